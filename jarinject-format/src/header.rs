// ZIP record signatures, stored little-endian on disk.
pub(crate) const LOCAL_FILE_HEADER_SIGNATURE: u32 = 0x0403_4b50;
pub(crate) const CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x0201_4b50;
pub(crate) const END_OF_CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x0605_4b50;
pub(crate) const ZIP64_LOCATOR_SIGNATURE: u32 = 0x0706_4b50;

/// General purpose flag: entry is encrypted.
pub(crate) const FLAG_ENCRYPTED: u16 = 1 << 0;
/// General purpose flag: CRC and sizes follow the data in a data descriptor.
pub(crate) const FLAG_DATA_DESCRIPTOR: u16 = 1 << 3;
/// General purpose flag: name and comment are UTF-8.
pub(crate) const FLAG_UTF8: u16 = 1 << 11;

/// "Version made by" written for new entries: MS-DOS host, ZIP 2.0.
pub(crate) const VERSION_MADE_BY: u16 = 20;

/// Trailer of a ZIP archive, pointing at the central directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct EndOfCentralDirectory {
    pub(crate) disk_number: u16,
    pub(crate) central_directory_disk: u16,
    pub(crate) entries_on_disk: u16,
    pub(crate) total_entries: u16,
    pub(crate) central_directory_size: u32,
    pub(crate) central_directory_offset: u32,
    pub(crate) comment: Vec<u8>,
}

impl EndOfCentralDirectory {
    /// Size of the record without its trailing comment.
    pub const SIZE: usize = 22;

    /// Furthest distance from the end of the file the record can start.
    pub const MAX_SEARCH: usize = Self::SIZE + u16::MAX as usize;

    pub(crate) fn new(
        entries: u16,
        central_directory_size: u32,
        central_directory_offset: u32,
    ) -> Self {
        EndOfCentralDirectory {
            entries_on_disk: entries,
            total_entries: entries,
            central_directory_size,
            central_directory_offset,
            ..Default::default()
        }
    }

    /// Whether any field carries the ZIP64 escape value.
    pub(crate) fn is_zip64(&self) -> bool {
        self.total_entries == u16::MAX
            || self.entries_on_disk == u16::MAX
            || self.central_directory_size == u32::MAX
            || self.central_directory_offset == u32::MAX
    }

    pub(crate) fn is_multi_disk(&self) -> bool {
        self.disk_number != 0
            || self.central_directory_disk != 0
            || self.entries_on_disk != self.total_entries
    }
}

/// Locate the end of central directory record within the tail of an archive.
///
/// Scans backwards so the last well-formed record wins; the comment length
/// must fit inside the remaining bytes.
pub(crate) fn find_end_of_central_directory(tail: &[u8]) -> Option<usize> {
    if tail.len() < EndOfCentralDirectory::SIZE {
        return None;
    }

    let signature = END_OF_CENTRAL_DIRECTORY_SIGNATURE.to_le_bytes();
    (0..=tail.len() - EndOfCentralDirectory::SIZE)
        .rev()
        .find(|&pos| {
            if tail[pos..pos + 4] != signature {
                return false;
            }
            let comment_len = u16::from_le_bytes([tail[pos + 20], tail[pos + 21]]) as usize;
            pos + EndOfCentralDirectory::SIZE + comment_len <= tail.len()
        })
}
