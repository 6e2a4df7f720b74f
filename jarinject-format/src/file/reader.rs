use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, SeekFrom, Take};
use std::path::{Path, PathBuf};

use crate::{
    de::Deserialize,
    header::{find_end_of_central_directory, EndOfCentralDirectory, ZIP64_LOCATOR_SIGNATURE},
    is_manifest_entry,
    manifest::Manifest,
    record::{EntryRecord, LocalHeader},
};

fn invalid(msg: impl Into<String>) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, msg.into())
}

/// Read side of a ZIP-family archive.
///
/// The central directory is loaded on open; entries are exposed in storage
/// order (ascending local header offset), which is the order a streaming
/// reader would see them in.
#[derive(Debug)]
pub struct ArchiveReader<R> {
    inner: R,
    path: Option<PathBuf>,
    /// Bytes preceding the archive proper, e.g. a self-extractor stub.
    offset: u64,
    entries: Vec<EntryRecord>,
    comment: Vec<u8>,
}

/// The compressed payload of one entry, positioned at its first byte.
pub struct RawEntry<'a, R> {
    pub(crate) local_extra: Vec<u8>,
    pub(crate) data: Take<&'a mut R>,
}

impl<R> RawEntry<'_, R> {
    /// Extra field of the entry's local header.
    pub fn local_extra(&self) -> &[u8] {
        &self.local_extra
    }
}

impl<R: Read> Read for RawEntry<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.data.read(buf)
    }
}

impl ArchiveReader<BufReader<File>> {
    /// Open an existing archive on disk.
    pub fn open<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mut reader = ArchiveReader::new(BufReader::new(file))?;
        reader.path = Some(path.to_path_buf());
        Ok(reader)
    }
}

impl<R: Read + Seek> ArchiveReader<R> {
    pub fn new(mut inner: R) -> std::io::Result<Self> {
        let len = inner.seek(SeekFrom::End(0))?;
        let tail_len = len.min(EndOfCentralDirectory::MAX_SEARCH as u64);
        if (tail_len as usize) < EndOfCentralDirectory::SIZE {
            return Err(invalid("not a ZIP archive: file too short"));
        }

        let tail_start = len - tail_len;
        inner.seek(SeekFrom::Start(tail_start))?;
        let mut tail = vec![0u8; tail_len as usize];
        inner.read_exact(&mut tail)?;

        let pos = find_end_of_central_directory(&tail)
            .ok_or_else(|| invalid("not a ZIP archive: no end of central directory record"))?;
        let eocd = EndOfCentralDirectory::deserialize(&mut Cursor::new(&tail[pos..]))?;

        let has_zip64_locator = pos >= 20
            && tail[pos - 20..pos - 16] == ZIP64_LOCATOR_SIGNATURE.to_le_bytes();
        if eocd.is_zip64() || has_zip64_locator {
            return Err(std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                "ZIP64 archives are not supported",
            ));
        }
        if eocd.is_multi_disk() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                "multi-disk archives are not supported",
            ));
        }

        let eocd_pos = tail_start + pos as u64;
        let directory_end =
            eocd.central_directory_offset as u64 + eocd.central_directory_size as u64;
        let offset = eocd_pos
            .checked_sub(directory_end)
            .ok_or_else(|| invalid("central directory extends past its trailer"))?;

        inner.seek(SeekFrom::Start(offset + eocd.central_directory_offset as u64))?;
        let mut directory = vec![0u8; eocd.central_directory_size as usize];
        inner.read_exact(&mut directory)?;

        let mut cursor = Cursor::new(directory);
        let mut entries = Vec::with_capacity(eocd.total_entries as usize);
        for _ in 0..eocd.total_entries {
            entries.push(EntryRecord::deserialize(&mut cursor)?);
        }
        entries.sort_by_key(|r| r.header_offset);

        // Only the first stored entry of a given name is visible.
        let mut names = HashSet::with_capacity(entries.len());
        entries.retain(|record| {
            let first = names.insert(record.name.clone());
            if !first {
                tracing::warn!(name = %record.name, "ignoring duplicate entry");
            }
            first
        });

        tracing::debug!(
            entries = entries.len(),
            offset,
            directory_offset = format_args!("{:#x}", eocd.central_directory_offset),
            "read central directory"
        );

        Ok(ArchiveReader {
            inner,
            path: None,
            offset,
            entries,
            comment: eocd.comment,
        })
    }

    /// Position the underlying reader at the payload of `entry`.
    pub fn open_raw(&mut self, entry: &EntryRecord) -> std::io::Result<RawEntry<'_, R>> {
        self.inner
            .seek(SeekFrom::Start(self.offset + entry.header_offset as u64))?;
        let header = LocalHeader::deserialize(&mut self.inner)?;
        if header.name != entry.name.as_bytes() {
            return Err(invalid(format!(
                "local header of `{}` names `{}`",
                entry.name,
                String::from_utf8_lossy(&header.name)
            )));
        }

        Ok(RawEntry {
            local_extra: header.extra,
            data: (&mut self.inner).take(entry.compressed_size as u64),
        })
    }

    /// Decompress `entry` into memory, verifying its size and checksum.
    pub fn read_to_vec(&mut self, entry: &EntryRecord) -> std::io::Result<Vec<u8>> {
        if entry.is_encrypted() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                format!("entry `{}` is encrypted", entry.name),
            ));
        }

        let compression = entry.compression;
        let mut out = Vec::with_capacity(entry.uncompressed_size as usize);
        let raw = self.open_raw(entry)?;
        compression.decompress_write(raw, &mut out)?;

        if out.len() as u64 != entry.uncompressed_size as u64 {
            return Err(invalid(format!(
                "entry `{}` decompressed to {} bytes, expected {}",
                entry.name,
                out.len(),
                entry.uncompressed_size
            )));
        }
        if crc32fast::hash(&out) != entry.crc32 {
            return Err(invalid(format!("entry `{}` failed its CRC check", entry.name)));
        }

        Ok(out)
    }

    /// Read and parse the manifest, if the archive has one.
    pub fn manifest(&mut self) -> std::io::Result<Option<Manifest>> {
        let entry = match self.manifest_entry() {
            Some(entry) => entry.clone(),
            None => return Ok(None),
        };

        let bytes = self.read_to_vec(&entry)?;
        let manifest = Manifest::parse(&bytes)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        Ok(Some(manifest))
    }
}

impl<R> ArchiveReader<R> {
    #[inline(always)]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    #[inline(always)]
    pub fn entries(&self) -> &[EntryRecord] {
        &self.entries
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline(always)]
    pub fn comment(&self) -> &[u8] {
        &self.comment
    }

    pub fn find(&self, name: &str) -> Option<&EntryRecord> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// The manifest entry, matched without regard to case.
    pub fn manifest_entry(&self) -> Option<&EntryRecord> {
        self.entries
            .iter()
            .find(|e| !e.is_dir() && is_manifest_entry(&e.name))
    }
}
