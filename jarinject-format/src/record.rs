use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

use crate::compression::Compression;
use crate::header::{FLAG_DATA_DESCRIPTOR, FLAG_ENCRYPTED, FLAG_UTF8, VERSION_MADE_BY};

/// MS-DOS packed modification time, as stored in ZIP headers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DosDateTime {
    pub time: u16,
    pub date: u16,
}

impl DosDateTime {
    pub fn from_datetime(datetime: &NaiveDateTime) -> DosDateTime {
        // DOS dates cannot represent anything before 1980.
        if datetime.year() < 1980 {
            return DosDateTime {
                time: 0,
                date: (1 << 5) | 1,
            };
        }

        let year = (datetime.year().min(2107) - 1980) as u16;
        DosDateTime {
            time: ((datetime.hour() as u16) << 11)
                | ((datetime.minute() as u16) << 5)
                | (datetime.second() as u16 / 2),
            date: (year << 9) | ((datetime.month() as u16) << 5) | datetime.day() as u16,
        }
    }

    pub fn now() -> DosDateTime {
        Self::from_datetime(&chrono::Local::now().naive_local())
    }

    /// Decode into a calendar time; `None` when the packed fields are out of range.
    pub fn to_datetime(self) -> Option<NaiveDateTime> {
        let year = 1980 + (self.date >> 9) as i32;
        let month = ((self.date >> 5) & 0x0f) as u32;
        let day = (self.date & 0x1f) as u32;
        let hour = (self.time >> 11) as u32;
        let minute = ((self.time >> 5) & 0x3f) as u32;
        let second = ((self.time & 0x1f) * 2) as u32;

        NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)
    }
}

/// One entry of an archive, as described by its central directory header.
///
/// A record is carried through a merge unchanged; only the local header offset
/// is reassigned by the writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRecord {
    pub name: String,
    pub version_made_by: u16,
    pub version_needed: u16,
    pub flags: u16,
    pub compression: Compression,
    pub modified: DosDateTime,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub extra: Vec<u8>,
    pub comment: Vec<u8>,
    pub internal_attributes: u16,
    pub external_attributes: u32,
    pub(crate) header_offset: u32,
}

impl EntryRecord {
    pub(crate) fn new(name: String, compression: Compression, modified: DosDateTime) -> Self {
        let flags = if name.is_ascii() { 0 } else { FLAG_UTF8 };

        EntryRecord {
            name,
            version_made_by: VERSION_MADE_BY,
            version_needed: compression.version_needed(),
            flags,
            compression,
            modified,
            crc32: 0,
            compressed_size: 0,
            uncompressed_size: 0,
            extra: Vec::new(),
            comment: Vec::new(),
            internal_attributes: 0,
            external_attributes: 0,
            header_offset: 0,
        }
    }

    #[inline(always)]
    pub fn is_dir(&self) -> bool {
        self.name.ends_with('/')
    }

    #[inline(always)]
    pub fn is_encrypted(&self) -> bool {
        self.flags & FLAG_ENCRYPTED != 0
    }

    #[inline(always)]
    pub fn has_data_descriptor(&self) -> bool {
        self.flags & FLAG_DATA_DESCRIPTOR != 0
    }

    /// Offset of the local header, relative to the start of the archive.
    #[inline(always)]
    pub fn header_offset(&self) -> u32 {
        self.header_offset
    }

    pub(crate) fn local_header(&self, extra: Vec<u8>) -> LocalHeader {
        LocalHeader {
            version_needed: self.version_needed,
            flags: self.flags,
            compression: self.compression,
            modified: self.modified,
            crc32: self.crc32,
            compressed_size: self.compressed_size,
            uncompressed_size: self.uncompressed_size,
            name: self.name.as_bytes().to_vec(),
            extra,
        }
    }
}

/// The header written immediately before each entry's payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LocalHeader {
    pub(crate) version_needed: u16,
    pub(crate) flags: u16,
    pub(crate) compression: Compression,
    pub(crate) modified: DosDateTime,
    pub(crate) crc32: u32,
    pub(crate) compressed_size: u32,
    pub(crate) uncompressed_size: u32,
    pub(crate) name: Vec<u8>,
    pub(crate) extra: Vec<u8>,
}

impl LocalHeader {
    pub const FIXED_SIZE: usize = 30;
}
