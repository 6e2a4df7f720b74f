use std::io::{Result, Write};

use byteorder::{LittleEndian, WriteBytesExt};

use crate::{
    header::{
        EndOfCentralDirectory, CENTRAL_DIRECTORY_SIGNATURE, END_OF_CENTRAL_DIRECTORY_SIGNATURE,
        LOCAL_FILE_HEADER_SIGNATURE,
    },
    record::{DosDateTime, EntryRecord, LocalHeader},
};

pub(crate) trait Serialize {
    fn write<W: Write>(&self, writer: &mut W) -> Result<()>;
}

/// Length of a variable field as stored in a 16-bit header slot.
fn field_len(bytes: &[u8], what: &str) -> Result<u16> {
    u16::try_from(bytes.len()).map_err(|_| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("{} is longer than {} bytes", what, u16::MAX),
        )
    })
}

impl Serialize for DosDateTime {
    fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u16::<LittleEndian>(self.time)?;
        writer.write_u16::<LittleEndian>(self.date)
    }
}

impl Serialize for LocalHeader {
    fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        let name_len = field_len(&self.name, "entry name")?;
        let extra_len = field_len(&self.extra, "extra field")?;

        writer.write_u32::<LittleEndian>(LOCAL_FILE_HEADER_SIGNATURE)?;
        writer.write_u16::<LittleEndian>(self.version_needed)?;
        writer.write_u16::<LittleEndian>(self.flags)?;
        writer.write_u16::<LittleEndian>(self.compression.id())?;
        self.modified.write(writer)?;
        writer.write_u32::<LittleEndian>(self.crc32)?;
        writer.write_u32::<LittleEndian>(self.compressed_size)?;
        writer.write_u32::<LittleEndian>(self.uncompressed_size)?;
        writer.write_u16::<LittleEndian>(name_len)?;
        writer.write_u16::<LittleEndian>(extra_len)?;
        writer.write_all(&self.name)?;
        writer.write_all(&self.extra)
    }
}

impl Serialize for EntryRecord {
    fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        let name = self.name.as_bytes();
        let name_len = field_len(name, "entry name")?;
        let extra_len = field_len(&self.extra, "extra field")?;
        let comment_len = field_len(&self.comment, "entry comment")?;

        writer.write_u32::<LittleEndian>(CENTRAL_DIRECTORY_SIGNATURE)?;
        writer.write_u16::<LittleEndian>(self.version_made_by)?;
        writer.write_u16::<LittleEndian>(self.version_needed)?;
        writer.write_u16::<LittleEndian>(self.flags)?;
        writer.write_u16::<LittleEndian>(self.compression.id())?;
        self.modified.write(writer)?;
        writer.write_u32::<LittleEndian>(self.crc32)?;
        writer.write_u32::<LittleEndian>(self.compressed_size)?;
        writer.write_u32::<LittleEndian>(self.uncompressed_size)?;
        writer.write_u16::<LittleEndian>(name_len)?;
        writer.write_u16::<LittleEndian>(extra_len)?;
        writer.write_u16::<LittleEndian>(comment_len)?;
        // Disk number start
        writer.write_u16::<LittleEndian>(0)?;
        writer.write_u16::<LittleEndian>(self.internal_attributes)?;
        writer.write_u32::<LittleEndian>(self.external_attributes)?;
        writer.write_u32::<LittleEndian>(self.header_offset)?;
        writer.write_all(name)?;
        writer.write_all(&self.extra)?;
        writer.write_all(&self.comment)
    }
}

impl Serialize for EndOfCentralDirectory {
    fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        let comment_len = field_len(&self.comment, "archive comment")?;

        writer.write_u32::<LittleEndian>(END_OF_CENTRAL_DIRECTORY_SIGNATURE)?;
        writer.write_u16::<LittleEndian>(self.disk_number)?;
        writer.write_u16::<LittleEndian>(self.central_directory_disk)?;
        writer.write_u16::<LittleEndian>(self.entries_on_disk)?;
        writer.write_u16::<LittleEndian>(self.total_entries)?;
        writer.write_u32::<LittleEndian>(self.central_directory_size)?;
        writer.write_u32::<LittleEndian>(self.central_directory_offset)?;
        writer.write_u16::<LittleEndian>(comment_len)?;
        writer.write_all(&self.comment)
    }
}
