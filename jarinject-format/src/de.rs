use std::io::{Read, Result};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::{
    compression::Compression,
    header::{
        EndOfCentralDirectory, CENTRAL_DIRECTORY_SIGNATURE, END_OF_CENTRAL_DIRECTORY_SIGNATURE,
        LOCAL_FILE_HEADER_SIGNATURE,
    },
    record::{DosDateTime, EntryRecord, LocalHeader},
};

pub(crate) trait Deserialize: Sized {
    fn deserialize<R: Read>(reader: &mut R) -> Result<Self>;
}

fn invalid(msg: impl Into<String>) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, msg.into())
}

fn expect_signature<R: Read>(reader: &mut R, expected: u32, what: &str) -> Result<()> {
    let signature = reader.read_u32::<LittleEndian>()?;
    if signature != expected {
        return Err(invalid(format!(
            "bad {} signature: {:#010x}",
            what, signature
        )));
    }
    Ok(())
}

fn read_bytes<R: Read>(reader: &mut R, len: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

impl Deserialize for DosDateTime {
    fn deserialize<R: Read>(reader: &mut R) -> Result<Self> {
        let time = reader.read_u16::<LittleEndian>()?;
        let date = reader.read_u16::<LittleEndian>()?;
        Ok(DosDateTime { time, date })
    }
}

impl Deserialize for LocalHeader {
    fn deserialize<R: Read>(reader: &mut R) -> Result<Self> {
        expect_signature(reader, LOCAL_FILE_HEADER_SIGNATURE, "local file header")?;

        let version_needed = reader.read_u16::<LittleEndian>()?;
        let flags = reader.read_u16::<LittleEndian>()?;
        let compression = Compression::from(reader.read_u16::<LittleEndian>()?);
        let modified = DosDateTime::deserialize(reader)?;
        let crc32 = reader.read_u32::<LittleEndian>()?;
        let compressed_size = reader.read_u32::<LittleEndian>()?;
        let uncompressed_size = reader.read_u32::<LittleEndian>()?;
        let name_len = reader.read_u16::<LittleEndian>()? as usize;
        let extra_len = reader.read_u16::<LittleEndian>()? as usize;
        let name = read_bytes(reader, name_len)?;
        let extra = read_bytes(reader, extra_len)?;

        Ok(LocalHeader {
            version_needed,
            flags,
            compression,
            modified,
            crc32,
            compressed_size,
            uncompressed_size,
            name,
            extra,
        })
    }
}

impl Deserialize for EntryRecord {
    fn deserialize<R: Read>(reader: &mut R) -> Result<Self> {
        expect_signature(reader, CENTRAL_DIRECTORY_SIGNATURE, "central directory")?;

        let version_made_by = reader.read_u16::<LittleEndian>()?;
        let version_needed = reader.read_u16::<LittleEndian>()?;
        let flags = reader.read_u16::<LittleEndian>()?;
        let compression = Compression::from(reader.read_u16::<LittleEndian>()?);
        let modified = DosDateTime::deserialize(reader)?;
        let crc32 = reader.read_u32::<LittleEndian>()?;
        let compressed_size = reader.read_u32::<LittleEndian>()?;
        let uncompressed_size = reader.read_u32::<LittleEndian>()?;
        let name_len = reader.read_u16::<LittleEndian>()? as usize;
        let extra_len = reader.read_u16::<LittleEndian>()? as usize;
        let comment_len = reader.read_u16::<LittleEndian>()? as usize;
        let disk_start = reader.read_u16::<LittleEndian>()?;
        let internal_attributes = reader.read_u16::<LittleEndian>()?;
        let external_attributes = reader.read_u32::<LittleEndian>()?;
        let header_offset = reader.read_u32::<LittleEndian>()?;
        let name = read_bytes(reader, name_len)?;
        let extra = read_bytes(reader, extra_len)?;
        let comment = read_bytes(reader, comment_len)?;

        if disk_start != 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                "multi-disk archives are not supported",
            ));
        }

        if compressed_size == u32::MAX
            || uncompressed_size == u32::MAX
            || header_offset == u32::MAX
        {
            return Err(std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                "ZIP64 entries are not supported",
            ));
        }

        let name = String::from_utf8(name)
            .map_err(|_| invalid("entry name is not valid UTF-8"))?;

        Ok(EntryRecord {
            name,
            version_made_by,
            version_needed,
            flags,
            compression,
            modified,
            crc32,
            compressed_size,
            uncompressed_size,
            extra,
            comment,
            internal_attributes,
            external_attributes,
            header_offset,
        })
    }
}

impl Deserialize for EndOfCentralDirectory {
    fn deserialize<R: Read>(reader: &mut R) -> Result<Self> {
        expect_signature(
            reader,
            END_OF_CENTRAL_DIRECTORY_SIGNATURE,
            "end of central directory",
        )?;

        let disk_number = reader.read_u16::<LittleEndian>()?;
        let central_directory_disk = reader.read_u16::<LittleEndian>()?;
        let entries_on_disk = reader.read_u16::<LittleEndian>()?;
        let total_entries = reader.read_u16::<LittleEndian>()?;
        let central_directory_size = reader.read_u32::<LittleEndian>()?;
        let central_directory_offset = reader.read_u32::<LittleEndian>()?;
        let comment_len = reader.read_u16::<LittleEndian>()? as usize;
        let comment = read_bytes(reader, comment_len)?;

        Ok(EndOfCentralDirectory {
            disk_number,
            central_directory_disk,
            entries_on_disk,
            total_entries,
            central_directory_size,
            central_directory_offset,
            comment,
        })
    }
}
