use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Cursor, Read, Write};
use std::path::Path;

use crate::{
    compression::Compression,
    counting::CountingWriter,
    hashing::CrcReader,
    header::{EndOfCentralDirectory, FLAG_DATA_DESCRIPTOR},
    manifest::Manifest,
    record::{DosDateTime, EntryRecord},
    ser::Serialize,
    MANIFEST_PATH, META_INF_DIR,
};

use super::{copy_stream, reader::RawEntry};

/// 1MB buffer for sequential writes
const WRITE_BUFFER_SIZE: usize = 1024 * 1024;

fn too_large(what: &str) -> std::io::Error {
    std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        format!("{} exceeds the ZIP format limit (ZIP64 is not supported)", what),
    )
}

/// Narrow `value` to a 32-bit field. `u32::MAX` is the ZIP64 escape value
/// and is refused along with anything larger.
fn field_u32(value: u64, what: &str) -> std::io::Result<u32> {
    match u32::try_from(value) {
        Ok(v) if v != u32::MAX => Ok(v),
        _ => Err(too_large(what)),
    }
}

/// Narrow an entry count to the trailer's 16-bit field, refusing the ZIP64
/// escape value `u16::MAX`.
fn entry_count(len: usize) -> std::io::Result<u16> {
    match u16::try_from(len) {
        Ok(n) if n != u16::MAX => Ok(n),
        _ => Err(too_large("entry count")),
    }
}

/// Write side of a ZIP-family archive.
///
/// Entries are appended in call order; the central directory and trailer are
/// written by [`finish`](ArchiveWriter::finish). The output only needs to be
/// `Write`: offsets are tracked by counting bytes.
pub struct ArchiveWriter<W: Write> {
    inner: Option<CountingWriter<W>>,
    entries: Vec<EntryRecord>,
    names: HashSet<String>,
    comment: Vec<u8>,
}

impl<W: Write> Drop for ArchiveWriter<W> {
    fn drop(&mut self) {
        if self.inner.is_some() {
            tracing::warn!(
                entries = self.entries.len(),
                "ArchiveWriter dropped without calling finish(); archive is incomplete"
            );
        }
    }
}

impl ArchiveWriter<BufWriter<File>> {
    /// This will create a new archive on disk, and error if the file already exists.
    pub fn create<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path.as_ref())?;
        Ok(ArchiveWriter::new(BufWriter::with_capacity(
            WRITE_BUFFER_SIZE,
            file,
        )))
    }
}

impl<W: Write> ArchiveWriter<W> {
    pub fn new(inner: W) -> Self {
        ArchiveWriter {
            inner: Some(CountingWriter::new(inner)),
            entries: Vec::new(),
            names: HashSet::new(),
            comment: Vec::new(),
        }
    }

    /// Entries written so far, in write order.
    pub fn entries(&self) -> &[EntryRecord] {
        &self.entries
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn set_comment(&mut self, comment: Vec<u8>) {
        self.comment = comment;
    }

    fn output(&mut self) -> std::io::Result<&mut CountingWriter<W>> {
        self.inner.as_mut().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::Other, "archive already finished")
        })
    }

    /// Reserve the record's name and write its local header at the current position.
    fn start_entry(
        &mut self,
        record: &mut EntryRecord,
        local_extra: Vec<u8>,
    ) -> std::io::Result<()> {
        if self.names.contains(&record.name) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("entry `{}` already written", record.name),
            ));
        }

        let out = self.output()?;
        record.header_offset = field_u32(out.bytes_written(), "archive size")?;
        // Sizes are known up front, so no data descriptor follows the payload.
        record.flags &= !FLAG_DATA_DESCRIPTOR;
        record.local_header(local_extra).write(out)?;

        self.names.insert(record.name.clone());
        Ok(())
    }

    fn insert_with_time<R: Read>(
        &mut self,
        name: &str,
        compression: Compression,
        modified: DosDateTime,
        reader: &mut R,
    ) -> std::io::Result<&EntryRecord> {
        let mut crc_reader = CrcReader::new(reader);
        let mut compressed = Cursor::new(Vec::new());
        compression.compress(&mut compressed, &mut crc_reader)?;
        let compressed = compressed.into_inner();

        let mut record = EntryRecord::new(name.to_string(), compression, modified);
        record.crc32 = crc_reader.crc32();
        record.uncompressed_size = field_u32(crc_reader.bytes_read(), "entry size")?;
        record.compressed_size = field_u32(compressed.len() as u64, "entry size")?;

        self.start_entry(&mut record, Vec::new())?;
        self.output()?.write_all(&compressed)?;

        tracing::trace!(name, compression = %compression, "inserted entry");
        self.entries.push(record);
        Ok(&self.entries[self.entries.len() - 1])
    }

    /// Compress the contents of `reader` into a new entry called `name`.
    pub fn insert<R: Read>(
        &mut self,
        name: &str,
        compression: Compression,
        reader: &mut R,
    ) -> std::io::Result<&EntryRecord> {
        self.insert_with_time(name, compression, DosDateTime::now(), reader)
    }

    /// Add a directory entry. `name` must end with `/`.
    pub fn mkdir(&mut self, name: &str) -> std::io::Result<&EntryRecord> {
        self.mkdir_with_time(name, DosDateTime::now())
    }

    fn mkdir_with_time(
        &mut self,
        name: &str,
        modified: DosDateTime,
    ) -> std::io::Result<&EntryRecord> {
        if !name.ends_with('/') {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("directory name `{}` must end with `/`", name),
            ));
        }

        let mut record = EntryRecord::new(name.to_string(), Compression::Stored, modified);
        record.version_needed = 20;
        self.start_entry(&mut record, Vec::new())?;

        tracing::trace!(name, "inserted directory");
        self.entries.push(record);
        Ok(&self.entries[self.entries.len() - 1])
    }

    /// Write `manifest` as the archive's manifest, preceded by its directory entry.
    pub fn write_manifest(
        &mut self,
        manifest: &Manifest,
        modified: DosDateTime,
    ) -> std::io::Result<()> {
        if !self.contains(META_INF_DIR) {
            self.mkdir_with_time(META_INF_DIR, modified)?;
        }

        let bytes = manifest.to_bytes();
        self.insert_with_time(
            MANIFEST_PATH,
            Compression::Deflate,
            modified,
            &mut bytes.as_slice(),
        )?;
        Ok(())
    }

    /// Copy an entry from another archive without recompressing it.
    ///
    /// The record's metadata is carried through unchanged apart from its
    /// offset; the payload is streamed byte-for-byte.
    pub fn raw_copy<R: Read>(
        &mut self,
        entry: &EntryRecord,
        raw: RawEntry<'_, R>,
    ) -> std::io::Result<u64> {
        let RawEntry {
            local_extra,
            mut data,
        } = raw;

        let mut record = entry.clone();
        self.start_entry(&mut record, local_extra)?;
        let copied = copy_stream(&mut data, self.output()?)?;

        if copied != record.compressed_size as u64 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!(
                    "entry `{}` ended after {} of {} bytes",
                    record.name, copied, record.compressed_size
                ),
            ));
        }

        self.entries.push(record);
        Ok(copied)
    }

    /// Write the central directory and trailer, returning the inner writer.
    pub fn finish(mut self) -> std::io::Result<W> {
        let total = entry_count(self.entries.len())?;

        let mut out = self.inner.take().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::Other, "archive already finished")
        })?;

        let directory_offset = field_u32(out.bytes_written(), "archive size")?;
        for record in &self.entries {
            record.write(&mut out)?;
        }
        let directory_size = field_u32(
            out.bytes_written() - directory_offset as u64,
            "central directory",
        )?;

        let mut eocd = EndOfCentralDirectory::new(total, directory_size, directory_offset);
        eocd.comment = std::mem::take(&mut self.comment);
        eocd.write(&mut out)?;
        out.flush()?;

        tracing::debug!(entries = total, bytes = out.bytes_written(), "finished archive");
        Ok(out.into_inner())
    }
}
