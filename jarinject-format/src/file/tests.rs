use std::io::{Cursor, Write};

use byteorder::{LittleEndian, WriteBytesExt};

use crate::compression::Compression;
use crate::de::Deserialize;
use crate::file::{reader::ArchiveReader, writer::ArchiveWriter};
use crate::header::FLAG_DATA_DESCRIPTOR;
use crate::manifest::Manifest;
use crate::record::{DosDateTime, LocalHeader};

fn build(entries: &[(&str, Compression, &[u8])]) -> Vec<u8> {
    let mut writer = ArchiveWriter::new(Vec::new());
    for (name, compression, data) in entries {
        if name.ends_with('/') {
            writer.mkdir(name).unwrap();
        } else {
            writer
                .insert(name, *compression, &mut Cursor::new(*data))
                .unwrap();
        }
    }
    writer.finish().unwrap()
}

#[test]
fn write_then_read_entries() {
    let bytes = build(&[
        ("com/", Compression::Stored, &b""[..]),
        ("com/App.class", Compression::Deflate, &b"\xca\xfe\xba\xbe app bytes"[..]),
        ("readme.txt", Compression::Stored, &b"hello"[..]),
    ]);

    let mut reader = ArchiveReader::new(Cursor::new(bytes)).unwrap();
    let names: Vec<_> = reader.entries().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["com/", "com/App.class", "readme.txt"]);
    assert!(reader.entries()[0].is_dir());

    let entry = reader.find("com/App.class").unwrap().clone();
    assert_eq!(entry.compression, Compression::Deflate);
    assert_eq!(reader.read_to_vec(&entry).unwrap(), b"\xca\xfe\xba\xbe app bytes");

    let entry = reader.find("readme.txt").unwrap().clone();
    assert_eq!(entry.compressed_size, 5);
    assert_eq!(reader.read_to_vec(&entry).unwrap(), b"hello");
}

#[test]
fn raw_copy_preserves_payload_and_metadata() {
    let source = build(&[("data.bin", Compression::Deflate, &[7u8; 10_000][..])]);
    let mut reader = ArchiveReader::new(Cursor::new(source.clone())).unwrap();
    let entry = reader.entries()[0].clone();

    let mut writer = ArchiveWriter::new(Vec::new());
    writer.insert("first.txt", Compression::Stored, &mut &b"first"[..]).unwrap();
    let raw = reader.open_raw(&entry).unwrap();
    let copied = writer.raw_copy(&entry, raw).unwrap();
    assert_eq!(copied, entry.compressed_size as u64);
    let output = writer.finish().unwrap();

    let mut merged = ArchiveReader::new(Cursor::new(output)).unwrap();
    let copy = merged.find("data.bin").unwrap().clone();
    assert_eq!(copy.crc32, entry.crc32);
    assert_eq!(copy.compression, entry.compression);
    assert_eq!(copy.modified, entry.modified);
    assert_eq!(copy.compressed_size, entry.compressed_size);
    assert_ne!(copy.header_offset(), entry.header_offset());
    assert_eq!(merged.read_to_vec(&copy).unwrap(), vec![7u8; 10_000]);
}

#[test]
fn duplicate_insert_is_refused() {
    let mut writer = ArchiveWriter::new(Vec::new());
    writer.insert("a.txt", Compression::Stored, &mut &b"1"[..]).unwrap();
    let err = writer
        .insert("a.txt", Compression::Stored, &mut &b"2"[..])
        .unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::AlreadyExists);
    writer.finish().unwrap();
}

#[test]
fn mkdir_requires_trailing_slash() {
    let mut writer = ArchiveWriter::new(Vec::new());
    let err = writer.mkdir("META-INF").unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
    writer.finish().unwrap();
}

#[test]
fn manifest_is_written_after_its_directory() {
    let mut manifest = Manifest::new();
    manifest.set_main_attr("Main-Class", "App.Main");

    let mut writer = ArchiveWriter::new(Vec::new());
    writer.write_manifest(&manifest, DosDateTime::now()).unwrap();
    let bytes = writer.finish().unwrap();

    let mut reader = ArchiveReader::new(Cursor::new(bytes)).unwrap();
    let names: Vec<_> = reader.entries().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["META-INF/", "META-INF/MANIFEST.MF"]);
    assert_eq!(reader.manifest().unwrap(), Some(manifest));
}

#[test]
fn missing_manifest_is_none() {
    let bytes = build(&[("App.class", Compression::Stored, &b"app"[..])]);
    let mut reader = ArchiveReader::new(Cursor::new(bytes)).unwrap();
    assert!(reader.manifest_entry().is_none());
    assert_eq!(reader.manifest().unwrap(), None);
}

#[test]
fn archive_with_prepended_stub() {
    let archive = build(&[("App.class", Compression::Stored, &b"app"[..])]);
    let mut bytes = b"#!/bin/sh\nexec java -jar \"$0\" \"$@\"\n".to_vec();
    bytes.extend_from_slice(&archive);

    let mut reader = ArchiveReader::new(Cursor::new(bytes)).unwrap();
    let entry = reader.entries()[0].clone();
    assert_eq!(reader.read_to_vec(&entry).unwrap(), b"app");
}

#[test]
fn archive_comment_roundtrip() {
    let mut writer = ArchiveWriter::new(Vec::new());
    writer.set_comment(b"packaged".to_vec());
    let bytes = writer.finish().unwrap();

    let reader = ArchiveReader::new(Cursor::new(bytes)).unwrap();
    assert!(reader.is_empty());
    assert_eq!(reader.comment(), b"packaged");
}

#[test]
fn corrupted_payload_fails_crc() {
    let mut bytes = build(&[("a.txt", Compression::Stored, &b"payload"[..])]);
    // The payload starts right after the 30-byte local header and the 5-byte name.
    bytes[35] ^= 0xff;

    let mut reader = ArchiveReader::new(Cursor::new(bytes)).unwrap();
    let entry = reader.entries()[0].clone();
    let err = reader.read_to_vec(&entry).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
}

#[test]
fn garbage_is_not_an_archive() {
    let err = ArchiveReader::new(Cursor::new(vec![0u8; 100])).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);

    let err = ArchiveReader::new(Cursor::new(b"PK".to_vec())).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
}

#[test]
fn duplicate_names_keep_the_first_stored_entry() {
    let bytes = build(&[
        ("a.txt", Compression::Stored, &b"1"[..]),
        ("b.txt", Compression::Stored, &b"2"[..]),
    ]);
    let text = bytes
        .windows(5)
        .enumerate()
        .filter(|(_, w)| *w == b"b.txt")
        .map(|(i, _)| i)
        .collect::<Vec<_>>();
    // Rename both the local and central copy of b.txt to a.txt.
    let mut bytes = bytes;
    for i in text {
        bytes[i] = b'a';
    }

    let mut reader = ArchiveReader::new(Cursor::new(bytes)).unwrap();
    assert_eq!(reader.len(), 1);
    let entry = reader.find("a.txt").unwrap().clone();
    assert_eq!(entry.header_offset(), 0);
    assert_eq!(reader.read_to_vec(&entry).unwrap(), b"1");
}

/// A stored entry in the shape `jar` writes when streaming: bit 3 set, zero
/// CRC and sizes in the local header, and a signed data descriptor after the
/// payload. The central directory carries the real values.
fn streamed_archive(name: &str, data: &[u8]) -> Vec<u8> {
    let crc = crc32fast::hash(data);
    let size = data.len() as u32;
    let mut out = Vec::new();

    out.write_u32::<LittleEndian>(0x0403_4b50).unwrap();
    out.write_u16::<LittleEndian>(20).unwrap();
    out.write_u16::<LittleEndian>(FLAG_DATA_DESCRIPTOR).unwrap();
    out.write_u16::<LittleEndian>(0).unwrap();
    out.write_u16::<LittleEndian>(0).unwrap();
    out.write_u16::<LittleEndian>(0x21).unwrap();
    out.write_u32::<LittleEndian>(0).unwrap();
    out.write_u32::<LittleEndian>(0).unwrap();
    out.write_u32::<LittleEndian>(0).unwrap();
    out.write_u16::<LittleEndian>(name.len() as u16).unwrap();
    out.write_u16::<LittleEndian>(0).unwrap();
    out.write_all(name.as_bytes()).unwrap();
    out.write_all(data).unwrap();

    out.write_u32::<LittleEndian>(0x0807_4b50).unwrap();
    out.write_u32::<LittleEndian>(crc).unwrap();
    out.write_u32::<LittleEndian>(size).unwrap();
    out.write_u32::<LittleEndian>(size).unwrap();

    let directory_offset = out.len() as u32;
    out.write_u32::<LittleEndian>(0x0201_4b50).unwrap();
    out.write_u16::<LittleEndian>(20).unwrap();
    out.write_u16::<LittleEndian>(20).unwrap();
    out.write_u16::<LittleEndian>(FLAG_DATA_DESCRIPTOR).unwrap();
    out.write_u16::<LittleEndian>(0).unwrap();
    out.write_u16::<LittleEndian>(0).unwrap();
    out.write_u16::<LittleEndian>(0x21).unwrap();
    out.write_u32::<LittleEndian>(crc).unwrap();
    out.write_u32::<LittleEndian>(size).unwrap();
    out.write_u32::<LittleEndian>(size).unwrap();
    out.write_u16::<LittleEndian>(name.len() as u16).unwrap();
    out.write_u16::<LittleEndian>(0).unwrap();
    out.write_u16::<LittleEndian>(0).unwrap();
    out.write_u16::<LittleEndian>(0).unwrap();
    out.write_u16::<LittleEndian>(0).unwrap();
    out.write_u32::<LittleEndian>(0).unwrap();
    out.write_u32::<LittleEndian>(0).unwrap();
    out.write_all(name.as_bytes()).unwrap();
    let directory_size = out.len() as u32 - directory_offset;

    out.write_u32::<LittleEndian>(0x0605_4b50).unwrap();
    out.write_u16::<LittleEndian>(0).unwrap();
    out.write_u16::<LittleEndian>(0).unwrap();
    out.write_u16::<LittleEndian>(1).unwrap();
    out.write_u16::<LittleEndian>(1).unwrap();
    out.write_u32::<LittleEndian>(directory_size).unwrap();
    out.write_u32::<LittleEndian>(directory_offset).unwrap();
    out.write_u16::<LittleEndian>(0).unwrap();
    out
}

#[test]
fn raw_copy_writes_sizes_up_front() {
    let source = streamed_archive("App.class", b"streamed bytes");
    let mut source = ArchiveReader::new(Cursor::new(source)).unwrap();
    let entry = source.find("App.class").unwrap().clone();
    assert!(entry.has_data_descriptor());
    assert_eq!(source.read_to_vec(&entry).unwrap(), b"streamed bytes");

    let mut writer = ArchiveWriter::new(Vec::new());
    let raw = source.open_raw(&entry).unwrap();
    assert_eq!(writer.raw_copy(&entry, raw).unwrap(), 14);
    let bytes = writer.finish().unwrap();

    let local = LocalHeader::deserialize(&mut Cursor::new(&bytes)).unwrap();
    assert_eq!(local.flags & FLAG_DATA_DESCRIPTOR, 0);
    assert_eq!(local.crc32, entry.crc32);
    assert_eq!(local.compressed_size, 14);
    assert_eq!(local.uncompressed_size, 14);
    // The descriptor is not carried over: the payload is followed directly
    // by the central directory.
    let payload_end = LocalHeader::FIXED_SIZE + "App.class".len() + 14;
    assert_eq!(&bytes[payload_end..payload_end + 4], b"PK\x01\x02");

    let mut copied = ArchiveReader::new(Cursor::new(bytes)).unwrap();
    let copy = copied.find("App.class").unwrap().clone();
    assert!(!copy.has_data_descriptor());
    assert_eq!(copied.read_to_vec(&copy).unwrap(), b"streamed bytes");
}

#[test]
fn entry_count_stops_short_of_the_zip64_marker() {
    let mut writer = ArchiveWriter::new(Vec::new());
    for i in 0..u16::MAX {
        writer.mkdir(&format!("d{}/", i)).unwrap();
    }
    let err = writer.finish().unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::Unsupported);

    let mut writer = ArchiveWriter::new(Vec::new());
    for i in 0..u16::MAX - 1 {
        writer.mkdir(&format!("d{}/", i)).unwrap();
    }
    let bytes = writer.finish().unwrap();
    let reader = ArchiveReader::new(Cursor::new(bytes)).unwrap();
    assert_eq!(reader.len(), u16::MAX as usize - 1);
}

#[test]
fn create_refuses_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("exists.jar");
    std::fs::File::create(&path)
        .unwrap()
        .write_all(b"not empty")
        .unwrap();

    assert!(ArchiveWriter::create(&path).is_err());
}
