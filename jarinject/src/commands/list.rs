use std::fs::File;
use std::io::BufReader;

use jarinject_format::{ArchiveReader, EntryRecord};
use serde::Serialize;

use crate::cli::ListArgs;
use crate::error::{Error, Result};
use crate::util::{format_size, format_time, ratio};

#[derive(Serialize)]
struct JsonEntry<'a> {
    path: &'a str,
    #[serde(rename = "type")]
    entry_type: &'static str,
    size: u64,
    compressed_size: u64,
    compression: String,
    crc32: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    modified: Option<String>,
}

impl<'a> From<&'a EntryRecord> for JsonEntry<'a> {
    fn from(entry: &'a EntryRecord) -> Self {
        JsonEntry {
            path: &entry.name,
            entry_type: if entry.is_dir() { "directory" } else { "file" },
            size: entry.uncompressed_size as u64,
            compressed_size: entry.compressed_size as u64,
            compression: entry.compression.to_string(),
            crc32: format!("{:08x}", entry.crc32),
            modified: entry
                .modified
                .to_datetime()
                .map(|t| t.format("%Y-%m-%dT%H:%M:%S").to_string()),
        }
    }
}

pub fn run(args: ListArgs) -> Result<()> {
    let reader = super::open_archive(&args.archive)?;

    if args.json {
        list_json(&reader)
    } else {
        list_compact(&reader);
        Ok(())
    }
}

fn list_json(reader: &ArchiveReader<BufReader<File>>) -> Result<()> {
    let entries: Vec<JsonEntry<'_>> = reader.entries().iter().map(JsonEntry::from).collect();
    let json = serde_json::to_string_pretty(&entries).map_err(Error::Json)?;
    println!("{}", json);
    Ok(())
}

fn list_compact(reader: &ArchiveReader<BufReader<File>>) {
    println!(
        "{:8}  {:>12}  {:>12}  {:>6}  {:19}  Path",
        "Method", "Compressed", "Size", "Ratio", "Modified"
    );
    println!("{}", "-".repeat(80));

    let mut total_compressed = 0u64;
    let mut total_size = 0u64;

    for entry in reader.entries() {
        let time = format_time(entry.modified);
        if entry.is_dir() {
            println!(
                "{:8}  {:>12}  {:>12}  {:>6}  {:19}  {}",
                "<dir>", "-", "-", "-", time, entry.name
            );
            continue;
        }

        let compressed = entry.compressed_size as u64;
        let size = entry.uncompressed_size as u64;
        println!(
            "{:8}  {:>12}  {:>12}  {:>5.1}%  {:19}  {}",
            entry.compression.to_string(),
            format_size(compressed),
            format_size(size),
            ratio(compressed, size),
            time,
            entry.name
        );

        total_compressed += compressed;
        total_size += size;
    }

    println!("{}", "-".repeat(80));
    println!(
        "{:8}  {:>12}  {:>12}  {:>5.1}%  {:19}  Total ({} entries)",
        "",
        format_size(total_compressed),
        format_size(total_size),
        ratio(total_compressed, total_size),
        "",
        reader.len()
    );
}
