mod inject;
mod list;
mod manifest;

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use jarinject_format::ArchiveReader;

use crate::error::{Error, Result};

pub use inject::run as inject;
pub use list::run as list;
pub use manifest::run as manifest;

fn open_archive(path: &Path) -> Result<ArchiveReader<BufReader<File>>> {
    ArchiveReader::open(path).map_err(|source| Error::OpenArchive {
        path: path.to_path_buf(),
        source,
    })
}
