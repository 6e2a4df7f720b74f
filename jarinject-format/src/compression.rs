use std::fmt;
use std::io::{Read, Result, Seek, Write};

use comde::deflate::{DeflateCompressor, DeflateDecompressor};
use comde::{
    stored::{StoredCompressor, StoredDecompressor},
    ByteCount, Compressor, Decompressor,
};

pub mod constants {
    pub const COMPRESSION_STORED: u16 = 0;
    pub const COMPRESSION_DEFLATE: u16 = 8;
}

use self::constants::*;

/// Compression method of an archive entry.
///
/// Entries with an [`Unknown`](Compression::Unknown) method can still be
/// carried through a merge untouched; only decompression needs to know them.
#[derive(Clone, Copy, Eq, PartialEq, Hash)]
pub enum Compression {
    Stored,
    Deflate,
    Unknown(u16),
}

impl Default for Compression {
    fn default() -> Self {
        Self::Stored
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Compression::*;

        let s = match self {
            Stored => "stored",
            Deflate => "DEFLATE",
            Unknown(id) => return write!(f, "Unknown(id: {})", id),
        };

        write!(f, "{}", s)
    }
}

impl fmt::Debug for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl From<u16> for Compression {
    fn from(id: u16) -> Self {
        match id {
            COMPRESSION_STORED => Compression::Stored,
            COMPRESSION_DEFLATE => Compression::Deflate,
            id => Compression::Unknown(id),
        }
    }
}

impl Compression {
    pub const fn id(self) -> u16 {
        use Compression::*;

        match self {
            Stored => COMPRESSION_STORED,
            Deflate => COMPRESSION_DEFLATE,
            Unknown(id) => id,
        }
    }

    /// Minimum ZIP specification version needed to extract an entry with this method.
    pub(crate) const fn version_needed(self) -> u16 {
        match self {
            Compression::Stored => 10,
            _ => 20,
        }
    }

    pub fn compress<W: Write + Seek, R: Read>(
        self,
        mut writer: W,
        reader: &mut R,
    ) -> Result<ByteCount> {
        use Compression::*;

        match self {
            Stored => StoredCompressor.compress(&mut writer, reader),
            Deflate => DeflateCompressor.compress(&mut writer, reader),
            Unknown(id) => Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Cannot handle compression with id {}", id),
            )),
        }
    }

    pub fn decompress_write<R: Read, W: Write>(self, reader: R, writer: W) -> Result<()> {
        use Compression::*;

        match self {
            Stored => StoredDecompressor.copy(reader, writer),
            Deflate => DeflateDecompressor.copy(reader, writer),
            Unknown(id) => Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Cannot handle decompression with id {}", id),
            )),
        }?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn ids_map_to_methods() {
        assert_eq!(Compression::from(0), Compression::Stored);
        assert_eq!(Compression::from(8), Compression::Deflate);
        assert_eq!(Compression::from(12), Compression::Unknown(12));
        assert_eq!(Compression::Unknown(12).id(), 12);
    }

    #[test]
    fn deflate_roundtrip() {
        let data = b"Manifest-Version: 1.0\r\nMain-Class: App.Main\r\n\r\n".repeat(8);
        let mut compressed = Cursor::new(Vec::new());
        Compression::Deflate
            .compress(&mut compressed, &mut Cursor::new(&data))
            .unwrap();

        let mut out = Vec::new();
        Compression::Deflate
            .decompress_write(Cursor::new(compressed.into_inner()), &mut out)
            .unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn unknown_method_cannot_decompress() {
        let err = Compression::Unknown(14)
            .decompress_write(Cursor::new(vec![1, 2, 3]), Vec::new())
            .unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
    }
}
