use std::io::{Read, Result, Write};

use crate::COPY_BUFFER_SIZE;

pub mod reader;
pub mod writer;

#[cfg(test)]
mod tests;

/// Copy everything from `reader` into `writer` through a fixed-size buffer.
pub(crate) fn copy_stream<R: Read + ?Sized, W: Write + ?Sized>(
    reader: &mut R,
    writer: &mut W,
) -> Result<u64> {
    let mut buf = [0u8; COPY_BUFFER_SIZE];
    let mut total = 0u64;

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => return Ok(total),
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        writer.write_all(&buf[..n])?;
        total += n as u64;
    }
}
