//! Payload codec: turns one compressed voice block back into PCM bytes.

use std::io::{self, Read};

use flate2::read::MultiGzDecoder;

/// Decompresses one self-contained block into the original bytes.
///
/// Implementations must consume the whole block; a truncated or corrupt block
/// is an error, never a partial result.
pub trait PayloadCodec: Send {
    fn decompress(&mut self, block: &[u8]) -> io::Result<Vec<u8>>;
}

/// Gzip blocks as produced by the sending client. Concatenated gzip members
/// inside one block are decoded back to back.
#[derive(Debug, Default, Clone, Copy)]
pub struct GzipCodec;

impl PayloadCodec for GzipCodec {
    fn decompress(&mut self, block: &[u8]) -> io::Result<Vec<u8>> {
        if block.is_empty() {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "empty gzip block"));
        }
        let mut pcm = Vec::with_capacity(block.len() * 4);
        MultiGzDecoder::new(block).read_to_end(&mut pcm)?;
        log::trace!("gzip in:out {}:{}", block.len(), pcm.len());
        Ok(pcm)
    }
}
