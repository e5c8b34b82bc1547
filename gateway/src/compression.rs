//! Inflation of zlib-compressed binary frames.

use flate2::{Decompress, FlushDecompress, Status};
use std::{
    error::Error,
    fmt::{Display, Formatter, Result as FmtResult},
};

/// Starting size of the output buffer.
const BUFFER_SIZE: usize = 32 * 1024;

/// An error occurred while inflating a frame.
#[derive(Debug)]
pub struct CompressionError {
    pub(crate) source: Option<Box<dyn Error + Send + Sync>>,
}

impl Display for CompressionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str("a frame could not be inflated")
    }
}

impl Error for CompressionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_ref()
            .map(|source| &**source as &(dyn Error + 'static))
    }
}

/// Inflater for zlib-compressed binary frames.
///
/// The output buffer is reused across frames; a frame's inflated bytes are
/// valid until the next call.
#[derive(Debug)]
pub struct Inflater {
    buffer: Vec<u8>,
}

impl Inflater {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(BUFFER_SIZE),
        }
    }

    /// Inflate one complete zlib stream.
    pub fn inflate(&mut self, bytes: &[u8]) -> Result<&[u8], CompressionError> {
        self.buffer.clear();

        let mut decompress = Decompress::new(true);
        let mut offset = 0_u64;

        loop {
            let before_out = decompress.total_out();
            let capacity = self.buffer.len();
            self.buffer.resize(capacity + BUFFER_SIZE, 0);

            #[allow(clippy::cast_possible_truncation)]
            let status = decompress
                .decompress(
                    &bytes[offset as usize..],
                    &mut self.buffer[capacity..],
                    FlushDecompress::Finish,
                )
                .map_err(|source| CompressionError {
                    source: Some(Box::new(source)),
                })?;

            let produced = (decompress.total_out() - before_out) as usize;
            self.buffer.truncate(capacity + produced);
            offset = decompress.total_in();

            match status {
                Status::StreamEnd => break,
                Status::Ok | Status::BufError => {
                    if produced == 0 && offset as usize >= bytes.len() {
                        return Err(CompressionError { source: None });
                    }
                }
            }
        }

        Ok(&self.buffer)
    }
}

impl Default for Inflater {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::Inflater;
    use flate2::{write::ZlibEncoder, Compression};
    use std::io::Write;

    #[test]
    fn inflates_a_frame() {
        let payload = br#"{"op":11,"d":null}"#;
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(payload).unwrap();
        let compressed = encoder.finish().unwrap();

        let mut inflater = Inflater::new();
        assert_eq!(payload.as_slice(), inflater.inflate(&compressed).unwrap());

        // The buffer is reusable for the next frame.
        assert_eq!(payload.as_slice(), inflater.inflate(&compressed).unwrap());
    }

    #[test]
    fn garbage_is_an_error() {
        let mut inflater = Inflater::new();

        assert!(inflater.inflate(&[1, 2, 3, 4]).is_err());
    }
}
