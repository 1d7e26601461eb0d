use std::io;
use std::path::{Path, PathBuf};

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};

use crate::protocol::{Corruption, DecodeError, Result};

/// Buffered sequential reader over an archive that tracks its absolute offset.
///
/// Header fields are read through the fixed-width helpers, which turn a short
/// read into `TruncatedHeader` corruption. The payload is drained in chunks
/// through [`ByteCursor::read_chunk`] from the same buffer, so no byte is lost
/// between the two phases.
#[derive(Debug)]
pub struct ByteCursor<R> {
    inner: BufReader<R>,
    source: PathBuf,
    offset: u64,
}

impl<R: AsyncRead + Unpin> ByteCursor<R> {
    pub fn new(reader: R, source: impl Into<PathBuf>) -> Self {
        Self::with_capacity(crate::protocol::READ_CHUNK_SIZE, reader, source)
    }

    pub fn with_capacity(capacity: usize, reader: R, source: impl Into<PathBuf>) -> Self {
        Self {
            inner: BufReader::with_capacity(capacity.max(1), reader),
            source: source.into(),
            offset: 0,
        }
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub async fn read_u8(&mut self, field: &'static str) -> Result<u8> {
        let at = self.offset;
        let byte = self.inner.read_u8().await.map_err(|e| self.read_error(e, field, at))?;
        self.offset += 1;
        Ok(byte)
    }

    pub async fn read_u16_le(&mut self, field: &'static str) -> Result<u16> {
        let at = self.offset;
        let value = self.inner.read_u16_le().await.map_err(|e| self.read_error(e, field, at))?;
        self.offset += 2;
        Ok(value)
    }

    pub async fn read_u32_le(&mut self, field: &'static str) -> Result<u32> {
        let at = self.offset;
        let value = self.inner.read_u32_le().await.map_err(|e| self.read_error(e, field, at))?;
        self.offset += 4;
        Ok(value)
    }

    /// Read up to and including `terminator`, returning the bytes before it
    pub async fn read_terminated(&mut self, terminator: u8, field: &'static str) -> Result<Vec<u8>> {
        let at = self.offset;
        let mut out = Vec::new();
        let n = self
            .inner
            .read_until(terminator, &mut out)
            .await
            .map_err(|e| self.read_error(e, field, at))?;
        self.offset += n as u64;

        if out.last() != Some(&terminator) {
            return Err(Corruption::TruncatedHeader { field, offset: at }.into());
        }
        out.pop();
        Ok(out)
    }

    /// Fill `buf` with the next payload bytes; 0 means end of stream
    pub async fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = self
            .inner
            .read(buf)
            .await
            .map_err(|e| DecodeError::input(&self.source, e.to_string()))?;
        self.offset += n as u64;
        Ok(n)
    }

    /// Consume everything left, returning the number of bytes skipped
    pub async fn drain(&mut self) -> Result<u64> {
        let n = tokio::io::copy(&mut self.inner, &mut tokio::io::sink())
            .await
            .map_err(|e| DecodeError::input(&self.source, e.to_string()))?;
        self.offset += n;
        Ok(n)
    }

    pub fn into_inner(self) -> R {
        self.inner.into_inner()
    }

    fn read_error(&self, e: io::Error, field: &'static str, offset: u64) -> DecodeError {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            Corruption::TruncatedHeader { field, offset }.into()
        } else {
            DecodeError::input(&self.source, e.to_string())
        }
    }
}
