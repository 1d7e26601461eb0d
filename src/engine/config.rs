use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::protocol::{PATH_SEPARATOR, READ_CHUNK_SIZE};

#[derive(Debug, Clone)]
pub struct DecodeOptions {
    /// Byte terminating each manifest path
    pub path_separator: u8,
    /// Reject manifest paths that could resolve outside the destination
    pub confine_paths: bool,
    pub read_buffer_size: usize,
    pub cancel: CancelToken,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            path_separator: PATH_SEPARATOR,
            confine_paths: true,
            read_buffer_size: READ_CHUNK_SIZE,
            cancel: CancelToken::new(),
        }
    }
}

/// Shared stop flag, polled by the decoder between payload bytes
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
