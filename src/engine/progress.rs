use std::path::PathBuf;

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

/// Observable decode milestones, one pair per manifest entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DecodeEvent {
    FileOpened {
        index: usize,
        path: PathBuf,
        byte_count: u32,
    },
    FileCompleted {
        index: usize,
        path: PathBuf,
        bytes: u32,
        crc32: u32,
    },
}

/// Receiver of decode events. Implementations must not block the decoder.
pub trait ProgressSink: Send {
    fn notify(&mut self, event: DecodeEvent);
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn notify(&mut self, _event: DecodeEvent) {}
}

impl ProgressSink for Vec<DecodeEvent> {
    fn notify(&mut self, event: DecodeEvent) {
        self.push(event);
    }
}

impl ProgressSink for UnboundedSender<DecodeEvent> {
    fn notify(&mut self, event: DecodeEvent) {
        // A dropped receiver only means nobody is watching
        let _ = self.send(event);
    }
}

impl<P: ProgressSink + ?Sized> ProgressSink for &mut P {
    fn notify(&mut self, event: DecodeEvent) {
        (**self).notify(event);
    }
}
