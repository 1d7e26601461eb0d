use std::fmt;
use std::io;
use std::path::PathBuf;

/// Structural violations of the container format
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Corruption {
    InvalidNodeTag { offset: u64, tag: u8 },
    TreeTooLarge { nodes: usize },
    TruncatedHeader { field: &'static str, offset: u64 },
    UnsafePath { path: PathBuf },
    EmptyPath { index: usize },
    TruncatedPayload {
        index: usize,
        path: PathBuf,
        written: u32,
        expected: u32,
        remaining: usize,
    },
}

impl fmt::Display for Corruption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Corruption::InvalidNodeTag { offset, tag } =>
                write!(f, "invalid tree node tag 0x{:02x} at offset {}", tag, offset),
            Corruption::TreeTooLarge { nodes } =>
                write!(f, "decode tree exceeds {} nodes", nodes),
            Corruption::TruncatedHeader { field, offset } =>
                write!(f, "header truncated while reading {} at offset {}", field, offset),
            Corruption::UnsafePath { path } =>
                write!(f, "manifest path {:?} escapes the destination", path),
            Corruption::EmptyPath { index } =>
                write!(f, "manifest entry {} has an empty path", index),
            Corruption::TruncatedPayload { index, path, written, expected, remaining } =>
                write!(
                    f,
                    "payload ended after {} of {} bytes for entry {} ({:?}), {} more entries undelivered",
                    written, expected, index, path, remaining
                ),
        }
    }
}

#[derive(Debug)]
pub enum DecodeError {
    /// Archive missing or unreadable, or destination root missing
    Input { path: PathBuf, reason: String },
    Corrupt(Corruption),
    /// Destination file or directory could not be created or written
    Output { path: PathBuf, source: io::Error },
    Cancelled { path: Option<PathBuf> },
}

impl DecodeError {
    pub fn input(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        DecodeError::Input { path: path.into(), reason: reason.into() }
    }

    pub fn output(path: impl Into<PathBuf>, source: io::Error) -> Self {
        DecodeError::Output { path: path.into(), source }
    }

    pub fn is_corruption(&self) -> bool {
        matches!(self, DecodeError::Corrupt(_))
    }
}

impl From<Corruption> for DecodeError {
    fn from(c: Corruption) -> Self {
        DecodeError::Corrupt(c)
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Input { path, reason } =>
                write!(f, "input error: {:?}: {}", path, reason),
            DecodeError::Corrupt(c) =>
                write!(f, "compressed file is corrupted: {}", c),
            DecodeError::Output { path, source } =>
                write!(f, "output error: {:?} couldn't be written: {}", path, source),
            DecodeError::Cancelled { path: Some(path) } =>
                write!(f, "decode cancelled while writing {:?}", path),
            DecodeError::Cancelled { path: None } =>
                write!(f, "decode cancelled"),
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DecodeError::Output { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, DecodeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_tag_message_names_offset() {
        let err = DecodeError::from(Corruption::InvalidNodeTag { offset: 7, tag: b'x' });
        let msg = err.to_string();
        assert!(msg.contains("corrupted"));
        assert!(msg.contains("0x78"));
        assert!(msg.contains("offset 7"));
        assert!(err.is_corruption());
    }

    #[test]
    fn output_error_exposes_source() {
        use std::error::Error;
        let err = DecodeError::output("a/b.txt", io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        assert!(err.source().is_some());
        assert!(!err.is_corruption());
        assert!(err.to_string().contains("a/b.txt"));
    }

    #[test]
    fn truncated_payload_message() {
        let c = Corruption::TruncatedPayload {
            index: 1,
            path: PathBuf::from("f2.txt"),
            written: 3,
            expected: 10,
            remaining: 2,
        };
        let msg = c.to_string();
        assert!(msg.contains("3 of 10"));
        assert!(msg.contains("entry 1"));
        assert!(msg.contains("2 more"));
    }
}
