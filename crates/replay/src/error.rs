use std::error::Error;
use thiserror::Error;

/// Error type carried by the bodies flowing through a tap.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// The request body could not be read to its end.
///
/// A failed capture never produces a comparison event; callers are expected to
/// hand the error to their normal request error path.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("failed to read request body after {read} bytes: {source}")]
    Read { read: usize, source: BoxError },
}

impl CaptureError {
    pub fn read<E: Into<BoxError>>(read: usize, e: E) -> Self {
        Self::Read { read, source: e.into() }
    }

    /// Number of bytes received before the body failed.
    pub fn bytes_read(&self) -> usize {
        match self {
            Self::Read { read, .. } => *read,
        }
    }
}
