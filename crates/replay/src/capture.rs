use bytes::Bytes;

/// One request body as seen at the tap, tagged with the order it was captured in.
///
/// The bytes are immutable; cloning a `CapturedBody` shares the buffer and never
/// exposes a way to change it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedBody {
    sequence: u64,
    bytes: Bytes,
}

impl CapturedBody {
    pub fn new(sequence: u64, bytes: Bytes) -> Self {
        Self { sequence, bytes }
    }

    /// Capture order, starting at 1 for the first body a checker records.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    #[inline]
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}
