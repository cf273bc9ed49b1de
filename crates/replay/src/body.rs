//! Rewindable request bodies.
//!
//! A request body arriving from the transport can only be read once. [`ReplayBody`]
//! drains it into an owned buffer a single time, after which any number of
//! [`ReplayReader`]s can be handed out, each starting from the first byte.

use crate::error::{BoxError, CaptureError};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use http_body::{Body as HttpBody, Frame, SizeHint};
use http_body_util::BodyExt;
use std::convert::Infallible;
use std::pin::{Pin, pin};
use std::task::{Context, Poll};

// upper bound on the up-front reservation, the announced length comes from the client
const MAX_INITIAL_CAPACITY: usize = 64 * 1024;

/// A fully buffered request body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayBody {
    bytes: Bytes,
}

impl ReplayBody {
    /// Reads `body` to its end.
    ///
    /// Trailers are dropped. If the body yields an error part way through, the
    /// bytes received so far are discarded and a [`CaptureError`] is returned.
    pub async fn capture<B>(body: B) -> Result<Self, CaptureError>
    where
        B: HttpBody,
        B::Error: Into<BoxError>,
    {
        let mut body = pin!(body);

        let capacity = body
            .size_hint()
            .exact()
            .and_then(|n| usize::try_from(n).ok())
            .map_or(0, |n| n.min(MAX_INITIAL_CAPACITY));
        let mut buf = BytesMut::with_capacity(capacity);

        while let Some(frame) = body.frame().await {
            let frame = frame.map_err(|e| CaptureError::read(buf.len(), e))?;
            if let Ok(data) = frame.into_data() {
                buf.put(data);
            }
        }

        Ok(Self { bytes: buf.freeze() })
    }

    /// A fresh reader positioned at the start of the buffered body.
    pub fn reader(&self) -> ReplayReader {
        ReplayReader::new(self.bytes.clone())
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

impl From<Bytes> for ReplayBody {
    fn from(bytes: Bytes) -> Self {
        Self { bytes }
    }
}

impl From<&'static [u8]> for ReplayBody {
    fn from(bytes: &'static [u8]) -> Self {
        Self { bytes: Bytes::from_static(bytes) }
    }
}

/// A single pass over a [`ReplayBody`], yielded as one data frame.
#[derive(Debug, Clone)]
pub struct ReplayReader {
    remaining: Option<Bytes>,
}

impl ReplayReader {
    fn new(bytes: Bytes) -> Self {
        if bytes.is_empty() { Self { remaining: None } } else { Self { remaining: Some(bytes) } }
    }
}

impl HttpBody for ReplayReader {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        Poll::Ready(self.get_mut().remaining.take().map(|bytes| Ok(Frame::data(bytes))))
    }

    fn is_end_stream(&self) -> bool {
        self.remaining.is_none()
    }

    fn size_hint(&self) -> SizeHint {
        match &self.remaining {
            None => SizeHint::with_exact(0),
            Some(bytes) => SizeHint::with_exact(bytes.remaining() as u64),
        }
    }
}
