//! Artifact payload streams and tee duplication.
//!
//! An [`ArtifactStream`] is a single-consumption sequence of byte chunks.
//! [`ArtifactStream::tee`] splits one stream into two handles that each
//! yield the identical chunk sequence: whichever handle needs data polls
//! the source once and forwards the chunk to the sibling's queue, so the
//! source is drained exactly once and neither handle's pace can corrupt
//! the other's view.

use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream, Stream, StreamExt};

use crate::error::StreamError;
use crate::lock::lock_guard;

const SOURCE: &str = "fresco::stream";

/// A single-consumption stream of payload chunks.
pub struct ArtifactStream {
    inner: BoxStream<'static, Result<Bytes, StreamError>>,
}

impl ArtifactStream {
    /// Wrap an arbitrary chunk stream.
    pub fn new(stream: impl Stream<Item = Result<Bytes, StreamError>> + Send + 'static) -> Self {
        Self {
            inner: stream.boxed(),
        }
    }

    /// A stream yielding a single chunk.
    pub fn from_chunk(chunk: impl Into<Bytes>) -> Self {
        Self::from_chunks(vec![chunk.into()])
    }

    /// A stream yielding the given chunks in order.
    pub fn from_chunks(chunks: Vec<Bytes>) -> Self {
        Self::new(stream::iter(chunks.into_iter().map(Ok)))
    }

    /// A stream that ends immediately.
    pub fn empty() -> Self {
        Self::new(stream::empty())
    }

    /// Split into two handles that each yield the identical chunk sequence.
    ///
    /// Chunks are forwarded to the slower side's queue, so the handles may
    /// be consumed at independent rates and in any interleaving. Dropping
    /// one handle neither stalls nor corrupts the other. A source fault is
    /// surfaced on both handles, after any chunks already produced.
    pub fn tee(self) -> (ArtifactStream, ArtifactStream) {
        let shared = Arc::new(Mutex::new(TeeShared {
            source: Some(self.inner),
            queues: [VecDeque::new(), VecDeque::new()],
            fault: None,
            fault_pending: [false, false],
            done: false,
            closed: [false, false],
            wakers: [None, None],
        }));
        let left = TeeHandle {
            shared: Arc::clone(&shared),
            side: 0,
        };
        let right = TeeHandle { shared, side: 1 };
        (ArtifactStream::new(left), ArtifactStream::new(right))
    }

    /// Drain the stream, counting payload bytes.
    ///
    /// On a mid-stream fault, returns the byte count accumulated up to the
    /// fault together with the fault itself.
    pub async fn measure(mut self) -> (u64, Option<StreamError>) {
        let mut total = 0u64;
        while let Some(chunk) = self.next().await {
            match chunk {
                Ok(chunk) => total += chunk.len() as u64,
                Err(fault) => return (total, Some(fault)),
            }
        }
        (total, None)
    }

    /// Drain the stream into one contiguous buffer.
    pub async fn collect(mut self) -> Result<Bytes, StreamError> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }
}

impl Stream for ArtifactStream {
    type Item = Result<Bytes, StreamError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().inner.as_mut().poll_next(cx)
    }
}

impl fmt::Debug for ArtifactStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ArtifactStream")
    }
}

/// State shared by the two sides of a tee.
struct TeeShared {
    source: Option<BoxStream<'static, Result<Bytes, StreamError>>>,
    /// Chunks produced by the source but not yet consumed by each side.
    queues: [VecDeque<Bytes>; 2],
    fault: Option<StreamError>,
    /// Whether each side still has to observe the fault.
    fault_pending: [bool; 2],
    done: bool,
    closed: [bool; 2],
    wakers: [Option<Waker>; 2],
}

struct TeeHandle {
    shared: Arc<Mutex<TeeShared>>,
    side: usize,
}

impl Stream for TeeHandle {
    type Item = Result<Bytes, StreamError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let side = this.side;
        let other = 1 - side;

        let mut shared = lock_guard(&this.shared, SOURCE, "tee_poll");

        if let Some(chunk) = shared.queues[side].pop_front() {
            return Poll::Ready(Some(Ok(chunk)));
        }

        if shared.done {
            if shared.fault_pending[side] {
                shared.fault_pending[side] = false;
                if let Some(fault) = shared.fault.clone() {
                    return Poll::Ready(Some(Err(fault)));
                }
            }
            return Poll::Ready(None);
        }

        let polled = match shared.source.as_mut() {
            Some(source) => source.as_mut().poll_next(cx),
            None => Poll::Ready(None),
        };

        match polled {
            Poll::Ready(Some(Ok(chunk))) => {
                if !shared.closed[other] {
                    shared.queues[other].push_back(chunk.clone());
                }
                let waker = shared.wakers[other].take();
                drop(shared);
                if let Some(waker) = waker {
                    waker.wake();
                }
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(fault))) => {
                shared.done = true;
                shared.source = None;
                shared.fault = Some(fault.clone());
                shared.fault_pending[other] = !shared.closed[other];
                let waker = shared.wakers[other].take();
                drop(shared);
                if let Some(waker) = waker {
                    waker.wake();
                }
                Poll::Ready(Some(Err(fault)))
            }
            Poll::Ready(None) => {
                shared.done = true;
                shared.source = None;
                let waker = shared.wakers[other].take();
                drop(shared);
                if let Some(waker) = waker {
                    waker.wake();
                }
                Poll::Ready(None)
            }
            Poll::Pending => {
                shared.wakers[side] = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}

impl Drop for TeeHandle {
    fn drop(&mut self) {
        let mut shared = lock_guard(&self.shared, SOURCE, "tee_drop");
        let side = self.side;
        shared.closed[side] = true;
        shared.queues[side].clear();
        shared.fault_pending[side] = false;
        // The sibling may be parked waiting for this side to drive the
        // source; hand the source back to it.
        let waker = shared.wakers[1 - side].take();
        drop(shared);
        if let Some(waker) = waker {
            waker.wake();
        }
    }
}
