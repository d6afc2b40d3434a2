//! Stream identity and active-stream accounting.
//!
//! # Responsibilities
//! - Generate unique stream IDs for tracing
//! - Count streams currently open
//! - Publish the `ext_proc_streams_active` gauge

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::observability::metrics;

/// Global atomic counter for stream IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static STREAM_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for one `Process` stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamId(u64);

impl StreamId {
    /// Generate a new unique stream ID.
    pub fn new() -> Self {
        Self(STREAM_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for StreamId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "stream-{}", self.0)
    }
}

/// Counts open streams. Clones share the same count.
#[derive(Debug, Clone, Default)]
pub struct StreamTracker {
    active_count: Arc<AtomicU64>,
}

impl StreamTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly opened stream. The returned guard closes it on drop.
    pub fn track(&self) -> StreamGuard {
        self.active_count.fetch_add(1, Ordering::SeqCst);
        metrics::stream_opened();
        StreamGuard {
            active_count: Arc::clone(&self.active_count),
            id: StreamId::new(),
        }
    }

    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::SeqCst)
    }
}

/// Held by a stream's task for as long as the stream is open.
#[derive(Debug)]
pub struct StreamGuard {
    active_count: Arc<AtomicU64>,
    id: StreamId,
}

impl StreamGuard {
    pub fn id(&self) -> StreamId {
        self.id
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.active_count.fetch_sub(1, Ordering::SeqCst);
        metrics::stream_released();
        tracing::trace!(stream_id = %self.id, "Stream released");
    }
}
