//! Identifier Allocator
//!
//! Hands out menu ids from the backend's durable counter. The counter is the
//! only source of truth, so several service instances sharing one backend
//! share one id space.

use crate::error::Result;
use crate::kv::KvBackend;

use super::{retry_once, COUNTER_KEY};

/// Issues unique, strictly increasing ids: 1, 2, 3, ...
pub struct IdAllocator<B> {
    backend: B,
    counter_key: String,
}

impl<B: KvBackend> IdAllocator<B> {
    pub fn new(backend: B) -> Self {
        Self::with_counter_key(backend, COUNTER_KEY)
    }

    pub fn with_counter_key(backend: B, counter_key: impl Into<String>) -> Self {
        Self {
            backend,
            counter_key: counter_key.into(),
        }
    }

    /// Allocate the next id
    ///
    /// Fails with `AllocationFailed` when the counter cannot be incremented;
    /// in that case no id was handed out and the caller must not write.
    /// An id that was allocated but never stored leaves a gap; it is not
    /// handed out again.
    pub fn next(&self) -> Result<u64> {
        retry_once("increment id counter", || self.backend.increment(&self.counter_key))
            .map_err(|e| e.into_allocation_failed())
    }

    pub fn counter_key(&self) -> &str {
        &self.counter_key
    }
}
