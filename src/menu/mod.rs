//! Menu Module
//!
//! Weekly menu records on top of a [`crate::kv::KvBackend`].
//!
//! ## Responsibilities
//! - Allocate unique increasing ids from a durable counter
//! - Store records and keep the index of all ids consistent with them
//! - Convert between typed [`WeekMenu`] values and field maps at the
//!   storage edge only
//! - Classify failures as `AllocationFailed`, `StorageUnavailable` or
//!   `NotFound`
//!
//! ## Keys
//! ```text
//! menu:id_counter   counter   last issued id
//! menu:{id}         hash      ID, Name
//! menus:all_ids     set       every committed id
//! ```

mod allocator;
mod record;
mod service;
mod store;

pub use allocator::IdAllocator;
pub use record::{NewWeekMenu, WeekMenu};
pub use service::MenuService;
pub use store::RecordStore;

use crate::error::Result;

/// Counter holding the last issued menu id
pub const COUNTER_KEY: &str = "menu:id_counter";

/// Set of every committed menu id
pub const INDEX_KEY: &str = "menus:all_ids";

/// Hash key of the menu with `id`
pub fn record_key(id: u64) -> String {
    format!("menu:{}", id)
}

/// Run `op`, repeating it once immediately if it fails with a retryable error
///
/// Further retries belong to the transport layer.
pub(crate) fn retry_once<T>(what: &str, mut op: impl FnMut() -> Result<T>) -> Result<T> {
    match op() {
        Err(e) if e.is_retryable() => {
            tracing::warn!(error = %e, "{} failed, retrying once", what);
            op()
        }
        other => other,
    }
}
