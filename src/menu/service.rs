//! Menu service
//!
//! The two operations offered to the transport layer: create a menu and
//! fetch one by id.

use std::sync::Arc;

use crate::error::{MenuError, Result};
use crate::kv::KvBackend;

use super::{IdAllocator, NewWeekMenu, RecordStore, WeekMenu};

/// Creates and fetches weekly menus
///
/// Shared between connection threads behind an `Arc`; holds no state of its
/// own beyond the backend handle.
pub struct MenuService<B> {
    backend: Arc<B>,
    allocator: IdAllocator<Arc<B>>,
    store: RecordStore<Arc<B>>,
}

impl<B: KvBackend> MenuService<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            allocator: IdAllocator::new(Arc::clone(&backend)),
            store: RecordStore::new(Arc::clone(&backend)),
            backend,
        }
    }

    /// Allocate an id and store the menu under it
    ///
    /// Errors: `AllocationFailed` (nothing was written) or
    /// `StorageUnavailable` (the id is spent but the menu may be missing).
    pub fn create_menu(&self, menu: NewWeekMenu) -> Result<WeekMenu> {
        let id = self.allocator.next()?;
        let menu = WeekMenu { id, name: menu.name };

        self.store.put(id, &menu.to_fields()).map_err(|e| {
            tracing::warn!(id, error = %e, "Menu write failed after id allocation");
            e
        })?;

        tracing::debug!(id, name = %menu.name, "Created menu");
        Ok(menu)
    }

    /// Fetch a menu by id
    ///
    /// Errors: `NotFound` or `StorageUnavailable`.
    pub fn get_menu(&self, id: u64) -> Result<WeekMenu> {
        let fields = self.store.get(id)?.ok_or(MenuError::NotFound(id))?;
        let menu = WeekMenu::from_fields(&fields)?;

        if menu.id != id {
            return Err(MenuError::StorageUnavailable(format!(
                "record stored under id {} carries id {}",
                id, menu.id
            )));
        }

        tracing::trace!(id, "Fetched menu");
        Ok(menu)
    }

    /// Ids of every stored menu, ascending
    pub fn list_menu_ids(&self) -> Result<Vec<u64>> {
        Ok(self.store.list_ids()?.into_iter().collect())
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }
}
