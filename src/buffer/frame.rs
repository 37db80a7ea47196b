//! A pinned, in-memory view of one page.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::types::{PageId, PAGE_SIZE};

/// A page the buffer manager has pinned on behalf of a caller.
///
/// `Frame` carries its own page bytes behind a lock rather than a raw
/// pointer into a pool slot: the pool is free to move or reuse the slot
/// the moment this frame is unfixed, so nothing here may outlive the
/// pin. There is deliberately no `Drop` impl — callers must pair every
/// `fix_page` with an explicit `unfix_page(frame, dirty)`.
#[derive(Clone)]
pub struct Frame {
    page_id: PageId,
    data: Arc<RwLock<[u8; PAGE_SIZE]>>,
    exclusive: bool,
}

impl Frame {
    pub(crate) fn new(page_id: PageId, data: Arc<RwLock<[u8; PAGE_SIZE]>>, exclusive: bool) -> Self {
        Self {
            page_id,
            data,
            exclusive,
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn is_exclusive(&self) -> bool {
        self.exclusive
    }

    /// Read the page bytes. Valid regardless of whether the pin is shared
    /// or exclusive.
    pub fn read(&self) -> impl std::ops::Deref<Target = [u8; PAGE_SIZE]> + '_ {
        self.data.read()
    }

    /// Mutably access the page bytes. Callers must hold an exclusive pin;
    /// debug builds assert this.
    pub fn write(&self) -> impl std::ops::DerefMut<Target = [u8; PAGE_SIZE]> + '_ {
        debug_assert!(self.exclusive, "write() called on a shared-pinned frame");
        self.data.write()
    }
}
