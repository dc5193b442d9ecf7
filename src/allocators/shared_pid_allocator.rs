use std::sync::Arc;

use parking_lot::Mutex;

use crate::{PidRange, Result};

use super::{Pid, PidAllocator};

/// A [`PidAllocator`] behind one allocator-wide lock, shareable across threads.
#[derive(Clone, Debug)]
pub struct SharedPidAllocator {
    inner: Arc<Mutex<PidAllocator>>,
}

impl SharedPidAllocator {
    pub fn new(range: PidRange) -> Self {
        Self::from(PidAllocator::new(range))
    }

    pub fn initialize(&self) {
        self.inner.lock().initialize();
    }

    pub fn allocate(&self) -> Result<Pid> {
        self.inner.lock().allocate()
    }

    pub fn release(&self, pid: Pid) -> Result<()> {
        self.inner.lock().release(pid)
    }

    pub fn in_use(&self) -> usize {
        self.inner.lock().in_use()
    }

    pub fn is_allocated(&self, pid: Pid) -> bool {
        self.inner.lock().is_allocated(pid)
    }

    /// Runs `f` with the lock held, for compound operations.
    pub fn with<R>(&self, f: impl FnOnce(&mut PidAllocator) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

impl From<PidAllocator> for SharedPidAllocator {
    fn from(value: PidAllocator) -> Self {
        Self {
            inner: Arc::new(Mutex::new(value)),
        }
    }
}
