use tracing::{debug, warn};

use crate::{utils::BitMap, PidError, PidRange, Result};

use super::Pid;

/// Lowest-available-first pid allocator over a fixed [`PidRange`].
///
/// The allocator starts out uninitialized: every operation fails with
/// [`PidError::NotInitialized`] until [`initialize`](Self::initialize) is called.
/// It is not synchronized; see [`SharedPidAllocator`](super::SharedPidAllocator)
/// and [`PidService`](crate::service::PidService) for shared use.
#[derive(Debug)]
pub struct PidAllocator {
    range: PidRange,
    presence: Option<BitMap>,
    // every index below this one is allocated
    first_free: usize,
}

impl Default for PidAllocator {
    fn default() -> Self {
        Self::new(PidRange::default())
    }
}

impl PidAllocator {
    pub fn new(range: PidRange) -> Self {
        Self {
            range,
            presence: None,
            first_free: 0,
        }
    }

    /// Resets the presence map to all-free, allocating it on first use.
    ///
    /// Calling this again drops every outstanding allocation.
    pub fn initialize(&mut self) {
        match self.presence.as_mut() {
            Some(presence) => presence.reset(),
            None => self.presence = Some(BitMap::new(self.range.capacity())),
        }

        self.first_free = 0;
        debug!(
            min = self.range.min(),
            max = self.range.max(),
            "pid map initialized"
        );
    }

    /// Hands out the lowest free pid.
    pub fn allocate(&mut self) -> Result<Pid> {
        let Some(presence) = self.presence.as_mut() else {
            warn!("unable to allocate pid, map uninitialized");
            return Err(PidError::NotInitialized);
        };

        let Some(idx) = presence.first_clear_from(self.first_free) else {
            self.first_free = presence.len();
            debug!("pid pool exhausted");
            return Err(PidError::PoolExhausted);
        };

        presence.set(idx);
        self.first_free = idx + 1;

        Ok(Pid::new(self.range.pid_at(idx)))
    }

    /// Returns `pid` to the pool. Releasing a pid that is already free is a no-op.
    pub fn release(&mut self, pid: Pid) -> Result<()> {
        let Some(presence) = self.presence.as_mut() else {
            warn!(%pid, "unable to release pid, map uninitialized");
            return Err(PidError::NotInitialized);
        };

        let Some(idx) = self.range.index_of(pid.get()) else {
            warn!(%pid, "invalid pid");
            return Err(PidError::OutOfRange {
                pid: pid.get(),
                min: self.range.min(),
                max: self.range.max(),
            });
        };

        presence.clear(idx);
        self.first_free = self.first_free.min(idx);

        Ok(())
    }

    #[inline]
    pub fn range(&self) -> PidRange {
        self.range
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.range.capacity()
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.presence.is_some()
    }

    pub fn is_allocated(&self, pid: Pid) -> bool {
        match (&self.presence, self.range.index_of(pid.get())) {
            (Some(presence), Some(idx)) => presence.get(idx),
            _ => false,
        }
    }

    /// Number of pids currently handed out.
    pub fn in_use(&self) -> usize {
        self.presence.as_ref().map_or(0, BitMap::count_ones)
    }

    /// Number of pids that can still be allocated.
    pub fn available(&self) -> usize {
        self.presence
            .as_ref()
            .map_or(0, |presence| presence.len() - presence.count_ones())
    }

    /// Allocated pids in ascending order.
    pub fn allocated(&self) -> impl Iterator<Item = Pid> + '_ {
        self.presence
            .iter()
            .flat_map(|presence| presence.iter_ones())
            .map(move |idx| Pid::new(self.range.pid_at(idx)))
    }
}
