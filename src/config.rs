use static_assertions::const_assert;
use tracing::debug;

use crate::{PidError, Result};

pub const DEFAULT_MIN_PID: u32 = 100;
pub const DEFAULT_MAX_PID: u32 = 1000;

const_assert!(DEFAULT_MIN_PID <= DEFAULT_MAX_PID);

pub const MIN_PID_VAR: &str = "PIDMAP_MIN";
pub const MAX_PID_VAR: &str = "PIDMAP_MAX";

/// Closed interval of pids managed by one allocator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PidRange {
    min: u32,
    max: u32,
}

impl Default for PidRange {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_PID,
            max: DEFAULT_MAX_PID,
        }
    }
}

impl PidRange {
    pub fn new(min: u32, max: u32) -> Result<Self> {
        if min > max {
            return Err(PidError::InvalidRange { min, max });
        }

        // the bitmap is indexed by usize, so capacity itself must fit
        let fits = usize::try_from(max - min)
            .ok()
            .and_then(|span| span.checked_add(1))
            .is_some();
        if !fits {
            return Err(PidError::Config(format!(
                "pid range {min}..={max} is too large for this platform"
            )));
        }

        Ok(Self { min, max })
    }

    /// Reads `PIDMAP_MIN` / `PIDMAP_MAX`, falling back to the defaults for unset variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let parse = |key: &str, default: u32| -> Result<u32> {
            match lookup(key) {
                Some(raw) => raw.trim().parse().map_err(|_| {
                    PidError::Config(format!("{key}={raw:?} is not a valid pid"))
                }),
                None => Ok(default),
            }
        };

        let range = Self::new(
            parse(MIN_PID_VAR, DEFAULT_MIN_PID)?,
            parse(MAX_PID_VAR, DEFAULT_MAX_PID)?,
        )?;
        debug!(min = range.min, max = range.max, "pid range configured");

        Ok(range)
    }

    #[inline]
    pub fn min(&self) -> u32 {
        self.min
    }

    #[inline]
    pub fn max(&self) -> u32 {
        self.max
    }

    /// Number of pids in the range. Always representable, see [`PidRange::new`].
    #[inline]
    pub fn capacity(&self) -> usize {
        (self.max - self.min) as usize + 1
    }

    #[inline]
    pub fn contains(&self, pid: u32) -> bool {
        (self.min..=self.max).contains(&pid)
    }

    /// Offset of `pid` from the start of the range, if it belongs to it.
    #[inline]
    pub fn index_of(&self, pid: u32) -> Option<usize> {
        self.contains(pid).then(|| (pid - self.min) as usize)
    }

    #[inline]
    pub(crate) fn pid_at(&self, index: usize) -> u32 {
        self.min + index as u32
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_range() {
        let range = PidRange::default();

        assert_eq!(range.min(), 100);
        assert_eq!(range.max(), 1000);
        assert_eq!(range.capacity(), 901);
    }

    #[test]
    fn test_rejects_inverted_range() {
        assert_eq!(
            PidRange::new(10, 9),
            Err(PidError::InvalidRange { min: 10, max: 9 })
        );
        assert!(PidRange::new(7, 7).is_ok());
    }

    #[test]
    fn test_index_mapping() {
        let range = PidRange::new(100, 1000).unwrap();

        assert_eq!(range.index_of(100), Some(0));
        assert_eq!(range.index_of(1000), Some(900));
        assert_eq!(range.index_of(99), None);
        assert_eq!(range.index_of(1001), None);
        assert_eq!(range.pid_at(900), 1000);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_full_u32_range_capacity() {
        let range = PidRange::new(0, u32::MAX).unwrap();
        assert_eq!(range.capacity(), u32::MAX as usize + 1);
    }

    #[cfg(target_pointer_width = "32")]
    #[test]
    fn test_full_u32_range_rejected() {
        assert!(matches!(
            PidRange::new(0, u32::MAX),
            Err(PidError::Config(_))
        ));
        assert_eq!(PidRange::new(1, u32::MAX).unwrap().capacity(), usize::MAX);
    }

    #[test]
    fn test_env_overrides() {
        let range = PidRange::from_lookup(lookup(&[("PIDMAP_MIN", "1"), ("PIDMAP_MAX", " 32 ")]))
            .unwrap();
        assert_eq!(range, PidRange::new(1, 32).unwrap());

        let range = PidRange::from_lookup(lookup(&[("PIDMAP_MAX", "500")])).unwrap();
        assert_eq!(range, PidRange::new(100, 500).unwrap());

        assert_eq!(PidRange::from_lookup(lookup(&[])).unwrap(), PidRange::default());
    }

    #[test]
    fn test_env_rejects_garbage() {
        assert!(matches!(
            PidRange::from_lookup(lookup(&[("PIDMAP_MIN", "-4")])),
            Err(PidError::Config(_))
        ));
        assert!(matches!(
            PidRange::from_lookup(lookup(&[("PIDMAP_MIN", "2000")])),
            Err(PidError::InvalidRange { min: 2000, max: 1000 })
        ));
    }
}
