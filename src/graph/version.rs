//! Write-version counters and their reserved values.
//!
//! Every node carries an `own_version` counter, plus one cursor per child
//! recording the counter value that child last observed. Staleness is exactly
//! `cursor != owner's current version`. The low values are reserved so that a
//! freshly wired edge can never compare clean by accident: cursors start at
//! [`Version::DIRTY`] while counters start at [`Version::INIT`].

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

/// A node's write-version counter value.
///
/// The counter is bumped once per observed content change and only ever
/// decreases through the deliberate overflow reset (see
/// [`Version::bumped`]).
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[repr(transparent)]
pub struct Version(u32);

impl Version {
    /// Cursor value that always compares stale against a live counter.
    pub const DIRTY: Version = Version(0);
    /// Reserved between `DIRTY` and `INIT`; never assigned by the protocol.
    pub const CLEAN: Version = Version(1);
    /// Starting value of a node's own counter.
    pub const INIT: Version = Version(2);
    /// Largest representable counter value; bumping it triggers the reset.
    pub const MAX: Version = Version(u32::MAX);

    /// Reconstructs a `Version` from its raw counter value.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Version(raw)
    }

    /// Raw counter value.
    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Next counter value; wraps to [`Version::INIT`] at the representable
    /// maximum so a bump can never land on a reserved value.
    #[inline]
    #[must_use]
    pub const fn bumped(self) -> Version {
        if self.0 == u32::MAX {
            Version::INIT
        } else {
            Version(self.0 + 1)
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shared-slot storage for a [`Version`].
///
/// Counters and cursors are read by worker threads while other entries of the
/// same breadth execute. All traffic is `Relaxed`: the fork-join barriers
/// between breadths provide the happens-before edges; the atomic only makes
/// individual loads and stores tear-free.
#[derive(Debug)]
#[repr(transparent)]
pub struct VersionCell(AtomicU32);

impl VersionCell {
    /// New cell holding `v`.
    #[inline]
    pub fn new(v: Version) -> Self {
        VersionCell(AtomicU32::new(v.get()))
    }

    /// Current value.
    #[inline]
    pub fn get(&self) -> Version {
        Version(self.0.load(Ordering::Relaxed))
    }

    /// Overwrites the value.
    #[inline]
    pub fn set(&self, v: Version) {
        self.0.store(v.get(), Ordering::Relaxed);
    }
}

impl Clone for VersionCell {
    fn clone(&self) -> Self {
        VersionCell::new(self.get())
    }
}

/// Cursors are pushed dirty so a brand-new edge is always initially stale.
impl Default for VersionCell {
    fn default() -> Self {
        VersionCell::new(Version::DIRTY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_values_are_distinct() {
        assert_ne!(Version::DIRTY, Version::CLEAN);
        assert_ne!(Version::CLEAN, Version::INIT);
        assert_ne!(Version::DIRTY, Version::INIT);
        assert!(Version::INIT < Version::MAX);
    }

    #[test]
    fn bump_is_monotonic_until_max() {
        let v = Version::INIT;
        assert_eq!(v.bumped().get(), Version::INIT.get() + 1);
        assert!(v.bumped() > v);
    }

    #[test]
    fn bump_at_max_wraps_to_init() {
        assert_eq!(Version::MAX.bumped(), Version::INIT);
    }

    #[test]
    fn cell_set_get() {
        let c = VersionCell::new(Version::INIT);
        assert_eq!(c.get(), Version::INIT);
        c.set(Version::from_raw(17));
        assert_eq!(c.get().get(), 17);
        let d = c.clone();
        assert_eq!(d.get(), c.get());
    }

    #[test]
    fn default_cell_is_dirty() {
        assert_eq!(VersionCell::default().get(), Version::DIRTY);
    }

    #[test]
    fn display_prints_raw() {
        assert_eq!(format!("{}", Version::from_raw(9)), "9");
    }
}

#[cfg(test)]
mod layout_tests {
    use super::*;
    use static_assertions::assert_eq_size;

    assert_eq_size!(Version, u32);
    assert_eq_size!(VersionCell, u32);
}
