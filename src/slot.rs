//! Logical timer slots.
//!
//! A slot is a small index statically bound to one hardware timer and one
//! interrupt vector. `Slot<N>` can only hold an index below `N`, so once a
//! caller has one, every register table lookup is in range.

use core::fmt;

use crate::error::TimerError;

/// Validated index of one of the `N` logical timers of a platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Slot<const N: usize>(u8);

impl<const N: usize> Slot<N> {
    /// Returns the slot for `index`, or `None` if the platform has no such timer.
    pub const fn new(index: usize) -> Option<Self> {
        if index < N {
            Some(Self(index as u8))
        } else {
            None
        }
    }

    /// Checked construction for callers that want to report misuse.
    pub const fn try_new(index: usize) -> Result<Self, TimerError> {
        match Self::new(index) {
            Some(slot) => Ok(slot),
            None => Err(TimerError::InvalidSlot { index, slots: N }),
        }
    }

    /// Validates an index handed to a core operation.
    ///
    /// Out-of-range indices are a programming error: debug builds stop here,
    /// release builds log and return `None` so the caller does nothing.
    pub fn resolve(index: usize) -> Option<Self> {
        match Self::try_new(index) {
            Ok(slot) => Some(slot),
            Err(err) => {
                log::error!("{}", err);
                debug_assert!(false, "{}", err);
                None
            }
        }
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Every slot of the platform, in index order.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..N).map(|index| Self(index as u8))
    }
}

impl<const N: usize> fmt::Display for Slot<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_accepts_indices_below_capacity() {
        assert_eq!(Slot::<4>::new(0).map(Slot::index), Some(0));
        assert_eq!(Slot::<4>::new(3).map(Slot::index), Some(3));
        assert!(Slot::<4>::new(4).is_none());
        assert!(Slot::<1>::new(1).is_none());
    }

    #[test]
    fn try_new_reports_capacity() {
        assert_eq!(
            Slot::<2>::try_new(5),
            Err(TimerError::InvalidSlot { index: 5, slots: 2 })
        );
    }

    #[test]
    fn all_enumerates_every_slot() {
        let indices: Vec<usize> = Slot::<4>::all().map(Slot::index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn resolve_in_range() {
        assert_eq!(Slot::<2>::resolve(1), Slot::new(1));
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "out of range")]
    fn resolve_fails_fast_in_debug() {
        let _ = Slot::<2>::resolve(2);
    }

    #[cfg(not(debug_assertions))]
    #[test]
    fn resolve_is_a_no_op_in_release() {
        assert!(Slot::<2>::resolve(2).is_none());
    }
}
