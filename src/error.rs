//! Errors reported by the timer core.

use core::fmt;

/// Failures surfaced to foreground callers.
///
/// Nothing in here is ever produced from interrupt context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerError {
    /// Slot index outside `0..slots`.
    InvalidSlot { index: usize, slots: usize },
    /// Platform bring-up ran twice.
    AlreadyInitialized,
    /// The interrupt controller refused to route a timer vector.
    InterruptBind(&'static str),
}

impl fmt::Display for TimerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerError::InvalidSlot { index, slots } => {
                write!(f, "timer slot {} out of range (platform has {})", index, slots)
            }
            TimerError::AlreadyInitialized => f.write_str("timer platform already initialized"),
            TimerError::InterruptBind(vector) => {
                write!(f, "failed to bind timer interrupt {}", vector)
            }
        }
    }
}
