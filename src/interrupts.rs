//! Interrupt management helpers.
//!
//! Scoped critical sections for multi-register updates, plus the ESP32
//! handler binding used to route each timer vector to its trampoline.

use critical_section::{CriticalSection, RestoreState};

#[cfg(feature = "esp32")]
use esp_hal::{
    interrupt::{self, Error as InterruptError, IsrCallback, Priority},
    peripherals::Interrupt,
    system::Cpu,
};

/// Binds `handler` to `interrupt` and enables it at `priority` on the
/// current core.
///
/// # Safety
/// `handler` runs in interrupt context and must only touch state guarded by
/// a critical section.
#[cfg(feature = "esp32")]
pub unsafe fn bind_timer_vector(
    interrupt: Interrupt,
    handler: extern "C" fn(),
    priority: Priority,
) -> Result<(), InterruptError> {
    interrupt::bind_interrupt(interrupt, IsrCallback::new(handler));
    interrupt::enable(interrupt, priority)
}

/// Masks a vector bound by [`bind_timer_vector`].
#[cfg(feature = "esp32")]
pub fn unbind_timer_vector(interrupt: Interrupt) {
    interrupt::disable(Cpu::current(), interrupt);
}

/// Binds vectors `0..count` in order.
///
/// On the first failure every vector bound so far is unbound again and the
/// failing index is returned with its error, leaving nothing half wired.
pub fn bind_all<E>(
    count: usize,
    mut bind: impl FnMut(usize) -> Result<(), E>,
    mut unbind: impl FnMut(usize),
) -> Result<(), (usize, E)> {
    for index in 0..count {
        if let Err(err) = bind(index) {
            (0..index).for_each(&mut unbind);
            return Err((index, err));
        }
    }
    Ok(())
}

/// RAII guard representing an acquired critical section.
///
/// Dropping the guard restores the interrupt state that was in effect when
/// it was created, so nesting one inside an ISR or another guard never
/// re-enables interrupts early.
pub struct CriticalSectionGuard {
    state: RestoreState,
}

impl CriticalSectionGuard {
    /// Enter a critical section, returning a guard that will restore the
    /// previous interrupt state when dropped.
    pub fn new() -> Self {
        let state = unsafe { critical_section::acquire() };
        Self { state }
    }

    /// Token proving interrupts are held off for as long as the guard lives.
    pub fn token(&self) -> CriticalSection<'_> {
        // SAFETY: the section stays acquired until `self` is dropped, and the
        // token cannot outlive the borrow of `self`.
        unsafe { CriticalSection::new() }
    }
}

impl Default for CriticalSectionGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CriticalSectionGuard {
    fn drop(&mut self) {
        unsafe { critical_section::release(self.state) };
    }
}

/// Enter a critical section using RAII semantics.
pub fn enter_critical() -> CriticalSectionGuard {
    CriticalSectionGuard::new()
}
