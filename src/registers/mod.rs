//! Register access layer.
//!
//! Each backend keeps a `'static` table with one register group per slot,
//! so "which registers belong to slot k" is a table index rather than a
//! branch. All accessors take a [`CriticalSection`] token: the register set
//! is shared between foreground code and the timer ISRs and must only be
//! touched with interrupts held off.

use core::marker::PhantomData;
use core::ptr;

use critical_section::CriticalSection;

use crate::slot::Slot;

pub mod avr;
pub mod esp32;
pub mod sim;

/// Control, mask and compare registers of the `N` timers of a platform.
pub trait TimerRegisters<const N: usize> {
    /// Clear every control bit of the slot, halting its counter.
    fn clear_control(&self, cs: CriticalSection<'_>, slot: Slot<N>);

    /// Set the compare-match interrupt enable bit.
    fn enable_compare_interrupt(&self, cs: CriticalSection<'_>, slot: Slot<N>);

    /// Select the prescaler and compare-match mode. Counting starts as soon
    /// as these bits are set.
    fn start_counting(&self, cs: CriticalSection<'_>, slot: Slot<N>);

    fn write_compare(&self, cs: CriticalSection<'_>, slot: Slot<N>, counter: u32);

    fn read_compare(&self, cs: CriticalSection<'_>, slot: Slot<N>) -> u32;

    fn is_running(&self, cs: CriticalSection<'_>, slot: Slot<N>) -> bool;

    /// Called first thing in the slot's ISR.
    fn acknowledge(&self, _cs: CriticalSection<'_>, _slot: Slot<N>) {}
}

/// Handle to one memory-mapped register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reg<T> {
    addr: usize,
    _marker: PhantomData<T>,
}

impl<T: Copy> Reg<T> {
    /// # Safety
    /// `addr` must be the address of a readable and writable register of
    /// width `T` on the target this handle is used on.
    pub const unsafe fn at(addr: usize) -> Self {
        Self {
            addr,
            _marker: PhantomData,
        }
    }

    /// Same register block, `offset` bytes further on.
    ///
    /// # Safety
    /// The resulting address must satisfy the contract of [`Reg::at`].
    pub const unsafe fn offset<U: Copy>(self, offset: usize) -> Reg<U> {
        Reg {
            addr: self.addr + offset,
            _marker: PhantomData,
        }
    }

    pub const fn addr(self) -> usize {
        self.addr
    }

    pub fn read(self, _cs: CriticalSection<'_>) -> T {
        unsafe { ptr::read_volatile(self.addr as *const T) }
    }

    pub fn write(self, _cs: CriticalSection<'_>, value: T) {
        unsafe { ptr::write_volatile(self.addr as *mut T, value) }
    }

    pub fn modify(self, cs: CriticalSection<'_>, f: impl FnOnce(T) -> T) {
        let value = self.read(cs);
        self.write(cs, f(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reg_round_trips_through_memory() {
        let mut cell: u8 = 0x0F;
        let reg = unsafe { Reg::<u8>::at(&mut cell as *mut u8 as usize) };
        critical_section::with(|cs| {
            reg.modify(cs, |v| v | 0xA0);
            assert_eq!(reg.read(cs), 0xAF);
            reg.write(cs, 0);
        });
        assert_eq!(cell, 0);
    }

    #[test]
    fn offset_moves_the_address() {
        let base = unsafe { Reg::<u32>::at(0x3FF5_F000) };
        let alarm: Reg<u32> = unsafe { base.offset(0x10) };
        assert_eq!(alarm.addr(), 0x3FF5_F010);
    }
}
