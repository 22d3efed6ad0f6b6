//! In-memory register bank.
//!
//! Behaves like the AVR timers (same control bits, compare stored as two
//! halves written high half first) so the core can run on a host. Every
//! register operation is also appended to a short trace.

use core::cell::{Cell, RefCell};

use critical_section::{CriticalSection, Mutex};
use heapless::{HistoryBuffer, Vec};

use super::avr::{ControlB, InterruptMask, Prescaler};
use super::TimerRegisters;
use crate::slot::Slot;

/// Number of register operations kept in the trace.
pub const TRACE_DEPTH: usize = 32;

/// One register operation, tagged with the slot index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOp {
    ClearControl(usize),
    EnableInterrupt(usize),
    StartCounting(usize),
    WriteCompare(usize, u32),
    Acknowledge(usize),
}

/// Register contents of one simulated slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SlotState {
    pub control_a: u8,
    pub control_b: u8,
    pub mask: u8,
    pub compare: u32,
}

struct SimSlot {
    control_a: Cell<u8>,
    control_b: Cell<u8>,
    mask: Cell<u8>,
    compare_high: Cell<u16>,
    compare_low: Cell<u16>,
}

impl SimSlot {
    const fn new() -> Self {
        Self {
            control_a: Cell::new(0),
            control_b: Cell::new(0),
            mask: Cell::new(0),
            compare_high: Cell::new(0),
            compare_low: Cell::new(0),
        }
    }

    fn compare(&self) -> u32 {
        ((self.compare_high.get() as u32) << 16) | self.compare_low.get() as u32
    }
}

pub struct SimTimers<const N: usize> {
    slots: Mutex<[SimSlot; N]>,
    trace: Mutex<RefCell<HistoryBuffer<RegisterOp, TRACE_DEPTH>>>,
    prescaler: Prescaler,
}

impl<const N: usize> SimTimers<N> {
    pub const fn new() -> Self {
        Self {
            slots: Mutex::new([const { SimSlot::new() }; N]),
            trace: Mutex::new(RefCell::new(HistoryBuffer::new())),
            prescaler: Prescaler::Div1024,
        }
    }

    fn record(&self, cs: CriticalSection<'_>, op: RegisterOp) {
        self.trace.borrow_ref_mut(cs).write(op);
    }

    fn slot<'cs>(&'cs self, cs: CriticalSection<'cs>, slot: Slot<N>) -> &'cs SimSlot {
        &self.slots.borrow(cs)[slot.index()]
    }

    /// Register contents of `slot`, or `None` past the last slot.
    pub fn state(&self, slot: usize) -> Option<SlotState> {
        let slot = Slot::<N>::new(slot)?;
        Some(critical_section::with(|cs| {
            let regs = self.slot(cs, slot);
            SlotState {
                control_a: regs.control_a.get(),
                control_b: regs.control_b.get(),
                mask: regs.mask.get(),
                compare: regs.compare(),
            }
        }))
    }

    /// Whether a compare match on `slot` would reach the CPU: the counter
    /// is clocked and the compare interrupt is unmasked.
    pub fn would_fire(&self, slot: usize) -> bool {
        let Some(slot) = Slot::<N>::new(slot) else {
            return false;
        };
        critical_section::with(|cs| {
            let mask = InterruptMask::from_bits_truncate(self.slot(cs, slot).mask.get());
            self.is_running(cs, slot) && mask.contains(InterruptMask::OCIEA)
        })
    }

    /// Recorded operations, oldest first.
    pub fn trace(&self) -> Vec<RegisterOp, TRACE_DEPTH> {
        critical_section::with(|cs| self.trace.borrow_ref(cs).oldest_ordered().copied().collect())
    }

    pub fn clear_trace(&self) {
        critical_section::with(|cs| self.trace.borrow_ref_mut(cs).clear());
    }
}

impl<const N: usize> Default for SimTimers<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> TimerRegisters<N> for SimTimers<N> {
    fn clear_control(&self, cs: CriticalSection<'_>, slot: Slot<N>) {
        let regs = self.slot(cs, slot);
        regs.control_a.set(0);
        regs.control_b.set(0);
        self.record(cs, RegisterOp::ClearControl(slot.index()));
    }

    fn enable_compare_interrupt(&self, cs: CriticalSection<'_>, slot: Slot<N>) {
        let regs = self.slot(cs, slot);
        regs.mask.set(regs.mask.get() | InterruptMask::OCIEA.bits());
        self.record(cs, RegisterOp::EnableInterrupt(slot.index()));
    }

    fn start_counting(&self, cs: CriticalSection<'_>, slot: Slot<N>) {
        let regs = self.slot(cs, slot);
        regs.control_b
            .set(regs.control_b.get() | self.prescaler.start_bits().bits());
        self.record(cs, RegisterOp::StartCounting(slot.index()));
    }

    fn write_compare(&self, cs: CriticalSection<'_>, slot: Slot<N>, counter: u32) {
        let regs = self.slot(cs, slot);
        regs.compare_high.set((counter >> 16) as u16);
        regs.compare_low.set(counter as u16);
        self.record(cs, RegisterOp::WriteCompare(slot.index(), counter));
    }

    fn read_compare(&self, cs: CriticalSection<'_>, slot: Slot<N>) -> u32 {
        self.slot(cs, slot).compare()
    }

    fn is_running(&self, cs: CriticalSection<'_>, slot: Slot<N>) -> bool {
        let control = ControlB::from_bits_truncate(self.slot(cs, slot).control_b.get());
        control.intersects(ControlB::CS0 | ControlB::CS1 | ControlB::CS2)
    }

    fn acknowledge(&self, cs: CriticalSection<'_>, slot: Slot<N>) {
        self.record(cs, RegisterOp::Acknowledge(slot.index()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_zeroed() {
        let sim = SimTimers::<2>::new();
        assert_eq!(sim.state(1), Some(SlotState::default()));
        assert_eq!(sim.state(2), None);
        assert!(!sim.would_fire(0));
    }

    #[test]
    fn fires_only_when_clocked_and_unmasked() {
        let sim = SimTimers::<1>::new();
        let slot = Slot::new(0).unwrap();
        critical_section::with(|cs| sim.start_counting(cs, slot));
        assert!(!sim.would_fire(0));
        critical_section::with(|cs| sim.enable_compare_interrupt(cs, slot));
        assert!(sim.would_fire(0));
        critical_section::with(|cs| sim.clear_control(cs, slot));
        assert!(!sim.would_fire(0));
    }

    #[test]
    fn compare_keeps_all_32_bits() {
        let sim = SimTimers::<1>::new();
        let slot = Slot::new(0).unwrap();
        critical_section::with(|cs| {
            sim.write_compare(cs, slot, 0x05F5_E0FF);
            assert_eq!(sim.read_compare(cs, slot), 0x05F5_E0FF);
        });
    }

    #[test]
    fn trace_keeps_the_most_recent_operations() {
        let sim = SimTimers::<1>::new();
        let slot = Slot::new(0).unwrap();
        critical_section::with(|cs| {
            for counter in 0..(TRACE_DEPTH as u32 + 4) {
                sim.write_compare(cs, slot, counter);
            }
        });
        let trace = sim.trace();
        assert_eq!(trace.len(), TRACE_DEPTH);
        assert_eq!(trace[0], RegisterOp::WriteCompare(0, 4));
        sim.clear_trace();
        assert!(sim.trace().is_empty());
    }
}
