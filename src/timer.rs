//! Timer core: lifecycle control and the common interrupt handler.
//!
//! A platform declares one `static` [`TimerCore`] over its register bank and
//! wires each timer vector to [`TimerCore::on_compare_match`] with that
//! vector's slot index. Foreground operations take slot indices as plain
//! integers and run every multi-register update inside a critical section,
//! so an ISR only ever sees a slot before or after a reconfiguration.
//!
//! # Overruns
//!
//! The hardware latches one pending compare match per slot. If a callback
//! runs longer than its interval, further matches collapse into that single
//! pending one: ticks are dropped, never queued.

use core::ptr;

use critical_section::CriticalSection;

use crate::{
    dispatch::{Callback, CallbackArg, DispatchTable, Mode, TimerObject},
    interrupts,
    interval::IntervalCalculator,
    registers::TimerRegisters,
    slot::Slot,
};

/// Register bank, interval calculator and dispatch table of one platform.
pub struct TimerCore<R, const N: usize> {
    regs: R,
    calculator: IntervalCalculator,
    table: DispatchTable<N>,
}

impl<R, const N: usize> TimerCore<R, N>
where
    R: TimerRegisters<N>,
{
    pub const fn new(regs: R, calculator: IntervalCalculator) -> Self {
        assert!(N == 1 || N == 2 || N == 4, "platforms provide 1, 2 or 4 timer slots");
        Self {
            regs,
            calculator,
            table: DispatchTable::new(),
        }
    }

    pub fn registers(&self) -> &R {
        &self.regs
    }

    pub fn calculator(&self) -> &IntervalCalculator {
        &self.calculator
    }

    pub const fn slots(&self) -> usize {
        N
    }

    pub fn max_interval_ms(&self) -> u32 {
        self.calculator.max_interval_ms()
    }

    /// Stops the slot and enables its compare interrupt. Call once before
    /// the first `start`; calling it again changes nothing.
    pub fn initialize(&self, slot: usize) {
        let Some(slot) = Slot::resolve(slot) else {
            return;
        };
        let guard = interrupts::enter_critical();
        self.initialize_in(guard.token(), slot);
    }

    /// Halts the slot's counter. The compare value is kept.
    pub fn stop(&self, slot: usize) {
        let Some(slot) = Slot::resolve(slot) else {
            return;
        };
        let guard = interrupts::enter_critical();
        self.regs.clear_control(guard.token(), slot);
    }

    /// [`stop`](Self::stop) for callers already inside a critical section.
    pub fn stop_with(&self, cs: CriticalSection<'_>, slot: usize) {
        if let Some(slot) = Slot::resolve(slot) {
            self.regs.clear_control(cs, slot);
        }
    }

    /// Starts counting towards the current compare value.
    pub fn start(&self, slot: usize) {
        let Some(slot) = Slot::resolve(slot) else {
            return;
        };
        let guard = interrupts::enter_critical();
        self.regs.start_counting(guard.token(), slot);
    }

    /// Loads the compare register for `requested_ms` and returns the period
    /// actually programmed. Running state is left alone.
    pub fn set_interval(&self, slot: usize, requested_ms: u32) -> u32 {
        let interval = self.calculator.compute(requested_ms);
        if let Some(slot) = Slot::resolve(slot) {
            let guard = interrupts::enter_critical();
            let cs = guard.token();
            self.regs.write_compare(cs, slot, interval.counter);
            if let Some(timer) = self.table.lookup(cs, slot) {
                timer.update(cs, |b| b.interval_ms = interval.clamped_ms);
            }
        }
        interval.clamped_ms
    }

    /// Arms `timer` on `slot` and starts it.
    ///
    /// The object's requested interval is clamped and loaded; the clamped
    /// value is returned and stored on the object. Whatever was armed on
    /// the slot before is disarmed, and if `timer` was armed on another slot
    /// that slot is stopped first. Arming with [`Mode::Disarmed`] releases
    /// whichever slot `timer` itself is armed on and leaves `slot` alone.
    pub fn arm(
        &self,
        slot: usize,
        timer: &'static TimerObject,
        mode: Mode,
        callback: Callback,
        arg: CallbackArg,
    ) -> u32 {
        let Some(slot) = Slot::<N>::resolve(slot) else {
            return self.calculator.clamp(timer.interval_ms());
        };

        let guard = interrupts::enter_critical();
        let cs = guard.token();

        if !mode.is_armed() {
            let binding = timer.binding(cs);
            if let Some(own) = binding.slot.and_then(Slot::<N>::new) {
                if self.table.is_bound(cs, own, timer) {
                    self.release(cs, own);
                }
            }
            timer.mark_disarmed(cs);
            return self.calculator.clamp(binding.interval_ms);
        }

        self.initialize_in(cs, slot);

        let binding = timer.binding(cs);
        if let Some(other) = binding.slot.and_then(Slot::<N>::new) {
            if other != slot && self.table.is_bound(cs, other, timer) {
                log::debug!("timer moves from slot {} to slot {}", other, slot);
                self.release(cs, other);
            }
        }

        if let Some(previous) = self.table.register(cs, slot, timer) {
            if !ptr::eq(previous, timer) {
                log::debug!("slot {} rebound, previous timer disarmed", slot);
                previous.mark_disarmed(cs);
            }
        }

        let interval = self.calculator.compute(binding.interval_ms);
        self.regs.write_compare(cs, slot, interval.counter);
        timer.update(cs, |b| {
            b.callback = Some(callback);
            b.arg = arg;
            b.mode = mode;
            b.interval_ms = interval.clamped_ms;
            b.slot = Some(slot.index());
            b.epoch = b.epoch.wrapping_add(1);
        });
        self.regs.start_counting(cs, slot);

        log::debug!(
            "slot {} armed {:?} every {} ms (counter {})",
            slot,
            mode,
            interval.clamped_ms,
            interval.counter
        );
        interval.clamped_ms
    }

    /// Stops the slot and disarms whatever object was armed on it.
    pub fn disarm(&self, slot: usize) {
        let Some(slot) = Slot::resolve(slot) else {
            return;
        };
        let guard = interrupts::enter_critical();
        self.release(guard.token(), slot);
    }

    /// Object currently armed on `slot`.
    pub fn bound(&self, slot: usize) -> Option<&'static TimerObject> {
        let slot = Slot::<N>::new(slot)?;
        critical_section::with(|cs| self.table.lookup(cs, slot))
    }

    pub fn is_running(&self, slot: usize) -> bool {
        Slot::<N>::new(slot)
            .is_some_and(|slot| critical_section::with(|cs| self.regs.is_running(cs, slot)))
    }

    /// Compare-match handler shared by every timer vector.
    ///
    /// Runs the owner's callback and, for one-shot timers, disarms the slot
    /// once the callback has returned. Interrupts stay masked throughout:
    /// the nested critical sections restore the state the ISR entered with.
    pub fn on_compare_match(&self, slot: usize) {
        let Some(slot) = Slot::<N>::resolve(slot) else {
            return;
        };

        let fired = critical_section::with(|cs| {
            self.regs.acknowledge(cs, slot);
            match self.table.lookup(cs, slot) {
                Some(timer) => Some((timer, timer.binding(cs))),
                None => {
                    log::warn!("compare match on unbound slot {}, stopping it", slot);
                    self.regs.clear_control(cs, slot);
                    None
                }
            }
        });
        let Some((timer, binding)) = fired else {
            return;
        };

        if binding.mode.is_armed() {
            if let Some(callback) = binding.callback {
                callback(binding.arg);
            }
        }

        if binding.mode == Mode::OneShot {
            critical_section::with(|cs| {
                // Leave the slot alone if the callback re-armed or released it.
                let current = timer.binding(cs);
                if self.table.is_bound(cs, slot, timer) && current.epoch == binding.epoch {
                    self.release(cs, slot);
                }
            });
        }
    }

    fn initialize_in(&self, cs: CriticalSection<'_>, slot: Slot<N>) {
        self.regs.clear_control(cs, slot);
        self.regs.enable_compare_interrupt(cs, slot);
    }

    fn release(&self, cs: CriticalSection<'_>, slot: Slot<N>) {
        self.regs.clear_control(cs, slot);
        if let Some(timer) = self.table.clear(cs, slot) {
            timer.mark_disarmed(cs);
            log::debug!("slot {} disarmed", slot);
        }
    }
}
