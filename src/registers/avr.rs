//! ATmega 16-bit timer/counters in CTC mode.
//!
//! Timer1 is always slot 0. Larger parts add Timer3 (slot 1) and, on the
//! ATmega2560, Timer4 and Timer5 (slots 2 and 3). Timer0 and Timer2 are
//! 8-bit and left to the Arduino core.

use bitflags::bitflags;
use critical_section::CriticalSection;

use super::{Reg, TimerRegisters};
use crate::slot::Slot;

bitflags! {
    /// TCCRnB bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ControlB: u8 {
        const CS0 = 1 << 0;
        const CS1 = 1 << 1;
        const CS2 = 1 << 2;
        /// Clear timer on compare match with OCRnA.
        const WGM2 = 1 << 3;
    }
}

bitflags! {
    /// TIMSKn bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct InterruptMask: u8 {
        const OCIEA = 1 << 1;
    }
}

/// Clock select for the 16-bit timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prescaler {
    Div1,
    Div8,
    Div64,
    Div256,
    Div1024,
}

impl Prescaler {
    pub const fn from_divisor(divisor: u32) -> Option<Self> {
        match divisor {
            1 => Some(Prescaler::Div1),
            8 => Some(Prescaler::Div8),
            64 => Some(Prescaler::Div64),
            256 => Some(Prescaler::Div256),
            1024 => Some(Prescaler::Div1024),
            _ => None,
        }
    }

    pub const fn divisor(self) -> u32 {
        match self {
            Prescaler::Div1 => 1,
            Prescaler::Div8 => 8,
            Prescaler::Div64 => 64,
            Prescaler::Div256 => 256,
            Prescaler::Div1024 => 1024,
        }
    }

    pub const fn clock_select(self) -> ControlB {
        match self {
            Prescaler::Div1 => ControlB::CS0,
            Prescaler::Div8 => ControlB::CS1,
            Prescaler::Div64 => ControlB::CS0.union(ControlB::CS1),
            Prescaler::Div256 => ControlB::CS2,
            Prescaler::Div1024 => ControlB::CS0.union(ControlB::CS2),
        }
    }

    /// Bits written to TCCRnB to start the timer in CTC mode.
    pub const fn start_bits(self) -> ControlB {
        self.clock_select().union(ControlB::WGM2)
    }
}

/// Registers of one 16-bit timer.
#[derive(Debug, Clone, Copy)]
pub struct RegisterGroup {
    pub name: &'static str,
    pub tccra: Reg<u8>,
    pub tccrb: Reg<u8>,
    pub timsk: Reg<u8>,
    pub ocra_low: Reg<u8>,
    pub ocra_high: Reg<u8>,
}

impl RegisterGroup {
    /// # Safety
    /// The addresses must belong to a 16-bit timer of the running chip.
    pub const unsafe fn new(name: &'static str, tccra: usize, timsk: usize, ocra: usize) -> Self {
        Self {
            name,
            tccra: Reg::at(tccra),
            tccrb: Reg::at(tccra + 1),
            timsk: Reg::at(timsk),
            ocra_low: Reg::at(ocra),
            ocra_high: Reg::at(ocra + 1),
        }
    }
}

// Data-space addresses, identical across the parts that have each timer.
pub const TIMER1: RegisterGroup = unsafe { RegisterGroup::new("TIMER1", 0x80, 0x6F, 0x88) };
pub const TIMER3: RegisterGroup = unsafe { RegisterGroup::new("TIMER3", 0x90, 0x71, 0x98) };
pub const TIMER4: RegisterGroup = unsafe { RegisterGroup::new("TIMER4", 0xA0, 0x72, 0xA8) };
pub const TIMER5: RegisterGroup = unsafe { RegisterGroup::new("TIMER5", 0x120, 0x73, 0x128) };

pub static ATMEGA328P_GROUPS: [RegisterGroup; 1] = [TIMER1];
pub static ATMEGA32U4_GROUPS: [RegisterGroup; 2] = [TIMER1, TIMER3];
pub static ATMEGA2560_GROUPS: [RegisterGroup; 4] = [TIMER1, TIMER3, TIMER4, TIMER5];

/// 16-bit timers of an ATmega part.
pub struct AvrTimers<const N: usize> {
    groups: &'static [RegisterGroup; N],
    prescaler: Prescaler,
}

impl<const N: usize> AvrTimers<N> {
    /// `prescaler` is the clock divisor; it must be one the hardware offers.
    pub const fn new(groups: &'static [RegisterGroup; N], prescaler: u32) -> Self {
        let prescaler = match Prescaler::from_divisor(prescaler) {
            Some(prescaler) => prescaler,
            None => panic!("unsupported AVR timer prescaler"),
        };
        Self { groups, prescaler }
    }

    pub const fn prescaler(&self) -> Prescaler {
        self.prescaler
    }

    fn group(&self, slot: Slot<N>) -> &RegisterGroup {
        &self.groups[slot.index()]
    }
}

impl<const N: usize> TimerRegisters<N> for AvrTimers<N> {
    fn clear_control(&self, cs: CriticalSection<'_>, slot: Slot<N>) {
        let group = self.group(slot);
        // Clearing the CS bits in B is what halts the counter; A goes too so
        // no stray waveform mode survives.
        group.tccra.write(cs, 0);
        group.tccrb.write(cs, 0);
    }

    fn enable_compare_interrupt(&self, cs: CriticalSection<'_>, slot: Slot<N>) {
        self.group(slot)
            .timsk
            .modify(cs, |v| v | InterruptMask::OCIEA.bits());
    }

    fn start_counting(&self, cs: CriticalSection<'_>, slot: Slot<N>) {
        let bits = self.prescaler.start_bits().bits();
        self.group(slot).tccrb.modify(cs, |v| v | bits);
    }

    fn write_compare(&self, cs: CriticalSection<'_>, slot: Slot<N>, counter: u32) {
        let group = self.group(slot);
        let counter = counter.min(u16::MAX as u32) as u16;
        // 16-bit access goes through TEMP: high byte first on write.
        group.ocra_high.write(cs, (counter >> 8) as u8);
        group.ocra_low.write(cs, counter as u8);
    }

    fn read_compare(&self, cs: CriticalSection<'_>, slot: Slot<N>) -> u32 {
        let group = self.group(slot);
        // Low byte first on read.
        let low = group.ocra_low.read(cs) as u32;
        let high = group.ocra_high.read(cs) as u32;
        (high << 8) | low
    }

    fn is_running(&self, cs: CriticalSection<'_>, slot: Slot<N>) -> bool {
        let control = ControlB::from_bits_truncate(self.group(slot).tccrb.read(cs));
        control.intersects(ControlB::CS0 | ControlB::CS1 | ControlB::CS2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prescaler_1024_selects_cs10_and_cs12() {
        let bits = Prescaler::Div1024.start_bits().bits();
        assert_eq!(bits, 0b0000_1101);
    }

    #[test]
    fn prescaler_divisors_round_trip() {
        for divisor in [1, 8, 64, 256, 1024] {
            let prescaler = Prescaler::from_divisor(divisor).expect("valid divisor");
            assert_eq!(prescaler.divisor(), divisor);
        }
        assert!(Prescaler::from_divisor(128).is_none());
    }

    #[test]
    fn register_tables_match_datasheet_layout() {
        assert_eq!(TIMER1.tccra.addr(), 0x80);
        assert_eq!(TIMER1.tccrb.addr(), 0x81);
        assert_eq!(TIMER1.ocra_high.addr(), 0x89);
        assert_eq!(TIMER5.tccrb.addr(), 0x121);
        assert_eq!(TIMER5.timsk.addr(), 0x73);
    }

    #[test]
    fn every_group_is_distinct() {
        for (i, a) in ATMEGA2560_GROUPS.iter().enumerate() {
            for b in &ATMEGA2560_GROUPS[i + 1..] {
                assert_ne!(a.tccra.addr(), b.tccra.addr());
                assert_ne!(a.timsk.addr(), b.timsk.addr());
                assert_ne!(a.ocra_low.addr(), b.ocra_low.addr());
            }
        }
    }

    #[test]
    fn smaller_parts_are_prefixes_of_the_mega() {
        assert_eq!(ATMEGA328P_GROUPS[0].name, ATMEGA2560_GROUPS[0].name);
        assert_eq!(ATMEGA32U4_GROUPS[1].tccra.addr(), ATMEGA2560_GROUPS[1].tccra.addr());
    }
}
