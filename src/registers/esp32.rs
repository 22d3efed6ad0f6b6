//! ESP32 timer groups (TIMG0, TIMG1), two general purpose timers each.
//!
//! The 64-bit counters count up from zero and raise a level interrupt when
//! they reach the alarm value, then reload. Only the low alarm word is used;
//! the interval calculator never produces a counter wider than 32 bits.

use bitflags::bitflags;
use critical_section::CriticalSection;

use super::{Reg, TimerRegisters};
use crate::slot::Slot;

pub const TIMG0_BASE: usize = 0x3FF5_F000;
pub const TIMG1_BASE: usize = 0x3FF6_0000;

const TIMER_STRIDE: usize = 0x24;
const CONFIG: usize = 0x00;
const ALARM_LO: usize = 0x10;
const ALARM_HI: usize = 0x14;
const LOAD_LO: usize = 0x18;
const LOAD_HI: usize = 0x1C;
const LOAD: usize = 0x20;
const INT_ENA: usize = 0x98;
const INT_CLR: usize = 0xA4;

const DIVIDER_SHIFT: u32 = 13;
const DIVIDER_MASK: u32 = 0xFFFF;

bitflags! {
    /// TIMGn_TxCONFIG_REG bits, divider field excluded.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Config: u32 {
        const EN = 1 << 31;
        const INCREASE = 1 << 30;
        const AUTORELOAD = 1 << 29;
        const EDGE_INT_EN = 1 << 12;
        const LEVEL_INT_EN = 1 << 11;
        /// Cleared by hardware when the alarm fires.
        const ALARM_EN = 1 << 10;
    }
}

/// CONFIG word that runs the timer as a reloading alarm with `divider`.
/// The hardware reads a divider of 0 as 65536.
pub const fn start_word(divider: u32) -> u32 {
    let flags = Config::EN
        .union(Config::INCREASE)
        .union(Config::AUTORELOAD)
        .union(Config::LEVEL_INT_EN)
        .union(Config::ALARM_EN);
    flags.bits() | ((divider & DIVIDER_MASK) << DIVIDER_SHIFT)
}

/// Registers of one timer inside a group.
#[derive(Debug, Clone, Copy)]
pub struct RegisterGroup {
    pub name: &'static str,
    pub config: Reg<u32>,
    pub alarm_lo: Reg<u32>,
    pub alarm_hi: Reg<u32>,
    pub load_lo: Reg<u32>,
    pub load_hi: Reg<u32>,
    pub load: Reg<u32>,
    pub int_ena: Reg<u32>,
    pub int_clr: Reg<u32>,
    /// This timer's bit in the group's interrupt registers.
    pub int_bit: u32,
}

impl RegisterGroup {
    /// # Safety
    /// `base` must be a TIMG block of the running chip and `timer` 0 or 1.
    pub const unsafe fn new(name: &'static str, base: usize, timer: usize) -> Self {
        let group = Reg::<u32>::at(base);
        let t = timer * TIMER_STRIDE;
        Self {
            name,
            config: group.offset(t + CONFIG),
            alarm_lo: group.offset(t + ALARM_LO),
            alarm_hi: group.offset(t + ALARM_HI),
            load_lo: group.offset(t + LOAD_LO),
            load_hi: group.offset(t + LOAD_HI),
            load: group.offset(t + LOAD),
            int_ena: group.offset(INT_ENA),
            int_clr: group.offset(INT_CLR),
            int_bit: 1 << timer,
        }
    }
}

pub static ESP32_GROUPS: [RegisterGroup; 4] = unsafe {
    [
        RegisterGroup::new("TG0_T0", TIMG0_BASE, 0),
        RegisterGroup::new("TG0_T1", TIMG0_BASE, 1),
        RegisterGroup::new("TG1_T0", TIMG1_BASE, 0),
        RegisterGroup::new("TG1_T1", TIMG1_BASE, 1),
    ]
};

/// The four general purpose timers of an ESP32.
pub struct Esp32Timers {
    groups: &'static [RegisterGroup; 4],
    divider: u32,
}

impl Esp32Timers {
    pub const fn new(groups: &'static [RegisterGroup; 4], divider: u32) -> Self {
        assert!(divider >= 2 && divider <= 65_536, "ESP32 timer divider out of range");
        Self { groups, divider }
    }

    fn group(&self, slot: Slot<4>) -> &RegisterGroup {
        &self.groups[slot.index()]
    }
}

impl TimerRegisters<4> for Esp32Timers {
    fn clear_control(&self, cs: CriticalSection<'_>, slot: Slot<4>) {
        self.group(slot).config.write(cs, 0);
    }

    fn enable_compare_interrupt(&self, cs: CriticalSection<'_>, slot: Slot<4>) {
        let group = self.group(slot);
        group.int_ena.modify(cs, |v| v | group.int_bit);
    }

    fn start_counting(&self, cs: CriticalSection<'_>, slot: Slot<4>) {
        let group = self.group(slot);
        group.load_lo.write(cs, 0);
        group.load_hi.write(cs, 0);
        // Any write to LOAD copies LOADLO/HI into the counter.
        group.load.write(cs, 1);
        group.config.modify(cs, |v| v | start_word(self.divider));
    }

    fn write_compare(&self, cs: CriticalSection<'_>, slot: Slot<4>, counter: u32) {
        let group = self.group(slot);
        group.alarm_hi.write(cs, 0);
        group.alarm_lo.write(cs, counter);
    }

    fn read_compare(&self, cs: CriticalSection<'_>, slot: Slot<4>) -> u32 {
        self.group(slot).alarm_lo.read(cs)
    }

    fn is_running(&self, cs: CriticalSection<'_>, slot: Slot<4>) -> bool {
        Config::from_bits_truncate(self.group(slot).config.read(cs)).contains(Config::EN)
    }

    fn acknowledge(&self, cs: CriticalSection<'_>, slot: Slot<4>) {
        let group = self.group(slot);
        group.int_clr.write(cs, group.int_bit);
        let config = Config::from_bits_truncate(group.config.read(cs));
        if config.contains(Config::EN) {
            group.config.modify(cs, |v| v | Config::ALARM_EN.bits());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_word_places_divider_between_flags() {
        let word = start_word(8_000);
        assert_eq!((word >> DIVIDER_SHIFT) & DIVIDER_MASK, 8_000);
        let flags = Config::from_bits_truncate(word);
        assert!(flags.contains(Config::EN | Config::AUTORELOAD | Config::ALARM_EN));
        assert!(!flags.contains(Config::EDGE_INT_EN));
    }

    #[test]
    fn full_divider_encodes_as_zero() {
        assert_eq!((start_word(65_536) >> DIVIDER_SHIFT) & DIVIDER_MASK, 0);
    }

    #[test]
    fn timers_in_a_group_share_interrupt_registers() {
        let [t0, t1, t2, _] = &ESP32_GROUPS;
        assert_eq!(t0.int_ena.addr(), t1.int_ena.addr());
        assert_ne!(t0.int_bit, t1.int_bit);
        assert_eq!(t1.config.addr() - t0.config.addr(), TIMER_STRIDE);
        assert_eq!(t2.config.addr(), TIMG1_BASE);
        assert_eq!(t2.int_clr.addr(), TIMG1_BASE + 0xA4);
    }
}
