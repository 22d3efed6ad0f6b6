//! ATmega timer core.
//!
//! Each `TIMERn_COMPA` vector of the selected chip is declared here and
//! calls the common handler with its slot index. Critical sections come
//! from `avr-device`, which masks interrupts with `cli` and restores SREG.
//! Call [`init`] once at boot, then enable interrupts globally.

use crate::{
    config::{self, PlatformConfig},
    registers::avr::{self, AvrTimers},
    timer::TimerCore,
};

#[cfg(feature = "atmega328p")]
pub const CONFIG: PlatformConfig = config::ATMEGA328P;
#[cfg(feature = "atmega32u4")]
pub const CONFIG: PlatformConfig = config::ATMEGA32U4;
#[cfg(feature = "atmega2560")]
pub const CONFIG: PlatformConfig = config::ATMEGA2560;

/// Number of timer slots on this part.
pub const MAX_TIMERS: usize = CONFIG.slots;

pub type Core = TimerCore<AvrTimers<MAX_TIMERS>, MAX_TIMERS>;

#[cfg(feature = "atmega328p")]
pub static CORE: Core = TimerCore::new(
    AvrTimers::new(&avr::ATMEGA328P_GROUPS, CONFIG.prescaler),
    CONFIG.calculator(),
);
#[cfg(feature = "atmega32u4")]
pub static CORE: Core = TimerCore::new(
    AvrTimers::new(&avr::ATMEGA32U4_GROUPS, CONFIG.prescaler),
    CONFIG.calculator(),
);
#[cfg(feature = "atmega2560")]
pub static CORE: Core = TimerCore::new(
    AvrTimers::new(&avr::ATMEGA2560_GROUPS, CONFIG.prescaler),
    CONFIG.calculator(),
);

/// Stops every timer and enables its compare interrupt.
pub fn init() {
    for slot in 0..MAX_TIMERS {
        CORE.initialize(slot);
    }
    log::info!(
        "{}: {} timer slots, {} ms max interval",
        CONFIG.name,
        MAX_TIMERS,
        CONFIG.max_interval_ms()
    );
}

#[cfg_attr(feature = "atmega328p", avr_device::interrupt(atmega328p))]
#[cfg_attr(feature = "atmega32u4", avr_device::interrupt(atmega32u4))]
#[cfg_attr(feature = "atmega2560", avr_device::interrupt(atmega2560))]
fn TIMER1_COMPA() {
    CORE.on_compare_match(0);
}

#[cfg(any(feature = "atmega32u4", feature = "atmega2560"))]
#[cfg_attr(feature = "atmega32u4", avr_device::interrupt(atmega32u4))]
#[cfg_attr(feature = "atmega2560", avr_device::interrupt(atmega2560))]
fn TIMER3_COMPA() {
    CORE.on_compare_match(1);
}

#[cfg(feature = "atmega2560")]
#[avr_device::interrupt(atmega2560)]
fn TIMER4_COMPA() {
    CORE.on_compare_match(2);
}

#[cfg(feature = "atmega2560")]
#[avr_device::interrupt(atmega2560)]
fn TIMER5_COMPA() {
    CORE.on_compare_match(3);
}
