//! ESP32 timer core over TIMG0 and TIMG1.
//!
//! Slots map to TG0/T0, TG0/T1, TG1/T0 and TG1/T1, each with its own level
//! interrupt routed to a trampoline that calls the common handler.

use core::cell::RefCell;

use critical_section::Mutex;
use esp_hal::{
    interrupt::Priority,
    peripherals::{Interrupt, TIMG0, TIMG1},
    timer::timg::TimerGroup,
};

use crate::{
    config::{self, PlatformConfig},
    error::TimerError,
    interrupts,
    registers::esp32::{Esp32Timers, ESP32_GROUPS},
    timer::TimerCore,
};

pub const CONFIG: PlatformConfig = config::ESP32;

/// Number of timer slots on this part.
pub const MAX_TIMERS: usize = 4;

pub type Core = TimerCore<Esp32Timers, MAX_TIMERS>;

pub static CORE: Core = TimerCore::new(
    Esp32Timers::new(&ESP32_GROUPS, CONFIG.prescaler),
    CONFIG.calculator(),
);

/// Timer group drivers, held so their peripheral clocks stay enabled.
type Groups = (
    TimerGroup<'static, TIMG0<'static>>,
    TimerGroup<'static, TIMG1<'static>>,
);
static GROUPS: Mutex<RefCell<Option<Groups>>> = Mutex::new(RefCell::new(None));

/// Timer callbacks are short; they share the lowest level.
const PRIORITY: Priority = Priority::Priority1;

const VECTORS: [(Interrupt, extern "C" fn(), &str); MAX_TIMERS] = [
    (Interrupt::TG0_T0_LEVEL, tg0_t0_isr, "TG0_T0_LEVEL"),
    (Interrupt::TG0_T1_LEVEL, tg0_t1_isr, "TG0_T1_LEVEL"),
    (Interrupt::TG1_T0_LEVEL, tg1_t0_isr, "TG1_T0_LEVEL"),
    (Interrupt::TG1_T1_LEVEL, tg1_t1_isr, "TG1_T1_LEVEL"),
];

/// Takes over both timer groups, stops all four timers and routes their
/// interrupts to the timer core.
pub fn init(timg0: TIMG0<'static>, timg1: TIMG1<'static>) -> Result<(), TimerError> {
    critical_section::with(|cs| {
        let mut groups = GROUPS.borrow_ref_mut(cs);
        if groups.is_some() {
            return Err(TimerError::AlreadyInitialized);
        }
        groups.replace((TimerGroup::new(timg0), TimerGroup::new(timg1)));
        Ok(())
    })?;

    for slot in 0..MAX_TIMERS {
        CORE.initialize(slot);
    }

    let bound = interrupts::bind_all(
        MAX_TIMERS,
        |index| {
            let (interrupt, handler, _) = VECTORS[index];
            unsafe { interrupts::bind_timer_vector(interrupt, handler, PRIORITY) }
        },
        |index| interrupts::unbind_timer_vector(VECTORS[index].0),
    );
    if let Err((index, err)) = bound {
        let name = VECTORS[index].2;
        log::error!("failed to bind {}: {:?}", name, err);
        // Release the groups too, so a retry is not refused as a double init.
        critical_section::with(|cs| GROUPS.borrow_ref_mut(cs).take());
        return Err(TimerError::InterruptBind(name));
    }

    log::info!(
        "esp32: {} timer slots, {} ms max interval",
        MAX_TIMERS,
        CONFIG.max_interval_ms()
    );
    Ok(())
}

extern "C" fn tg0_t0_isr() {
    CORE.on_compare_match(0);
}

extern "C" fn tg0_t1_isr() {
    CORE.on_compare_match(1);
}

extern "C" fn tg1_t0_isr() {
    CORE.on_compare_match(2);
}

extern "C" fn tg1_t1_isr() {
    CORE.on_compare_match(3);
}
