//! Interval timers for small microcontrollers.
//!
//! Arm a repeating or one-shot interval on one of a fixed set of hardware
//! timers and get a callback from the compare-match interrupt. The same
//! [`TimerCore`] drives the ATmega 16-bit timers, the ESP32 timer groups and
//! an in-memory register bank used on the host.
//!
//! ```
//! use systimer::{
//!     interval::IntervalCalculator, registers::sim::SimTimers, CallbackArg, Mode, TimerCore,
//!     TimerObject,
//! };
//!
//! static CORE: TimerCore<SimTimers<2>, 2> =
//!     TimerCore::new(SimTimers::new(), IntervalCalculator::new(16_000_000, 1024, 0xFFFF));
//! static BLINK: TimerObject = TimerObject::new(250);
//!
//! fn blink(_: CallbackArg) {}
//!
//! assert_eq!(CORE.arm(0, &BLINK, Mode::Repeating, blink, CallbackArg::NONE), 250);
//! CORE.on_compare_match(0);
//! assert!(BLINK.is_armed());
//! ```

#![cfg_attr(not(test), no_std)]
#![cfg_attr(target_arch = "avr", feature(abi_avr_interrupt))]

pub mod config;
pub mod dispatch;
pub mod error;
pub mod interrupts;
pub mod interval;
pub mod platform;
pub mod registers;
pub mod slot;
pub mod timer;

pub use dispatch::{Callback, CallbackArg, Mode, TimerObject};
pub use error::TimerError;
pub use timer::TimerCore;
