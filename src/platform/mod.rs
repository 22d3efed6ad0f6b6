//! Build-selected platform instances.
//!
//! Each platform owns one `static` [`TimerCore`](crate::timer::TimerCore)
//! named `CORE` and one entry point per timer vector. Exactly one platform
//! feature may be enabled.

#[cfg(any(feature = "atmega328p", feature = "atmega32u4", feature = "atmega2560"))]
pub mod avr;
#[cfg(feature = "esp32")]
pub mod esp32;

#[cfg(any(
    all(feature = "atmega328p", feature = "atmega32u4"),
    all(feature = "atmega328p", feature = "atmega2560"),
    all(feature = "atmega32u4", feature = "atmega2560"),
    all(
        feature = "esp32",
        any(feature = "atmega328p", feature = "atmega32u4", feature = "atmega2560")
    ),
))]
compile_error!("enable exactly one of the `atmega328p`, `atmega32u4`, `atmega2560` and `esp32` features");
