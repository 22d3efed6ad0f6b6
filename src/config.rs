//! Per-platform timer parameters.

use crate::interval::IntervalCalculator;

/// Fixed timer characteristics of one chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformConfig {
    pub name: &'static str,
    /// Number of logical timer slots (1, 2 or 4).
    pub slots: usize,
    /// Clock feeding the timer prescaler.
    pub clock_hz: u32,
    pub prescaler: u32,
    /// Largest value the compare register can hold.
    pub counter_max: u32,
}

impl PlatformConfig {
    pub const fn calculator(&self) -> IntervalCalculator {
        IntervalCalculator::new(self.clock_hz, self.prescaler, self.counter_max)
    }

    pub const fn max_interval_ms(&self) -> u32 {
        self.calculator().max_interval_ms()
    }
}

/// Arduino Uno / Nano: Timer1 only.
pub const ATMEGA328P: PlatformConfig = PlatformConfig {
    name: "atmega328p",
    slots: 1,
    clock_hz: 16_000_000,
    prescaler: 1024,
    counter_max: u16::MAX as u32,
};

/// Leonardo / Pro Micro: Timer1 and Timer3.
pub const ATMEGA32U4: PlatformConfig = PlatformConfig {
    name: "atmega32u4",
    slots: 2,
    clock_hz: 16_000_000,
    prescaler: 1024,
    counter_max: u16::MAX as u32,
};

/// Mega 2560: Timer1, Timer3, Timer4 and Timer5.
pub const ATMEGA2560: PlatformConfig = PlatformConfig {
    name: "atmega2560",
    slots: 4,
    clock_hz: 16_000_000,
    prescaler: 1024,
    counter_max: u16::MAX as u32,
};

/// ESP32 timer groups clocked from the 80 MHz APB, 100 us ticks.
pub const ESP32: PlatformConfig = PlatformConfig {
    name: "esp32",
    slots: 4,
    clock_hz: 80_000_000,
    prescaler: 8_000,
    counter_max: u32::MAX,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn avr_parts_share_the_16mhz_range() {
        for config in [ATMEGA328P, ATMEGA32U4, ATMEGA2560] {
            assert_eq!(config.max_interval_ms(), 4_194, "{}", config.name);
        }
    }

    #[test]
    fn esp32_range_covers_days() {
        assert_eq!(ESP32.calculator().resolution_ns(), 100_000);
        assert_eq!(ESP32.max_interval_ms(), 429_496_729);
    }

    #[test]
    fn slot_counts_are_supported() {
        for config in [ATMEGA328P, ATMEGA32U4, ATMEGA2560, ESP32] {
            assert!(matches!(config.slots, 1 | 2 | 4));
        }
    }
}
