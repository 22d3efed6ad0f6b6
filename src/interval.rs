//! Period to compare-register conversion.
//!
//! The counter ticks once every `prescaler` clock cycles and fires when it
//! reaches the compare value. Because zero is counted too, a period of
//! `t` ticks is programmed as `t - 1`.
//!
//! With a 16 MHz clock and a /1024 prescaler one tick is 64 us:
//!
//! ```
//! use systimer::interval::IntervalCalculator;
//!
//! let calc = IntervalCalculator::new(16_000_000, 1024, u16::MAX as u32);
//! assert_eq!(calc.resolution_ns(), 64_000);
//! assert_eq!(calc.compute(64).counter, 999);
//! assert_eq!(calc.compute(5_000).clamped_ms, 4_194);
//! ```

/// Clamped period and the counter value that produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub clamped_ms: u32,
    pub counter: u32,
}

/// Fixed clock, prescaler and counter width of one timer peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalCalculator {
    clock_hz: u32,
    prescaler: u32,
    counter_max: u32,
}

impl IntervalCalculator {
    pub const fn new(clock_hz: u32, prescaler: u32, counter_max: u32) -> Self {
        assert!(clock_hz > 0, "clock frequency must be non-zero");
        assert!(prescaler > 0, "prescaler must be non-zero");
        Self {
            clock_hz,
            prescaler,
            counter_max,
        }
    }

    pub const fn clock_hz(&self) -> u32 {
        self.clock_hz
    }

    pub const fn prescaler(&self) -> u32 {
        self.prescaler
    }

    pub const fn counter_max(&self) -> u32 {
        self.counter_max
    }

    /// Length of one counter tick in nanoseconds.
    pub const fn resolution_ns(&self) -> u64 {
        self.prescaler as u64 * 1_000_000_000 / self.clock_hz as u64
    }

    /// Longest period the counter can represent, never below 1 ms.
    pub const fn max_interval_ms(&self) -> u32 {
        let max = self.prescaler as u128 * self.counter_max as u128 * 1_000 / self.clock_hz as u128;
        if max > u32::MAX as u128 {
            u32::MAX
        } else if max == 0 {
            1
        } else {
            max as u32
        }
    }

    /// Coerces a request into `[1, max_interval_ms]`.
    pub const fn clamp(&self, requested_ms: u32) -> u32 {
        let max = self.max_interval_ms();
        if requested_ms < 1 {
            1
        } else if requested_ms > max {
            max
        } else {
            requested_ms
        }
    }

    pub const fn compute(&self, requested_ms: u32) -> Interval {
        let clamped_ms = self.clamp(requested_ms);
        let divisor = 1_000 * self.prescaler as u128;
        // Round half up to the nearest whole tick.
        let ticks = (clamped_ms as u128 * self.clock_hz as u128 + divisor / 2) / divisor;
        let counter = ticks.saturating_sub(1);
        let counter = if counter > self.counter_max as u128 {
            self.counter_max
        } else {
            counter as u32
        };
        Interval {
            clamped_ms,
            counter,
        }
    }
}
