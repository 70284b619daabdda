//! The delay and sound timers.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// The rate real CHIP-8 hardware decrements its timers at.
pub const TIMER_HZ: u32 = 60;

/// The time between two timer ticks at `TIMER_HZ`.
pub fn timer_period() -> Duration {
    Duration::from_nanos(1_000_000_000 / TIMER_HZ as u64)
}

/// When the timers count down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerMode {
    /// Decrement once per completed instruction. Timer durations then depend
    /// on how fast instructions are executed.
    PerInstruction,
    /// Decrement at a fixed 60 Hz wall-clock rate, driven by the host loop.
    Fixed60Hz,
}

impl Default for TimerMode {
    fn default() -> Self {
        TimerMode::PerInstruction
    }
}

impl FromStr for TimerMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "per-instruction" | "instruction" => Ok(TimerMode::PerInstruction),
            "60hz" | "fixed" => Ok(TimerMode::Fixed60Hz),
            other => Err(format!("unknown timer mode '{}', expected 'per-instruction' or '60hz'", other)),
        }
    }
}

impl fmt::Display for TimerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerMode::PerInstruction => write!(f, "per-instruction"),
            TimerMode::Fixed60Hz => write!(f, "60hz"),
        }
    }
}

/// Two 8-bit countdown timers. Both stop at zero.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Timers {
    pub delay: u8,
    pub sound: u8,
}

impl Timers {

    /// Count both timers down by one, stopping at zero.
    pub fn tick(&mut self) {
        self.delay = self.delay.saturating_sub(1);
        self.sound = self.sound.saturating_sub(1);
    }

    /// The host should be beeping while this holds.
    pub fn sound_active(&self) -> bool {
        self.sound > 0
    }
}
