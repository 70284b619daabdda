//! The host loop: poll input, step, present, wait.

use std::thread;
use std::time::{Duration, Instant};

use crate::emulator::emulator::Emulator;
use crate::emulator::error::Result;
use crate::emulator::input::{Control, EmulatorInput};
use crate::emulator::output::EmulatorOutput;
use crate::emulator::timer::{timer_period, TimerMode};

/// Roughly one instruction every 1.5 ms.
pub const DEFAULT_CYCLE_HZ: u32 = 666;

/// The time between two instructions at `hz`, or `None` for 0 (unthrottled).
pub fn cycle_interval(hz: u32) -> Option<Duration> {
    if hz == 0 {
        None
    } else {
        Some(Duration::from_nanos(1_000_000_000 / hz as u64))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Time between two steps, `None` runs as fast as possible.
    pub cycle_interval: Option<Duration>,
    pub timer_mode: TimerMode,
    /// Stop after this many steps, blocked ones included.
    pub max_steps: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            cycle_interval: cycle_interval(DEFAULT_CYCLE_HZ),
            timer_mode: TimerMode::default(),
            max_steps: None,
        }
    }
}

/// Why `Runner::run` returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Quit,
    StepLimit,
}

/// Paces a loop to a fixed period.
pub(crate) struct Clock {
    period: Duration,
    last: Instant,
}

impl Clock {
    pub(crate) fn new(period: Duration) -> Self {
        Clock {
            period,
            last: Instant::now(),
        }
    }

    /// Sleep until a period has passed since the last tick.
    /// A late tick doesn't try to catch up.
    pub(crate) fn wait(&mut self) {
        let elapsed = self.last.elapsed();
        if elapsed < self.period {
            thread::sleep(self.period - elapsed);
        }
        self.last = Instant::now();
    }

    /// Whole periods since the last call. The remainder carries over.
    pub(crate) fn elapsed_ticks(&mut self) -> u32 {
        let ticks = (self.last.elapsed().as_nanos() / self.period.as_nanos()) as u32;
        self.last += self.period * ticks;
        ticks
    }
}

/// Owns an emulator together with its host input and output.
pub struct Runner<I: EmulatorInput, O: EmulatorOutput> {
    emulator: Emulator,
    input: I,
    output: O,
    config: Config,
    steps: u64,
}

impl<I: EmulatorInput, O: EmulatorOutput> Runner<I, O> {
    pub fn new(emulator: Emulator, input: I, output: O, config: Config) -> Runner<I, O> {
        Runner {
            emulator: emulator.with_timer_mode(config.timer_mode),
            input,
            output,
            config,
            steps: 0,
        }
    }

    pub fn emulator(&self) -> &Emulator {
        &self.emulator
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    /// Steps taken so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Run until the input asks to quit, the step limit is reached or the
    /// emulator fails.
    pub fn run(&mut self) -> Result<Exit> {
        log::info!("Running with {:?}", self.config);

        let mut cycle_clock = self.config.cycle_interval.map(Clock::new);
        let mut timer_clock = Clock::new(timer_period());

        loop {
            if let Some(max) = self.config.max_steps {
                if self.steps >= max {
                    log::info!("Stopping after {} steps", self.steps);
                    return Ok(Exit::StepLimit);
                }
            }

            if self.input.poll(self.emulator.keypad_mut())? == Control::Quit {
                log::info!("Quit after {} steps", self.steps);
                return Ok(Exit::Quit);
            }

            self.emulator.step()?;
            self.steps += 1;

            if self.config.timer_mode == TimerMode::Fixed60Hz {
                // The timers are 8 bits, more ticks than that change nothing
                for _ in 0..timer_clock.elapsed_ticks().min(u8::MAX as u32) {
                    self.emulator.tick_timers();
                }
            }

            if self.emulator.framebuffer_mut().take_dirty() {
                self.output.present(self.emulator.framebuffer())?;
            }

            if let Some(clock) = cycle_clock.as_mut() {
                clock.wait();
            }
        }
    }
}
