//! The CHIP-8 virtual machine and the traits a host implements to drive it.

pub mod emulator;
pub mod error;
pub mod framebuffer;
pub mod input;
pub mod instruction;
pub mod machine;
pub mod output;
pub mod runner;
pub mod timer;

pub use self::emulator::Emulator;
pub use self::error::{EmulatorError, Result};
