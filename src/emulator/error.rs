//! Errors that stop the emulator.

/// Everything that can go wrong while loading or running a program.
/// None of these are recoverable mid-instruction; the state is left as it
/// was before the failing step.
#[derive(Debug, thiserror::Error)]
pub enum EmulatorError {
    #[error("program is {size} bytes, but only {max} bytes fit in memory")]
    CapacityExceeded { size: usize, max: usize },

    #[error("unknown opcode {0:#06x}")]
    UnknownOpcode(u16),

    #[error("stack overflow when calling from {address:#05x}")]
    StackOverflow { address: u16 },

    #[error("stack underflow when returning from {address:#05x}")]
    StackUnderflow { address: u16 },

    #[error("memory access out of bounds at {address:#06x}")]
    MemoryOutOfBounds { address: usize },

    #[error("attempt to overwrite reserved memory at {address:#05x}")]
    ReservedMemoryWrite { address: usize },

    #[error("host i/o failed: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EmulatorError>;
