//! Small helpers that don't belong to the emulator itself.

pub mod bits;
