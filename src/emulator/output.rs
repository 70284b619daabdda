use std::io;

use crate::emulator::framebuffer::Framebuffer;

/// Represents an output device that frames can be presented on.
pub trait EmulatorOutput {
    /// Show `frame`. Only called when the frame changed since last time.
    fn present(&mut self, frame: &Framebuffer) -> io::Result<()>;
}

/// A simple output device that keeps the latest presented frame.
pub struct DummyOutput {
    last: Option<Vec<u8>>,
    presented: usize,
}

impl DummyOutput {
    pub fn new() -> DummyOutput {
        DummyOutput {
            last: None,
            presented: 0,
        }
    }

    /// The pixels of the most recently presented frame.
    pub fn last_frame(&self) -> Option<&[u8]> {
        self.last.as_deref()
    }

    /// How many frames have been presented.
    pub fn presented(&self) -> usize {
        self.presented
    }
}

impl Default for DummyOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl EmulatorOutput for DummyOutput {
    fn present(&mut self, frame: &Framebuffer) -> io::Result<()> {
        self.last = Some(frame.pixels().to_vec());
        self.presented += 1;
        Ok(())
    }
}
