//! The monochrome 64x32 display.

use std::fmt;

pub const SCREEN_WIDTH: usize = 64;
pub const SCREEN_HEIGHT: usize = 32;
pub const SCREEN_SIZE: usize = SCREEN_WIDTH * SCREEN_HEIGHT;

/// Colour of an unset pixel when converted with `Framebuffer::to_argb`.
pub const ARGB_OFF: u32 = 0xFF00_0000;
/// Colour of a set pixel when converted with `Framebuffer::to_argb`.
pub const ARGB_ON: u32 = 0xFFFF_FFFF;

/// One byte per pixel, each either 0 or 1, stored row-major so that
/// the pixel at `(x, y)` lives at `x + y * SCREEN_WIDTH`.
///
/// The dirty flag is raised by every change and lowered by the host
/// once it has presented the frame.
#[derive(Clone)]
pub struct Framebuffer {
    pixels: [u8; SCREEN_SIZE],
    dirty: bool,
}

impl Framebuffer {
    pub fn new() -> Framebuffer {
        Framebuffer {
            pixels: [0; SCREEN_SIZE],
            dirty: false,
        }
    }

    /// The pixel at `(x, y)`, or `None` if it is outside the screen.
    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        Self::index(x, y).map(|i| self.pixels[i])
    }

    /// XOR a single pixel with 1, returning true if a set pixel was unset.
    /// Pixels outside the screen are ignored.
    pub fn flip(&mut self, x: usize, y: usize) -> bool {
        match Self::index(x, y) {
            Some(i) => {
                let collision = self.pixels[i] == 1;
                self.pixels[i] ^= 1;
                self.dirty = true;
                collision
            }
            None => false,
        }
    }

    /// Flag the frame as changed without touching any pixel.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Unset every pixel.
    pub fn clear(&mut self) {
        self.pixels = [0; SCREEN_SIZE];
        self.dirty = true;
    }

    /// A read-only view of all 2048 pixels.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Lower the dirty flag, returning whether it was raised.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    /// Map every pixel to an ARGB8888 colour, black for 0 and white for 1.
    pub fn to_argb(&self) -> Vec<u32> {
        self.pixels
            .iter()
            .map(|&p| if p == 1 { ARGB_ON } else { ARGB_OFF })
            .collect()
    }

    fn index(x: usize, y: usize) -> Option<usize> {
        if x < SCREEN_WIDTH && y < SCREEN_HEIGHT {
            Some(x + y * SCREEN_WIDTH)
        } else {
            None
        }
    }
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Framebuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Framebuffer")
            .field("lit", &self.pixels.iter().filter(|&&p| p == 1).count())
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl fmt::Display for Framebuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.pixels.chunks(SCREEN_WIDTH) {
            for c in row.iter() {
                write!(f, "{}", if *c == 1 { "#" } else { " " })?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}
