//! The machine state: memory, registers, stack, timers, keypad and display.
//!
//! This is plain data with bounds-checked helpers. The interpreter in
//! `emulator::emulator` is what gives it behaviour.

use crate::emulator::error::{EmulatorError, Result};
use crate::emulator::framebuffer::Framebuffer;
use crate::emulator::input::Keypad;
use crate::emulator::timer::Timers;

pub const MEM_SIZE: usize = 4096;
pub const NUM_REGISTERS: usize = 16;
pub const STACK_SIZE: usize = 16;
pub const PC_START: u16 = 0x200;
pub const MAX_PROGRAM_SIZE: usize = MEM_SIZE - PC_START as usize;
/// Each font glyph is five rows high.
pub const FONT_GLYPH_SIZE: u16 = 5;
pub const FONT: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

/// VF doubles as the carry, borrow and collision flag.
pub const FLAG: usize = 0xF;

#[derive(Clone)]
pub struct Machine {
    pub(crate) memory: [u8; MEM_SIZE],
    pub(crate) registers: [u8; NUM_REGISTERS],
    pub(crate) i: u16,
    pub(crate) program_counter: u16,
    pub(crate) stack: [u16; STACK_SIZE],
    pub(crate) stack_pointer: usize,
    pub(crate) timers: Timers,
    pub(crate) keypad: Keypad,
    pub(crate) framebuffer: Framebuffer,
}

impl Machine {

    /// A freshly initialized machine with the font loaded.
    pub fn new() -> Machine {
        let mut memory = [0; MEM_SIZE];
        memory[..FONT.len()].copy_from_slice(&FONT);

        Machine {
            memory,
            registers: [0; NUM_REGISTERS],
            i: 0,
            program_counter: PC_START,
            stack: [0; STACK_SIZE],
            stack_pointer: 0,
            timers: Timers::default(),
            keypad: Keypad::new(),
            framebuffer: Framebuffer::new(),
        }
    }

    /// Put everything back the way `new` left it, including memory.
    pub fn reset(&mut self) {
        *self = Machine::new();
    }

    /// Copy a program into memory at 0x200. Nothing else is touched.
    pub fn load(&mut self, program: &[u8]) -> Result<()> {
        if program.len() > MAX_PROGRAM_SIZE {
            log::error!("Program of {} bytes does not fit in memory", program.len());
            return Err(EmulatorError::CapacityExceeded {
                size: program.len(),
                max: MAX_PROGRAM_SIZE,
            });
        }

        let start = PC_START as usize;
        self.memory[start..start + program.len()].copy_from_slice(program);
        log::debug!("Loaded {} bytes at {:#05x}", program.len(), start);

        Ok(())
    }

    pub fn memory(&self) -> &[u8] {
        &self.memory
    }

    pub fn register(&self, x: u8) -> u8 {
        self.registers[(x & 0xF) as usize]
    }

    pub fn registers(&self) -> &[u8; NUM_REGISTERS] {
        &self.registers
    }

    pub fn i(&self) -> u16 {
        self.i
    }

    pub fn program_counter(&self) -> u16 {
        self.program_counter
    }

    pub fn stack_pointer(&self) -> usize {
        self.stack_pointer
    }

    /// The return addresses currently on the stack, oldest first.
    pub fn stack(&self) -> &[u16] {
        &self.stack[..self.stack_pointer]
    }

    pub fn timers(&self) -> Timers {
        self.timers
    }

    pub fn keypad(&self) -> &Keypad {
        &self.keypad
    }

    pub fn keypad_mut(&mut self) -> &mut Keypad {
        &mut self.keypad
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    pub fn framebuffer_mut(&mut self) -> &mut Framebuffer {
        &mut self.framebuffer
    }

    /// Borrow `len` bytes starting at `address`.
    pub(crate) fn read(&self, address: usize, len: usize) -> Result<&[u8]> {
        self.memory
            .get(address..address + len)
            .ok_or(EmulatorError::MemoryOutOfBounds {
                address: (address + len).saturating_sub(1).max(address),
            })
    }

    /// Mutably borrow `len` bytes starting at `address`.
    /// The font region below 0x200 can't be written to.
    pub(crate) fn write(&mut self, address: usize, len: usize) -> Result<&mut [u8]> {
        if address < PC_START as usize {
            return Err(EmulatorError::ReservedMemoryWrite { address });
        }
        self.memory
            .get_mut(address..address + len)
            .ok_or(EmulatorError::MemoryOutOfBounds {
                address: (address + len).saturating_sub(1).max(address),
            })
    }

    pub(crate) fn push(&mut self, address: u16) -> Result<()> {
        if self.stack_pointer >= STACK_SIZE {
            return Err(EmulatorError::StackOverflow {
                address: self.program_counter,
            });
        }
        self.stack[self.stack_pointer] = address;
        self.stack_pointer += 1;
        Ok(())
    }

    pub(crate) fn pop(&mut self) -> Result<u16> {
        if self.stack_pointer == 0 {
            return Err(EmulatorError::StackUnderflow {
                address: self.program_counter,
            });
        }
        self.stack_pointer -= 1;
        Ok(self.stack[self.stack_pointer])
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Machine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Machine")
            .field("registers", &self.registers)
            .field("i", &format_args!("{:#05x}", self.i))
            .field("program_counter", &format_args!("{:#05x}", self.program_counter))
            .field("stack", &self.stack())
            .field("timers", &self.timers)
            .field("keypad", &self.keypad)
            .field("framebuffer", &self.framebuffer)
            .finish()
    }
}
