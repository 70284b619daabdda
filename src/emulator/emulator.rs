//! The CHIP-8 interpreter as described at https://en.wikipedia.org/wiki/CHIP-8#Virtual_machine_description.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::emulator::error::{EmulatorError, Result};
use crate::emulator::framebuffer::Framebuffer;
use crate::emulator::input::Keypad;
use crate::emulator::instruction::*;
use crate::emulator::machine::{Machine, FLAG, FONT_GLYPH_SIZE};
use crate::emulator::timer::TimerMode;

/// Where the program counter goes once an instruction is done.
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Next,
    Skip,
    Jump(u16),
    /// Blocked on input, run the same instruction again next step.
    Wait,
}

impl Flow {
    fn skip_if(condition: bool) -> Flow {
        if condition {
            Flow::Skip
        } else {
            Flow::Next
        }
    }
}

pub struct Emulator {
    machine: Machine,
    rng: StdRng,
    timer_mode: TimerMode,
}

impl Emulator {

    /// Create a new emulator with a randomly seeded `CXNN`.
    pub fn new() -> Emulator {
        Emulator::with_rng(StdRng::from_entropy())
    }

    /// Create a new emulator whose `CXNN` results are reproducible.
    pub fn with_seed(seed: u64) -> Emulator {
        Emulator::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Emulator {
        Emulator {
            machine: Machine::new(),
            rng,
            timer_mode: TimerMode::default(),
        }
    }

    /// Choose when the timers count down.
    pub fn with_timer_mode(mut self, timer_mode: TimerMode) -> Emulator {
        self.timer_mode = timer_mode;
        self
    }

    pub fn timer_mode(&self) -> TimerMode {
        self.timer_mode
    }

    /// Copy a program into memory at 0x200.
    pub fn load(&mut self, program: &[u8]) -> Result<()> {
        self.machine.load(program)
    }

    /// Throw away all state, including the loaded program.
    pub fn reset(&mut self) {
        self.machine.reset();
    }

    /// Perform a single step: fetch the instruction at PC, execute it and
    /// count the timers down.
    ///
    /// Returns `false` if the instruction is waiting for a key press, in which
    /// case nothing changed and the same instruction runs again next step.
    pub fn step(&mut self) -> Result<bool> {
        let pc = self.machine.program_counter;

        // Each opcode is two bytes
        let (left, right) = match self.machine.read(pc as usize, 2)? {
            [left, right] => (*left, *right),
            _ => return Err(EmulatorError::MemoryOutOfBounds { address: pc as usize }),
        };

        let instruction = Instruction::from_two_u8(left, right).map_err(|err| {
            log::error!("{} at {:#05x}", err, pc);
            err
        })?;

        log::trace!("{:#05x}: {:?}", pc, instruction);

        self.execute_single(instruction)
    }

    /// Execute a single instruction as if it had been fetched from PC.
    pub fn execute_single(&mut self, instruction: Instruction) -> Result<bool> {
        let pc = self.machine.program_counter;

        self.machine.program_counter = match self.execute(instruction)? {
            Flow::Next => pc.wrapping_add(2),
            Flow::Skip => pc.wrapping_add(4),
            Flow::Jump(addr) => addr,
            Flow::Wait => return Ok(false),
        };

        if self.timer_mode == TimerMode::PerInstruction {
            self.machine.timers.tick();
        }

        Ok(true)
    }

    /// Execute instructions in order, stopping at the first error.
    pub fn execute_many(&mut self, instructions: &[Instruction]) -> Result<()> {
        for instruction in instructions {
            self.execute_single(*instruction)?;
        }
        Ok(())
    }

    /// Count both timers down once. Used by hosts running the timers at 60 Hz.
    pub fn tick_timers(&mut self) {
        self.machine.timers.tick();
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    pub fn keypad_mut(&mut self) -> &mut Keypad {
        self.machine.keypad_mut()
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        self.machine.framebuffer()
    }

    pub fn framebuffer_mut(&mut self) -> &mut Framebuffer {
        self.machine.framebuffer_mut()
    }

    fn reg(&self, Reg(x): Reg) -> u8 {
        self.machine.registers[x as usize]
    }

    fn set_reg(&mut self, Reg(x): Reg, value: u8) {
        self.machine.registers[x as usize] = value;
    }

    /// Write the result first and the flag last, so VF always ends up
    /// holding the flag even when it is also the destination.
    fn set_reg_with_flag(&mut self, x: Reg, value: u8, flag: bool) {
        self.set_reg(x, value);
        self.machine.registers[FLAG] = flag as u8;
    }

    fn execute(&mut self, instruction: Instruction) -> Result<Flow> {
        let flow = match instruction {

            // Clear the screen
            Instruction::ClearScreen => {
                self.machine.framebuffer.clear();
                Flow::Next
            }

            // Return to the instruction after the call site stored on the stack.
            Instruction::Return => {
                let call_site = self.machine.pop()?;
                log::debug!("Return to {:#05x}", call_site);
                Flow::Jump(call_site.wrapping_add(2))
            }

            // Go to a specific memory address
            Instruction::Goto(Addr(addr)) => Flow::Jump(addr),

            // Store the current address on the stack, then jump to the specified address
            Instruction::Call(Addr(addr)) => {
                self.machine.push(self.machine.program_counter)?;
                log::debug!("Call {:#05x} from {:#05x}", addr, self.machine.program_counter);
                Flow::Jump(addr)
            }

            Instruction::IfRegEqConst(x, Const(n)) => Flow::skip_if(self.reg(x) == n),

            Instruction::IfRegNeqConst(x, Const(n)) => Flow::skip_if(self.reg(x) != n),

            Instruction::IfRegEqReg(x, y) => Flow::skip_if(self.reg(x) == self.reg(y)),

            Instruction::SetRegToConst(x, Const(n)) => {
                self.set_reg(x, n);
                Flow::Next
            }

            // Wraps around, VF is left alone
            Instruction::IncRegByConst(x, Const(n)) => {
                self.set_reg(x, self.reg(x).wrapping_add(n));
                Flow::Next
            }

            Instruction::SetRegToReg(x, y) => {
                self.set_reg(x, self.reg(y));
                Flow::Next
            }

            Instruction::BitwiseOr(x, y) => {
                self.set_reg(x, self.reg(x) | self.reg(y));
                Flow::Next
            }

            Instruction::BitwiseAnd(x, y) => {
                self.set_reg(x, self.reg(x) & self.reg(y));
                Flow::Next
            }

            Instruction::BitwiseXor(x, y) => {
                self.set_reg(x, self.reg(x) ^ self.reg(y));
                Flow::Next
            }

            // VF is 1 on carry
            Instruction::IncRegByReg(x, y) => {
                let (sum, carry) = self.reg(x).overflowing_add(self.reg(y));
                self.set_reg_with_flag(x, sum, carry);
                Flow::Next
            }

            // VF is 0 on borrow
            Instruction::DecRegByReg(x, y) => {
                let (difference, borrow) = self.reg(x).overflowing_sub(self.reg(y));
                self.set_reg_with_flag(x, difference, !borrow);
                Flow::Next
            }

            Instruction::BitshiftRight(x) => {
                let value = self.reg(x);
                self.set_reg_with_flag(x, value >> 1, value & 1 == 1);
                Flow::Next
            }

            Instruction::SetVxVyMinusVx(x, y) => {
                let (difference, borrow) = self.reg(y).overflowing_sub(self.reg(x));
                self.set_reg_with_flag(x, difference, !borrow);
                Flow::Next
            }

            Instruction::BitshiftLeft(x) => {
                let value = self.reg(x);
                self.set_reg_with_flag(x, value << 1, value >> 7 == 1);
                Flow::Next
            }

            Instruction::IfRegNeqReg(x, y) => Flow::skip_if(self.reg(x) != self.reg(y)),

            Instruction::SetI(Addr(addr)) => {
                self.machine.i = addr;
                Flow::Next
            }

            Instruction::SetPcToV0PlusAddr(Addr(addr)) => {
                Flow::Jump(addr + self.machine.registers[0] as u16)
            }

            Instruction::SetVxRand(x, Const(n)) => {
                let random: u8 = self.rng.gen();
                self.set_reg(x, random & n);
                Flow::Next
            }

            // XOR the sprite onto the screen, clipping at the edges.
            Instruction::Draw(x, y, Const(sprite_height)) => {

                // Get coordinates
                let x_coord = self.reg(x) as usize;
                let y_coord = self.reg(y) as usize;

                // Get sprite, each row is 8 bits
                let height = sprite_height as usize;
                let mut sprite = [0u8; 15];
                sprite[..height].copy_from_slice(self.machine.read(self.machine.i as usize, height)?);

                let framebuffer = &mut self.machine.framebuffer;
                let mut any_collisions = false;
                for (dy, row) in sprite[..height].iter().enumerate() {
                    for dx in 0..8 {
                        if (row >> (7 - dx)) & 1 == 1 {
                            any_collisions |= framebuffer.flip(x_coord + dx, y_coord + dy);
                        }
                    }
                }
                framebuffer.mark_dirty();

                // Set VF collision flag
                self.machine.registers[FLAG] = any_collisions as u8;
                Flow::Next
            }

            Instruction::IfKeyEqVx(x) => Flow::skip_if(self.machine.keypad.is_down(self.reg(x))),

            Instruction::IfKeyNeqVx(x) => Flow::skip_if(!self.machine.keypad.is_down(self.reg(x))),

            Instruction::SetRegToDelayTimer(x) => {
                self.set_reg(x, self.machine.timers.delay);
                Flow::Next
            }

            // Wait for a key press, taking the lowest key if several are down
            Instruction::SetRegToGetKey(x) => match self.machine.keypad.first_down() {
                Some(key) => {
                    self.set_reg(x, key);
                    Flow::Next
                }
                None => Flow::Wait,
            },

            Instruction::SetDelayTimerToReg(x) => {
                self.machine.timers.delay = self.reg(x);
                Flow::Next
            }

            Instruction::SetSoundTimerToReg(x) => {
                self.machine.timers.sound = self.reg(x);
                Flow::Next
            }

            // VF is 1 when I goes past the end of memory
            Instruction::AddRegToI(x) => {
                let i = self.machine.i.wrapping_add(self.reg(x) as u16);
                self.machine.i = i;
                self.machine.registers[FLAG] = (i > 0xFFF) as u8;
                Flow::Next
            }

            // Set i to character address. Each font element is 5 bytes wide.
            Instruction::SetIToSpriteAddrVx(x) => {
                self.machine.i = FONT_GLYPH_SIZE * self.reg(x) as u16;
                Flow::Next
            }

            Instruction::SetIToBcdOfReg(x) => {
                let value = self.reg(x);
                let digits = self.machine.write(self.machine.i as usize, 3)?;
                digits.copy_from_slice(&[value / 100, (value / 10) % 10, value % 10]);
                Flow::Next
            }

            // Dump register values up to Vx
            Instruction::RegDump(Reg(x)) => {
                let count = x as usize + 1;
                let registers = self.machine.registers;
                let destination = self.machine.write(self.machine.i as usize, count)?;
                destination.copy_from_slice(&registers[..count]);
                self.machine.i += count as u16;
                Flow::Next
            }

            // Load register values up to Vx
            Instruction::RegLoad(Reg(x)) => {
                let count = x as usize + 1;
                let mut values = [0u8; 16];
                values[..count].copy_from_slice(self.machine.read(self.machine.i as usize, count)?);
                self.machine.registers[..count].copy_from_slice(&values[..count]);
                self.machine.i += count as u16;
                Flow::Next
            }
        };

        Ok(flow)
    }
}

impl Default for Emulator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::emulator::framebuffer::SCREEN_WIDTH;
    use crate::emulator::machine::{FONT, PC_START, STACK_SIZE};
    use proptest::prelude::*;
    use test_case::test_case;

    fn with_program(program: &[u8]) -> Emulator {
        let mut emulator = Emulator::with_seed(0);
        emulator.load(program).unwrap();
        emulator
    }

    fn run(program: &[u8], steps: usize) -> Emulator {
        let mut emulator = with_program(program);
        for _ in 0..steps {
            assert!(emulator.step().unwrap());
        }
        emulator
    }

    /// The top-left 8 pixels of each of the first `rows` rows, packed like a sprite.
    fn sprite_at_origin(emulator: &Emulator, rows: usize) -> Vec<u8> {
        let pixels = emulator.framebuffer().pixels();
        (0..rows)
            .map(|y| (0..8).fold(0u8, |acc, x| (acc << 1) | pixels[x + y * SCREEN_WIDTH]))
            .collect()
    }

    #[test]
    fn goto_goes_to() {
        let mut emulator = Emulator::with_seed(0);
        emulator.execute_single(Instruction::Goto(Addr(0x250))).unwrap();
        assert_eq!(0x250, emulator.machine().program_counter());
    }

    #[test]
    fn return_after_call_is_neutral() {
        let mut emulator = with_program(&[
            0x22, 0x06, // 0x00, call 0x206
            0x00, 0x00, // 0x02
            0x00, 0x00, // 0x04
            0x00, 0xEE  // 0x06, return
        ]);
        assert_eq!(PC_START, emulator.machine().program_counter());

        emulator.step().unwrap(); // Call 0x206
        assert_eq!(0x206, emulator.machine().program_counter());
        assert_eq!(&[0x200], emulator.machine().stack());
        emulator.step().unwrap(); // Return to 202
        assert_eq!(0x202, emulator.machine().program_counter());
        assert_eq!(0, emulator.machine().stack_pointer());
    }

    #[test]
    fn call_does_not_fall_through_to_compare() {
        // V0 == 0x06 would make a 3XNN fall-through skip
        let mut emulator = with_program(&[0x22, 0x06]);
        emulator.machine.registers[0x2] = 0x06;
        emulator.step().unwrap();
        assert_eq!(0x206, emulator.machine().program_counter());
    }

    #[test]
    fn return_on_empty_stack_fails() {
        let mut emulator = with_program(&[0x00, 0xEE]);
        assert!(matches!(emulator.step(), Err(EmulatorError::StackUnderflow { address: 0x200 })));
        assert_eq!(PC_START, emulator.machine().program_counter());
    }

    #[test]
    fn call_on_full_stack_fails() {
        // Calls itself forever
        let mut emulator = with_program(&[0x22, 0x00]);
        for _ in 0..STACK_SIZE {
            emulator.step().unwrap();
        }
        assert!(matches!(emulator.step(), Err(EmulatorError::StackOverflow { address: 0x200 })));
        assert_eq!(STACK_SIZE, emulator.machine().stack_pointer());
        assert_eq!(PC_START, emulator.machine().program_counter());
    }

    #[test]
    fn clear_screen_clears_dirty_screen() {
        let mut emulator = with_program(&[0x00, 0xE0]);
        emulator.framebuffer_mut().flip(5, 5);
        assert!(emulator.framebuffer().is_dirty());
        emulator.framebuffer_mut().take_dirty();

        assert!(emulator.step().unwrap());

        assert!(emulator.framebuffer().pixels().iter().all(|&p| p == 0));
        assert!(emulator.framebuffer().is_dirty());
        assert_eq!(0x202, emulator.machine().program_counter());
    }

    #[test]
    fn add_const_wraps_without_flag() {
        let emulator = run(&[0x60, 0x0A, 0x70, 0xFF], 2);
        assert_eq!(9, emulator.machine().register(0));
        assert_eq!(0, emulator.machine().register(0xF));
    }

    #[test_case(&[0x60, 0x05, 0x30, 0x05] => 0x206 ; "3XNN equal skips")]
    #[test_case(&[0x60, 0x05, 0x30, 0x06] => 0x204 ; "3XNN unequal does not skip")]
    #[test_case(&[0x60, 0x05, 0x40, 0x06] => 0x206 ; "4XNN unequal skips")]
    #[test_case(&[0x60, 0x05, 0x40, 0x05] => 0x204 ; "4XNN equal does not skip")]
    #[test_case(&[0x60, 0x05, 0x61, 0x05, 0x50, 0x10] => 0x208 ; "5XY0 equal skips")]
    #[test_case(&[0x60, 0x05, 0x61, 0x06, 0x50, 0x10] => 0x206 ; "5XY0 unequal does not skip")]
    #[test_case(&[0x60, 0x05, 0x61, 0x06, 0x90, 0x10] => 0x208 ; "9XY0 unequal skips")]
    #[test_case(&[0x60, 0x05, 0x61, 0x05, 0x90, 0x10] => 0x206 ; "9XY0 equal does not skip")]
    fn skips(program: &[u8]) -> u16 {
        let emulator = run(program, program.len() / 2);
        emulator.machine().program_counter()
    }

    #[test_case(0x8011, 0b1100, 0b1010 => 0b1110 ; "or")]
    #[test_case(0x8012, 0b1100, 0b1010 => 0b1000 ; "and")]
    #[test_case(0x8013, 0b1100, 0b1010 => 0b0110 ; "xor")]
    #[test_case(0x8010, 0b1100, 0b1010 => 0b1010 ; "assign")]
    fn bitwise(opcode: u16, a: u8, b: u8) -> u8 {
        let mut emulator = Emulator::with_seed(0);
        emulator.machine.registers[0] = a;
        emulator.machine.registers[1] = b;
        emulator.execute_single(Instruction::from_u16(opcode).unwrap()).unwrap();
        emulator.machine().register(0)
    }

    proptest! {
        #[test]
        fn add_sets_carry(a in any::<u8>(), b in any::<u8>()) {
            let mut emulator = Emulator::with_seed(0);
            emulator.machine.registers[0xA] = a;
            emulator.machine.registers[0xB] = b;
            emulator.execute_single(Instruction::IncRegByReg(Reg(0xA), Reg(0xB))).unwrap();
            prop_assert_eq!(a.wrapping_add(b), emulator.machine().register(0xA));
            prop_assert_eq!((a as u16 + b as u16 > 255) as u8, emulator.machine().register(0xF));
        }

        #[test]
        fn sub_clears_flag_on_borrow(a in any::<u8>(), b in any::<u8>()) {
            let mut emulator = Emulator::with_seed(0);
            emulator.machine.registers[0xA] = a;
            emulator.machine.registers[0xB] = b;
            emulator.execute_single(Instruction::DecRegByReg(Reg(0xA), Reg(0xB))).unwrap();
            prop_assert_eq!(a.wrapping_sub(b), emulator.machine().register(0xA));
            prop_assert_eq!((a >= b) as u8, emulator.machine().register(0xF));
        }

        #[test]
        fn reverse_sub_clears_flag_on_borrow(a in any::<u8>(), b in any::<u8>()) {
            let mut emulator = Emulator::with_seed(0);
            emulator.machine.registers[0xA] = a;
            emulator.machine.registers[0xB] = b;
            emulator.execute_single(Instruction::SetVxVyMinusVx(Reg(0xA), Reg(0xB))).unwrap();
            prop_assert_eq!(b.wrapping_sub(a), emulator.machine().register(0xA));
            prop_assert_eq!((b >= a) as u8, emulator.machine().register(0xF));
        }

        #[test]
        fn bcd_digits_spell_the_value(value in any::<u8>()) {
            let mut emulator = Emulator::with_seed(0);
            emulator.machine.registers[3] = value;
            emulator.machine.i = 0x300;
            emulator.execute_single(Instruction::SetIToBcdOfReg(Reg(3))).unwrap();
            let digits = &emulator.machine().memory()[0x300..0x303];
            prop_assert!(digits.iter().all(|&d| d < 10));
            prop_assert_eq!(value as u16, digits[0] as u16 * 100 + digits[1] as u16 * 10 + digits[2] as u16);
        }

        #[test]
        fn dump_then_load_round_trips(values in any::<[u8; 16]>(), x in 0u8..16) {
            let mut emulator = Emulator::with_seed(0);
            emulator.machine.registers = values;
            emulator.machine.i = 0x400;
            emulator.execute_single(Instruction::RegDump(Reg(x))).unwrap();
            prop_assert_eq!(0x400 + x as u16 + 1, emulator.machine().i());

            emulator.machine.registers = [0; 16];
            emulator.machine.i = 0x400;
            emulator.execute_single(Instruction::RegLoad(Reg(x))).unwrap();
            prop_assert_eq!(&values[..=x as usize], &emulator.machine().registers()[..=x as usize]);
            prop_assert!(emulator.machine().registers()[x as usize + 1..].iter().all(|&v| v == 0));
            prop_assert_eq!(0x400 + x as u16 + 1, emulator.machine().i());
        }
    }

    #[test]
    fn flag_register_as_destination_keeps_the_flag() {
        let mut emulator = Emulator::with_seed(0);
        emulator.machine.registers[0xF] = 200;
        emulator.machine.registers[0xE] = 100;
        emulator.execute_single(Instruction::IncRegByReg(Reg(0xF), Reg(0xE))).unwrap();
        assert_eq!(1, emulator.machine().register(0xF));
    }

    #[test]
    fn shift_right_ignores_vy() {
        let mut emulator = Emulator::with_seed(0);
        emulator.machine.registers[0] = 0b0000_0101;
        emulator.machine.registers[1] = 0xFF;
        emulator.execute_single(Instruction::from_u16(0x8016).unwrap()).unwrap();
        assert_eq!(0b0000_0010, emulator.machine().register(0));
        assert_eq!(1, emulator.machine().register(0xF));
        assert_eq!(0xFF, emulator.machine().register(1));
    }

    #[test]
    fn shift_left_ignores_vy() {
        let mut emulator = Emulator::with_seed(0);
        emulator.machine.registers[0] = 0b0100_0001;
        emulator.machine.registers[1] = 0xFF;
        emulator.execute_single(Instruction::from_u16(0x801E).unwrap()).unwrap();
        assert_eq!(0b1000_0010, emulator.machine().register(0));
        assert_eq!(0, emulator.machine().register(0xF));
    }

    #[test]
    fn set_i_and_jump_with_offset() {
        let emulator = run(&[0xA1, 0x23, 0x60, 0x10, 0xB3, 0x00], 3);
        assert_eq!(0x123, emulator.machine().i());
        assert_eq!(0x310, emulator.machine().program_counter());
    }

    #[test]
    fn random_is_masked() {
        let mut emulator = Emulator::new();
        for _ in 0..32 {
            emulator.execute_single(Instruction::SetVxRand(Reg(4), Const(0x0F))).unwrap();
            assert!(emulator.machine().register(4) <= 0x0F);
        }
        emulator.execute_single(Instruction::SetVxRand(Reg(4), Const(0x00))).unwrap();
        assert_eq!(0, emulator.machine().register(4));
    }

    #[test]
    fn random_is_reproducible_with_seed() {
        let mut first = Emulator::with_seed(42);
        let mut second = Emulator::with_seed(42);
        for _ in 0..8 {
            first.execute_single(Instruction::SetVxRand(Reg(0), Const(0xFF))).unwrap();
            second.execute_single(Instruction::SetVxRand(Reg(0), Const(0xFF))).unwrap();
            assert_eq!(first.machine().register(0), second.machine().register(0));
        }
    }

    #[test]
    fn draws_font_glyph_at_origin() {
        let emulator = run(&[0xA0, 0x00, 0xD0, 0x05], 2);
        assert_eq!(FONT[..5].to_vec(), sprite_at_origin(&emulator, 5));
        assert_eq!(0, emulator.machine().register(0xF));
        assert!(emulator.framebuffer().is_dirty());
        let lit = emulator.framebuffer().pixels().iter().filter(|&&p| p == 1).count();
        assert_eq!(14, lit);
    }

    #[test]
    fn drawing_twice_erases_and_collides() {
        let emulator = run(&[0xA0, 0x00, 0xD0, 0x05, 0xD0, 0x05], 3);
        assert!(emulator.framebuffer().pixels().iter().all(|&p| p == 0));
        assert_eq!(1, emulator.machine().register(0xF));
    }

    #[test]
    fn clear_then_draw_leaves_only_sprite() {
        // Draw "1", clear, then draw "0"
        let mut emulator = with_program(&[
            0xA0, 0x05, 0xD0, 0x05,
            0x00, 0xE0,
            0xA0, 0x00, 0xD0, 0x05,
        ]);
        for _ in 0..5 {
            emulator.step().unwrap();
        }
        assert_eq!(FONT[..5].to_vec(), sprite_at_origin(&emulator, 5));
        assert_eq!(0, emulator.machine().register(0xF));
        let lit = emulator.framebuffer().pixels().iter().filter(|&&p| p == 1).count();
        assert_eq!(14, lit);
    }

    #[test]
    fn draw_clips_at_right_edge() {
        let mut emulator = with_program(&[0xD0, 0x11, 0xFF]);
        emulator.machine.registers[0] = 60;
        emulator.machine.registers[1] = 31;
        emulator.machine.i = 0x202;
        emulator.step().unwrap();
        let lit = emulator.framebuffer().pixels().iter().filter(|&&p| p == 1).count();
        assert_eq!(4, lit);
        assert_eq!(Some(1), emulator.framebuffer().get(63, 31));
    }

    #[test]
    fn draw_reading_past_memory_fails() {
        let mut emulator = with_program(&[0xD0, 0x05]);
        emulator.machine.i = 0xFFE;
        assert!(matches!(emulator.step(), Err(EmulatorError::MemoryOutOfBounds { .. })));
        assert!(!emulator.framebuffer().is_dirty());
        assert_eq!(PC_START, emulator.machine().program_counter());
    }

    #[test]
    fn key_skips() {
        let mut emulator = with_program(&[0xE0, 0x9E, 0x00, 0x00, 0xE0, 0xA1]);
        emulator.machine.registers[0] = 0x7;
        emulator.keypad_mut().press(0x7);
        emulator.step().unwrap();
        assert_eq!(0x204, emulator.machine().program_counter());

        emulator.keypad_mut().release(0x7);
        emulator.step().unwrap();
        assert_eq!(0x208, emulator.machine().program_counter());
    }

    #[test]
    fn get_key_blocks_until_pressed() {
        let mut emulator = with_program(&[0x6F, 0x05, 0xF3, 0x0A]);
        emulator.machine.timers.delay = 10;
        emulator.step().unwrap();
        assert_eq!(9, emulator.machine().timers().delay);

        assert_eq!(false, emulator.step().unwrap());
        assert_eq!(false, emulator.step().unwrap());
        assert_eq!(0x202, emulator.machine().program_counter());
        assert_eq!(9, emulator.machine().timers().delay);

        emulator.keypad_mut().press(0xB);
        emulator.keypad_mut().press(0x2);
        assert_eq!(true, emulator.step().unwrap());
        assert_eq!(0x2, emulator.machine().register(3));
        assert_eq!(0x204, emulator.machine().program_counter());
        assert_eq!(8, emulator.machine().timers().delay);
    }

    #[test]
    fn timers_count_down_after_each_instruction() {
        // V0 = 10, delay = V0, sound = V0, V1 = delay
        let emulator = run(&[0x60, 0x0A, 0xF0, 0x15, 0xF0, 0x18, 0xF1, 0x07], 4);
        let timers = emulator.machine().timers();
        assert_eq!(7, timers.delay);
        assert_eq!(8, timers.sound);
        assert_eq!(8, emulator.machine().register(1));
    }

    #[test]
    fn fixed_rate_timers_only_tick_on_request() {
        let mut emulator = Emulator::with_seed(0).with_timer_mode(TimerMode::Fixed60Hz);
        emulator.load(&[0x60, 0x0A, 0xF0, 0x15, 0x00, 0xE0]).unwrap();
        for _ in 0..3 {
            emulator.step().unwrap();
        }
        assert_eq!(10, emulator.machine().timers().delay);
        emulator.tick_timers();
        assert_eq!(9, emulator.machine().timers().delay);
    }

    #[test_case(0x0FFF, 1 => (0x1000, 1) ; "past the end")]
    #[test_case(0x0100, 1 => (0x0101, 0) ; "inside memory")]
    #[test_case(0x0FF0, 0x0F => (0x0FFF, 0) ; "exactly the last address")]
    fn add_to_i_flags_overflow(i: u16, value: u8) -> (u16, u8) {
        let mut emulator = Emulator::with_seed(0);
        emulator.machine.i = i;
        emulator.machine.registers[2] = value;
        emulator.execute_single(Instruction::AddRegToI(Reg(2))).unwrap();
        (emulator.machine().i(), emulator.machine().register(0xF))
    }

    #[test]
    fn sprite_address_points_at_glyph() {
        let emulator = run(&[0x6A, 0x0A, 0xFA, 0x29], 2);
        assert_eq!(50, emulator.machine().i());
        assert_eq!(0xF0, emulator.machine().memory()[50]);
    }

    #[test]
    fn bcd_of_157() {
        let emulator = run(&[0x65, 157, 0xA3, 0x00, 0xF5, 0x33], 3);
        assert_eq!(&[1, 5, 7], &emulator.machine().memory()[0x300..0x303]);
        assert_eq!(0x300, emulator.machine().i());
    }

    #[test]
    fn dump_into_font_fails() {
        let mut emulator = with_program(&[0xF2, 0x55]);
        assert!(matches!(emulator.step(), Err(EmulatorError::ReservedMemoryWrite { address: 0 })));
        assert_eq!(0, emulator.machine().i());
        assert_eq!(&FONT[..], &emulator.machine().memory()[..FONT.len()]);
    }

    #[test]
    fn unknown_opcode_halts_in_place() {
        let mut emulator = with_program(&[0x51, 0x21]);
        emulator.machine.timers.delay = 3;
        match emulator.step() {
            Err(EmulatorError::UnknownOpcode(0x5121)) => {}
            other => panic!("expected UnknownOpcode, got {:?}", other),
        }
        assert_eq!(PC_START, emulator.machine().program_counter());
        assert_eq!(3, emulator.machine().timers().delay);
    }

    #[test]
    fn fetch_past_memory_fails() {
        let mut emulator = with_program(&[0x1F, 0xFF]);
        emulator.step().unwrap();
        assert!(matches!(emulator.step(), Err(EmulatorError::MemoryOutOfBounds { .. })));
    }

    #[test]
    fn execute_many_runs_in_order() {
        let mut emulator = Emulator::with_seed(0);
        emulator.execute_many(&[
            Instruction::Goto(Addr(0x250)),
            Instruction::SetRegToConst(Reg(0xA), Const(35)),
            Instruction::SetRegToReg(Reg(0xB), Reg(0xA)),
        ]).unwrap();
        assert_eq!(35, emulator.machine().register(0xB));
        assert_eq!(0x254, emulator.machine().program_counter());
    }
}
