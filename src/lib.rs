/*!

A CHIP-8 interpreter as specified at https://en.wikipedia.org/wiki/CHIP-8.

# Terminal Frontend

If you want to try the interpreter on some programs, there is a ready-to-use frontend
you can run by using `cargo run --release -- <program>`.
The hexadecimal keypad is mapped to the keys 1-4, q-r, a-f and z-v. Press escape to quit.
Run with `--help` to see how to change the speed, the timer mode or to run without a terminal.

# Library

The main way of running a program is to load it as bytes, then step through it.
Every step executes one instruction and returns whether it completed.

```rust
use chip8_vm::emulator::Emulator;

let mut emulator = Emulator::new();

// Load a program at address 0x200.
let clear_display = [0x00, 0xE0];
emulator.load(&clear_display).unwrap();
assert!(emulator.step().unwrap()); // Will now clear the display
assert!(emulator.framebuffer().is_dirty());
```

Alternatively, you can experiment by executing instructions manually.

```rust
use chip8_vm::emulator::Emulator;
use chip8_vm::emulator::instruction::{Instruction, Reg, Const, Addr};

let mut emulator = Emulator::with_seed(7);

// Execute instructions manually
emulator.execute_single(Instruction::ClearScreen).unwrap();

// Or many sequentially
emulator.execute_many(&[
    Instruction::Goto(Addr(0x250)),
    Instruction::SetRegToConst(Reg(0xA), Const(35)),
    Instruction::SetRegToReg(Reg(0xB), Reg(0xA))
]).unwrap();
assert_eq!(emulator.machine().register(0xB), 35);
```

## Waiting for keys

`FX0A` doesn't block the thread. The step returns `false` instead, and the host is
expected to update the keypad and step again.

```rust
use chip8_vm::emulator::Emulator;

let mut emulator = Emulator::new();
emulator.load(&[0xF0, 0x0A]).unwrap();

assert!(!emulator.step().unwrap());
emulator.keypad_mut().press(0xA);
assert!(emulator.step().unwrap());
assert_eq!(emulator.machine().register(0), 0xA);
```

## Custom input and output

To drive the interpreter from a real host, implement `EmulatorInput` and `EmulatorOutput`,
which represent somewhere to get key presses from and a screen respectively.
Take a look at `src/emulator/input.rs` and `src/emulator/output.rs` to see how to implement this,
then hand them to a `Runner`.

```ignore
use chip8_vm::emulator::{Emulator, runner::{Config, Runner}};

let mut runner = Runner::new(Emulator::new(), MyInput::new(), MyOutput::new(), Config::default());
runner.run()?;
```
*/

pub mod emulator;
pub mod util;
