use std::io::{self, stdout, Stdout, Write};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyModifiers};
use crossterm::style::Print;
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute, queue, ErrorKind};

use chip8_vm::emulator::framebuffer::{Framebuffer, SCREEN_HEIGHT, SCREEN_SIZE, SCREEN_WIDTH};
use chip8_vm::emulator::input::{keymap, Control, EmulatorInput, Keypad, NUM_KEYS};
use chip8_vm::emulator::output::EmulatorOutput;

/// Terminals only report key presses, so a key counts as down for this long
/// after its last press or auto-repeat.
const KEY_TIMEOUT: Duration = Duration::from_millis(250);

fn to_io(err: ErrorKind) -> io::Error {
    match err {
        ErrorKind::IoError(err) => err,
        other => io::Error::new(io::ErrorKind::Other, other.to_string()),
    }
}

pub struct CrosstermInput {
    pressed: [Option<Instant>; NUM_KEYS],
}

impl CrosstermInput {
    pub fn new() -> CrosstermInput {
        CrosstermInput {
            pressed: [None; NUM_KEYS],
        }
    }
}

impl EmulatorInput for CrosstermInput {
    fn poll(&mut self, keypad: &mut Keypad) -> io::Result<Control> {
        // Drain everything that arrived since the last step
        while event::poll(Duration::from_millis(0)).map_err(to_io)? {
            let key_event = match event::read().map_err(to_io)? {
                Event::Key(key_event) => key_event,
                _ => continue,
            };
            match key_event.code {
                KeyCode::Esc => return Ok(Control::Quit),
                KeyCode::Char('c') if key_event.modifiers.contains(KeyModifiers::CONTROL) => {
                    return Ok(Control::Quit)
                }
                KeyCode::Char(c) => {
                    if let Some(key) = keymap(c) {
                        log::debug!("Key {:X} down", key);
                        self.pressed[key as usize] = Some(Instant::now());
                    }
                }
                _ => {}
            }
        }

        for (key, pressed) in self.pressed.iter_mut().enumerate() {
            let fresh = pressed.map_or(false, |at| at.elapsed() < KEY_TIMEOUT);
            if fresh {
                keypad.press(key as u8);
            } else {
                *pressed = None;
                keypad.release(key as u8);
            }
        }

        Ok(Control::Continue)
    }
}

/// Draws the screen inside a box, two terminal columns per pixel.
pub struct CrosstermOutput {
    stdout: Stdout,
    cells: [u8; SCREEN_SIZE],
}

impl CrosstermOutput {
    pub fn new() -> io::Result<CrosstermOutput> {
        let mut stdout = stdout();
        terminal::enable_raw_mode().map_err(to_io)?;
        execute!(stdout, EnterAlternateScreen, cursor::Hide, Clear(ClearType::All)).map_err(to_io)?;

        let bottom = SCREEN_HEIGHT as u16 + 1;
        let right = 2 * SCREEN_WIDTH as u16 + 1;
        for y in 0..=bottom {
            for x in 0..=right {
                let c = match (x, y) {
                    (0, 0) => '┏',
                    (x, 0) if x == right => '┓',
                    (0, y) if y == bottom => '┗',
                    (x, y) if x == right && y == bottom => '┛',
                    (_, y) if y == 0 || y == bottom => '━',
                    (x, _) if x == 0 || x == right => '┃',
                    _ => continue,
                };
                queue!(stdout, cursor::MoveTo(x, y), Print(c)).map_err(to_io)?;
            }
        }
        stdout.flush()?;

        Ok(CrosstermOutput {
            stdout,
            cells: [0; SCREEN_SIZE],
        })
    }
}

impl Drop for CrosstermOutput {
    fn drop(&mut self) {
        // Nothing sensible to do if the terminal can't be restored
        let _ = execute!(self.stdout, LeaveAlternateScreen, cursor::Show);
        let _ = terminal::disable_raw_mode();
    }
}

impl EmulatorOutput for CrosstermOutput {
    fn present(&mut self, frame: &Framebuffer) -> io::Result<()> {
        let stdout = &mut self.stdout;
        for (i, (&pixel, cell)) in frame.pixels().iter().zip(self.cells.iter_mut()).enumerate() {
            if *cell == pixel {
                continue;
            }
            *cell = pixel;
            let x = 2 * (i % SCREEN_WIDTH) as u16 + 1;
            let y = (i / SCREEN_WIDTH) as u16 + 1;
            queue!(
                stdout,
                cursor::MoveTo(x, y),
                Print(if pixel == 1 { "██" } else { "  " })
            )
            .map_err(to_io)?;
        }
        stdout.flush()
    }
}
