use std::io;

pub const NUM_KEYS: usize = 16;

/// The 16-key hexadecimal keypad, one down/up state per key.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Keypad {
    keys: [bool; NUM_KEYS],
}

impl Keypad {
    pub fn new() -> Keypad {
        Keypad::default()
    }

    /// Keys are indexed by their low nibble, so `0x1A` is key `A`.
    pub fn is_down(&self, key: u8) -> bool {
        self.keys[(key & 0xF) as usize]
    }

    pub fn press(&mut self, key: u8) {
        self.keys[(key & 0xF) as usize] = true;
    }

    pub fn release(&mut self, key: u8) {
        self.keys[(key & 0xF) as usize] = false;
    }

    pub fn release_all(&mut self) {
        self.keys = [false; NUM_KEYS];
    }

    /// The lowest-numbered key that is currently down.
    pub fn first_down(&self) -> Option<u8> {
        self.keys.iter().position(|&down| down).map(|key| key as u8)
    }
}

/// What the host wants the run loop to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Quit,
}

/// Represents an input device that updates the keypad between steps.
pub trait EmulatorInput {
    /// Bring `keypad` up to date with the host's key state.
    fn poll(&mut self, keypad: &mut Keypad) -> io::Result<Control>;
}

/// An input device that never provides any input
pub struct DummyInput;

impl EmulatorInput for DummyInput {
    fn poll(&mut self, _: &mut Keypad) -> io::Result<Control> {
        Ok(Control::Continue)
    }
}

/// Map a host keyboard character to a keypad key.
///
/// The hexadecimal keypad is laid out on the left four columns of a
/// QWERTY keyboard.
/// ```text
/// |1|2|3|C|      |1|2|3|4|
/// |4|5|6|D|  ->  |Q|W|E|R|
/// |7|8|9|E|  ->  |A|S|D|F|
/// |A|0|B|F|      |Z|X|C|V|
/// ```
pub fn keymap(c: char) -> Option<u8> {
    match c.to_ascii_lowercase() {
        'x' => Some(0x0),
        '1' => Some(0x1),
        '2' => Some(0x2),
        '3' => Some(0x3),
        'q' => Some(0x4),
        'w' => Some(0x5),
        'e' => Some(0x6),
        'a' => Some(0x7),
        's' => Some(0x8),
        'd' => Some(0x9),
        'z' => Some(0xA),
        'c' => Some(0xB),
        '4' => Some(0xC),
        'r' => Some(0xD),
        'f' => Some(0xE),
        'v' => Some(0xF),
        _ => None,
    }
}
