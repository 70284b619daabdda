/// A structure for easily picking apart an opcode,
/// either as four nibbles or as the trailing
/// 8-bit and 12-bit operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeBits(u16);

impl OpcodeBits {

    pub fn from_u16(value: u16) -> OpcodeBits {
        OpcodeBits(value)
    }

    /// Opcodes are stored big-endian, so the first byte in memory
    /// is the most significant one.
    pub fn from_two_u8(left: u8, right: u8) -> OpcodeBits {
        OpcodeBits(((left as u16) << 8) | right as u16)
    }

    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// The four nibbles, most significant first.
    pub fn as_four_u8(&self) -> (u8, u8, u8, u8) {
        let nibble = |shift: u16| ((self.0 >> shift) & 0xF) as u8;
        (nibble(12), nibble(8), nibble(4), nibble(0))
    }

    /// The NN operand.
    pub fn last_8_bits(&self) -> u8 {
        (self.0 & 0x00FF) as u8
    }

    /// The NNN operand.
    pub fn last_12_bits(&self) -> u16 {
        self.0 & 0x0FFF
    }
}
