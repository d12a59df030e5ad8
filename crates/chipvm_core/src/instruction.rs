use std::fmt;

/// A decoded instruction word.
///
/// `x` and `y` are register indices (0..16), `nn` an immediate byte, `addr`
/// a 12-bit address and `n` a sprite height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// 00E0
    Cls,
    /// 00EE
    Ret,
    /// 0NNN, any other group 0 word
    Sys(u16),
    /// 1NNN
    Jump(u16),
    /// 2NNN
    Call(u16),
    /// 3XNN
    SkipEqImm { x: u8, nn: u8 },
    /// 4XNN
    SkipNeImm { x: u8, nn: u8 },
    /// 5XY0
    SkipEqReg { x: u8, y: u8 },
    /// 6XNN
    LoadImm { x: u8, nn: u8 },
    /// 7XNN
    AddImm { x: u8, nn: u8 },
    /// 8XY0
    Move { x: u8, y: u8 },
    /// 8XY1
    Or { x: u8, y: u8 },
    /// 8XY2
    And { x: u8, y: u8 },
    /// 8XY3
    Xor { x: u8, y: u8 },
    /// 8XY4
    AddReg { x: u8, y: u8 },
    /// 8XY5
    Sub { x: u8, y: u8 },
    /// 8XY6
    ShiftRight { x: u8, y: u8 },
    /// 8XY7
    SubReverse { x: u8, y: u8 },
    /// 8XYE
    ShiftLeft { x: u8, y: u8 },
    /// 9XY0
    SkipNeReg { x: u8, y: u8 },
    /// ANNN
    LoadIndex(u16),
    /// BNNN
    JumpV0(u16),
    /// CXNN
    Random { x: u8, nn: u8 },
    /// DXYN
    Draw { x: u8, y: u8, n: u8 },
    /// EX9E
    SkipKeyDown { x: u8 },
    /// EXA1
    SkipKeyUp { x: u8 },
    /// FX07
    LoadDelay { x: u8 },
    /// FX0A
    WaitKey { x: u8 },
    /// FX15
    SetDelay { x: u8 },
    /// FX18
    SetSound { x: u8 },
    /// FX1E
    AddIndex { x: u8 },
    /// FX29
    LoadFont { x: u8 },
    /// FX33
    StoreBcd { x: u8 },
    /// FX55
    StoreRegs { x: u8 },
    /// FX65
    LoadRegs { x: u8 },
}

impl Instruction {
    /// Decode a raw word. Returns `None` for words no instruction matches.
    ///
    /// Group 0 checks the two literal words before falling back to `Sys`;
    /// groups 8, E and F select on N, NN and NN respectively.
    pub fn decode(op: u16) -> Option<Instruction> {
        let group = (op & 0xF000) >> 12;
        let x = ((op & 0x0F00) >> 8) as u8;
        let y = ((op & 0x00F0) >> 4) as u8;
        let n = (op & 0x000F) as u8;
        let nn = (op & 0x00FF) as u8;
        let addr = op & 0x0FFF;

        let instruction = match group {
            0x0 => match op {
                0x00E0 => Instruction::Cls,
                0x00EE => Instruction::Ret,
                _ => Instruction::Sys(addr),
            },
            0x1 => Instruction::Jump(addr),
            0x2 => Instruction::Call(addr),
            0x3 => Instruction::SkipEqImm { x, nn },
            0x4 => Instruction::SkipNeImm { x, nn },
            0x5 if n == 0 => Instruction::SkipEqReg { x, y },
            0x6 => Instruction::LoadImm { x, nn },
            0x7 => Instruction::AddImm { x, nn },
            0x8 => match n {
                0x0 => Instruction::Move { x, y },
                0x1 => Instruction::Or { x, y },
                0x2 => Instruction::And { x, y },
                0x3 => Instruction::Xor { x, y },
                0x4 => Instruction::AddReg { x, y },
                0x5 => Instruction::Sub { x, y },
                0x6 => Instruction::ShiftRight { x, y },
                0x7 => Instruction::SubReverse { x, y },
                0xE => Instruction::ShiftLeft { x, y },
                _ => return None,
            },
            0x9 if n == 0 => Instruction::SkipNeReg { x, y },
            0xA => Instruction::LoadIndex(addr),
            0xB => Instruction::JumpV0(addr),
            0xC => Instruction::Random { x, nn },
            0xD => Instruction::Draw { x, y, n },
            0xE => match nn {
                0x9E => Instruction::SkipKeyDown { x },
                0xA1 => Instruction::SkipKeyUp { x },
                _ => return None,
            },
            0xF => match nn {
                0x07 => Instruction::LoadDelay { x },
                0x0A => Instruction::WaitKey { x },
                0x15 => Instruction::SetDelay { x },
                0x18 => Instruction::SetSound { x },
                0x1E => Instruction::AddIndex { x },
                0x29 => Instruction::LoadFont { x },
                0x33 => Instruction::StoreBcd { x },
                0x55 => Instruction::StoreRegs { x },
                0x65 => Instruction::LoadRegs { x },
                _ => return None,
            },
            _ => return None,
        };
        Some(instruction)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Instruction::Cls => write!(f, "CLS"),
            Instruction::Ret => write!(f, "RET"),
            Instruction::Sys(addr) => write!(f, "SYS {:#05X}", addr),
            Instruction::Jump(addr) => write!(f, "JP {:#05X}", addr),
            Instruction::Call(addr) => write!(f, "CALL {:#05X}", addr),
            Instruction::SkipEqImm { x, nn } => write!(f, "SE V{:X}, {:#04X}", x, nn),
            Instruction::SkipNeImm { x, nn } => write!(f, "SNE V{:X}, {:#04X}", x, nn),
            Instruction::SkipEqReg { x, y } => write!(f, "SE V{:X}, V{:X}", x, y),
            Instruction::LoadImm { x, nn } => write!(f, "LD V{:X}, {:#04X}", x, nn),
            Instruction::AddImm { x, nn } => write!(f, "ADD V{:X}, {:#04X}", x, nn),
            Instruction::Move { x, y } => write!(f, "LD V{:X}, V{:X}", x, y),
            Instruction::Or { x, y } => write!(f, "OR V{:X}, V{:X}", x, y),
            Instruction::And { x, y } => write!(f, "AND V{:X}, V{:X}", x, y),
            Instruction::Xor { x, y } => write!(f, "XOR V{:X}, V{:X}", x, y),
            Instruction::AddReg { x, y } => write!(f, "ADD V{:X}, V{:X}", x, y),
            Instruction::Sub { x, y } => write!(f, "SUB V{:X}, V{:X}", x, y),
            Instruction::ShiftRight { x, y } => write!(f, "SHR V{:X}, V{:X}", x, y),
            Instruction::SubReverse { x, y } => write!(f, "SUBN V{:X}, V{:X}", x, y),
            Instruction::ShiftLeft { x, y } => write!(f, "SHL V{:X}, V{:X}", x, y),
            Instruction::SkipNeReg { x, y } => write!(f, "SNE V{:X}, V{:X}", x, y),
            Instruction::LoadIndex(addr) => write!(f, "LD I, {:#05X}", addr),
            Instruction::JumpV0(addr) => write!(f, "JP V0, {:#05X}", addr),
            Instruction::Random { x, nn } => write!(f, "RND V{:X}, {:#04X}", x, nn),
            Instruction::Draw { x, y, n } => write!(f, "DRW V{:X}, V{:X}, {}", x, y, n),
            Instruction::SkipKeyDown { x } => write!(f, "SKP V{:X}", x),
            Instruction::SkipKeyUp { x } => write!(f, "SKNP V{:X}", x),
            Instruction::LoadDelay { x } => write!(f, "LD V{:X}, DT", x),
            Instruction::WaitKey { x } => write!(f, "LD V{:X}, K", x),
            Instruction::SetDelay { x } => write!(f, "LD DT, V{:X}", x),
            Instruction::SetSound { x } => write!(f, "LD ST, V{:X}", x),
            Instruction::AddIndex { x } => write!(f, "ADD I, V{:X}", x),
            Instruction::LoadFont { x } => write!(f, "LD F, V{:X}", x),
            Instruction::StoreBcd { x } => write!(f, "LD B, V{:X}", x),
            Instruction::StoreRegs { x } => write!(f, "LD [I], V{:X}", x),
            Instruction::LoadRegs { x } => write!(f, "LD V{:X}, [I]", x),
        }
    }
}
