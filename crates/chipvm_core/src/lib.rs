mod display;
mod error;
mod instruction;
mod keypad;
mod machine;
mod quirks;

pub use display::Display;
pub use error::{MachineError, Result};
pub use instruction::Instruction;
pub use keypad::Keypad;
pub use machine::{Machine, RegisterSnapshot, Step};
pub use quirks::{Quirks, SpriteEdge};

/// Logical screen width in pixels.
pub const SCREEN_WIDTH: usize = 64;
/// Logical screen height in pixels.
pub const SCREEN_HEIGHT: usize = 32;

pub const RAM_SIZE: usize = 4096;
pub const NUM_REGS: usize = 16;
pub const STACK_SIZE: usize = 16;
pub const NUM_KEYS: usize = 16;

/// Conventional load address for programs.
pub const START_ADDRESS: u16 = 0x200;

/// Rate at which the delay and sound timers count down.
pub const TIMER_HZ: u32 = 60;

/// Bytes per font glyph.
pub const GLYPH_SIZE: usize = 5;
pub const FONTSET_SIZE: usize = 80;

/// Hex digit glyphs 0-F, installed at address 0 on reset.
pub const FONTSET: [u8; FONTSET_SIZE] = [
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
