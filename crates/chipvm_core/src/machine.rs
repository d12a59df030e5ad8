use std::fmt;
use std::ops::Range;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::display::Display;
use crate::error::{MachineError, Result};
use crate::instruction::Instruction;
use crate::keypad::Keypad;
use crate::quirks::Quirks;
use crate::{FONTSET, FONTSET_SIZE, GLYPH_SIZE, NUM_REGS, RAM_SIZE, STACK_SIZE, START_ADDRESS};


/// Outcome of a successful [`Machine::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Executed,
    /// `FX0A` found no key held. PC still points at the instruction, so the
    /// next step retries it.
    AwaitingKey { register: u8 },
}

pub struct Machine {
    /// program counter
    pc: u16,
    ram: [u8; RAM_SIZE],
    display: Display,
    /// V Registers
    v_reg: [u8; NUM_REGS],
    /// I Register
    i_reg: u16,
    stack_pointer: usize,
    stack: [u16; STACK_SIZE],
    keypad: Keypad,
    delay_timer: u8,
    sound_timer: u8,
    rng: StdRng,
    quirks: Quirks,
}

impl Default for Machine {
    fn default() -> Self {
        Self::new(Quirks::default())
    }
}

impl Machine {
    pub fn new(quirks: Quirks) -> Self {
        let mut machine = Self {
            pc: START_ADDRESS,
            ram: [0; RAM_SIZE],
            display: Display::default(),
            v_reg: [0; NUM_REGS],
            i_reg: 0,
            stack_pointer: 0,
            stack: [0; STACK_SIZE],
            keypad: Keypad::default(),
            delay_timer: 0,
            sound_timer: 0,
            rng: StdRng::from_entropy(),
            quirks,
        };
        machine.reset(START_ADDRESS);
        machine
    }

    /// Hard restart: everything zeroed, font installed, PC at `start`,
    /// random source reseeded.
    pub fn reset(&mut self, start: u16) {
        self.pc = start;
        self.ram = [0; RAM_SIZE];
        self.display.clear();
        self.v_reg = [0; NUM_REGS];
        self.i_reg = 0;
        self.stack_pointer = 0;
        self.stack = [0; STACK_SIZE];
        self.keypad.release_all();
        self.delay_timer = 0;
        self.sound_timer = 0;
        self.ram[..FONTSET_SIZE].copy_from_slice(&FONTSET);
        self.rng = StdRng::from_entropy();
        log::debug!("machine reset, pc={:#06X}", start);
    }

    /// Fix the random byte stream used by `CXNN`.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Copy `program` into memory at `start`. Nothing is written if it does
    /// not fit. PC and registers are left alone.
    pub fn load_program(&mut self, program: &[u8], start: u16) -> Result<()> {
        let begin = start as usize;
        let max_size = RAM_SIZE.saturating_sub(begin);
        if begin > RAM_SIZE || program.len() > max_size {
            return Err(MachineError::ProgramTooLarge {
                size: program.len(),
                start,
                max_size,
            });
        }
        self.ram[begin..begin + program.len()].copy_from_slice(program);
        log::debug!("loaded {} bytes at {:#06X}", program.len(), start);
        Ok(())
    }

    /// Fetch, decode and execute exactly one instruction.
    pub fn step(&mut self) -> Result<Step> {
        let pc = self.pc;
        let opcode = self.fetch_opcode()?;
        let instruction = Instruction::decode(opcode)
            .ok_or(MachineError::UnknownOpcode { opcode, pc })?;
        log::trace!("{:#06X}: {:04X} {}", pc, opcode, instruction);
        self.execute(instruction, opcode, pc)
    }

    pub fn tick_timers(&mut self) {
        self.delay_timer = self.delay_timer.saturating_sub(1);
        self.sound_timer = self.sound_timer.saturating_sub(1);
    }

    /// Indices outside 0..16 are ignored.
    pub fn set_key(&mut self, idx: usize, pressed: bool) {
        self.keypad.set(idx, pressed);
    }

    fn fetch_opcode(&mut self) -> Result<u16> {
        let pc = self.pc as usize;
        if pc + 1 >= RAM_SIZE {
            return Err(MachineError::PcOutOfBounds { pc: self.pc });
        }
        let opcode = u16::from_be_bytes([self.ram[pc], self.ram[pc + 1]]);
        self.pc += 2;
        Ok(opcode)
    }

    fn push(&mut self, val: u16, pc: u16) -> Result<()> {
        if self.stack_pointer >= STACK_SIZE {
            return Err(MachineError::StackOverflow { pc });
        }
        self.stack[self.stack_pointer] = val;
        self.stack_pointer += 1;
        Ok(())
    }

    fn pop(&mut self, pc: u16) -> Result<u16> {
        if self.stack_pointer == 0 {
            return Err(MachineError::StackUnderflow { pc });
        }
        self.stack_pointer -= 1;
        Ok(self.stack[self.stack_pointer])
    }

    /// `len` bytes starting at I, or the first out-of-range address.
    fn index_range(&self, len: usize, opcode: u16) -> Result<Range<usize>> {
        let start = self.i_reg as usize;
        let end = start + len;
        if end > RAM_SIZE {
            return Err(MachineError::MemoryOutOfBounds {
                address: start.max(RAM_SIZE),
                opcode,
            });
        }
        Ok(start..end)
    }

    fn skip_if(&mut self, condition: bool) {
        if condition {
            self.pc += 2;
        }
    }

    fn execute(&mut self, instruction: Instruction, opcode: u16, pc: u16) -> Result<Step> {
        match instruction {
            Instruction::Cls => self.display.clear(),
            Instruction::Ret => self.pc = self.pop(pc)?,
            Instruction::Sys(_) => {
                if !self.quirks.ignore_sys_calls {
                    return Err(MachineError::UnknownOpcode { opcode, pc });
                }
            }
            Instruction::Jump(addr) => self.pc = addr,
            Instruction::Call(addr) => {
                self.push(self.pc, pc)?;
                self.pc = addr;
            }
            Instruction::SkipEqImm { x, nn } => self.skip_if(self.v(x) == nn),
            Instruction::SkipNeImm { x, nn } => self.skip_if(self.v(x) != nn),
            Instruction::SkipEqReg { x, y } => self.skip_if(self.v(x) == self.v(y)),
            Instruction::SkipNeReg { x, y } => self.skip_if(self.v(x) != self.v(y)),
            Instruction::LoadImm { x, nn } => self.v_reg[x as usize] = nn,
            Instruction::AddImm { x, nn } => {
                self.v_reg[x as usize] = self.v(x).wrapping_add(nn);
            }
            Instruction::Move { x, y } => self.v_reg[x as usize] = self.v(y),
            Instruction::Or { x, y } => self.v_reg[x as usize] |= self.v(y),
            Instruction::And { x, y } => self.v_reg[x as usize] &= self.v(y),
            Instruction::Xor { x, y } => self.v_reg[x as usize] ^= self.v(y),
            Instruction::AddReg { x, y } => {
                let (val, carry) = self.v(x).overflowing_add(self.v(y));
                self.set_with_flag(x, val, carry);
            }
            Instruction::Sub { x, y } => {
                let (vx, vy) = (self.v(x), self.v(y));
                self.set_with_flag(x, vx.wrapping_sub(vy), vx > vy);
            }
            Instruction::ShiftRight { x, .. } => {
                let vx = self.v(x);
                self.set_with_flag(x, vx >> 1, vx & 0x1 == 1);
            }
            Instruction::SubReverse { x, y } => {
                let (vx, vy) = (self.v(x), self.v(y));
                self.set_with_flag(x, vy.wrapping_sub(vx), vy > vx);
            }
            Instruction::ShiftLeft { x, .. } => {
                let vx = self.v(x);
                self.set_with_flag(x, vx << 1, vx & 0x80 != 0);
            }
            Instruction::LoadIndex(addr) => self.i_reg = addr,
            Instruction::JumpV0(addr) => self.pc = addr + self.v(0) as u16,
            Instruction::Random { x, nn } => {
                let byte: u8 = self.rng.gen();
                self.v_reg[x as usize] = byte & nn;
            }
            Instruction::Draw { x, y, n } => self.draw(x, y, n, opcode)?,
            Instruction::SkipKeyDown { x } => self.skip_if(self.keypad.is_down(self.v(x))),
            Instruction::SkipKeyUp { x } => self.skip_if(!self.keypad.is_down(self.v(x))),
            Instruction::LoadDelay { x } => self.v_reg[x as usize] = self.delay_timer,
            Instruction::WaitKey { x } => match self.keypad.first_down() {
                Some(key) => self.v_reg[x as usize] = key,
                None => {
                    self.pc -= 2;
                    return Ok(Step::AwaitingKey { register: x });
                }
            },
            Instruction::SetDelay { x } => self.delay_timer = self.v(x),
            Instruction::SetSound { x } => self.sound_timer = self.v(x),
            Instruction::AddIndex { x } => {
                self.i_reg = self.i_reg.wrapping_add(self.v(x) as u16);
            }
            Instruction::LoadFont { x } => self.i_reg = self.v(x) as u16 * GLYPH_SIZE as u16,
            Instruction::StoreBcd { x } => {
                let val = self.v(x);
                let range = self.index_range(3, opcode)?;
                self.ram[range].copy_from_slice(&[val / 100, (val / 10) % 10, val % 10]);
            }
            Instruction::StoreRegs { x } => {
                let count = x as usize + 1;
                let range = self.index_range(count, opcode)?;
                self.ram[range].copy_from_slice(&self.v_reg[..count]);
            }
            Instruction::LoadRegs { x } => {
                let count = x as usize + 1;
                let range = self.index_range(count, opcode)?;
                self.v_reg[..count].copy_from_slice(&self.ram[range]);
            }
        }
        Ok(Step::Executed)
    }

    /// VF is written after VX so the flag survives when X is F.
    fn set_with_flag(&mut self, x: u8, val: u8, flag: bool) {
        self.v_reg[x as usize] = val;
        self.v_reg[0xF] = flag as u8;
    }

    fn draw(&mut self, x: u8, y: u8, height: u8, opcode: u16) -> Result<()> {
        let rows = self.index_range(height as usize, opcode)?;
        let (x, y) = (self.v(x) as usize, self.v(y) as usize);
        let collision = self
            .display
            .draw_sprite(x, y, &self.ram[rows], self.quirks.sprite_edge);
        self.v_reg[0xF] = collision as u8;
        Ok(())
    }

    pub fn v(&self, x: u8) -> u8 {
        self.v_reg[x as usize & 0xF]
    }

    pub fn registers(&self) -> &[u8; NUM_REGS] {
        &self.v_reg
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn index(&self) -> u16 {
        self.i_reg
    }

    pub fn stack_pointer(&self) -> usize {
        self.stack_pointer
    }

    /// Return addresses currently pushed, oldest first.
    pub fn stack(&self) -> &[u16] {
        &self.stack[..self.stack_pointer]
    }

    pub fn memory(&self) -> &[u8; RAM_SIZE] {
        &self.ram
    }

    pub fn display(&self) -> &Display {
        &self.display
    }

    pub fn delay_timer(&self) -> u8 {
        self.delay_timer
    }

    pub fn sound_timer(&self) -> u8 {
        self.sound_timer
    }

    /// Whether a tone should currently be playing.
    pub fn sound_active(&self) -> bool {
        self.sound_timer > 0
    }

    pub fn is_key_down(&self, key: u8) -> bool {
        self.keypad.is_down(key)
    }

    pub fn keypad(&self) -> &Keypad {
        &self.keypad
    }

    pub fn quirks(&self) -> Quirks {
        self.quirks
    }

    pub fn snapshot(&self) -> RegisterSnapshot {
        RegisterSnapshot {
            pc: self.pc,
            i: self.i_reg,
            sp: self.stack_pointer,
            v: self.v_reg,
            delay_timer: self.delay_timer,
            sound_timer: self.sound_timer,
        }
    }
}

/// Register file at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterSnapshot {
    pub pc: u16,
    pub i: u16,
    pub sp: usize,
    pub v: [u8; NUM_REGS],
    pub delay_timer: u8,
    pub sound_timer: u8,
}

impl fmt::Display for RegisterSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "PC: {:#06X} I: {:#06X} SP: {:#04X} DT: {:#04X} ST: {:#04X}",
            self.pc, self.i, self.sp, self.delay_timer, self.sound_timer
        )?;
        for (idx, val) in self.v.iter().enumerate() {
            if idx > 0 {
                f.write_str(" ")?;
            }
            write!(f, "V{:X}: {:#04X}", idx, val)?;
        }
        Ok(())
    }
}
