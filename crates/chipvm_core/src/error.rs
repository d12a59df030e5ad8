/// Fatal conditions raised by the interpreter.
///
/// None of these are transient: the instruction that produced one did not
/// complete, and the caller decides whether to halt, reset or report.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MachineError {
    #[error("program counter out of bounds: {pc:#06X}")]
    PcOutOfBounds { pc: u16 },

    #[error("memory access out of bounds at {address:#06X} (opcode {opcode:#06X})")]
    MemoryOutOfBounds { address: usize, opcode: u16 },

    #[error("stack overflow: call at {pc:#06X} with 16 return addresses pushed")]
    StackOverflow { pc: u16 },

    #[error("stack underflow: return at {pc:#06X} with an empty call stack")]
    StackUnderflow { pc: u16 },

    #[error("unimplemented instruction {opcode:#06X} at {pc:#06X}")]
    UnknownOpcode { opcode: u16, pc: u16 },

    #[error("program of {size} bytes does not fit at {start:#06X} ({max_size} bytes available)")]
    ProgramTooLarge {
        size: usize,
        start: u16,
        max_size: usize,
    },
}

pub type Result<T> = std::result::Result<T, MachineError>;
