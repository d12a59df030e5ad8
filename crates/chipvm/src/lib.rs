pub mod cli;
pub mod driver;
pub mod frontend;
pub mod rom;

use std::path::Path;

use anyhow::{Context, Result};
use chipvm_core::Instruction;

use crate::cli::Command;
use crate::driver::{Driver, DriverConfig, RunSummary};
use crate::frontend::HeadlessFrontend;

pub fn run(command: Command) -> Result<()> {
    match command {
        Command::Run { rom, config } => {
            let scale = config.scale as usize;
            let mut frontend = HeadlessFrontend::new(scale);
            let summary = run_rom(&rom, config, &mut frontend)?;
            log::info!(
                "stopped after {} frames, {} instructions",
                summary.frames,
                summary.steps
            );
            if let Some(frame) = frontend.last_frame() {
                print!("{}", frame);
            }
        }
        Command::Disasm { rom, load_address } => {
            let data = crate::rom::read_rom(&rom, load_address)?;
            print!("{}", disassemble(&data, load_address));
        }
    }
    Ok(())
}

pub fn run_rom(
    path: &Path,
    config: DriverConfig,
    frontend: &mut HeadlessFrontend,
) -> Result<RunSummary> {
    let data = rom::read_rom(path, config.load_address)
        .with_context(|| format!("failed to load '{}'", path.display()))?;
    let mut driver = Driver::new(config);
    driver.load(&data)?;
    log::info!("playing ROM '{}'", path.display());
    driver.run(frontend)
}

/// One line per instruction word: address, raw word and mnemonic.
pub fn disassemble(program: &[u8], load_address: u16) -> String {
    let mut out = String::new();
    for (idx, chunk) in program.chunks(2).enumerate() {
        let addr = load_address as usize + idx * 2;
        // An odd trailing byte is padded with zero.
        let word = u16::from_be_bytes([chunk[0], chunk.get(1).copied().unwrap_or(0)]);
        let text = match Instruction::decode(word) {
            Some(instruction) => instruction.to_string(),
            None => "???".to_string(),
        };
        out.push_str(&format!("{:03X}: {:04X}  {}\n", addr, word, text));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disassembly_lists_each_word() {
        let listing = disassemble(&[0x60, 0x05, 0x80, 0x14, 0xFF, 0xFF, 0x12], 0x200);
        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(
            lines,
            vec![
                "200: 6005  LD V0, 0x05",
                "202: 8014  ADD V0, V1",
                "204: FFFF  ???",
                "206: 1200  JP 0x200",
            ]
        );
    }

    #[test]
    fn runs_a_rom_file_headless() {
        let path = std::env::temp_dir().join(format!("chipvm-lib-{}.ch8", std::process::id()));
        // Draw the "0" glyph at (0, 0), then spin.
        std::fs::write(&path, [0xF0, 0x29, 0xD0, 0x05, 0x12, 0x04]).unwrap();
        let config = DriverConfig::builder().paced(false).max_frames(2).build();
        let mut frontend = HeadlessFrontend::new(1);
        let summary = run_rom(&path, config, &mut frontend).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(summary.frames, 2);
        assert_eq!(frontend.frames(), 2);
        let frame = frontend.last_frame().unwrap();
        assert!(frame.starts_with("####...."));
        assert!(frame.lines().nth(1).unwrap().starts_with("#..#...."));
    }
}
