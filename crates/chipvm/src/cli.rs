use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use chipvm_core::{Quirks, SpriteEdge, START_ADDRESS};

use crate::driver::DriverConfig;

pub const USAGE: &str = "\
usage:
  chipvm run <rom> [--ips N] [--load-address ADDR] [--frames N] [--scale N]
                   [--seed N] [--wrap-sprites] [--ignore-sys] [--unpaced]
  chipvm disasm <rom> [--load-address ADDR]

numbers may be decimal or 0x-prefixed hex";

#[derive(Debug, Clone)]
pub enum Command {
    Run { rom: PathBuf, config: DriverConfig },
    Disasm { rom: PathBuf, load_address: u16 },
}

pub fn parse_args<I>(args: I) -> Result<Command>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let command = args.next().ok_or_else(|| anyhow!("missing command"))?;
    let rom = args
        .next()
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("missing ROM path"))?;

    let mut ips = None;
    let mut load_address = START_ADDRESS;
    let mut frames = None;
    let mut scale = 1;
    let mut seed = None;
    let mut sprite_edge = SpriteEdge::Clip;
    let mut ignore_sys_calls = false;
    let mut paced = true;

    while let Some(flag) = args.next() {
        let mut value = || {
            args.next()
                .ok_or_else(|| anyhow!("missing value for '{}'", flag))
        };
        match flag.as_str() {
            "--ips" => ips = Some(parse_u32(&value()?)?),
            "--load-address" => {
                let addr = parse_number(&value()?)?;
                load_address = u16::try_from(addr)
                    .ok()
                    .filter(|&a| (a as usize) < chipvm_core::RAM_SIZE)
                    .ok_or_else(|| anyhow!("load address {:#X} is outside memory", addr))?;
            }
            "--frames" => frames = Some(parse_number(&value()?)?),
            "--scale" => scale = parse_u32(&value()?)?.max(1),
            "--seed" => seed = Some(parse_number(&value()?)?),
            "--wrap-sprites" => sprite_edge = SpriteEdge::Wrap,
            "--ignore-sys" => ignore_sys_calls = true,
            "--unpaced" => paced = false,
            other => bail!("unknown option '{}'", other),
        }
    }

    match command.as_str() {
        "run" => {
            let quirks = Quirks::builder()
                .sprite_edge(sprite_edge)
                .ignore_sys_calls(ignore_sys_calls)
                .build();
            let mut config = DriverConfig::builder()
                .load_address(load_address)
                .scale(scale)
                .paced(paced)
                .quirks(quirks)
                .build();
            config.max_frames = frames;
            config.seed = seed;
            if let Some(ips) = ips {
                config.instructions_per_second = ips;
            }
            Ok(Command::Run { rom, config })
        }
        "disasm" => Ok(Command::Disasm { rom, load_address }),
        other => bail!("unknown command '{}'", other),
    }
}

/// Decimal, or hex with a `0x` prefix.
pub fn parse_number(text: &str) -> Result<u64> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.with_context(|| format!("invalid number '{}'", text))
}

fn parse_u32(text: &str) -> Result<u32> {
    let number = parse_number(text)?;
    u32::try_from(number)
        .map_err(|_| anyhow!("{} is too large, the limit is {}", number, u32::MAX))
}
