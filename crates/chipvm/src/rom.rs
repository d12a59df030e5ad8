use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use chipvm_core::RAM_SIZE;

#[derive(Debug, thiserror::Error)]
pub enum RomError {
    #[error("unable to read ROM '{}'", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("ROM size changed while reading: expected {expected} bytes, read {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("ROM is too large ({size} bytes), max size is {max_size} bytes")]
    TooLarge { size: usize, max_size: usize },
}

/// Largest program that fits in memory when loaded at `load_address`.
pub fn max_rom_size(load_address: u16) -> usize {
    RAM_SIZE.saturating_sub(load_address as usize)
}

/// Read a ROM image in one bounded read.
pub fn read_rom(path: &Path, load_address: u16) -> Result<Vec<u8>, RomError> {
    let unreadable = |source| RomError::Unreadable {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(unreadable)?;
    let expected = file.metadata().map_err(unreadable)?.len() as usize;
    let max_size = max_rom_size(load_address);
    if expected > max_size {
        return Err(RomError::TooLarge {
            size: expected,
            max_size,
        });
    }

    let data = read_sized(file, expected, max_size, unreadable)?;
    log::info!("read {} bytes from '{}'", data.len(), path.display());
    Ok(data)
}

/// Read at most `max_size + 1` bytes and require exactly `expected` of them.
/// The extra byte of headroom catches a source that grew since it was sized.
fn read_sized<R, F>(
    reader: R,
    expected: usize,
    max_size: usize,
    on_io: F,
) -> Result<Vec<u8>, RomError>
where
    R: Read,
    F: FnOnce(io::Error) -> RomError,
{
    let mut data = Vec::with_capacity(expected);
    reader
        .take(max_size as u64 + 1)
        .read_to_end(&mut data)
        .map_err(on_io)?;
    if data.len() != expected {
        return Err(RomError::SizeMismatch {
            expected,
            actual: data.len(),
        });
    }
    Ok(data)
}
