//! Backing store access for the HWID EEPROM
//!
//! The codec only needs block reads, block writes and a blocking delay. Two
//! backends are provided:
//!
//! - [`FileEeprom`]: the Linux `at24` sysfs node of a real part, or any image
//!   file standing in for one
//! - [`MemoryEeprom`]: a RAM-backed part for simulation and tests

use bytes::Bytes;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, trace};

use crate::constants::DEFAULT_EEPROM_ADDRESS;
use crate::error::IoError;

// errno values the at24 driver returns when the part does not ACK
const ENXIO: i32 = 6;
const ENODEV: i32 = 19;

/// Byte-addressable EEPROM reached over I2C.
pub trait Eeprom {
    /// Read `len` bytes starting at `offset` from the part at `address`.
    fn read_block(&mut self, address: u8, offset: u32, len: usize) -> Result<Bytes, IoError>;

    /// Write `data` starting at `offset`. The caller keeps each call within
    /// one write page and waits for the write cycle afterwards.
    fn write_block(&mut self, address: u8, offset: u32, data: &[u8]) -> Result<(), IoError>;
}

impl<E: Eeprom + ?Sized> Eeprom for &mut E {
    fn read_block(&mut self, address: u8, offset: u32, len: usize) -> Result<Bytes, IoError> {
        (**self).read_block(address, offset, len)
    }

    fn write_block(&mut self, address: u8, offset: u32, data: &[u8]) -> Result<(), IoError> {
        (**self).write_block(address, offset, data)
    }
}

/// Blocking wait primitive.
pub trait Delay {
    fn delay_ms(&mut self, ms: u32);
}

impl<D: Delay + ?Sized> Delay for &mut D {
    fn delay_ms(&mut self, ms: u32) {
        (**self).delay_ms(ms)
    }
}

/// Delay backed by `std::thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdDelay;

impl Delay for StdDelay {
    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}

/// EEPROM held in memory. Reads past the end fail like a bus error would.
#[derive(Debug, Clone)]
pub struct MemoryEeprom {
    address: u8,
    data: Vec<u8>,
}

impl MemoryEeprom {
    /// A blank (all 0xFF) part of `capacity` bytes answering at `address`.
    pub fn new(address: u8, capacity: usize) -> Self {
        Self {
            address,
            data: vec![0xFF; capacity],
        }
    }

    /// A part preloaded with `contents`.
    pub fn with_contents(address: u8, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            address,
            data: contents.into(),
        }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn contents(&self) -> &[u8] {
        &self.data
    }

    pub fn contents_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    fn range(&self, address: u8, offset: u32, len: usize) -> Result<Range<usize>, IoError> {
        if address != self.address {
            return Err(IoError::NoDevice { address });
        }
        let capacity = self.data.len();
        let start = offset as usize;
        let end = start
            .checked_add(len)
            .filter(|&end| end <= capacity)
            .ok_or_else(|| IoError::Transfer {
                offset,
                source: io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("{} bytes at {:#06x} exceed the {} byte part", len, offset, capacity),
                ),
            })?;
        Ok(start..end)
    }
}

impl Default for MemoryEeprom {
    /// A 4 KiB part at the HWID EEPROM address.
    fn default() -> Self {
        Self::new(DEFAULT_EEPROM_ADDRESS, 4096)
    }
}

impl Eeprom for MemoryEeprom {
    fn read_block(&mut self, address: u8, offset: u32, len: usize) -> Result<Bytes, IoError> {
        let range = self.range(address, offset, len)?;
        trace!("mem read {} bytes at {:#06x}", len, offset);
        Ok(Bytes::copy_from_slice(&self.data[range]))
    }

    fn write_block(&mut self, address: u8, offset: u32, data: &[u8]) -> Result<(), IoError> {
        let range = self.range(address, offset, data.len())?;
        trace!("mem write {} bytes at {:#06x}", data.len(), offset);
        self.data[range].copy_from_slice(data);
        Ok(())
    }
}

/// EEPROM exposed as a file, usually `/sys/bus/i2c/devices/<bus>-<addr>/eeprom`.
///
/// The file is opened per transfer so that a missing part shows up as
/// [`IoError::NoDevice`] on the first access rather than at construction.
#[derive(Debug, Clone)]
pub struct FileEeprom {
    path: PathBuf,
    address: u8,
}

impl FileEeprom {
    pub fn new(path: impl Into<PathBuf>, address: u8) -> Self {
        Self {
            path: path.into(),
            address,
        }
    }

    /// The at24 sysfs node for `address` on `bus`.
    pub fn sysfs(bus: u8, address: u8) -> Self {
        Self::new(sysfs_path(bus, address), address)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self, address: u8, offset: u32, write: bool) -> Result<File, IoError> {
        if address != self.address {
            return Err(IoError::NoDevice { address });
        }
        let mut file = OpenOptions::new()
            .read(true)
            .write(write)
            .open(&self.path)
            .map_err(|e| self.map_err(offset, e))?;
        file.seek(SeekFrom::Start(u64::from(offset)))
            .map_err(|e| self.map_err(offset, e))?;
        Ok(file)
    }

    fn map_err(&self, offset: u32, source: io::Error) -> IoError {
        let absent = source.kind() == io::ErrorKind::NotFound
            || matches!(source.raw_os_error(), Some(ENXIO) | Some(ENODEV));
        if absent {
            debug!("{} not reachable: {}", self.path.display(), source);
            IoError::NoDevice { address: self.address }
        } else {
            IoError::Transfer { offset, source }
        }
    }
}

impl Eeprom for FileEeprom {
    fn read_block(&mut self, address: u8, offset: u32, len: usize) -> Result<Bytes, IoError> {
        let mut file = self.open(address, offset, false)?;
        let mut buf = vec![0u8; len];
        file.read_exact(&mut buf).map_err(|e| self.map_err(offset, e))?;
        trace!("read {} bytes at {:#06x} from {}", len, offset, self.path.display());
        Ok(Bytes::from(buf))
    }

    fn write_block(&mut self, address: u8, offset: u32, data: &[u8]) -> Result<(), IoError> {
        let mut file = self.open(address, offset, true)?;
        file.write_all(data).map_err(|e| self.map_err(offset, e))?;
        file.flush().map_err(|e| self.map_err(offset, e))?;
        trace!("wrote {} bytes at {:#06x} to {}", data.len(), offset, self.path.display());
        Ok(())
    }
}

/// Path of the at24 sysfs node, e.g. `/sys/bus/i2c/devices/1-0050/eeprom`.
pub fn sysfs_path(bus: u8, address: u8) -> PathBuf {
    PathBuf::from(format!("/sys/bus/i2c/devices/{}-{:04x}/eeprom", bus, address))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sysfs_path() {
        assert_eq!(
            sysfs_path(1, 0x50),
            PathBuf::from("/sys/bus/i2c/devices/1-0050/eeprom")
        );
    }

    #[test]
    fn test_sysfs_eeprom() {
        let eeprom = FileEeprom::sysfs(2, 0x57);
        assert_eq!(eeprom.path(), Path::new("/sys/bus/i2c/devices/2-0057/eeprom"));
    }

    #[test]
    fn test_memory_eeprom_is_erased() {
        let mut mem = MemoryEeprom::new(0x50, 128);
        let block = mem.read_block(0x50, 0, 16).unwrap();
        assert!(block.iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_memory_eeprom_wrong_address_is_absent() {
        let mut mem = MemoryEeprom::new(0x50, 128);
        assert_eq!(mem.address(), 0x50);
        assert!(matches!(
            mem.read_block(0x51, 0, 1),
            Err(IoError::NoDevice { address: 0x51 })
        ));
    }

    #[test]
    fn test_memory_eeprom_out_of_range() {
        let mut mem = MemoryEeprom::new(0x50, 64);
        assert!(matches!(
            mem.write_block(0x50, 60, &[0u8; 8]),
            Err(IoError::Transfer { offset: 60, .. })
        ));
        assert!(mem.contents().iter().all(|&b| b == 0xFF));
    }
}
