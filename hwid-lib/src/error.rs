use std::io;
use strum_macros::Display;
use thiserror::Error;

use crate::constants::MAGIC_SIZE;
use crate::record::fixed_str;

/// Failure reported by the backing store.
#[derive(Error, Debug)]
pub enum IoError {
    #[error("No device responded at I2C address {address:#04x}")]
    NoDevice { address: u8 },

    #[error("Transfer failed at offset {offset:#06x}: {source}")]
    Transfer {
        offset: u32,
        #[source]
        source: io::Error,
    },
}

/// The integrity checks applied to a decoded record, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum IntegrityCheck {
    #[strum(to_string = "magic")]
    Magic,
    #[strum(to_string = "payload size")]
    PayloadSize,
    #[strum(to_string = "CRC")]
    Crc,
}

/// A record that was read successfully but failed one of the integrity checks.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Magic number did not have the expected value: {:?}", fixed_str(.found))]
    BadMagic { found: [u8; MAGIC_SIZE] },

    #[error("Unexpected payload size: {actual} != {expected}")]
    SizeMismatch { expected: u32, actual: u32 },

    #[error("CRC validation failed: stored {stored:#010x}, computed {computed:#010x}")]
    CrcMismatch { stored: u32, computed: u32 },
}

impl ValidationError {
    pub fn check(&self) -> IntegrityCheck {
        match self {
            ValidationError::BadMagic { .. } => IntegrityCheck::Magic,
            ValidationError::SizeMismatch { .. } => IntegrityCheck::PayloadSize,
            ValidationError::CrcMismatch { .. } => IntegrityCheck::Crc,
        }
    }
}

/// The primary error type for the `hwid-lib` library.
#[derive(Error, Debug)]
pub enum HwidError {
    #[error("Error accessing HWID EEPROM: {0}")]
    Io(#[from] IoError),

    #[error("Invalid record length: expected {expected} bytes, got {actual}")]
    Format { expected: usize, actual: usize },

    #[error("HWID EEPROM {check} check failed: {0}", check = .0.check())]
    Validation(#[from] ValidationError),

    #[error("{len} bytes at offset {offset:#010x} run past the end of the address space")]
    OutOfRange { offset: u32, len: usize },

    #[error("Write aborted at offset {offset:#06x}: {source}")]
    Write {
        offset: u32,
        #[source]
        source: IoError,
    },
}

impl HwidError {
    /// True when the read failed because nothing answered on the bus.
    pub fn is_no_device(&self) -> bool {
        matches!(self, HwidError::Io(IoError::NoDevice { .. }))
    }

    /// The integrity check that rejected the record, if that is what failed.
    pub fn failed_check(&self) -> Option<IntegrityCheck> {
        match self {
            HwidError::Validation(e) => Some(e.check()),
            _ => None,
        }
    }
}
