//! Common test utilities and shared imports

// Allow unused imports and dead code since this is a shared module
// used across multiple test files - not all items are used in every test file
#[allow(unused_imports)]
pub use bytes::Bytes;
#[allow(unused_imports)]
pub use hwid_lib::constants::*;
#[allow(unused_imports)]
pub use hwid_lib::{
    BoardVersion, CheckOutcome, Delay, Eeprom, Environment, HwidEeprom, HwidError, HwidFields,
    HwidRecord, IntegrityCheck, IoError, MemoryEeprom, ValidationError, decode, encode, validate,
};
#[allow(unused_imports)]
pub use std::collections::BTreeMap;

/// Header written by the bootloader's e2e routine
#[allow(dead_code)]
pub const E2E_RECORD_HEX: &str = concat!(
    "627974654445564b4954000000000000",
    "e2e89d79390000000101030",
    "0fd9eee3467000000013230",
    "32322d30312d3031000031",
    "392f3230007364750000003",
    "1383034323730303039373337000000",
);

#[allow(dead_code)]
pub fn e2e_fields() -> HwidFields {
    HwidFields {
        major: 1,
        minor: 3,
        patch: 0,
        art_nr: 888053501,
        lot: 103,
        lotseq: 1,
        proddate: "2022-01-01".to_string(),
        flashdate: "19/20".to_string(),
        flashuser: "sdu".to_string(),
        uid: "1804270009737".to_string(),
    }
}

#[allow(dead_code)]
pub fn e2e_bytes() -> Vec<u8> {
    hex::decode(E2E_RECORD_HEX).expect("Failed to decode hex")
}

/// A 4 KiB part at the default address holding the e2e header
#[allow(dead_code)]
pub fn flashed_part() -> MemoryEeprom {
    let mut mem = MemoryEeprom::default();
    mem.contents_mut()[..RECORD_SIZE].copy_from_slice(&e2e_bytes());
    mem
}

/// Wraps a part and records every write; can be told to fail one offset.
#[allow(dead_code)]
pub struct RecordingEeprom {
    pub inner: MemoryEeprom,
    pub writes: Vec<(u32, usize)>,
    pub fail_write_at: Option<u32>,
    pub absent: bool,
}

#[allow(dead_code)]
impl RecordingEeprom {
    pub fn new(inner: MemoryEeprom) -> Self {
        Self {
            inner,
            writes: Vec::new(),
            fail_write_at: None,
            absent: false,
        }
    }

    pub fn absent() -> Self {
        Self {
            absent: true,
            ..Self::new(MemoryEeprom::default())
        }
    }
}

impl Eeprom for RecordingEeprom {
    fn read_block(&mut self, address: u8, offset: u32, len: usize) -> Result<Bytes, IoError> {
        if self.absent {
            return Err(IoError::NoDevice { address });
        }
        self.inner.read_block(address, offset, len)
    }

    fn write_block(&mut self, address: u8, offset: u32, data: &[u8]) -> Result<(), IoError> {
        if self.absent {
            return Err(IoError::NoDevice { address });
        }
        self.writes.push((offset, data.len()));
        if self.fail_write_at == Some(offset) {
            return Err(IoError::Transfer {
                offset,
                source: std::io::Error::other("NACK during write cycle"),
            });
        }
        self.inner.write_block(address, offset, data)
    }
}

/// Records requested delays instead of sleeping
#[derive(Debug, Default)]
#[allow(dead_code)]
pub struct RecordingDelay {
    pub calls: Vec<u32>,
}

impl Delay for RecordingDelay {
    fn delay_ms(&mut self, ms: u32) {
        self.calls.push(ms);
    }
}

#[allow(dead_code)]
pub fn session(eeprom: RecordingEeprom) -> HwidEeprom<RecordingEeprom, RecordingDelay> {
    HwidEeprom::new(eeprom, RecordingDelay::default(), DEFAULT_EEPROM_ADDRESS)
}
