use bytes::Bytes;
use std::fmt;
use tracing::{debug, info, warn};

use crate::constants::*;
use crate::eeprom::{Delay, Eeprom};
use crate::env::{BoardVersion, Environment};
use crate::error::{HwidError, ValidationError};
use crate::record::{HwidFields, HwidRecord, ProductionData, decode};
use crate::validate::{ValidRecord, validate};
use crate::writer;

/// Result of a successful `check`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The EEPROM holds a valid record.
    Verified(ValidRecord),
    /// No EEPROM answered; the board predates the HWID EEPROM.
    Legacy,
}

impl CheckOutcome {
    pub fn board_version(&self) -> BoardVersion {
        match self {
            CheckOutcome::Verified(record) => BoardVersion::from(record),
            CheckOutcome::Legacy => BoardVersion::legacy(),
        }
    }

    pub fn record(&self) -> Option<&ValidRecord> {
        match self {
            CheckOutcome::Verified(record) => Some(record),
            CheckOutcome::Legacy => None,
        }
    }
}

/// Constants describing where and how the record is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleInfo {
    pub bus: u8,
    pub address: u8,
    pub magic: &'static [u8],
    pub payload_start: usize,
    pub payload_size: usize,
    pub undefined: i8,
}

impl fmt::Display for ModuleInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "HWID EEPROM DEVICE: {}", self.bus)?;
        writeln!(f, "HWID EEPROM ADDR: {:#X}", self.address)?;
        writeln!(f, "MAGIC: \"{}\"", String::from_utf8_lossy(self.magic))?;
        writeln!(f, "HEADER PAYLOAD START: {}", self.payload_start)?;
        writeln!(f, "HEADER PAYLOAD SIZE: {}", self.payload_size)?;
        write!(f, "UNDEFINED: {}", self.undefined)
    }
}

/// Handle on the HWID EEPROM for the duration of one command.
pub struct HwidEeprom<E, D> {
    eeprom: E,
    delay: D,
    address: u8,
}

impl<E: Eeprom, D: Delay> HwidEeprom<E, D> {
    pub fn new(eeprom: E, delay: D, address: u8) -> Self {
        Self { eeprom, delay, address }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn eeprom(&self) -> &E {
        &self.eeprom
    }

    pub fn into_parts(self) -> (E, D) {
        (self.eeprom, self.delay)
    }

    /// Read the whole record region in one transfer.
    pub fn read_raw(&mut self) -> Result<[u8; RECORD_SIZE], HwidError> {
        let bytes = self.eeprom.read_block(self.address, RECORD_OFFSET, RECORD_SIZE)?;
        let raw: [u8; RECORD_SIZE] = bytes.as_ref().try_into().map_err(|_| HwidError::Format {
            expected: RECORD_SIZE,
            actual: bytes.len(),
        })?;
        debug!("Read {} byte HWID header from {:#04x}", RECORD_SIZE, self.address);
        Ok(raw)
    }

    /// Read and decode the record without checking it.
    pub fn read_record(&mut self) -> Result<HwidRecord, HwidError> {
        let raw = self.read_raw()?;
        decode(&raw)
    }

    /// Read and validate the record. A part that does not answer at all is
    /// reported as [`CheckOutcome::Legacy`] rather than as an error.
    pub fn check(&mut self) -> Result<CheckOutcome, HwidError> {
        let record = match self.read_record() {
            Ok(record) => record,
            Err(e) if e.is_no_device() => {
                warn!("No HWID EEPROM found, assuming byteDEVKIT 1.2");
                return Ok(CheckOutcome::Legacy);
            }
            Err(e) => return Err(e),
        };

        match validate(record) {
            Ok(valid) => {
                info!(
                    "HWID EEPROM valid: header {} version {}.{}.{}",
                    valid.header_version, valid.major, valid.minor, valid.patch
                );
                Ok(CheckOutcome::Verified(valid))
            }
            Err(e) => {
                warn!("HWID EEPROM rejected: {}", e);
                Err(e.into())
            }
        }
    }

    /// [`check`](Self::check) and export the board version. Nothing is
    /// exported when the check fails.
    pub fn check_and_export<V>(&mut self, env: &mut V) -> Result<CheckOutcome, HwidError>
    where
        V: Environment + ?Sized,
    {
        let outcome = self.check()?;
        outcome.board_version().apply(env);
        Ok(outcome)
    }

    /// Production data, shown even when the record fails validation. The
    /// validation error, if any, is handed back next to the data.
    pub fn production_data(
        &mut self,
    ) -> Result<(ProductionData, Option<ValidationError>), HwidError> {
        let record = self.read_record()?;
        let data = record.production_data();
        match validate(record) {
            Ok(_) => Ok((data, None)),
            Err(e) => {
                warn!("Production data shown from unverified record: {}", e);
                Ok((data, Some(e)))
            }
        }
    }

    pub fn write_record(&mut self, record: &HwidRecord) -> Result<(), HwidError> {
        writer::write_record(&mut self.eeprom, &mut self.delay, self.address, record)
    }

    /// Build a current-format record from `fields` and write it.
    pub fn write_fields(&mut self, fields: &HwidFields) -> Result<HwidRecord, HwidError> {
        let record = HwidRecord::from_fields(fields);
        self.write_record(&record)?;
        Ok(record)
    }

    /// Raw bytes from the start of the part.
    pub fn dump(&mut self, count: usize) -> Result<Bytes, HwidError> {
        Ok(self.eeprom.read_block(self.address, 0, count)?)
    }

    /// Overwrite `rows` rows of [`EEPROM_ROW`] bytes with `byte`, starting at
    /// `offset`. The whole range is checked before the first row is written.
    pub fn fill_rows(&mut self, offset: u32, byte: u8, rows: usize) -> Result<(), HwidError> {
        let len = rows.saturating_mul(EEPROM_ROW);
        let last = u32::try_from(len).ok().map(|span| span.saturating_sub(1));
        if last.and_then(|last| offset.checked_add(last)).is_none() {
            return Err(HwidError::OutOfRange { offset, len });
        }

        let row = [byte; EEPROM_ROW];
        for i in 0..rows {
            // cannot overflow, the last byte was checked above
            let row_offset = offset + (i * EEPROM_ROW) as u32;
            self.eeprom
                .write_block(self.address, row_offset, &row)
                .map_err(|source| HwidError::Write {
                    offset: row_offset,
                    source,
                })?;
            self.delay.delay_ms(WRITE_SETTLE_MS);
        }
        debug!("Filled {} rows at {:#06x} with {:#04x}", rows, offset, byte);
        Ok(())
    }

    pub fn info(&self) -> ModuleInfo {
        ModuleInfo {
            bus: HWID_EEPROM_BUS,
            address: self.address,
            magic: MAGIC,
            payload_start: PAYLOAD_START,
            payload_size: PAYLOAD_SIZE,
            undefined: UNDEFINED,
        }
    }
}
