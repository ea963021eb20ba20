//! HWID EEPROM support for the byteDEVKIT
//!
//! The board stores a 77 byte identification header at offset 0 of an I2C
//! EEPROM: a magic signature, a CRC-32 over the payload, and version and
//! production fields. This crate decodes, validates and writes that header.

pub mod constants;
pub mod device;
pub mod eeprom;
pub mod env;
pub mod error;
pub mod record;
pub mod validate;
pub mod writer;


pub use device::{CheckOutcome, HwidEeprom, ModuleInfo};
pub use eeprom::{Delay, Eeprom, FileEeprom, MemoryEeprom, StdDelay};
pub use env::{BoardVersion, Environment};
pub use error::{HwidError, IntegrityCheck, IoError, ValidationError};
pub use record::{HwidFields, HwidRecord, ProductionData, decode, encode};
pub use validate::{ValidRecord, validate};
