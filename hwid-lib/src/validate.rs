use std::ops::Deref;
use tracing::debug;

use crate::constants::{MAGIC, MAGIC_COMPARE_LEN, PAYLOAD_SIZE};
use crate::error::ValidationError;
use crate::record::{HwidRecord, fixed_bytes};

/// A record that passed [`validate`]. There is no other way to build one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidRecord(HwidRecord);

impl ValidRecord {
    pub fn into_inner(self) -> HwidRecord {
        self.0
    }
}

impl Deref for ValidRecord {
    type Target = HwidRecord;

    fn deref(&self) -> &HwidRecord {
        &self.0
    }
}

/// Check magic, payload size and CRC, stopping at the first failure.
pub fn validate(record: HwidRecord) -> Result<ValidRecord, ValidationError> {
    // strncmp(magic, "byteDEVKIT", 11): signature plus terminator, the
    // trailing five bytes of the field are not looked at
    let expected: [u8; MAGIC_COMPARE_LEN] = fixed_bytes(MAGIC);
    if record.magic[..MAGIC_COMPARE_LEN] != expected {
        return Err(ValidationError::BadMagic { found: record.magic });
    }

    if record.payload_size != PAYLOAD_SIZE as u32 {
        return Err(ValidationError::SizeMismatch {
            expected: PAYLOAD_SIZE as u32,
            actual: record.payload_size,
        });
    }

    let computed = record.payload_crc();
    if computed != record.crc {
        return Err(ValidationError::CrcMismatch {
            stored: record.crc,
            computed,
        });
    }

    debug!("HWID record passed integrity checks (crc {:#010x})", computed);
    Ok(ValidRecord(record))
}
