use tracing::{debug, info};

use crate::constants::{RECORD_OFFSET, WRITE_BLOCK_SIZE, WRITE_SETTLE_MS};
use crate::eeprom::{Delay, Eeprom};
use crate::error::HwidError;
use crate::record::{HwidRecord, encode};

/// Write `data` from offset 0 in page-sized blocks, waiting for the write
/// cycle after every block.
///
/// Stops at the first failing block. The part is then left half written; if
/// the first block went through, the old record no longer passes its CRC.
pub fn write_blocks<E, D>(
    eeprom: &mut E,
    delay: &mut D,
    address: u8,
    data: &[u8],
) -> Result<(), HwidError>
where
    E: Eeprom + ?Sized,
    D: Delay + ?Sized,
{
    for (index, block) in data.chunks(WRITE_BLOCK_SIZE).enumerate() {
        let offset = RECORD_OFFSET + (index * WRITE_BLOCK_SIZE) as u32;
        debug!("Writing block {} ({} bytes) at {:#06x}", index, block.len(), offset);
        eeprom
            .write_block(address, offset, block)
            .map_err(|source| HwidError::Write { offset, source })?;
        delay.delay_ms(WRITE_SETTLE_MS);
    }
    Ok(())
}

/// Encode `record` and write it to the record offset. The CRC is written as
/// stored; call [`HwidRecord::seal`] first if fields were changed.
pub fn write_record<E, D>(
    eeprom: &mut E,
    delay: &mut D,
    address: u8,
    record: &HwidRecord,
) -> Result<(), HwidError>
where
    E: Eeprom + ?Sized,
    D: Delay + ?Sized,
{
    let bytes = encode(record);
    write_blocks(eeprom, delay, address, &bytes)?;
    info!("HWID EEPROM was flashed successfully ({} bytes)", bytes.len());
    Ok(())
}
