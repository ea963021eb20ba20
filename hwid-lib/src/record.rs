use std::fmt;
use zerocopy::byteorder::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::HwidError;

/// On-EEPROM layout of the HWID header (77 bytes, packed).
///
/// The bootloader writes this struct straight from memory on a little-endian
/// Cortex-A7, so every multi-byte field is little-endian. Boards in the field
/// carry this exact layout; do not reorder or resize anything.
///
/// | Offset | Size | Field          |
/// |--------|------|----------------|
/// | 0      | 16   | magic          |
/// | 16     | 4    | crc            |
/// | 20     | 4    | payload_size   |
/// | 24     | 1    | header_version |
/// | 25     | 1    | major          |
/// | 26     | 1    | minor          |
/// | 27     | 1    | patch          |
/// | 28     | 4    | art_nr         |
/// | 32     | 4    | lot            |
/// | 36     | 1    | lotseq         |
/// | 37     | 12   | proddate       |
/// | 49     | 6    | flashdate      |
/// | 55     | 6    | flashuser      |
/// | 61     | 16   | uid            |
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct HwidRecordRaw {
    pub magic: [u8; MAGIC_SIZE],
    /// CRC-32 of bytes 20..77
    pub crc: U32,
    pub payload_size: U32,
    pub header_version: u8,
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
    pub art_nr: U32,
    pub lot: U32,
    pub lotseq: u8,
    pub proddate: [u8; PRODDATE_SIZE],
    pub flashdate: [u8; FLASHDATE_SIZE],
    pub flashuser: [u8; FLASHUSER_SIZE],
    pub uid: [u8; UID_SIZE],
}

const _: () = assert!(size_of::<HwidRecordRaw>() == RECORD_SIZE);
const _: () = assert!(PAYLOAD_SIZE == 57);

/// Decoded HWID header.
///
/// String fields are kept as the fixed-width buffers found on the EEPROM.
/// They are NUL padded but not necessarily NUL terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HwidRecord {
    pub magic: [u8; MAGIC_SIZE],
    pub crc: u32,
    pub payload_size: u32,
    pub header_version: u8,
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
    pub art_nr: u32,
    pub lot: u32,
    pub lotseq: u8,
    pub proddate: [u8; PRODDATE_SIZE],
    pub flashdate: [u8; FLASHDATE_SIZE],
    pub flashuser: [u8; FLASHUSER_SIZE],
    pub uid: [u8; UID_SIZE],
}

impl From<HwidRecordRaw> for HwidRecord {
    fn from(raw: HwidRecordRaw) -> Self {
        HwidRecord {
            magic: raw.magic,
            crc: raw.crc.get(),
            payload_size: raw.payload_size.get(),
            header_version: raw.header_version,
            major: raw.major,
            minor: raw.minor,
            patch: raw.patch,
            art_nr: raw.art_nr.get(),
            lot: raw.lot.get(),
            lotseq: raw.lotseq,
            proddate: raw.proddate,
            flashdate: raw.flashdate,
            flashuser: raw.flashuser,
            uid: raw.uid,
        }
    }
}

impl From<&HwidRecord> for HwidRecordRaw {
    fn from(record: &HwidRecord) -> Self {
        HwidRecordRaw {
            magic: record.magic,
            crc: U32::new(record.crc),
            payload_size: U32::new(record.payload_size),
            header_version: record.header_version,
            major: record.major,
            minor: record.minor,
            patch: record.patch,
            art_nr: U32::new(record.art_nr),
            lot: U32::new(record.lot),
            lotseq: record.lotseq,
            proddate: record.proddate,
            flashdate: record.flashdate,
            flashuser: record.flashuser,
            uid: record.uid,
        }
    }
}

/// Parse a raw record buffer. Only the length is checked here; see
/// [`crate::validate::validate`] for magic, size and CRC.
pub fn decode(bytes: &[u8]) -> Result<HwidRecord, HwidError> {
    let raw = HwidRecordRaw::read_from_bytes(bytes).map_err(|_| HwidError::Format {
        expected: RECORD_SIZE,
        actual: bytes.len(),
    })?;
    Ok(HwidRecord::from(raw))
}

/// Serialize a record into its on-EEPROM byte image.
pub fn encode(record: &HwidRecord) -> [u8; RECORD_SIZE] {
    let raw = HwidRecordRaw::from(record);
    let mut out = [0u8; RECORD_SIZE];
    out.copy_from_slice(raw.as_bytes());
    out
}

/// Values supplied by the operator when flashing a board.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HwidFields {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
    pub art_nr: u32,
    pub lot: u32,
    pub lotseq: u8,
    pub proddate: String,
    pub flashdate: String,
    pub flashuser: String,
    pub uid: String,
}

impl HwidRecord {
    /// Build a current-format record from operator values and seal its CRC.
    ///
    /// Strings longer than their field are cut off silently.
    pub fn from_fields(fields: &HwidFields) -> Self {
        let mut record = HwidRecord {
            magic: fixed_bytes(MAGIC),
            crc: 0,
            payload_size: PAYLOAD_SIZE as u32,
            header_version: CURRENT_HEADER_VERSION,
            major: fields.major,
            minor: fields.minor,
            patch: fields.patch,
            art_nr: fields.art_nr,
            lot: fields.lot,
            lotseq: fields.lotseq,
            proddate: fixed_bytes(fields.proddate.as_bytes()),
            flashdate: fixed_bytes(fields.flashdate.as_bytes()),
            flashuser: fixed_bytes(fields.flashuser.as_bytes()),
            uid: fixed_bytes(fields.uid.as_bytes()),
        };
        record.seal();
        record
    }

    /// CRC-32 over the payload region (everything after magic and crc).
    pub fn payload_crc(&self) -> u32 {
        crc32fast::hash(&encode(self)[PAYLOAD_START..])
    }

    /// Recompute and store the CRC after fields were changed.
    pub fn seal(&mut self) {
        self.crc = self.payload_crc();
    }

    pub fn production_data(&self) -> ProductionData {
        ProductionData::from(self)
    }
}

/// Copy `src` into a NUL padded buffer of width `N`, truncating if needed.
pub fn fixed_bytes<const N: usize>(src: &[u8]) -> [u8; N] {
    let mut buf = [0u8; N];
    let len = src.len().min(N);
    buf[..len].copy_from_slice(&src[..len]);
    buf
}

/// Read a fixed-width buffer as text, stopping at the first NUL.
pub fn fixed_str(buf: &[u8]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

/// Production data as shown to an operator.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProductionData {
    pub art_nr: u32,
    pub lot: u32,
    pub lotseq: u8,
    pub proddate: String,
    pub flashdate: String,
    pub flashuser: String,
    pub uid: String,
}

impl From<&HwidRecord> for ProductionData {
    fn from(record: &HwidRecord) -> Self {
        ProductionData {
            art_nr: record.art_nr,
            lot: record.lot,
            lotseq: record.lotseq,
            proddate: fixed_str(&record.proddate),
            flashdate: fixed_str(&record.flashdate),
            flashuser: fixed_str(&record.flashuser),
            uid: fixed_str(&record.uid),
        }
    }
}

impl fmt::Display for ProductionData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "art_nr: {}", self.art_nr)?;
        writeln!(f, "lot: {}", self.lot)?;
        writeln!(f, "lotseq: {}", self.lotseq)?;
        writeln!(f, "proddate: {}", self.proddate)?;
        writeln!(f, "flashdate: {}", self.flashdate)?;
        writeln!(f, "flashuser: {}", self.flashuser)?;
        write!(f, "uid: {}", self.uid)
    }
}
