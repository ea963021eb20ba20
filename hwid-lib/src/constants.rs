// Layout and timing constants for the byteDEVKIT HWID EEPROM

/// Signature stored at the start of every record
pub const MAGIC: &[u8] = b"byteDEVKIT";

/// Width of the magic field (signature, NUL padded)
pub const MAGIC_SIZE: usize = 16;

/// Number of magic bytes that are compared: the signature plus its NUL
/// terminator. Bytes past this prefix are ignored.
pub const MAGIC_COMPARE_LEN: usize = MAGIC.len() + 1;

/// Size of the CRC field following the magic
pub const CRC_SIZE: usize = 4;

/// Offset of the CRC-covered payload (starts with `payload_size`)
pub const PAYLOAD_START: usize = MAGIC_SIZE + CRC_SIZE;

/// Total size of the packed record (77 bytes)
pub const RECORD_SIZE: usize = 77;

/// Size of the payload region, also the value stored in `payload_size`
pub const PAYLOAD_SIZE: usize = RECORD_SIZE - PAYLOAD_START;

/// Header format written by this crate
pub const CURRENT_HEADER_VERSION: u8 = 1;

/// Page size the EEPROM accepts in a single write cycle
pub const WRITE_BLOCK_SIZE: usize = 64;

/// Settle time after each block write, from the part's datasheet
pub const WRITE_SETTLE_MS: u32 = 5;

/// Row width used by the raw dump and reset tooling
pub const EEPROM_ROW: usize = 16;

/// I2C bus the HWID EEPROM sits on
pub const HWID_EEPROM_BUS: u8 = 1;

/// 7-bit I2C address of the HWID EEPROM
pub const DEFAULT_EEPROM_ADDRESS: u8 = 0x50;

/// Offset of the record inside the EEPROM
pub const RECORD_OFFSET: u32 = 0;

/// Sentinel exported for version fields that are not known
pub const UNDEFINED: i8 = -1;

// Field widths of the string buffers
pub const PRODDATE_SIZE: usize = 12;
pub const FLASHDATE_SIZE: usize = 6;
pub const FLASHUSER_SIZE: usize = 6;
pub const UID_SIZE: usize = 16;
