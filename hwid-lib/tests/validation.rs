//! Tests for the magic, size and CRC gates

mod common;

use common::*;

fn sealed() -> HwidRecord {
    HwidRecord::from_fields(&e2e_fields())
}

#[test]
fn test_valid_record_passes() {
    let valid = validate(sealed()).expect("Sealed record should validate");
    assert_eq!(valid.into_inner(), sealed());
}

#[test]
fn test_any_payload_bit_flip_is_crc_mismatch() {
    let original = e2e_bytes();
    for byte in PAYLOAD_START..RECORD_SIZE {
        for bit in 0..8 {
            let mut bytes = original.clone();
            bytes[byte] ^= 1 << bit;
            let record = decode(&bytes).unwrap();
            let result = validate(record);
            // flips inside payload_size trip the size gate first
            let expected = if (20..24).contains(&byte) {
                IntegrityCheck::PayloadSize
            } else {
                IntegrityCheck::Crc
            };
            match result {
                Err(e) => assert_eq!(e.check(), expected, "byte {} bit {}", byte, bit),
                Ok(_) => panic!("byte {} bit {}: corrupted record was accepted", byte, bit),
            }
        }
    }
}

#[test]
fn test_corrupt_uid_is_crc_mismatch() {
    let mut bytes = e2e_bytes();
    bytes[61] = b'X';
    let record = decode(&bytes).unwrap();
    match validate(record) {
        Err(ValidationError::CrcMismatch { stored, computed }) => {
            assert_eq!(stored, 0x799d_e8e2);
            assert_ne!(computed, stored);
        }
        other => panic!("Expected CrcMismatch, got {:?}", other),
    }
}

#[test]
fn test_magic_prefix_change_is_bad_magic() {
    for i in 0..MAGIC_COMPARE_LEN {
        let mut record = sealed();
        record.magic[i] ^= 0x20;
        // magic is outside the CRC, so the record is otherwise intact
        assert_eq!(record.payload_crc(), record.crc);
        assert!(
            matches!(validate(record), Err(ValidationError::BadMagic { .. })),
            "magic byte {} not checked",
            i
        );
    }
}

#[test]
fn test_magic_tail_is_ignored() {
    for i in MAGIC_COMPARE_LEN..MAGIC_SIZE {
        let mut record = sealed();
        record.magic[i] = b'v';
        assert!(validate(record).is_ok(), "magic byte {} should be ignored", i);
    }
}

#[test]
fn test_payload_size_gate_ignores_crc() {
    for delta in [1i64, -1, 2, -57, 1000] {
        let mut record = sealed();
        record.payload_size = (57 + delta) as u32;
        // resealing makes the CRC consistent; the size check must still fire
        record.seal();
        assert_eq!(
            validate(record),
            Err(ValidationError::SizeMismatch {
                expected: 57,
                actual: record.payload_size
            })
        );
    }
}

#[test]
fn test_erased_part_is_bad_magic() {
    let record = decode(&[0xFF; RECORD_SIZE]).unwrap();
    let err = HwidError::from(validate(record).unwrap_err());
    assert_eq!(err.failed_check(), Some(IntegrityCheck::Magic));
    assert!(err.to_string().contains("magic"));
}
