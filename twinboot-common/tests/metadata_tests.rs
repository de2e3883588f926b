// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Unit tests for the bootloader metadata record.

use twinboot_common::checksum::compute;
use twinboot_common::layout::{BankLayout, Region, RegionKind};
use twinboot_common::metadata::{
    pad_to_bank, BankCheck, BankId, BankImage, BootloaderMetadataRecord, BANK_A_FLAG, BANK_B_FLAG,
    METADATA_SIZE,
};
use twinboot_common::{ChecksumError, MetadataError, SizeExceeded};

fn layout() -> BankLayout {
    BankLayout::stm32f103c8_dual_bank()
}

fn tiny_layout() -> BankLayout {
    BankLayout::new(
        Region::new(0x000, 0x40),
        Region::new(0x040, 0x20),
        Region::new(0x060, 0x20),
        Region::new(0x080, 0x20),
    )
    .unwrap()
}

fn firmware(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(13).wrapping_add(seed)).collect()
}

// =============================================================================
// BankId
// =============================================================================

#[test]
fn test_bank_flags() {
    assert_eq!(BANK_A_FLAG, 0xAA);
    assert_eq!(BANK_B_FLAG, 0xBB);
    assert_eq!(BankId::A.flag(), 0xAA);
    assert_eq!(BankId::B.flag(), 0xBB);
}

#[test]
fn test_bank_from_flag() {
    assert_eq!(BankId::try_from(0xAA), Ok(BankId::A));
    assert_eq!(BankId::try_from(0xBB), Ok(BankId::B));
}

#[test]
fn test_bank_from_invalid_flag() {
    for flag in [0x00, 0x01, 0xAB, 0xBA, 0xFF] {
        assert_eq!(
            BankId::try_from(flag),
            Err(MetadataError::InvalidArgument(flag))
        );
    }
}

#[test]
fn test_bank_from_str() {
    assert_eq!("A".parse::<BankId>(), Ok(BankId::A));
    assert_eq!("b".parse::<BankId>(), Ok(BankId::B));
    assert_eq!(
        "C".parse::<BankId>(),
        Err(MetadataError::UnknownBank("C".to_string()))
    );
}

#[test]
fn test_bank_other() {
    assert_eq!(BankId::A.other(), BankId::B);
    assert_eq!(BankId::B.other(), BankId::A);
}

#[test]
fn test_bank_region() {
    assert_eq!(BankId::A.region(), RegionKind::BankA);
    assert_eq!(BankId::B.region(), RegionKind::BankB);
}

// =============================================================================
// build
// =============================================================================

#[test]
fn test_build_both_absent() {
    let record =
        BootloaderMetadataRecord::build(&layout(), BankId::A, BankImage::Absent, BankImage::Absent)
            .unwrap();

    assert_eq!(record.active_bank_flag(), 0xAA);
    assert_eq!(record.bank_a_size, 0);
    assert_eq!(record.bank_a_crc32, 0xFFFF_FFFF);
    assert_eq!(record.bank_b_size, 0);
    assert_eq!(record.bank_b_crc32, 0xFFFF_FFFF);
    assert_eq!(record, BootloaderMetadataRecord::empty(BankId::A));
}

#[test]
fn test_build_bank_a_only() {
    let fw = firmware(1024, 1);
    let record = BootloaderMetadataRecord::build(
        &layout(),
        BankId::A,
        BankImage::Present(&fw),
        BankImage::Absent,
    )
    .unwrap();

    assert_eq!(record.bank_a_size, 1024);
    assert_eq!(record.bank_a_crc32, compute(&fw).unwrap());
    assert_eq!(record.bank(BankId::B), (0, 0xFFFF_FFFF));
}

#[test]
fn test_build_both_banks_active_b() {
    let fw_a = firmware(512, 1);
    let fw_b = firmware(768, 2);
    let record = BootloaderMetadataRecord::build(
        &layout(),
        BankId::B,
        BankImage::Present(&fw_a),
        BankImage::Present(&fw_b),
    )
    .unwrap();

    assert_eq!(record.active_bank, BankId::B);
    assert_eq!(record.active_bank_flag(), 0xBB);
    assert_eq!(record.bank(BankId::A), (512, compute(&fw_a).unwrap()));
    assert_eq!(record.bank(BankId::B), (768, compute(&fw_b).unwrap()));
}

#[test]
fn test_build_crc_ignores_padding() {
    let fw = firmware(100, 3);
    let record = BootloaderMetadataRecord::build(
        &layout(),
        BankId::A,
        BankImage::Present(&fw),
        BankImage::Absent,
    )
    .unwrap();

    let padded = pad_to_bank(&layout(), BankId::A, &fw).unwrap();
    assert_ne!(record.bank_a_crc32, compute(&padded).unwrap());
    assert_eq!(record.bank_a_crc32, compute(&fw).unwrap());
}

#[test]
fn test_build_from_option() {
    let fw = firmware(64, 4);
    let from_option = BootloaderMetadataRecord::build(
        &layout(),
        BankId::A,
        Some(fw.as_slice()).into(),
        BankImage::from(None::<&[u8]>),
    )
    .unwrap();
    let explicit = BootloaderMetadataRecord::build(
        &layout(),
        BankId::A,
        BankImage::Present(&fw),
        BankImage::Absent,
    )
    .unwrap();
    assert_eq!(from_option, explicit);
}

#[test]
fn test_build_bank_too_large() {
    let fw = firmware(0x24, 5);
    let err = BootloaderMetadataRecord::build(
        &tiny_layout(),
        BankId::A,
        BankImage::Absent,
        BankImage::Present(&fw),
    )
    .unwrap_err();

    assert_eq!(
        err,
        MetadataError::SizeExceeded(SizeExceeded {
            region: RegionKind::BankB,
            declared: 0x24,
            limit: 0x20,
        })
    );
}

#[test]
fn test_build_bank_at_limit() {
    let fw = firmware(0x20, 6);
    let record = BootloaderMetadataRecord::build(
        &tiny_layout(),
        BankId::A,
        BankImage::Present(&fw),
        BankImage::Absent,
    )
    .unwrap();
    assert_eq!(record.bank_a_size, 0x20);
}

#[test]
fn test_build_unaligned_image_rejected() {
    let fw = firmware(101, 7);
    let err = BootloaderMetadataRecord::build(
        &layout(),
        BankId::A,
        BankImage::Present(&fw),
        BankImage::Absent,
    )
    .unwrap_err();
    assert_eq!(
        err,
        MetadataError::Checksum(ChecksumError::InvalidInputLength { len: 101 })
    );
}

// =============================================================================
// Serialization
// =============================================================================

#[test]
fn test_serialized_size() {
    assert_eq!(METADATA_SIZE, 20);
    assert_eq!(BootloaderMetadataRecord::empty(BankId::A).to_bytes().len(), 20);
}

#[test]
fn test_serialized_layout() {
    let record = BootloaderMetadataRecord {
        active_bank: BankId::B,
        bank_a_size: 0x0000_1234,
        bank_b_size: 0x0000_5678,
        bank_a_crc32: 0xAABB_CCDD,
        bank_b_crc32: 0x1122_3344,
    };

    assert_eq!(
        record.to_bytes(),
        [
            0xBB, 0x00, 0x00, 0x00, // flag + reserved
            0x34, 0x12, 0x00, 0x00, // bank_a_size
            0x78, 0x56, 0x00, 0x00, // bank_b_size
            0xDD, 0xCC, 0xBB, 0xAA, // bank_a_crc32
            0x44, 0x33, 0x22, 0x11, // bank_b_crc32
        ]
    );
}

#[test]
fn test_empty_record_bytes() {
    let bytes = BootloaderMetadataRecord::empty(BankId::A).to_bytes();
    assert_eq!(&bytes[..4], &[0xAA, 0, 0, 0]);
    assert_eq!(&bytes[4..12], &[0u8; 8]);
    assert_eq!(&bytes[12..20], &[0xFFu8; 8]);
}

#[test]
fn test_round_trip() {
    let fw_a = firmware(256, 8);
    let fw_b = firmware(4096, 9);
    let cases = [
        (BankId::A, BankImage::Absent, BankImage::Absent),
        (BankId::B, BankImage::Present(&fw_a[..]), BankImage::Absent),
        (BankId::A, BankImage::Absent, BankImage::Present(&fw_b[..])),
        (BankId::B, BankImage::Present(&fw_a[..]), BankImage::Present(&fw_b[..])),
    ];

    for (active, a, b) in cases {
        let record = BootloaderMetadataRecord::build(&layout(), active, a, b).unwrap();
        let decoded = BootloaderMetadataRecord::from_bytes(&record.to_bytes()).unwrap();
        assert_eq!(decoded, record);
    }
}

#[test]
fn test_from_bytes_ignores_reserved() {
    let mut bytes = BootloaderMetadataRecord::empty(BankId::B).to_bytes();
    bytes[1..4].copy_from_slice(&[0xFF, 0xFF, 0xFF]);
    assert_eq!(
        BootloaderMetadataRecord::from_bytes(&bytes),
        Ok(BootloaderMetadataRecord::empty(BankId::B))
    );
}

#[test]
fn test_from_bytes_invalid_flag() {
    let mut bytes = BootloaderMetadataRecord::empty(BankId::A).to_bytes();
    bytes[0] = 0xFF;
    assert_eq!(
        BootloaderMetadataRecord::from_bytes(&bytes),
        Err(MetadataError::InvalidArgument(0xFF))
    );
}

#[test]
fn test_from_bytes_wrong_length() {
    for len in [0, 12, 19, 21, 32] {
        let bytes = vec![0xAA; len];
        assert_eq!(
            BootloaderMetadataRecord::from_bytes(&bytes),
            Err(MetadataError::InvalidLength {
                expected: 20,
                actual: len
            })
        );
    }
}

// =============================================================================
// verify_bank
// =============================================================================

#[test]
fn test_verify_bank_match() {
    let fw = firmware(256, 10);
    let record = BootloaderMetadataRecord::build(
        &layout(),
        BankId::A,
        BankImage::Present(&fw),
        BankImage::Absent,
    )
    .unwrap();

    assert_eq!(record.verify_bank(BankId::A, &fw), BankCheck::Match);
    assert_eq!(record.verify_bank(BankId::B, &fw), BankCheck::NotProgrammed);
}

#[test]
fn test_verify_bank_corrupted() {
    let fw = firmware(256, 11);
    let record = BootloaderMetadataRecord::build(
        &layout(),
        BankId::A,
        BankImage::Present(&fw),
        BankImage::Absent,
    )
    .unwrap();

    let mut corrupted = fw.clone();
    corrupted[100] ^= 0x01;
    assert!(matches!(
        record.verify_bank(BankId::A, &corrupted),
        BankCheck::CrcMismatch { expected, .. } if expected == record.bank_a_crc32
    ));
}

#[test]
fn test_verify_bank_size_mismatch() {
    let fw = firmware(256, 12);
    let record = BootloaderMetadataRecord::build(
        &layout(),
        BankId::B,
        BankImage::Absent,
        BankImage::Present(&fw),
    )
    .unwrap();

    let padded = pad_to_bank(&layout(), BankId::B, &fw).unwrap();
    assert_eq!(
        record.verify_bank(BankId::B, &padded),
        BankCheck::SizeMismatch {
            expected: 256,
            actual: 24 * 1024
        }
    );
}

#[test]
fn test_verify_bank_unaligned_recorded_size() {
    let mut bytes = [0u8; METADATA_SIZE];
    bytes[0] = BANK_A_FLAG;
    bytes[4..8].copy_from_slice(&6u32.to_le_bytes());
    bytes[12..16].copy_from_slice(&0x1234_5678u32.to_le_bytes());
    let record = BootloaderMetadataRecord::from_bytes(&bytes).unwrap();

    assert_eq!(
        record.verify_bank(BankId::A, &firmware(6, 3)),
        BankCheck::Unaligned { len: 6 }
    );
}

// =============================================================================
// pad_to_bank
// =============================================================================

#[test]
fn test_pad_to_bank() {
    let fw = firmware(10, 13);
    let padded = pad_to_bank(&tiny_layout(), BankId::A, &fw).unwrap();
    assert_eq!(padded.len(), 0x20);
    assert_eq!(&padded[..10], &fw[..]);
    assert!(padded[10..].iter().all(|&b| b == 0xFF));
}

#[test]
fn test_pad_to_bank_too_large() {
    let fw = firmware(0x21, 14);
    assert_eq!(
        pad_to_bank(&tiny_layout(), BankId::B, &fw),
        Err(SizeExceeded {
            region: RegionKind::BankB,
            declared: 0x21,
            limit: 0x20,
        })
    );
}
