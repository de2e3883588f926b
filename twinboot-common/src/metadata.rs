// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Bootloader metadata record stored at the start of the data area.
//!
//! Wire layout (20 bytes, little-endian), read by the bootloader as a packed struct:
//!
//! ```text
//! offset  size  field
//! 0       1     active_bank_flag   0xAA = bank A, 0xBB = bank B
//! 1       3     reserved           written as zero
//! 4       4     bank_a_size
//! 8       4     bank_b_size
//! 12      4     bank_a_crc32
//! 16      4     bank_b_crc32
//! ```
//!
//! CRCs cover exactly `bank_*_size` bytes. Erased padding after the image is
//! never part of the checksum.

use alloc::string::ToString;
use alloc::vec::Vec;
use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::checksum::{self, CRC32_INIT};
use crate::error::{MetadataError, SizeExceeded};
use crate::layout::{BankLayout, RegionKind, ERASED_BYTE};

/// Size of the serialized record.
pub const METADATA_SIZE: usize = 20;

/// Flag value selecting bank A.
pub const BANK_A_FLAG: u8 = 0xAA;
/// Flag value selecting bank B.
pub const BANK_B_FLAG: u8 = 0xBB;

// --- Bank selection ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BankId {
    A,
    B,
}

impl BankId {
    pub const fn flag(self) -> u8 {
        match self {
            Self::A => BANK_A_FLAG,
            Self::B => BANK_B_FLAG,
        }
    }

    pub const fn region(self) -> RegionKind {
        match self {
            Self::A => RegionKind::BankA,
            Self::B => RegionKind::BankB,
        }
    }

    pub const fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

impl TryFrom<u8> for BankId {
    type Error = MetadataError;

    fn try_from(flag: u8) -> Result<Self, Self::Error> {
        match flag {
            BANK_A_FLAG => Ok(Self::A),
            BANK_B_FLAG => Ok(Self::B),
            other => Err(MetadataError::InvalidArgument(other)),
        }
    }
}

impl FromStr for BankId {
    type Err = MetadataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" | "a" => Ok(Self::A),
            "B" | "b" => Ok(Self::B),
            other => Err(MetadataError::UnknownBank(other.to_string())),
        }
    }
}

impl fmt::Display for BankId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::A => "A",
            Self::B => "B",
        })
    }
}

/// Contents supplied for one bank when preparing a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BankImage<'a> {
    Present(&'a [u8]),
    Absent,
}

impl<'a> From<Option<&'a [u8]>> for BankImage<'a> {
    fn from(image: Option<&'a [u8]>) -> Self {
        match image {
            Some(bytes) => Self::Present(bytes),
            None => Self::Absent,
        }
    }
}

/// Outcome of checking a bank image against a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BankCheck {
    Match,
    /// Record describes the bank as never programmed.
    NotProgrammed,
    SizeMismatch { expected: u32, actual: usize },
    /// Recorded size matches but is not a whole number of words, so no CRC
    /// can be computed. Only a hand-made record gets here.
    Unaligned { len: usize },
    CrcMismatch { expected: u32, actual: u32 },
}

// --- Record ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootloaderMetadataRecord {
    pub active_bank: BankId,
    pub bank_a_size: u32,
    pub bank_b_size: u32,
    pub bank_a_crc32: u32,
    pub bank_b_crc32: u32,
}

impl BootloaderMetadataRecord {
    /// Record with both banks unprogrammed.
    pub const fn empty(active_bank: BankId) -> Self {
        Self {
            active_bank,
            bank_a_size: 0,
            bank_b_size: 0,
            bank_a_crc32: CRC32_INIT,
            bank_b_crc32: CRC32_INIT,
        }
    }

    /// Build the record for a preparation run.
    ///
    /// Each present image is checked against its bank budget and checksummed
    /// over its real length. Absent banks get size 0 and CRC `0xFFFFFFFF`.
    pub fn build(
        layout: &BankLayout,
        active_bank: BankId,
        bank_a: BankImage<'_>,
        bank_b: BankImage<'_>,
    ) -> Result<Self, MetadataError> {
        let (bank_a_size, bank_a_crc32) = describe_bank(layout, BankId::A, bank_a)?;
        let (bank_b_size, bank_b_crc32) = describe_bank(layout, BankId::B, bank_b)?;

        Ok(Self {
            active_bank,
            bank_a_size,
            bank_b_size,
            bank_a_crc32,
            bank_b_crc32,
        })
    }

    pub fn active_bank_flag(&self) -> u8 {
        self.active_bank.flag()
    }

    /// `(size, crc32)` recorded for `bank`.
    pub fn bank(&self, bank: BankId) -> (u32, u32) {
        match bank {
            BankId::A => (self.bank_a_size, self.bank_a_crc32),
            BankId::B => (self.bank_b_size, self.bank_b_crc32),
        }
    }

    pub fn to_bytes(&self) -> [u8; METADATA_SIZE] {
        let mut out = [0u8; METADATA_SIZE];
        out[0] = self.active_bank.flag();
        // out[1..4] reserved, left zero
        out[4..8].copy_from_slice(&self.bank_a_size.to_le_bytes());
        out[8..12].copy_from_slice(&self.bank_b_size.to_le_bytes());
        out[12..16].copy_from_slice(&self.bank_a_crc32.to_le_bytes());
        out[16..20].copy_from_slice(&self.bank_b_crc32.to_le_bytes());
        out
    }

    /// Decode a record. Reserved bytes are ignored.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MetadataError> {
        if bytes.len() != METADATA_SIZE {
            return Err(MetadataError::InvalidLength {
                expected: METADATA_SIZE,
                actual: bytes.len(),
            });
        }

        let word = |offset: usize| {
            u32::from_le_bytes([
                bytes[offset],
                bytes[offset + 1],
                bytes[offset + 2],
                bytes[offset + 3],
            ])
        };

        Ok(Self {
            active_bank: BankId::try_from(bytes[0])?,
            bank_a_size: word(4),
            bank_b_size: word(8),
            bank_a_crc32: word(12),
            bank_b_crc32: word(16),
        })
    }

    /// Check `image` against what the record says about `bank`, the same way
    /// the bootloader does before trusting it.
    pub fn verify_bank(&self, bank: BankId, image: &[u8]) -> BankCheck {
        let (size, crc) = self.bank(bank);
        if size == 0 {
            return BankCheck::NotProgrammed;
        }
        if image.len() != size as usize {
            return BankCheck::SizeMismatch {
                expected: size,
                actual: image.len(),
            };
        }
        match checksum::compute(image) {
            Ok(actual) if actual == crc => BankCheck::Match,
            Ok(actual) => BankCheck::CrcMismatch {
                expected: crc,
                actual,
            },
            Err(_) => BankCheck::Unaligned { len: image.len() },
        }
    }
}

fn describe_bank(
    layout: &BankLayout,
    bank: BankId,
    image: BankImage<'_>,
) -> Result<(u32, u32), MetadataError> {
    match image {
        BankImage::Present(bytes) => {
            layout.fits(bytes.len(), bank.region())?;
            let crc = checksum::compute(bytes)?;
            Ok((bytes.len() as u32, crc))
        }
        BankImage::Absent => Ok((0, CRC32_INIT)),
    }
}

/// Pad `image` with erased bytes up to the full size of `bank`.
///
/// Produces a bank-sized file for tools that program whole banks. The
/// metadata CRC is still computed over the unpadded image.
pub fn pad_to_bank(layout: &BankLayout, bank: BankId, image: &[u8]) -> Result<Vec<u8>, SizeExceeded> {
    layout.fits(image.len(), bank.region())?;
    let mut out = Vec::with_capacity(layout.bank(bank).size as usize);
    out.extend_from_slice(image);
    out.resize(layout.bank(bank).size as usize, ERASED_BYTE);
    Ok(out)
}
