// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Application image header: the 64-byte block the firmware links at offset 0.
//!
//! ```text
//! offset  field
//! 0x00    magic          0xDEADBEEF
//! 0x04    version        major<<16 | minor<<8 | patch
//! 0x08    declared_size  size the image claims for itself
//! 0x0C    crc32          checksum the image carries
//! 0x10    flags          opaque to the host
//! 0x14    reserved up to 0x40
//! ```
//!
//! A missing header is not an error: the image is still flashable, it just
//! carries no version information.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Size of the header block at the start of every application image.
pub const HEADER_SIZE: usize = 64;

/// Sentinel marking a valid header.
pub const FIRMWARE_MAGIC: u32 = 0xDEAD_BEEF;

// --- Version ---

/// Semantic version as packed into the header `version` word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

impl Version {
    pub const fn new(major: u8, minor: u8, patch: u8) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Pack as `major<<16 | minor<<8 | patch`.
    pub const fn pack(self) -> u32 {
        (self.major as u32) << 16 | (self.minor as u32) << 8 | self.patch as u32
    }

    /// Unpack the low 24 bits of a version word. Bits 24..31 are ignored.
    pub const fn unpack(word: u32) -> Self {
        Self {
            major: (word >> 16) as u8,
            minor: (word >> 8) as u8,
            patch: word as u8,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}.{}", self.major, self.minor, self.patch)
    }
}

// --- Header ---

/// Why an image carries no usable header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderAbsent {
    /// Image is shorter than [`HEADER_SIZE`].
    TooShort { len: usize },
    /// Image is long enough but the first word is not [`FIRMWARE_MAGIC`].
    MagicMismatch { found: u32 },
}

impl fmt::Display for HeaderAbsent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort { len } => write!(
                f,
                "image too short for a header ({} bytes < {} bytes)",
                len, HEADER_SIZE
            ),
            Self::MagicMismatch { found } => write!(
                f,
                "header magic mismatch: expected 0x{:08X}, found 0x{:08X}",
                FIRMWARE_MAGIC, found
            ),
        }
    }
}

/// Read-only view of a valid firmware header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareHeader {
    pub magic: u32,
    pub version: u32,
    pub declared_size: u32,
    pub crc32: u32,
    pub flags: u32,
}

impl FirmwareHeader {
    /// Read the header from the start of `image`, reporting why it is absent.
    pub fn read(image: &[u8]) -> Result<Self, HeaderAbsent> {
        if image.len() < HEADER_SIZE {
            return Err(HeaderAbsent::TooShort { len: image.len() });
        }

        let word = |offset: usize| {
            u32::from_le_bytes([
                image[offset],
                image[offset + 1],
                image[offset + 2],
                image[offset + 3],
            ])
        };

        let magic = word(0);
        if magic != FIRMWARE_MAGIC {
            return Err(HeaderAbsent::MagicMismatch { found: magic });
        }

        Ok(Self {
            magic,
            version: word(4),
            declared_size: word(8),
            crc32: word(12),
            flags: word(16),
        })
    }

    /// Parse the header, discarding the reason when it is absent.
    pub fn parse(image: &[u8]) -> Option<Self> {
        Self::read(image).ok()
    }

    pub fn semver(&self) -> Version {
        Version::unpack(self.version)
    }

    /// Version as `v{major}.{minor}.{patch}`, used in distribution file names.
    pub fn version_str(&self) -> alloc::string::String {
        use alloc::string::ToString;
        self.semver().to_string()
    }

    /// Whether `declared_size` agrees with the real image length.
    pub fn size_matches(&self, actual_len: usize) -> bool {
        self.declared_size as usize == actual_len
    }
}
