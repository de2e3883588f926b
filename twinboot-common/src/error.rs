// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Error types shared by the image model.

use alloc::string::String;

use thiserror::Error;

use crate::layout::RegionKind;

/// Checksum input was not a whole number of 32-bit words.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumError {
    #[error("checksum input length {len} is not a multiple of 4 bytes")]
    InvalidInputLength { len: usize },
}

/// An image does not fit the region it is destined for.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{region} image too large: {declared} bytes > {limit} bytes")]
pub struct SizeExceeded {
    pub region: RegionKind,
    pub declared: usize,
    pub limit: usize,
}

/// The memory map handed to [`crate::BankLayout::new`] is inconsistent.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutError {
    #[error("{region} region has zero size")]
    EmptyRegion { region: RegionKind },

    #[error("flash size {flash_size} bytes is smaller than the {required} bytes the regions span")]
    FlashTooSmall { flash_size: u32, required: u64 },

    #[error("{region} base 0x{base:08X} is not above {previous} base 0x{previous_base:08X}")]
    NotAscending {
        region: RegionKind,
        base: u32,
        previous: RegionKind,
        previous_base: u32,
    },

    #[error("{region} ends at 0x{end:08X}, overlapping {next} at 0x{next_base:08X}")]
    Overlap {
        region: RegionKind,
        end: u64,
        next: RegionKind,
        next_base: u32,
    },

    #[error("{region} region at 0x{base:08X} (+{size} bytes) runs past the 32-bit address space")]
    AddressOverflow {
        region: RegionKind,
        base: u32,
        size: u32,
    },
}

/// Failures while building or decoding a bootloader metadata record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetadataError {
    #[error("invalid active bank selector 0x{0:02X} (expected 0xAA for A or 0xBB for B)")]
    InvalidArgument(u8),

    #[error("unknown bank {0:?} (expected A or B)")]
    UnknownBank(String),

    #[error("metadata record must be exactly {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error(transparent)]
    SizeExceeded(#[from] SizeExceeded),

    #[error(transparent)]
    Checksum(#[from] ChecksumError),
}

/// Failures of the image merge.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeError {
    #[error(transparent)]
    SizeExceeded(#[from] SizeExceeded),
}
