// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Firmware image model for the STM32 A/B bootloader.
//!
//! This crate supports both `no_std` (embedded) and `std` (host) environments:
//! - Default: `no_std` + `alloc`, usable from a bootloader or an on-device updater
//! - `std` feature: Enables `std` support for host tools
//!
//! Everything here is pure computation on caller-supplied byte buffers. File
//! I/O, probe invocation and reporting live in the host tool.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod checksum;
pub mod error;
pub mod header;
pub mod layout;
pub mod merge;
pub mod metadata;

// Re-export commonly used types
pub use checksum::{Stm32Crc, CRC32_INIT, CRC32_POLYNOMIAL};
pub use error::{ChecksumError, LayoutError, MergeError, MetadataError, SizeExceeded};
pub use header::{FirmwareHeader, HeaderAbsent, Version, FIRMWARE_MAGIC, HEADER_SIZE};
pub use layout::{BankLayout, Region, RegionKind, ERASED_BYTE};
pub use merge::{merge, MergeStats, MergedImage};
pub use metadata::{BankCheck, BankId, BankImage, BootloaderMetadataRecord, METADATA_SIZE};
