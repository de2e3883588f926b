// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Merge a bootloader and an application into one image flashed at the bootloader base.
//!
//! ```text
//! 0                 len(bootloader)              app_offset          app_offset + len(app)
//! | bootloader bytes | 0xFF ...................... | application bytes |
//! ```
//!
//! The output stops at the end of the application rather than covering the
//! whole flash, so the file stays small while every byte still lands at its
//! absolute address.

use alloc::vec;
use alloc::vec::Vec;

use crate::error::MergeError;
use crate::header::{FirmwareHeader, HeaderAbsent};
use crate::layout::{BankLayout, RegionKind, ERASED_BYTE};

/// Result of [`merge`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedImage {
    bytes: Vec<u8>,
    bootloader_len: usize,
    app_offset: usize,
    /// Header found in the application. Advisory only: a missing header does
    /// not stop the merge.
    pub header: Result<FirmwareHeader, HeaderAbsent>,
}

/// Memory usage of a merged image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergeStats {
    pub bootloader_len: usize,
    /// Padding between the end of the bootloader and the application.
    pub gap_len: usize,
    pub app_len: usize,
    pub total_len: usize,
    /// Flash left after the merged image, zero if it does not fit.
    pub free_len: usize,
    pub flash_used_percent: f32,
}

impl MergedImage {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn app_offset(&self) -> usize {
        self.app_offset
    }

    pub fn bootloader(&self) -> &[u8] {
        &self.bytes[..self.bootloader_len]
    }

    pub fn application(&self) -> &[u8] {
        &self.bytes[self.app_offset..]
    }

    pub fn stats(&self, flash_size: usize) -> MergeStats {
        let total_len = self.bytes.len();
        let flash_used_percent = if flash_size == 0 {
            0.0
        } else {
            total_len as f32 * 100.0 / flash_size as f32
        };

        MergeStats {
            bootloader_len: self.bootloader_len,
            gap_len: self.app_offset - self.bootloader_len,
            app_len: total_len - self.app_offset,
            total_len,
            free_len: flash_size.saturating_sub(total_len),
            flash_used_percent,
        }
    }
}

/// Merge `bootloader` and `app` according to `layout`.
///
/// Both budgets are checked before anything is allocated, so a failed merge
/// produces no partial output.
pub fn merge(layout: &BankLayout, bootloader: &[u8], app: &[u8]) -> Result<MergedImage, MergeError> {
    layout.fits(bootloader.len(), RegionKind::Bootloader)?;
    layout.fits(app.len(), RegionKind::BankA)?;

    let header = FirmwareHeader::read(app);

    let app_offset = layout.app_offset();
    let mut bytes = vec![ERASED_BYTE; app_offset + app.len()];
    bytes[..bootloader.len()].copy_from_slice(bootloader);
    bytes[app_offset..].copy_from_slice(app);

    Ok(MergedImage {
        bytes,
        bootloader_len: bootloader.len(),
        app_offset,
        header,
    })
}
