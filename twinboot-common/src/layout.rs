// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Flash memory map: bootloader, bank A, bank B and the metadata (data) area.
//!
//! A [`BankLayout`] is an immutable value handed to every operation that
//! needs addresses or size budgets, so several layouts (device presets, test
//! fixtures with tiny regions) can coexist.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{LayoutError, SizeExceeded};
use crate::metadata::BankId;

/// Value read back from erased flash; used as padding.
pub const ERASED_BYTE: u8 = 0xFF;

/// Names of the regions in a [`BankLayout`], in ascending address order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegionKind {
    Bootloader,
    BankA,
    BankB,
    Data,
}

impl RegionKind {
    pub const ALL: [RegionKind; 4] = [
        RegionKind::Bootloader,
        RegionKind::BankA,
        RegionKind::BankB,
        RegionKind::Data,
    ];
}

impl fmt::Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Bootloader => "bootloader",
            Self::BankA => "bank A",
            Self::BankB => "bank B",
            Self::Data => "data",
        })
    }
}

/// A contiguous span of flash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Region {
    pub base: u32,
    pub size: u32,
}

impl Region {
    pub const fn new(base: u32, size: u32) -> Self {
        Self { base, size }
    }

    /// First address past the region. `u64` so a region ending at 4 GiB is representable.
    pub const fn end(&self) -> u64 {
        self.base as u64 + self.size as u64
    }

    pub fn contains(&self, addr: u32) -> bool {
        addr >= self.base && (addr as u64) < self.end()
    }

    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }
}

/// Validated flash layout of the A/B scheme.
///
/// Bank B and the data area may be empty (size 0) for single-image layouts;
/// empty regions take no part in the ordering checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BankLayout {
    bootloader: Region,
    bank_a: Region,
    bank_b: Region,
    data: Region,
    /// Device flash size when it differs from what the regions span.
    flash_size: Option<u32>,
}

impl BankLayout {
    /// Build a layout, checking that the bootloader and bank A are non-empty
    /// and that all used regions are strictly ascending and non-overlapping.
    pub fn new(
        bootloader: Region,
        bank_a: Region,
        bank_b: Region,
        data: Region,
    ) -> Result<Self, LayoutError> {
        let layout = Self::from_regions(bootloader, bank_a, bank_b, data);
        layout.check()?;
        Ok(layout)
    }

    const fn from_regions(bootloader: Region, bank_a: Region, bank_b: Region, data: Region) -> Self {
        Self {
            bootloader,
            bank_a,
            bank_b,
            data,
            flash_size: None,
        }
    }

    /// Declare the device flash size used for usage reports and the merged
    /// image budget. Must cover every region.
    pub fn with_flash_size(self, flash_size: u32) -> Result<Self, LayoutError> {
        let required = self.regions_end() - u64::from(self.bootloader.base);
        if u64::from(flash_size) < required {
            return Err(LayoutError::FlashTooSmall {
                flash_size,
                required,
            });
        }
        Ok(Self {
            flash_size: Some(flash_size),
            ..self
        })
    }

    /// Flash size given through [`BankLayout::with_flash_size`], if any.
    pub fn declared_flash_size(&self) -> Option<u32> {
        self.flash_size
    }

    /// STM32F103C8 (64 KiB) A/B layout:
    ///
    /// ```text
    /// 0x0800_0000  bootloader   8 KiB
    /// 0x0800_2000  bank A      24 KiB
    /// 0x0800_8000  bank B      24 KiB
    /// 0x0800_E000  data         8 KiB
    /// ```
    pub const fn stm32f103c8_dual_bank() -> Self {
        Self::from_regions(
            Region::new(0x0800_0000, 8 * 1024),
            Region::new(0x0800_2000, 24 * 1024),
            Region::new(0x0800_8000, 24 * 1024),
            Region::new(0x0800_E000, 8 * 1024),
        )
    }

    /// STM32F103C8 layout for a single image: the application takes all
    /// 56 KiB after the bootloader. No bank B and no data area.
    pub const fn stm32f103c8_single_app() -> Self {
        Self::from_regions(
            Region::new(0x0800_0000, 8 * 1024),
            Region::new(0x0800_2000, 56 * 1024),
            Region::new(0x0801_0000, 0),
            Region::new(0x0801_0000, 0),
        )
    }

    fn check(&self) -> Result<(), LayoutError> {
        let regions = self.regions();

        for (kind, region) in regions {
            if region.is_empty() && matches!(kind, RegionKind::Bootloader | RegionKind::BankA) {
                return Err(LayoutError::EmptyRegion { region: kind });
            }
            if region.end() > u64::from(u32::MAX) + 1 {
                return Err(LayoutError::AddressOverflow {
                    region: kind,
                    base: region.base,
                    size: region.size,
                });
            }
        }

        let mut previous: Option<(RegionKind, Region)> = None;
        for (kind, region) in regions.into_iter().filter(|(_, r)| !r.is_empty()) {
            if let Some((prev_kind, prev)) = previous {
                if region.base <= prev.base {
                    return Err(LayoutError::NotAscending {
                        region: kind,
                        base: region.base,
                        previous: prev_kind,
                        previous_base: prev.base,
                    });
                }
                if prev.end() > u64::from(region.base) {
                    return Err(LayoutError::Overlap {
                        region: prev_kind,
                        end: prev.end(),
                        next: kind,
                        next_base: region.base,
                    });
                }
            }
            previous = Some((kind, region));
        }

        Ok(())
    }

    fn regions_end(&self) -> u64 {
        self.regions()
            .iter()
            .map(|(_, r)| r.end())
            .max()
            .unwrap_or(u64::from(self.bootloader.base))
    }

    /// All regions paired with their names, in address order.
    pub fn regions(&self) -> [(RegionKind, Region); 4] {
        [
            (RegionKind::Bootloader, self.bootloader),
            (RegionKind::BankA, self.bank_a),
            (RegionKind::BankB, self.bank_b),
            (RegionKind::Data, self.data),
        ]
    }

    pub fn region(&self, kind: RegionKind) -> Region {
        match kind {
            RegionKind::Bootloader => self.bootloader,
            RegionKind::BankA => self.bank_a,
            RegionKind::BankB => self.bank_b,
            RegionKind::Data => self.data,
        }
    }

    pub fn bootloader(&self) -> Region {
        self.bootloader
    }

    /// The application region used by the merge flow. Always bank A.
    pub fn application(&self) -> Region {
        self.bank_a
    }

    pub fn data(&self) -> Region {
        self.data
    }

    pub fn bank(&self, bank: BankId) -> Region {
        self.region(bank.region())
    }

    /// Offset of the application region from the bootloader base.
    pub fn app_offset(&self) -> usize {
        (self.bank_a.base - self.bootloader.base) as usize
    }

    /// Device flash size if declared, else the bytes spanned from the
    /// bootloader base to the end of the last region.
    pub fn flash_size(&self) -> usize {
        match self.flash_size {
            Some(size) => size as usize,
            None => (self.regions_end() - u64::from(self.bootloader.base)) as usize,
        }
    }

    /// Check that an image of `image_len` bytes fits `kind`.
    pub fn fits(&self, image_len: usize, kind: RegionKind) -> Result<(), SizeExceeded> {
        let limit = self.region(kind).size as usize;
        if image_len > limit {
            return Err(SizeExceeded {
                region: kind,
                declared: image_len,
                limit,
            });
        }
        Ok(())
    }
}

impl Default for BankLayout {
    fn default() -> Self {
        Self::stm32f103c8_dual_bank()
    }
}
