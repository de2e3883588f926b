// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Flash layout selection: built-in presets or a TOML layout file.
//!
//! ```toml
//! flash_size = 65536   # optional, defaults to the span of the regions
//!
//! [bootloader]
//! base = 0x08000000
//! size = 8192
//!
//! [bank_a]
//! base = 0x08002000
//! size = 24576
//!
//! [bank_b]
//! base = 0x08008000
//! size = 24576
//!
//! [data]
//! base = 0x0800E000
//! size = 8192
//! ```

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use twinboot_common::{BankLayout, Region};

/// Built-in layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LayoutPreset {
    /// Bootloader 8K, bank A 24K, bank B 24K, data 8K
    DualBank,
    /// Bootloader 8K, application 56K, no bank B or data area
    SingleApp,
}

impl LayoutPreset {
    pub fn layout(self) -> BankLayout {
        match self {
            Self::DualBank => BankLayout::stm32f103c8_dual_bank(),
            Self::SingleApp => BankLayout::stm32f103c8_single_app(),
        }
    }
}

/// On-disk form of a layout. Validated through [`BankLayout::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayoutFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flash_size: Option<u32>,
    pub bootloader: Region,
    pub bank_a: Region,
    pub bank_b: Region,
    pub data: Region,
}

impl From<&BankLayout> for LayoutFile {
    fn from(layout: &BankLayout) -> Self {
        let [(_, bootloader), (_, bank_a), (_, bank_b), (_, data)] = layout.regions();
        Self {
            flash_size: layout.declared_flash_size(),
            bootloader,
            bank_a,
            bank_b,
            data,
        }
    }
}

/// Parse and validate a TOML layout description.
pub fn parse_layout(text: &str) -> Result<BankLayout> {
    let file: LayoutFile = toml::from_str(text).context("Invalid layout file")?;
    let layout = BankLayout::new(file.bootloader, file.bank_a, file.bank_b, file.data)
        .context("Inconsistent flash layout")?;
    match file.flash_size {
        Some(size) => layout.with_flash_size(size).context("Inconsistent flash layout"),
        None => Ok(layout),
    }
}

/// Render a layout as TOML, suitable for `--layout-file`.
pub fn render_layout(layout: &BankLayout) -> Result<String> {
    toml::to_string(&LayoutFile::from(layout)).context("Failed to serialize layout")
}

/// Resolve the layout for this run. A layout file takes precedence over the preset.
pub fn load_layout(preset: LayoutPreset, file: Option<&Path>) -> Result<BankLayout> {
    let Some(path) = file else {
        tracing::debug!("Using {:?} layout preset", preset);
        return Ok(preset.layout());
    };

    let text =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let layout = parse_layout(&text).with_context(|| format!("In {}", path.display()))?;
    tracing::debug!("Loaded layout from {}", path.display());
    Ok(layout)
}
