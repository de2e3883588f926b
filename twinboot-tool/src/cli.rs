// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command-line interface definitions.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

use twinboot_common::{BankId, BankLayout};

use crate::commands;
use crate::config::{self, LayoutPreset};
use crate::logging::LevelFilter;
use crate::probe::ProbeKind;

/// Default target MCU passed to probe tools.
pub const DEFAULT_DEVICE: &str = "STM32F103C8";

/// Command-line arguments.
#[derive(Parser)]
#[command(name = "twinboot")]
#[command(about = "Build, inspect and flash images for the STM32 A/B bootloader")]
pub struct Cli {
    /// Built-in flash layout
    #[arg(long, value_enum, default_value_t = LayoutPreset::DualBank, global = true)]
    pub layout: LayoutPreset,

    /// TOML file describing the flash layout (overrides --layout)
    #[arg(long, value_name = "FILE", global = true, env = "TWINBOOT_LAYOUT")]
    pub layout_file: Option<PathBuf>,

    /// Log level on stderr (defaults to RUST_LOG, then WARN)
    #[arg(long, value_enum, global = true)]
    pub log_level: Option<LevelFilter>,

    /// Shorthand for --log-level DEBUG
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn log_level(&self) -> Option<LevelFilter> {
        match (self.log_level, self.verbose) {
            (Some(level), _) => Some(level),
            (None, true) => Some(LevelFilter::Debug),
            (None, false) => None,
        }
    }
}

/// Where an image is flashed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FlashTarget {
    /// Merged bootloader + application, at the bootloader base
    Merged,
    /// Standalone application at the application base; the bootloader stays in place
    App,
    /// Application image in bank A
    BankA,
    /// Application image in bank B
    BankB,
    /// 20-byte metadata record, at the data area base
    Metadata,
}

impl FlashTarget {
    pub fn address(self, layout: &BankLayout) -> u32 {
        match self {
            Self::Merged => layout.bootloader().base,
            Self::App => layout.application().base,
            Self::BankA => layout.bank(BankId::A).base,
            Self::BankB => layout.bank(BankId::B).base,
            Self::Metadata => layout.data().base,
        }
    }
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Print the flash layout in use
    Layout {
        /// Print as a TOML layout file instead of a table
        #[arg(long)]
        toml: bool,
    },

    /// Merge bootloader and application into one image flashed at the bootloader base
    Merge {
        /// Bootloader binary
        #[arg(value_name = "BOOTLOADER")]
        bootloader: PathBuf,

        /// Application binary
        #[arg(value_name = "APP")]
        app: PathBuf,

        /// Output file
        #[arg(short, long, default_value = "merged_firmware.bin")]
        output: PathBuf,
    },

    /// Prepare the 20-byte bootloader metadata record for the data area
    Metadata {
        /// Active bank (A or B)
        #[arg(short, long, value_parser = parse_bank)]
        active: BankId,

        /// Firmware binary programmed in bank A
        #[arg(long, value_name = "FILE")]
        bank_a: Option<PathBuf>,

        /// Firmware binary programmed in bank B
        #[arg(long, value_name = "FILE")]
        bank_b: Option<PathBuf>,

        /// Output file
        #[arg(short, long, default_value = "bootloader_data.bin")]
        output: PathBuf,
    },

    /// Show the firmware header of an application image
    Inspect {
        /// Application binary
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Decode a metadata record file
    DecodeMetadata {
        /// Metadata record (20 bytes)
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Check bank images against a metadata record
    Verify {
        /// Metadata record (20 bytes)
        #[arg(value_name = "RECORD")]
        record: PathBuf,

        /// Firmware binary expected in bank A
        #[arg(long, value_name = "FILE")]
        bank_a: Option<PathBuf>,

        /// Firmware binary expected in bank B
        #[arg(long, value_name = "FILE")]
        bank_b: Option<PathBuf>,
    },

    /// Pad an image with 0xFF to the full size of a bank
    Pad {
        /// Target bank (A or B)
        #[arg(short, long, value_parser = parse_bank)]
        bank: BankId,

        /// Input binary
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output binary
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,
    },

    /// Copy an application image into a FOTA distribution folder with an info sheet
    Dist {
        /// Application binary
        #[arg(value_name = "APP")]
        app: PathBuf,

        /// Distribution folder
        #[arg(long, default_value = "FOTA_Firmware")]
        out_dir: PathBuf,

        /// File name prefix
        #[arg(long, default_value = "MSU")]
        prefix: String,
    },

    /// Flash an image with an external probe tool
    Flash {
        /// Image to flash
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// What the image is (selects the flash address)
        #[arg(short, long, value_enum)]
        target: FlashTarget,

        /// Probe tool
        #[arg(short, long, value_enum, default_value_t = ProbeKind::StFlash)]
        probe: ProbeKind,

        /// Path to the probe executable (default: looked up on PATH)
        #[arg(long, value_name = "PATH")]
        probe_path: Option<PathBuf>,

        /// Override the flash address (hex)
        #[arg(short = 'a', long, value_parser = parse_hex_u32)]
        address: Option<u32>,

        /// Target device name passed to J-Link
        #[arg(long, default_value = DEFAULT_DEVICE)]
        device: String,
    },

    /// Launch the J-Link RTT viewer
    Rtt {
        /// Target device name
        #[arg(long, default_value = DEFAULT_DEVICE)]
        device: String,

        /// Path to JLinkRTTViewer (default: looked up on PATH)
        #[arg(long, value_name = "PATH")]
        viewer_path: Option<PathBuf>,
    },
}

/// Parse a bank selector (`A` or `B`).
fn parse_bank(s: &str) -> Result<BankId, String> {
    s.parse::<BankId>().map_err(|e| e.to_string())
}

/// Parse a hex string (with or without 0x prefix) into a u32.
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    let s = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u32::from_str_radix(s, 16).map_err(|e| format!("invalid hex value: {e}"))
}

/// Execute the parsed CLI command.
pub fn run(cli: Cli) -> Result<()> {
    let layout = config::load_layout(cli.layout, cli.layout_file.as_deref())?;

    match cli.command {
        Commands::Layout { toml } => commands::show_layout(&layout, toml),
        Commands::Merge {
            bootloader,
            app,
            output,
        } => commands::merge(&layout, &bootloader, &app, &output),
        Commands::Metadata {
            active,
            bank_a,
            bank_b,
            output,
        } => commands::metadata(
            &layout,
            active,
            bank_a.as_deref(),
            bank_b.as_deref(),
            &output,
        ),
        Commands::Inspect { file } => commands::inspect(&file),
        Commands::DecodeMetadata { file } => commands::decode_metadata(&file),
        Commands::Verify {
            record,
            bank_a,
            bank_b,
        } => commands::verify(&record, bank_a.as_deref(), bank_b.as_deref()),
        Commands::Pad {
            bank,
            input,
            output,
        } => commands::pad(&layout, bank, &input, &output),
        Commands::Dist {
            app,
            out_dir,
            prefix,
        } => commands::dist(&layout, &app, &out_dir, &prefix),
        Commands::Flash {
            file,
            target,
            probe,
            probe_path,
            address,
            device,
        } => commands::flash(
            &layout,
            &file,
            target,
            probe,
            probe_path.as_deref(),
            address,
            &device,
        ),
        Commands::Rtt {
            device,
            viewer_path,
        } => commands::rtt(&device, viewer_path.as_deref()),
    }
}
