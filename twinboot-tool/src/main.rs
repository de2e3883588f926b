// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Host tool for the STM32 A/B bootloader images.
//!
//! Usage:
//!   twinboot merge bootloader.bin firmware.bin -o merged_firmware.bin
//!   twinboot metadata --active A --bank-a firmware_a.bin --bank-b firmware_b.bin
//!   twinboot dist firmware.bin --out-dir FOTA_Firmware
//!   twinboot flash merged_firmware.bin --target merged --probe jlink

mod cli;
mod commands;
mod config;
mod dist;
mod logging;
mod probe;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    logging::setup_logging(args.log_level())?;
    cli::run(args)
}
