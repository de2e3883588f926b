// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command implementations: file I/O and reporting around the image model.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

use twinboot_common::metadata::pad_to_bank;
use twinboot_common::{
    checksum, merge as merge_images, BankCheck, BankId, BankImage, BankLayout,
    BootloaderMetadataRecord, FirmwareHeader, HeaderAbsent, MergeStats, RegionKind,
    METADATA_SIZE,
};

use crate::cli::FlashTarget;
use crate::dist;
use crate::probe::{ProbeInvocation, ProbeKind};

fn read_image(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn write_image(path: &Path, data: &[u8]) -> Result<()> {
    fs::write(path, data).with_context(|| format!("Failed to write {}", path.display()))
}

fn kb(len: usize) -> f64 {
    len as f64 / 1024.0
}

fn percent(len: usize, limit: u32) -> f64 {
    len as f64 * 100.0 / f64::from(limit)
}

/// Print the layout as a table, or as a TOML layout file.
pub fn show_layout(layout: &BankLayout, as_toml: bool) -> Result<()> {
    if as_toml {
        print!("{}", crate::config::render_layout(layout)?);
        return Ok(());
    }

    println!("Flash Layout:");
    for (kind, region) in layout.regions() {
        if region.is_empty() {
            println!("  {:<11} (unused)", kind.to_string());
            continue;
        }
        println!(
            "  {:<11} 0x{:08X}-0x{:08X} ({} KB)",
            kind.to_string(),
            region.base,
            region.end() - 1,
            region.size / 1024
        );
    }
    println!("  App offset: 0x{:X}", layout.app_offset());
    if let Some(size) = layout.declared_flash_size() {
        println!("  Flash size: {} KB", size / 1024);
    }
    Ok(())
}

/// Memory usage block of the merge report.
fn memory_statistics(layout: &BankLayout, stats: &MergeStats) -> String {
    let mut s = String::new();
    // Writing to a String cannot fail.
    let _ = writeln!(s, "Memory Statistics:");
    let _ = writeln!(
        s,
        "  Bootloader:  {:6} bytes @ 0x{:08X}",
        stats.bootloader_len,
        layout.bootloader().base
    );
    let _ = writeln!(s, "  Gap:         {:6} bytes (0xFF padding)", stats.gap_len);
    let _ = writeln!(
        s,
        "  Application: {:6} bytes @ 0x{:08X}",
        stats.app_len,
        layout.application().base
    );
    let _ = writeln!(
        s,
        "  Merged file: {:6} bytes ({:.2} KB)",
        stats.total_len,
        kb(stats.total_len)
    );
    let _ = writeln!(
        s,
        "  Flash used:  {:.1}% ({}/{})",
        stats.flash_used_percent,
        stats.total_len,
        layout.flash_size()
    );
    let _ = writeln!(
        s,
        "  Flash free:  {:6} bytes ({:.1} KB)",
        stats.free_len,
        kb(stats.free_len)
    );
    s
}

/// Merge bootloader and application into one image.
pub fn merge(layout: &BankLayout, bootloader: &Path, app: &Path, output: &Path) -> Result<()> {
    let bl_image = read_image(bootloader)?;
    let app_image = read_image(app)?;
    let bl_region = layout.bootloader();
    let app_region = layout.application();

    println!(
        "Bootloader:  {} ({} bytes, {:.2} KB, {:.1}% of {} KB)",
        bootloader.display(),
        bl_image.len(),
        kb(bl_image.len()),
        percent(bl_image.len(), bl_region.size),
        bl_region.size / 1024
    );
    println!(
        "Application: {} ({} bytes, {:.2} KB, {:.1}% of {} KB)",
        app.display(),
        app_image.len(),
        kb(app_image.len()),
        percent(app_image.len(), app_region.size),
        app_region.size / 1024
    );

    let merged = merge_images(layout, &bl_image, &app_image)?;

    match &merged.header {
        Ok(header) => println!(
            "Header:      magic 0x{:08X}, version {}",
            header.magic,
            header.version_str()
        ),
        Err(absent) => {
            tracing::warn!("{}", absent);
            println!("[WARN] Firmware header not valid: {}", absent);
        }
    }

    println!();
    print!("{}", memory_statistics(layout, &merged.stats(layout.flash_size())));

    write_image(output, merged.as_bytes())?;
    tracing::info!("Wrote {} bytes to {}", merged.len(), output.display());

    println!();
    println!("Merged firmware written to {}", output.display());
    println!(
        "Flash it at 0x{:08X}: twinboot flash {} --target merged",
        bl_region.base,
        output.display()
    );
    Ok(())
}

/// Build and write the bootloader metadata record.
pub fn metadata(
    layout: &BankLayout,
    active: BankId,
    bank_a: Option<&Path>,
    bank_b: Option<&Path>,
    output: &Path,
) -> Result<()> {
    if layout.data().is_empty() {
        bail!("Layout has no data area to hold the metadata record");
    }
    let image_a = bank_a.map(read_image).transpose()?;
    let image_b = bank_b.map(read_image).transpose()?;

    for (bank, image) in [(BankId::A, &image_a), (BankId::B, &image_b)] {
        match image {
            Some(image) => tracing::debug!("Bank {} firmware: {} bytes", bank, image.len()),
            None => tracing::warn!("Bank {} firmware not provided, using default values", bank),
        }
    }

    let record = BootloaderMetadataRecord::build(
        layout,
        active,
        BankImage::from(image_a.as_deref()),
        BankImage::from(image_b.as_deref()),
    )?;

    write_image(output, &record.to_bytes())?;

    println!("Bootloader metadata:");
    print_record(&record);
    println!("  Output:       {} ({} bytes)", output.display(), METADATA_SIZE);
    println!();
    println!("Flash instructions:");
    println!("  bootloader           -> 0x{:08X}", layout.bootloader().base);
    for (bank, path) in [(BankId::A, bank_a), (BankId::B, bank_b)] {
        if let Some(path) = path {
            println!(
                "  {:<20} -> 0x{:08X} (bank {})",
                path.display().to_string(),
                layout.bank(bank).base,
                bank
            );
        }
    }
    println!(
        "  {:<20} -> 0x{:08X} (data)",
        output.display().to_string(),
        layout.data().base
    );
    Ok(())
}

fn print_record(record: &BootloaderMetadataRecord) {
    println!(
        "  Active bank:  {} (0x{:02X})",
        record.active_bank,
        record.active_bank_flag()
    );
    for bank in [BankId::A, BankId::B] {
        let (size, crc) = record.bank(bank);
        println!("  Bank {} size:  {} bytes", bank, size);
        println!("  Bank {} CRC32: 0x{:08X}", bank, crc);
    }
}

/// Report the header of an application image.
pub fn inspect(file: &Path) -> Result<()> {
    let image = read_image(file)?;

    println!(
        "Image: {} ({} bytes, {:.2} KB)",
        file.display(),
        image.len(),
        kb(image.len())
    );

    match FirmwareHeader::read(&image) {
        Ok(header) => {
            println!("  Magic:         0x{:08X}", header.magic);
            println!(
                "  Version:       {} (0x{:08X})",
                header.version_str(),
                header.version
            );
            println!("  Declared size: {} bytes", header.declared_size);
            println!("  Header CRC32:  0x{:08X}", header.crc32);
            println!("  Flags:         0x{:08X}", header.flags);
            if !header.size_matches(image.len()) {
                tracing::warn!(
                    "Declared size {} differs from file size {}",
                    header.declared_size,
                    image.len()
                );
            }
        }
        Err(HeaderAbsent::TooShort { len }) => {
            println!("  No header: image is only {} bytes", len);
        }
        Err(absent @ HeaderAbsent::MagicMismatch { .. }) => {
            println!("  No header: {}", absent);
        }
    }

    match checksum::compute(&image) {
        Ok(crc) => println!("  Image CRC32:   0x{:08X} (STM32 hardware CRC)", crc),
        Err(e) => println!("  Image CRC32:   n/a ({})", e),
    }
    Ok(())
}

/// Decode and print a metadata record file.
pub fn decode_metadata(file: &Path) -> Result<()> {
    let bytes = read_image(file)?;
    let record = BootloaderMetadataRecord::from_bytes(&bytes)
        .with_context(|| format!("Invalid metadata record {}", file.display()))?;

    println!("Metadata record: {}", file.display());
    print_record(&record);
    Ok(())
}

/// Check bank images against a metadata record.
pub fn verify(record_path: &Path, bank_a: Option<&Path>, bank_b: Option<&Path>) -> Result<()> {
    let bytes = read_image(record_path)?;
    let record = BootloaderMetadataRecord::from_bytes(&bytes)
        .with_context(|| format!("Invalid metadata record {}", record_path.display()))?;

    let mut failures = 0;
    for (bank, path) in [(BankId::A, bank_a), (BankId::B, bank_b)] {
        let Some(path) = path else {
            continue;
        };
        let image = read_image(path)?;

        match record.verify_bank(bank, &image) {
            BankCheck::Match => println!("Bank {}: OK ({})", bank, path.display()),
            BankCheck::NotProgrammed => {
                failures += 1;
                println!("Bank {}: record marks the bank as not programmed", bank);
            }
            BankCheck::SizeMismatch { expected, actual } => {
                failures += 1;
                println!(
                    "Bank {}: size mismatch, record {} bytes, file {} bytes",
                    bank, expected, actual
                );
            }
            BankCheck::Unaligned { len } => {
                failures += 1;
                println!(
                    "Bank {}: {} bytes is not a whole number of words, no CRC to compare",
                    bank, len
                );
            }
            BankCheck::CrcMismatch { expected, actual } => {
                failures += 1;
                println!(
                    "Bank {}: CRC mismatch, record 0x{:08X}, file 0x{:08X}",
                    bank, expected, actual
                );
            }
        }
    }

    if failures > 0 {
        bail!("{} bank(s) failed verification", failures);
    }
    if bank_a.is_none() && bank_b.is_none() {
        tracing::warn!("No bank images given, nothing verified");
    }
    Ok(())
}

/// Pad an image to a full bank.
pub fn pad(layout: &BankLayout, bank: BankId, input: &Path, output: &Path) -> Result<()> {
    let image = read_image(input)?;
    let padded = pad_to_bank(layout, bank, &image)?;
    write_image(output, &padded)?;

    println!(
        "Padded {} ({} bytes) to {} bytes for bank {}: {}",
        input.display(),
        image.len(),
        padded.len(),
        bank,
        output.display()
    );
    Ok(())
}

/// Copy an application into the distribution folder.
pub fn dist(layout: &BankLayout, app: &Path, out_dir: &Path, prefix: &str) -> Result<()> {
    let now = chrono::Local::now().naive_local();
    let (bundle, header) = dist::distribute(app, out_dir, prefix, layout.application(), &now)?;

    println!("Magic:   0x{:08X}", header.magic);
    println!("Version: {} (0x{:08X})", header.version_str(), header.version);
    println!("Flags:   0x{:08X}", header.flags);
    println!();
    println!("Created:");
    println!("  {}", bundle.image.display());
    println!("  {}", bundle.latest.display());
    println!("  {}", bundle.info.display());
    println!();
    println!("Flash directly at 0x{:08X}", layout.application().base);
    Ok(())
}

/// Check that `len` bytes can go to `target`.
fn check_flash_target(layout: &BankLayout, target: FlashTarget, len: usize) -> Result<()> {
    match target {
        FlashTarget::Merged => {
            let limit = layout.flash_size();
            if len > limit {
                bail!("Merged image too large: {} bytes > {} bytes", len, limit);
            }
        }
        FlashTarget::App | FlashTarget::BankA => layout.fits(len, RegionKind::BankA)?,
        FlashTarget::BankB => {
            if layout.bank(BankId::B).is_empty() {
                bail!("Layout has no bank B");
            }
            layout.fits(len, RegionKind::BankB)?
        }
        FlashTarget::Metadata => {
            if layout.data().is_empty() {
                bail!("Layout has no data area to hold the metadata record");
            }
            if len != METADATA_SIZE {
                bail!(
                    "Metadata record must be exactly {} bytes, got {}",
                    METADATA_SIZE,
                    len
                );
            }
        }
    }
    Ok(())
}

/// Flash an image through an external probe tool.
pub fn flash(
    layout: &BankLayout,
    file: &Path,
    target: FlashTarget,
    probe: ProbeKind,
    probe_path: Option<&Path>,
    address: Option<u32>,
    device: &str,
) -> Result<()> {
    let image = read_image(file)?;
    check_flash_target(layout, target, image.len())?;

    if matches!(
        target,
        FlashTarget::App | FlashTarget::BankA | FlashTarget::BankB
    ) {
        if let Err(absent) = FirmwareHeader::read(&image) {
            tracing::warn!("{}: {}", file.display(), absent);
        }
    }

    let address = address.unwrap_or_else(|| target.address(layout));
    println!(
        "Flashing {} ({} bytes) to 0x{:08X}...",
        file.display(),
        image.len(),
        address
    );

    let invocation = ProbeInvocation::flash(probe, probe_path, device, file, address);
    let outcome = invocation.run()?;
    tracing::debug!("probe stdout:\n{}", outcome.stdout);

    println!("Flash complete.");
    if target == FlashTarget::App {
        println!("Note: only the application was written; the bootloader must already be present.");
    }
    Ok(())
}

/// Launch the RTT viewer and wait for it to exit.
pub fn rtt(device: &str, viewer_path: Option<&Path>) -> Result<()> {
    let invocation = ProbeInvocation::rtt_viewer(viewer_path, device);
    println!("Starting RTT viewer: {}", invocation.command_line());

    let status = invocation
        .run_interactive()
        .context("RTT viewer unavailable (alternatives: JLinkRTTClient for a console, JLinkRTTLogger for a file)")?;

    if !status.success() {
        bail!("RTT viewer exited with {}", status);
    }
    Ok(())
}
