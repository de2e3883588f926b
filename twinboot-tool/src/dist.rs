// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! FOTA distribution: versioned copy of an application image plus a text info sheet.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;

use twinboot_common::{checksum, FirmwareHeader, Region};

const RULE_WIDTH: usize = 60;

/// Files produced for one distribution run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    pub image: PathBuf,
    pub latest: PathBuf,
    pub info: PathBuf,
}

impl Bundle {
    /// `<prefix>_<version>_<YYYYmmdd_HHMMSS>.bin`, `<prefix>_latest.bin` and the matching `.txt`.
    pub fn new(out_dir: &Path, prefix: &str, version_str: &str, timestamp: &NaiveDateTime) -> Self {
        let stem = format!("{}_{}_{}", prefix, version_str, timestamp.format("%Y%m%d_%H%M%S"));
        Self {
            image: out_dir.join(format!("{stem}.bin")),
            latest: out_dir.join(format!("{prefix}_latest.bin")),
            info: out_dir.join(format!("{stem}.txt")),
        }
    }
}

/// Human-readable summary written next to the distributed image.
pub fn info_sheet(
    prefix: &str,
    header: &FirmwareHeader,
    image: &[u8],
    timestamp: &NaiveDateTime,
    application: Region,
) -> String {
    let image_crc = match checksum::compute(image) {
        Ok(crc) => format!("0x{:08X}", crc),
        Err(_) => "n/a (length not word aligned)".to_string(),
    };
    let app_last = application.end() - 1;

    let mut s = String::new();
    // Writing to a String cannot fail.
    let _ = writeln!(s, "{} Firmware Information", prefix);
    let _ = writeln!(s, "{}", "=".repeat(RULE_WIDTH));
    let _ = writeln!(s);
    let _ = writeln!(s, "Version:        {}", header.version_str());
    let _ = writeln!(s, "Build Date:     {}", timestamp.format("%Y%m%d"));
    let _ = writeln!(s, "Build Time:     {}", timestamp.format("%H:%M:%S"));
    let _ = writeln!(s, "File Size:      {} bytes", image.len());
    let _ = writeln!(s, "Header Magic:   0x{:08X}", header.magic);
    let _ = writeln!(s, "Header Version: 0x{:08X}", header.version);
    let _ = writeln!(s, "Header Size:    {} bytes", header.declared_size);
    let _ = writeln!(s, "Header Flags:   0x{:08X}", header.flags);
    let _ = writeln!(s, "Header CRC32:   0x{:08X}", header.crc32);
    let _ = writeln!(s, "Image CRC32:    {}", image_crc);
    let _ = writeln!(s);
    let _ = writeln!(s, "Memory Layout:");
    let _ = writeln!(
        s,
        "  Application: 0x{:08X}-0x{:08X} ({}KB)",
        application.base,
        app_last,
        application.size / 1024
    );
    let _ = writeln!(
        s,
        "  This firmware must be flashed to 0x{:08X}",
        application.base
    );
    s
}

/// Copy `app` into `out_dir` as a versioned image, a `latest` image and an info sheet.
///
/// Refuses images without a valid header: the version in the file name comes from it.
pub fn distribute(
    app: &Path,
    out_dir: &Path,
    prefix: &str,
    application: Region,
    timestamp: &NaiveDateTime,
) -> Result<(Bundle, FirmwareHeader)> {
    let image = fs::read(app).with_context(|| format!("Failed to read {}", app.display()))?;

    let header = match FirmwareHeader::read(&image) {
        Ok(header) => header,
        Err(absent) => bail!("Invalid firmware header in {}: {}", app.display(), absent),
    };

    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let bundle = Bundle::new(out_dir, prefix, &header.version_str(), timestamp);

    for target in [&bundle.image, &bundle.latest] {
        fs::write(target, &image)
            .with_context(|| format!("Failed to write {}", target.display()))?;
        tracing::debug!("Wrote {}", target.display());
    }

    let sheet = info_sheet(prefix, &header, &image, timestamp, application);
    fs::write(&bundle.info, sheet)
        .with_context(|| format!("Failed to write {}", bundle.info.display()))?;

    Ok((bundle, header))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use twinboot_common::{BankLayout, FIRMWARE_MAGIC};

    fn timestamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 14)
            .unwrap()
            .and_hms_opt(9, 5, 7)
            .unwrap()
    }

    fn app_image(len: usize) -> Vec<u8> {
        let mut image = vec![0x5Au8; len];
        image[0..4].copy_from_slice(&FIRMWARE_MAGIC.to_le_bytes());
        image[4..8].copy_from_slice(&0x0001_0203u32.to_le_bytes());
        image[8..12].copy_from_slice(&(len as u32).to_le_bytes());
        image[12..16].copy_from_slice(&0x1234_5678u32.to_le_bytes());
        image[16..20].copy_from_slice(&0x0000_0001u32.to_le_bytes());
        image
    }

    #[test]
    fn test_bundle_names() {
        let bundle = Bundle::new(Path::new("FOTA_Firmware"), "MSU", "v1.2.3", &timestamp());
        assert_eq!(
            bundle.image,
            Path::new("FOTA_Firmware/MSU_v1.2.3_20260314_090507.bin")
        );
        assert_eq!(bundle.latest, Path::new("FOTA_Firmware/MSU_latest.bin"));
        assert_eq!(
            bundle.info,
            Path::new("FOTA_Firmware/MSU_v1.2.3_20260314_090507.txt")
        );
    }

    #[test]
    fn test_info_sheet() {
        let image = app_image(128);
        let header = FirmwareHeader::parse(&image).unwrap();
        let app = BankLayout::stm32f103c8_dual_bank().application();
        let sheet = info_sheet("MSU", &header, &image, &timestamp(), app);

        assert!(sheet.starts_with("MSU Firmware Information\n"));
        assert!(sheet.contains("Version:        v1.2.3\n"));
        assert!(sheet.contains("Build Date:     20260314\n"));
        assert!(sheet.contains("Build Time:     09:05:07\n"));
        assert!(sheet.contains("File Size:      128 bytes\n"));
        assert!(sheet.contains("Header Magic:   0xDEADBEEF\n"));
        assert!(sheet.contains("Header Version: 0x00010203\n"));
        assert!(sheet.contains("Header Size:    128 bytes\n"));
        assert!(sheet.contains("Header Flags:   0x00000001\n"));
        assert!(sheet.contains("Header CRC32:   0x12345678\n"));
        assert!(sheet.contains(&format!(
            "Image CRC32:    0x{:08X}\n",
            checksum::compute(&image).unwrap()
        )));
        assert!(sheet.contains("  Application: 0x08002000-0x08007FFF (24KB)\n"));
        assert!(sheet.contains("  This firmware must be flashed to 0x08002000\n"));
    }

    #[test]
    fn test_info_sheet_unaligned_image() {
        let image = app_image(130);
        let header = FirmwareHeader::parse(&image).unwrap();
        let app = BankLayout::stm32f103c8_dual_bank().application();
        let sheet = info_sheet("MSU", &header, &image, &timestamp(), app);
        assert!(sheet.contains("Image CRC32:    n/a (length not word aligned)\n"));
    }

    #[test]
    fn test_distribute_writes_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let app = dir.path().join("firmware.bin");
        let image = app_image(256);
        fs::write(&app, &image).unwrap();

        let out_dir = dir.path().join("FOTA_Firmware");
        let layout = BankLayout::stm32f103c8_dual_bank();
        let (bundle, header) =
            distribute(&app, &out_dir, "MSU", layout.application(), &timestamp()).unwrap();

        assert_eq!(header.version_str(), "v1.2.3");
        assert_eq!(fs::read(&bundle.image).unwrap(), image);
        assert_eq!(fs::read(&bundle.latest).unwrap(), image);
        let sheet = fs::read_to_string(&bundle.info).unwrap();
        assert!(sheet.contains("File Size:      256 bytes"));
    }

    #[test]
    fn test_distribute_rejects_missing_header() {
        let dir = tempfile::tempdir().unwrap();
        let app = dir.path().join("firmware.bin");
        fs::write(&app, vec![0u8; 256]).unwrap();

        let out_dir = dir.path().join("FOTA_Firmware");
        let layout = BankLayout::stm32f103c8_dual_bank();
        let err = distribute(&app, &out_dir, "MSU", layout.application(), &timestamp())
            .unwrap_err();

        assert!(err.to_string().contains("magic mismatch"));
        assert!(!out_dir.exists());
    }
}
