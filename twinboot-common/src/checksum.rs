// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! CRC32 as computed by the STM32F1 CRC peripheral.
//!
//! The peripheral consumes 32-bit words, shifts MSB first with polynomial
//! 0x04C11DB7, starts from 0xFFFFFFFF and applies no reflection and no final
//! XOR. Words are read from flash, so each 4-byte chunk is little-endian.
//! This is *not* the zlib/ISO-HDLC CRC32 and the two never agree.

use crate::error::ChecksumError;

/// Generator polynomial of the CRC peripheral (Ethernet polynomial, non-reflected).
pub const CRC32_POLYNOMIAL: u32 = 0x04C1_1DB7;

/// Reset value of the CRC data register.
pub const CRC32_INIT: u32 = 0xFFFF_FFFF;

/// Incremental CRC engine fed one 32-bit word at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stm32Crc {
    crc: u32,
}

impl Stm32Crc {
    pub const fn new() -> Self {
        Self { crc: CRC32_INIT }
    }

    /// Feed a single word, exactly like a write to `CRC->DR`.
    pub fn update_word(&mut self, word: u32) {
        let mut crc = self.crc ^ word;
        for _ in 0..32 {
            crc = if crc & 0x8000_0000 != 0 {
                (crc << 1) ^ CRC32_POLYNOMIAL
            } else {
                crc << 1
            };
        }
        self.crc = crc;
    }

    /// Feed a byte slice as little-endian words.
    ///
    /// The slice length must be a multiple of 4. Nothing is consumed when it
    /// isn't, so a failed call leaves the engine untouched.
    pub fn update(&mut self, data: &[u8]) -> Result<(), ChecksumError> {
        if data.len() % 4 != 0 {
            return Err(ChecksumError::InvalidInputLength { len: data.len() });
        }

        for chunk in data.chunks_exact(4) {
            self.update_word(u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
        }
        Ok(())
    }

    /// Current register value.
    pub const fn finalize(&self) -> u32 {
        self.crc
    }
}

impl Default for Stm32Crc {
    fn default() -> Self {
        Self::new()
    }
}

/// Compute the hardware CRC32 of `data`.
///
/// Fails with [`ChecksumError::InvalidInputLength`] if `data` is not word
/// aligned. Never pads: padding would change the value the device computes.
pub fn compute(data: &[u8]) -> Result<u32, ChecksumError> {
    let mut crc = Stm32Crc::new();
    crc.update(data)?;
    Ok(crc.finalize())
}
