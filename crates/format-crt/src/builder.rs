//! CRT container assembly.
//!
//! Used to wrap raw ROM dumps into CRT form and to build fixtures.

use crate::{CHIP_HEADER_LEN, CHIP_SIGNATURE, CRT_SIGNATURE, HEADER_MIN_LEN, HardwareType};

/// Builder for a CRT container.
#[derive(Debug, Clone)]
pub struct CrtBuilder {
    hardware: HardwareType,
    exrom: u8,
    game: u8,
    name: String,
    chips: Vec<u8>,
}

impl CrtBuilder {
    /// Start a container for the given hardware. Lines default to 8K mode
    /// (EXROM asserted, GAME released).
    #[must_use]
    pub fn new(hardware: HardwareType) -> Self {
        Self {
            hardware,
            exrom: 0,
            game: 1,
            name: String::new(),
            chips: Vec::new(),
        }
    }

    /// Set the initial line levels (false = asserted/low).
    #[must_use]
    pub fn lines(mut self, exrom: bool, game: bool) -> Self {
        self.exrom = u8::from(exrom);
        self.game = u8::from(game);
        self
    }

    /// Set the cartridge name (truncated to 32 bytes).
    #[must_use]
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Append a ROM CHIP packet.
    #[must_use]
    pub fn chip(mut self, bank: u16, load_address: u16, rom: &[u8]) -> Self {
        let total_len = (CHIP_HEADER_LEN + rom.len()) as u32;
        self.chips.extend_from_slice(CHIP_SIGNATURE);
        self.chips.extend_from_slice(&total_len.to_be_bytes());
        self.chips.extend_from_slice(&0u16.to_be_bytes());
        self.chips.extend_from_slice(&bank.to_be_bytes());
        self.chips.extend_from_slice(&load_address.to_be_bytes());
        self.chips.extend_from_slice(&(rom.len() as u16).to_be_bytes());
        self.chips.extend_from_slice(rom);
        self
    }

    /// Serialize the container.
    #[must_use]
    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_MIN_LEN + self.chips.len());
        out.extend_from_slice(CRT_SIGNATURE);
        out.extend_from_slice(&(HEADER_MIN_LEN as u32).to_be_bytes());
        // Version 1.0
        out.extend_from_slice(&[0x01, 0x00]);
        out.extend_from_slice(&self.hardware.code().to_be_bytes());
        out.push(self.exrom);
        out.push(self.game);
        // Reserved
        out.extend_from_slice(&[0; 6]);
        let name = self.name.as_bytes();
        let name = &name[..name.len().min(32)];
        out.extend_from_slice(name);
        out.resize(HEADER_MIN_LEN, 0);
        out.extend_from_slice(&self.chips);
        out
    }
}
