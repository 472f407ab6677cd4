//! Loader output: address mappings, control lines and entry point.
//!
//! The GAME and EXROM control lines determine how cartridge memory is
//! banked into the target:
//!
//! | EXROM | GAME | Mode                                              |
//! |-------|------|---------------------------------------------------|
//! |   1   |   1  | Off (no cartridge effect)                         |
//! |   0   |   1  | 8K: ROML at $8000-$9FFF                           |
//! |   0   |   0  | 16K: ROML at $8000, ROMH at $A000                 |
//! |   1   |   0  | Ultimax: ROML at $8000, ROMH at $E000, no BASIC   |

use std::fmt;

use serde::Serialize;

use crate::bank::BankTable;
use crate::kind::ImageKind;

/// "CBM80" with the letters shifted, as the Kernal compares it at $8004.
pub const AUTOSTART_SIGNATURE: [u8; 5] = [0xC3, 0xC2, 0xCD, 0x38, 0x30];

/// A fixed cartridge ROM window on the target bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Window {
    /// ROML, $8000-$9FFF.
    Roml,
    /// ROMH in 16K mode, $A000-$BFFF.
    Romh,
    /// ROMH in Ultimax mode, $E000-$FFFF.
    RomhUltimax,
}

impl Window {
    pub const SIZE: usize = 0x2000;

    #[must_use]
    pub const fn base(self) -> u16 {
        match self {
            Self::Roml => 0x8000,
            Self::Romh => 0xA000,
            Self::RomhUltimax => 0xE000,
        }
    }
}

/// Cartridge memory-mode lines. Both are active low: `true` means the
/// line is released (high).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ControlLines {
    pub exrom: bool,
    pub game: bool,
}

impl ControlLines {
    pub const OFF: Self = Self {
        exrom: true,
        game: true,
    };
    pub const EIGHT_K: Self = Self {
        exrom: false,
        game: true,
    };
    pub const SIXTEEN_K: Self = Self {
        exrom: false,
        game: false,
    };
    pub const ULTIMAX: Self = Self {
        exrom: true,
        game: false,
    };

    #[must_use]
    pub fn mode(self) -> MemoryMode {
        match (self.exrom, self.game) {
            (true, true) => MemoryMode::Off,
            (false, true) => MemoryMode::EightK,
            (false, false) => MemoryMode::SixteenK,
            (true, false) => MemoryMode::Ultimax,
        }
    }
}

impl Default for ControlLines {
    fn default() -> Self {
        Self::OFF
    }
}

impl fmt::Display for ControlLines {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EXROM={} GAME={}",
            u8::from(self.exrom),
            u8::from(self.game)
        )
    }
}

/// Named memory configuration selected by the control lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MemoryMode {
    Off,
    EightK,
    SixteenK,
    Ultimax,
}

impl fmt::Display for MemoryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Off => "off",
            Self::EightK => "8K",
            Self::SixteenK => "16K",
            Self::Ultimax => "Ultimax",
        })
    }
}

/// Bytes destined for a contiguous target address range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    pub start: u16,
    pub bytes: Vec<u8>,
}

impl Mapping {
    #[must_use]
    pub fn new(start: u16, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            start,
            bytes: bytes.into(),
        }
    }

    /// Exclusive end address.
    #[must_use]
    pub fn end(&self) -> u32 {
        u32::from(self.start) + self.bytes.len() as u32
    }

    #[must_use]
    pub fn overlaps(&self, other: &Mapping) -> bool {
        u32::from(self.start) < other.end() && u32::from(other.start) < self.end()
    }

    /// Byte at `addr`, if this mapping covers it.
    #[must_use]
    pub fn byte_at(&self, addr: u16) -> Option<u8> {
        let offset = usize::from(addr.checked_sub(self.start)?);
        self.bytes.get(offset).copied()
    }
}

/// A fully validated image, produced by a loader and consumed once by the
/// handoff.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub kind: ImageKind,
    /// What the target sees at release. Pairwise disjoint.
    pub mappings: Vec<Mapping>,
    /// Switchable banks; empty for single-image kinds.
    pub banks: BankTable,
    pub lines: ControlLines,
    /// Where execution begins, when the image itself defines it.
    pub entry: Option<u16>,
}

impl LoadedImage {
    #[must_use]
    pub fn new(kind: ImageKind, lines: ControlLines) -> Self {
        Self {
            kind,
            mappings: Vec::new(),
            banks: BankTable::default(),
            lines,
            entry: None,
        }
    }

    #[must_use]
    pub fn with_mapping(mut self, mapping: Mapping) -> Self {
        self.mappings.push(mapping);
        self
    }

    /// Total bytes written to the target at commit.
    #[must_use]
    pub fn mapped_len(&self) -> usize {
        self.mappings.iter().map(|m| m.bytes.len()).sum()
    }

    #[must_use]
    pub fn is_disjoint(&self) -> bool {
        self.mappings
            .iter()
            .enumerate()
            .all(|(i, a)| self.mappings[i + 1..].iter().all(|b| !a.overlaps(b)))
    }

    /// Byte the image places at `addr`.
    #[must_use]
    pub fn peek(&self, addr: u16) -> Option<u8> {
        self.mappings.iter().find_map(|m| m.byte_at(addr))
    }

    fn peek_word(&self, addr: u16) -> Option<u16> {
        let lo = self.peek(addr)?;
        let hi = self.peek(addr.wrapping_add(1))?;
        Some(u16::from_le_bytes([lo, hi]))
    }

    /// Whether the ROML image carries the CBM80 autostart signature at $8004.
    #[must_use]
    pub fn has_autostart(&self) -> bool {
        (0..5).all(|i| self.peek(0x8004 + i) == Some(AUTOSTART_SIGNATURE[usize::from(i)]))
    }

    /// Derive where a cartridge image takes control after reset.
    ///
    /// A CBM80 signature hands the Kernal's cold start to the vector at
    /// $8000. In Ultimax mode the cartridge supplies the CPU reset vector
    /// at $FFFC itself. Otherwise the stock Kernal boots.
    #[must_use]
    pub fn cartridge_entry(&self) -> Option<u16> {
        if self.has_autostart() {
            self.peek_word(0x8000)
        } else if self.lines == ControlLines::ULTIMAX {
            self.peek_word(0xFFFC)
        } else {
            None
        }
    }
}
