//! Image kinds, menu items and the classifier.
//!
//! The classifier turns one `MenuItem` into a `Selection`: a closed set of
//! variants, each carrying only what its loader needs. It has no side
//! effects beyond validating the item.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;

use crate::error::LoadError;
use crate::image::Window;

/// Largest image the core will load.
pub const MAX_IMAGE_LEN: usize = 0x1_0000;

/// Size of one raw 8K ROM socket image.
pub const BIN_8K_LEN: usize = Window::SIZE;

/// Size of a raw 16K ROM image spanning ROML and ROMH.
pub const BIN_16K_LEN: usize = 2 * Window::SIZE;

/// Declared kind of a menu image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImageKind {
    /// Separator or heading; nothing to load.
    None,
    /// Raw 16K ROM at $8000-$BFFF.
    Bin16k,
    /// Raw 8K ROM on ROMH, Ultimax mode at $E000.
    Bin8kHi,
    /// Raw 8K ROM on ROML at $8000.
    Bin8kLo,
    /// PRG program with embedded load address.
    Prg,
    /// CRT cartridge container.
    Crt,
}

impl ImageKind {
    pub const ALL: [Self; 6] = [
        Self::None,
        Self::Bin16k,
        Self::Bin8kHi,
        Self::Bin8kLo,
        Self::Prg,
        Self::Crt,
    ];

    /// Numeric tag used in the menu table.
    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Bin16k => 1,
            Self::Bin8kHi => 2,
            Self::Bin8kLo => 3,
            Self::Prg => 4,
            Self::Crt => 5,
        }
    }

    /// Manifest name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bin16k => "bin16k",
            Self::Bin8kHi => "bin8k-hi",
            Self::Bin8kLo => "bin8k-lo",
            Self::Prg => "prg",
            Self::Crt => "crt",
        }
    }

    /// Exact byte length for kinds with fixed socket geometry.
    #[must_use]
    pub const fn fixed_len(self) -> Option<usize> {
        match self {
            Self::Bin16k => Some(BIN_16K_LEN),
            Self::Bin8kHi | Self::Bin8kLo => Some(BIN_8K_LEN),
            Self::None | Self::Prg | Self::Crt => None,
        }
    }
}

impl TryFrom<u8> for ImageKind {
    type Error = LoadError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|k| k.tag() == tag)
            .ok_or_else(|| LoadError::InvalidImageKind(tag.to_string()))
    }
}

impl FromStr for ImageKind {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|k| k.name() == lower)
            .ok_or_else(|| LoadError::InvalidImageKind(format!("{s:?}")))
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One entry of the menu table. Read-only to the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    /// Raw kind tag as stored in the table.
    pub kind_tag: u8,
    pub label: String,
    pub data: Option<Arc<[u8]>>,
    /// Declared length; only checked for PRG images.
    pub declared_size: Option<usize>,
}

impl MenuItem {
    #[must_use]
    pub fn new(kind: ImageKind, label: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            kind_tag: kind.tag(),
            label: label.into(),
            data: Some(data.into()),
            declared_size: None,
        }
    }

    /// A labelled entry with nothing to load.
    #[must_use]
    pub fn separator(label: impl Into<String>) -> Self {
        Self {
            kind_tag: ImageKind::None.tag(),
            label: label.into(),
            data: None,
            declared_size: None,
        }
    }

    /// An entry whose tag has not been validated.
    #[must_use]
    pub fn from_tag(tag: u8, label: impl Into<String>, data: Option<Arc<[u8]>>) -> Self {
        Self {
            kind_tag: tag,
            label: label.into(),
            data,
            declared_size: None,
        }
    }

    #[must_use]
    pub fn with_declared_size(mut self, size: usize) -> Self {
        self.declared_size = Some(size);
        self
    }

    /// Decode the kind tag.
    pub fn kind(&self) -> Result<ImageKind, LoadError> {
        ImageKind::try_from(self.kind_tag)
    }

    /// Whether selecting this entry would load anything.
    #[must_use]
    pub fn is_selectable(&self) -> bool {
        !matches!(self.kind(), Ok(ImageKind::None))
    }
}

/// Fixed ROM socket placement for raw images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Socket {
    /// ROML, $8000-$9FFF.
    Low8k,
    /// ROMH in Ultimax mode, $E000-$FFFF.
    High8k,
    /// ROML+ROMH, $8000-$BFFF.
    Full16k,
}

impl Socket {
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            Self::Low8k | Self::High8k => BIN_8K_LEN,
            Self::Full16k => BIN_16K_LEN,
        }
    }

    #[must_use]
    pub const fn kind(self) -> ImageKind {
        match self {
            Self::Low8k => ImageKind::Bin8kLo,
            Self::High8k => ImageKind::Bin8kHi,
            Self::Full16k => ImageKind::Bin16k,
        }
    }
}

/// A classified selection, ready for exactly one loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection<'a> {
    /// Separator: nothing to load, no bus activity.
    None,
    Crt(&'a [u8]),
    Prg(&'a [u8]),
    Raw { socket: Socket, data: &'a [u8] },
}

impl Selection<'_> {
    #[must_use]
    pub fn kind(&self) -> ImageKind {
        match self {
            Self::None => ImageKind::None,
            Self::Crt(_) => ImageKind::Crt,
            Self::Prg(_) => ImageKind::Prg,
            Self::Raw { socket, .. } => socket.kind(),
        }
    }
}

/// Route a menu item to its loader.
///
/// Validates the tag and the item invariants that do not need format
/// decoding: data presence, the 64 KiB bound, and a PRG's declared size.
pub fn classify(item: &MenuItem) -> Result<Selection<'_>, LoadError> {
    let kind = item.kind()?;
    if kind == ImageKind::None {
        return Ok(Selection::None);
    }

    let data = item
        .data
        .as_deref()
        .ok_or_else(|| LoadError::MissingData(item.label.clone()))?;
    if data.len() > MAX_IMAGE_LEN {
        return Err(LoadError::ImageTooLarge(data.len()));
    }

    Ok(match kind {
        ImageKind::None => Selection::None,
        ImageKind::Crt => Selection::Crt(data),
        ImageKind::Prg => {
            if let Some(declared) = item.declared_size
                && declared != data.len()
            {
                return Err(LoadError::SizeMismatch {
                    expected: declared,
                    actual: data.len(),
                });
            }
            Selection::Prg(data)
        }
        ImageKind::Bin16k => Selection::Raw {
            socket: Socket::Full16k,
            data,
        },
        ImageKind::Bin8kHi => Selection::Raw {
            socket: Socket::High8k,
            data,
        },
        ImageKind::Bin8kLo => Selection::Raw {
            socket: Socket::Low8k,
            data,
        },
    })
}
