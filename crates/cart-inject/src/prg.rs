//! PRG loader.
//!
//! The first two bytes are the little-endian load address; every following
//! byte belongs contiguously from there. `.P00` wrapped programs are
//! unwrapped first. The cartridge stays invisible to the target (both
//! control lines released) and the entry address is the load address.

use tracing::debug;

use crate::error::LoadError;
use crate::image::{ControlLines, LoadedImage, Mapping};
use crate::kind::ImageKind;

/// Build a `LoadedImage` from a PRG (or `.P00`) image.
pub fn load_prg(data: &[u8]) -> Result<LoadedImage, LoadError> {
    let prg = format_prg::split_any(data)?;
    debug!(
        load_address = format_args!("${:04X}", prg.load_address),
        len = prg.payload.len(),
        "PRG image"
    );

    let mut image = LoadedImage::new(ImageKind::Prg, ControlLines::OFF);
    if !prg.payload.is_empty() {
        image.mappings.push(Mapping::new(prg.load_address, prg.payload));
    }
    image.entry = Some(prg.load_address);
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use format_prg::PrgError;

    #[test]
    fn load_prg_basic() {
        let image = load_prg(&[0x01, 0x08, 0xAA, 0xBB]).expect("load should succeed");
        assert_eq!(image.entry, Some(0x0801));
        assert_eq!(image.peek(0x0801), Some(0xAA));
        assert_eq!(image.peek(0x0802), Some(0xBB));
        assert_eq!(image.peek(0x0803), None);
        assert_eq!(image.lines, ControlLines::OFF);
    }

    #[test]
    fn header_only_loads_nothing() {
        let image = load_prg(&[0x00, 0xC0]).expect("valid");
        assert!(image.mappings.is_empty());
        assert_eq!(image.entry, Some(0xC000));
    }

    #[test]
    fn load_prg_too_short() {
        assert_eq!(
            load_prg(&[0x01]).unwrap_err(),
            LoadError::TruncatedImage(PrgError::TooShort(1))
        );
    }

    #[test]
    fn wrapping_payload_is_size_mismatch() {
        assert_eq!(
            load_prg(&[0xFE, 0xFF, 1, 2, 3]).unwrap_err(),
            LoadError::SizeMismatch {
                expected: 2,
                actual: 3
            }
        );
    }
}
