//! PRG and PC64 `.P00` program images.
//!
//! A PRG file is the simplest C64 binary format: a 2-byte little-endian
//! load address followed by the data bytes, which belong contiguously in
//! RAM starting at that address.
//!
//! A `.P00` file wraps a PRG in a 26-byte PC64 header:
//!
//! | Offset | Size | Field                        |
//! |--------|------|------------------------------|
//! | $00    | 8    | `"C64File\0"`                |
//! | $08    | 17   | PETSCII file name, NUL padded|
//! | $19    | 1    | REL record size (0 for PRG)  |
//! | $1A    | n    | PRG image                    |

use thiserror::Error;

/// PC64 container signature.
pub const P00_SIGNATURE: &[u8; 8] = b"C64File\0";

/// Length of the PC64 header preceding the PRG image.
pub const P00_HEADER_LEN: usize = 0x1A;

/// Start of BASIC program text on a stock C64.
pub const BASIC_START: u16 = 0x0801;

/// Errors raised while splitting a program image.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrgError {
    #[error("PRG image too short: {0} bytes (need at least 2)")]
    TooShort(usize),

    #[error("PRG payload of {len} bytes at ${load_address:04X} runs past $FFFF")]
    Overflow { load_address: u16, len: usize },

    #[error("missing C64File signature")]
    BadP00Signature,

    #[error("P00 image too short: {0} bytes")]
    P00TooShort(usize),
}

/// A program image split into load address and payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prg<'a> {
    pub load_address: u16,
    pub payload: &'a [u8],
}

impl Prg<'_> {
    /// Exclusive end address of the payload.
    #[must_use]
    pub fn end_address(&self) -> u32 {
        u32::from(self.load_address) + self.payload.len() as u32
    }

    /// Whether the program is loaded at the start of BASIC text.
    #[must_use]
    pub fn is_basic(&self) -> bool {
        self.load_address == BASIC_START
    }
}

/// Split a PRG image into its load address and payload.
///
/// A two-byte image is valid and carries an empty payload.
pub fn split(data: &[u8]) -> Result<Prg<'_>, PrgError> {
    if data.len() < 2 {
        return Err(PrgError::TooShort(data.len()));
    }

    let load_address = u16::from(data[0]) | (u16::from(data[1]) << 8);
    let prg = Prg {
        load_address,
        payload: &data[2..],
    };

    if prg.end_address() > 0x1_0000 {
        return Err(PrgError::Overflow {
            load_address,
            len: prg.payload.len(),
        });
    }

    Ok(prg)
}

/// Whether the image starts with the PC64 signature.
#[must_use]
pub fn is_p00(data: &[u8]) -> bool {
    data.starts_with(P00_SIGNATURE)
}

/// A PRG unwrapped from a `.P00` container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct P00<'a> {
    /// Original C64 file name.
    pub name: String,
    /// The embedded PRG image, load address included.
    pub prg: &'a [u8],
}

/// Strip the PC64 header from a `.P00` image.
pub fn unwrap_p00(data: &[u8]) -> Result<P00<'_>, PrgError> {
    if !is_p00(data) {
        return Err(PrgError::BadP00Signature);
    }
    if data.len() < P00_HEADER_LEN {
        return Err(PrgError::P00TooShort(data.len()));
    }
    let name_bytes = &data[0x08..0x19];
    let end = name_bytes.iter().position(|&b| b == 0).unwrap_or(name_bytes.len());
    Ok(P00 {
        name: String::from_utf8_lossy(&name_bytes[..end]).into_owned(),
        prg: &data[P00_HEADER_LEN..],
    })
}

/// Split a program image, unwrapping a `.P00` container when present.
pub fn split_any(data: &[u8]) -> Result<Prg<'_>, PrgError> {
    if is_p00(data) {
        split(unwrap_p00(data)?.prg)
    } else {
        split(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_p00(name: &str, prg: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(P00_SIGNATURE);
        let mut name_field = [0u8; 17];
        name_field[..name.len()].copy_from_slice(name.as_bytes());
        out.extend_from_slice(&name_field);
        out.push(0);
        out.extend_from_slice(prg);
        out
    }

    #[test]
    fn split_basic() {
        let prg = split(&[0x01, 0x08, 0xAA, 0xBB]).expect("valid");
        assert_eq!(prg.load_address, 0x0801);
        assert_eq!(prg.payload, &[0xAA, 0xBB]);
        assert_eq!(prg.end_address(), 0x0803);
        assert!(prg.is_basic());
    }

    #[test]
    fn two_bytes_is_empty_payload() {
        let prg = split(&[0x00, 0xC0]).expect("valid");
        assert_eq!(prg.load_address, 0xC000);
        assert!(prg.payload.is_empty());
        assert!(!prg.is_basic());
    }

    #[test]
    fn too_short() {
        assert_eq!(split(&[0x01]), Err(PrgError::TooShort(1)));
        assert_eq!(split(&[]), Err(PrgError::TooShort(0)));
    }

    #[test]
    fn payload_may_end_exactly_at_top_of_memory() {
        let mut data = vec![0xFE, 0xFF];
        data.extend_from_slice(&[1, 2]);
        let prg = split(&data).expect("fits");
        assert_eq!(prg.end_address(), 0x1_0000);
    }

    #[test]
    fn payload_past_top_of_memory_is_rejected() {
        let data = [0xFF, 0xFF, 1, 2];
        assert_eq!(
            split(&data),
            Err(PrgError::Overflow {
                load_address: 0xFFFF,
                len: 2
            })
        );
    }

    #[test]
    fn p00_unwrap() {
        let p00 = make_p00("JOUST", &[0x01, 0x08, 0x42]);
        assert!(is_p00(&p00));
        let inner = unwrap_p00(&p00).expect("valid");
        assert_eq!(inner.name, "JOUST");
        let prg = split_any(&p00).expect("valid");
        assert_eq!(prg.load_address, 0x0801);
        assert_eq!(prg.payload, &[0x42]);
    }

    #[test]
    fn p00_errors() {
        assert_eq!(unwrap_p00(b"C64File\0AB"), Err(PrgError::P00TooShort(10)));
        assert_eq!(unwrap_p00(&[0x01, 0x08]), Err(PrgError::BadP00Signature));
    }

    #[test]
    fn p00_header_only_is_short_prg() {
        let p00 = make_p00("X", &[]);
        assert_eq!(split_any(&p00), Err(PrgError::TooShort(0)));
    }
}
