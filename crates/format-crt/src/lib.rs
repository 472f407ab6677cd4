//! CRT cartridge container parser.
//!
//! The CRT format wraps C64 cartridge ROM images with a header describing
//! the cartridge hardware and its initial EXROM/GAME line states. ROM data
//! is stored in CHIP packets, each naming a bank and a load address.
//!
//! Header layout (all multi-byte fields big-endian):
//!
//! | Offset | Size | Field                                  |
//! |--------|------|----------------------------------------|
//! | $00    | 16   | `"C64 CARTRIDGE   "`                     |
//! | $10    | 4    | Header length (normally $40)           |
//! | $14    | 2    | Version                                |
//! | $16    | 2    | Hardware type                          |
//! | $18    | 1    | EXROM line (0 = asserted)              |
//! | $19    | 1    | GAME line (0 = asserted)               |
//! | $20    | 32   | Name, NUL padded                       |
//!
//! CHIP packet layout:
//!
//! | Offset | Size | Field                                  |
//! |--------|------|----------------------------------------|
//! | $00    | 4    | `"CHIP"`                               |
//! | $04    | 4    | Packet length including this header    |
//! | $08    | 2    | Chip type (0 ROM, 1 RAM, 2 Flash)      |
//! | $0A    | 2    | Bank number                            |
//! | $0C    | 2    | Load address                           |
//! | $0E    | 2    | Payload size                           |
//! | $10    | n    | Payload                                |
//!
//! [`parse`] walks the whole packet sequence before returning. A container
//! with any bad packet yields an error and no packets at all, so callers
//! never see a prefix of a broken image.

pub mod builder;
mod hardware;

pub use hardware::HardwareType;

use thiserror::Error;

/// CRT file signature.
pub const CRT_SIGNATURE: &[u8; 16] = b"C64 CARTRIDGE   ";

/// CHIP packet signature.
pub const CHIP_SIGNATURE: &[u8; 4] = b"CHIP";

/// Size of the fixed header fields, including the name.
pub const HEADER_MIN_LEN: usize = 0x40;

/// Smallest header length value accepted at offset $10.
const HEADER_LEN_FIELD_MIN: usize = 0x20;

/// Size of a CHIP packet header.
pub const CHIP_HEADER_LEN: usize = 0x10;

/// ROML window base.
pub const ROML_BASE: u16 = 0x8000;
/// ROMH window base in 16K mode.
pub const ROMH_BASE: u16 = 0xA000;
/// ROMH window base in Ultimax mode.
pub const ROMH_ULTIMAX_BASE: u16 = 0xE000;
/// Size of one ROM window.
pub const WINDOW_SIZE: usize = 0x2000;

/// Errors raised while decoding a CRT container.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CrtError {
    #[error("CRT image too short for header: {0} bytes")]
    TooShort(usize),

    #[error("invalid CRT signature")]
    BadSignature,

    #[error("invalid CRT header length {len} (image is {total} bytes)")]
    BadHeaderLength { len: usize, total: usize },

    #[error("unsupported CRT hardware type {0}")]
    UnsupportedHardware(u16),

    #[error("expected CHIP signature at offset {offset:#X}")]
    BadChipSignature { offset: usize },

    #[error("CHIP header truncated at offset {offset:#X}: {remaining} bytes left")]
    TruncatedChip { offset: usize, remaining: usize },

    #[error("CHIP packet at offset {offset:#X} claims {len} bytes but only {remaining} remain")]
    ChipLengthOverrun {
        offset: usize,
        len: usize,
        remaining: usize,
    },

    #[error("CHIP packet at offset {offset:#X}: payload of {size} bytes exceeds packet length {len}")]
    PayloadExceedsPacket {
        offset: usize,
        size: usize,
        len: usize,
    },

    #[error("CHIP packet at offset {offset:#X}: unknown chip type {code}")]
    UnknownChipType { offset: usize, code: u16 },

    #[error("CHIP packet at offset {offset:#X}: unexpected load address ${address:04X}")]
    BadLoadAddress { offset: usize, address: u16 },

    #[error("CHIP packet at offset {offset:#X}: {size} bytes do not fit the window at ${address:04X}")]
    PayloadTooLarge {
        offset: usize,
        address: u16,
        size: usize,
    },

    #[error("CHIP packet at offset {offset:#X}: bank {bank} outside 0..{count} for {hardware}")]
    BankOutOfRange {
        offset: usize,
        bank: u16,
        count: u16,
        hardware: &'static str,
    },

    #[error("CHIP packet at offset {offset:#X}: bank {bank} at ${address:04X} already loaded")]
    DuplicateChip {
        offset: usize,
        bank: u16,
        address: u16,
    },

    #[error("CRT image contains no CHIP packets")]
    NoChips,

    #[error("CRT image has no bank 0 packet to boot from")]
    NoBootBank,
}

/// Chip memory type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChipType {
    Rom,
    Ram,
    Flash,
}

impl ChipType {
    fn from_code(code: u16) -> Option<Self> {
        match code {
            0 => Some(Self::Rom),
            1 => Some(Self::Ram),
            2 => Some(Self::Flash),
            _ => None,
        }
    }
}

/// Decoded CRT header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrtHeader {
    /// Header length from offset $10. CHIP packets start here.
    pub header_len: usize,
    /// Format version (major, minor).
    pub version: (u8, u8),
    /// Hardware type.
    pub hardware: HardwareType,
    /// EXROM line level at power-up (false = pulled low/asserted).
    pub exrom: bool,
    /// GAME line level at power-up (false = pulled low/asserted).
    pub game: bool,
    /// Cartridge name.
    pub name: String,
}

/// One CHIP packet, borrowed from the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChipPacket<'a> {
    /// Offset of the packet within the container.
    pub offset: usize,
    /// Packet length including its 16-byte header.
    pub packet_len: usize,
    pub chip_type: ChipType,
    pub bank: u16,
    pub load_address: u16,
    pub data: &'a [u8],
}

impl ChipPacket<'_> {
    /// Exclusive end address of the payload.
    #[must_use]
    pub fn end_address(&self) -> u32 {
        u32::from(self.load_address) + self.data.len() as u32
    }

    /// A 16K packet at $8000 fills ROML and ROMH in one write.
    #[must_use]
    pub fn spans_both_windows(&self) -> bool {
        self.load_address == ROML_BASE && self.data.len() > WINDOW_SIZE
    }
}

/// A fully validated CRT container.
#[derive(Debug, Clone)]
pub struct CrtImage<'a> {
    pub header: CrtHeader,
    pub chips: Vec<ChipPacket<'a>>,
    total_len: usize,
}

impl CrtImage<'_> {
    /// Total image length in bytes.
    #[must_use]
    pub fn total_len(&self) -> usize {
        self.total_len
    }

    /// Sum of all CHIP packet lengths, headers included.
    #[must_use]
    pub fn packets_len(&self) -> usize {
        self.chips.iter().map(|c| c.packet_len).sum()
    }

    /// Highest bank index named by any packet, plus one.
    #[must_use]
    pub fn bank_span(&self) -> usize {
        self.chips
            .iter()
            .map(|c| c.bank as usize + 1)
            .max()
            .unwrap_or(0)
    }
}

/// Read a big-endian u16 from a byte slice.
fn read_be_u16(data: &[u8], offset: usize) -> u16 {
    u16::from(data[offset]) << 8 | u16::from(data[offset + 1])
}

/// Read a big-endian u32 from a byte slice.
fn read_be_u32(data: &[u8], offset: usize) -> u32 {
    u32::from(data[offset]) << 24
        | u32::from(data[offset + 1]) << 16
        | u32::from(data[offset + 2]) << 8
        | u32::from(data[offset + 3])
}

/// Decode and validate the CRT header.
pub fn parse_header(data: &[u8]) -> Result<CrtHeader, CrtError> {
    if data.len() < HEADER_MIN_LEN {
        return Err(CrtError::TooShort(data.len()));
    }
    if &data[0..16] != CRT_SIGNATURE {
        return Err(CrtError::BadSignature);
    }

    let header_len = read_be_u32(data, 0x10) as usize;
    if header_len < HEADER_LEN_FIELD_MIN || header_len > data.len() {
        return Err(CrtError::BadHeaderLength {
            len: header_len,
            total: data.len(),
        });
    }

    let type_id = read_be_u16(data, 0x16);
    let hardware = HardwareType::from_code(type_id).ok_or(CrtError::UnsupportedHardware(type_id))?;

    Ok(CrtHeader {
        header_len,
        version: (data[0x14], data[0x15]),
        hardware,
        exrom: data[0x18] != 0,
        game: data[0x19] != 0,
        name: crt_name(data),
    })
}

/// Streaming CHIP packet walker.
///
/// Yields each packet once its header and bounds have been checked. After
/// the first error the iterator is fused and yields nothing further.
pub struct Chips<'a> {
    data: &'a [u8],
    hardware: HardwareType,
    offset: usize,
    failed: bool,
}

impl<'a> Chips<'a> {
    /// Walk the packets following `header`.
    #[must_use]
    pub fn new(data: &'a [u8], header: &CrtHeader) -> Self {
        Self {
            data,
            hardware: header.hardware,
            offset: header.header_len,
            failed: false,
        }
    }

    fn next_packet(&mut self) -> Result<ChipPacket<'a>, CrtError> {
        let data = self.data;
        let offset = self.offset;
        let remaining = data.len() - offset;

        if remaining < CHIP_HEADER_LEN {
            return Err(CrtError::TruncatedChip { offset, remaining });
        }
        if &data[offset..offset + 4] != CHIP_SIGNATURE {
            return Err(CrtError::BadChipSignature { offset });
        }

        let packet_len = read_be_u32(data, offset + 4) as usize;
        if packet_len > remaining {
            return Err(CrtError::ChipLengthOverrun {
                offset,
                len: packet_len,
                remaining,
            });
        }

        let type_code = read_be_u16(data, offset + 0x08);
        let chip_type = ChipType::from_code(type_code).ok_or(CrtError::UnknownChipType {
            offset,
            code: type_code,
        })?;
        let bank = read_be_u16(data, offset + 0x0A);
        let load_address = read_be_u16(data, offset + 0x0C);
        let size = read_be_u16(data, offset + 0x0E) as usize;

        if packet_len < CHIP_HEADER_LEN + size {
            return Err(CrtError::PayloadExceedsPacket {
                offset,
                size,
                len: packet_len,
            });
        }

        // $8000 may carry a 16K image covering ROML and ROMH together.
        let window = match load_address {
            ROML_BASE => 2 * WINDOW_SIZE,
            ROMH_BASE | ROMH_ULTIMAX_BASE => WINDOW_SIZE,
            _ => {
                return Err(CrtError::BadLoadAddress {
                    offset,
                    address: load_address,
                });
            }
        };
        if size > window {
            return Err(CrtError::PayloadTooLarge {
                offset,
                address: load_address,
                size,
            });
        }

        let count = self.hardware.bank_count();
        if bank >= count {
            return Err(CrtError::BankOutOfRange {
                offset,
                bank,
                count,
                hardware: self.hardware.name(),
            });
        }

        let start = offset + CHIP_HEADER_LEN;
        self.offset = offset + packet_len;

        Ok(ChipPacket {
            offset,
            packet_len,
            chip_type,
            bank,
            load_address,
            data: &data[start..start + size],
        })
    }
}

impl<'a> Iterator for Chips<'a> {
    type Item = Result<ChipPacket<'a>, CrtError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.data.len() {
            return None;
        }
        let result = self.next_packet();
        if result.is_err() {
            self.failed = true;
        }
        Some(result)
    }
}

/// Parse a CRT container.
///
/// Every packet is validated before anything is returned; the declared
/// total is the image length and the packet walk must end exactly on it.
pub fn parse(data: &[u8]) -> Result<CrtImage<'_>, CrtError> {
    let header = parse_header(data)?;
    let mut chips: Vec<ChipPacket<'_>> = Vec::new();

    for packet in Chips::new(data, &header) {
        let packet = packet?;
        let clash = chips
            .iter()
            .any(|c| c.bank == packet.bank && windows_overlap(c, &packet));
        if clash {
            return Err(CrtError::DuplicateChip {
                offset: packet.offset,
                bank: packet.bank,
                address: packet.load_address,
            });
        }
        chips.push(packet);
    }

    if chips.is_empty() {
        return Err(CrtError::NoChips);
    }
    if !chips.iter().any(|c| c.bank == 0) {
        return Err(CrtError::NoBootBank);
    }

    Ok(CrtImage {
        header,
        chips,
        total_len: data.len(),
    })
}

/// Whether two packets in the same bank claim overlapping address ranges.
fn windows_overlap(a: &ChipPacket<'_>, b: &ChipPacket<'_>) -> bool {
    let a_start = u32::from(a.load_address);
    let b_start = u32::from(b.load_address);
    // Empty packets still claim their window base.
    let a_end = a.end_address().max(a_start + 1);
    let b_end = b.end_address().max(b_start + 1);
    a_start < b_end && b_start < a_end
}

/// Extract the cartridge name from a CRT header (up to 32 bytes at offset $20).
#[must_use]
pub fn crt_name(data: &[u8]) -> String {
    if data.len() < HEADER_MIN_LEN {
        return String::new();
    }
    let name_bytes = &data[0x20..0x40];
    let end = name_bytes.iter().position(|&b| b == 0).unwrap_or(name_bytes.len());
    String::from_utf8_lossy(&name_bytes[..end]).trim().to_string()
}
