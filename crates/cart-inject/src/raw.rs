//! Raw bank mapper.
//!
//! Headerless ROM dumps go into fixed sockets. There is no address
//! translation beyond the socket base:
//!
//! | Kind      | Window(s)          | Lines    |
//! |-----------|--------------------|----------|
//! | `Bin8kLo` | ROML $8000-$9FFF   | 8K       |
//! | `Bin8kHi` | ROMH $E000-$FFFF   | Ultimax  |
//! | `Bin16k`  | ROML+ROMH $8000-$BFFF | 16K   |

use tracing::debug;

use crate::error::LoadError;
use crate::image::{ControlLines, LoadedImage, Mapping, Window};
use crate::kind::Socket;

impl Socket {
    /// Base address the socket image is placed at.
    #[must_use]
    pub const fn base(self) -> u16 {
        match self {
            Self::Low8k | Self::Full16k => Window::Roml.base(),
            Self::High8k => Window::RomhUltimax.base(),
        }
    }

    /// Control lines that make the socket visible.
    #[must_use]
    pub const fn lines(self) -> ControlLines {
        match self {
            Self::Low8k => ControlLines::EIGHT_K,
            Self::High8k => ControlLines::ULTIMAX,
            Self::Full16k => ControlLines::SIXTEEN_K,
        }
    }
}

/// Place a raw ROM image into its socket.
pub fn map_raw(socket: Socket, data: &[u8]) -> Result<LoadedImage, LoadError> {
    if data.len() != socket.size() {
        return Err(LoadError::SizeMismatch {
            expected: socket.size(),
            actual: data.len(),
        });
    }
    debug!(
        ?socket,
        base = format_args!("${:04X}", socket.base()),
        len = data.len(),
        "raw ROM"
    );

    let mut image = LoadedImage::new(socket.kind(), socket.lines())
        .with_mapping(Mapping::new(socket.base(), data));
    image.entry = image.cartridge_entry();
    Ok(image)
}
