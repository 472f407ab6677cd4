//! Load failures surfaced to the menu layer.

use format_crt::CrtError;
use format_prg::PrgError;
use thiserror::Error;

/// Failure raised by the target bus.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    #[error("bus write to ${address:04X} timed out")]
    Timeout { address: u16 },
}

/// Why a selection could not be launched.
///
/// Every variant aborts the load: the handoff returns to idle with the
/// target held in reset, and no partial image is booted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("invalid image kind tag {0}")]
    InvalidImageKind(String),

    #[error("malformed CRT container: {0}")]
    MalformedContainer(#[from] CrtError),

    #[error("truncated program image: {0}")]
    TruncatedImage(PrgError),

    #[error("size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error(transparent)]
    BusTimeout(#[from] BusError),

    #[error("menu item {0:?} has no image data")]
    MissingData(String),

    #[error("image of {0} bytes exceeds the 64 KiB load limit")]
    ImageTooLarge(usize),

    #[error("bank {bank} is not loaded ({count} banks present)")]
    BankNotLoaded { bank: u16, count: usize },

    #[error("no image is running")]
    NotRunning,
}

impl From<PrgError> for LoadError {
    fn from(err: PrgError) -> Self {
        match err {
            // Payload past $FFFF would wrap into zero page.
            PrgError::Overflow { load_address, len } => Self::SizeMismatch {
                expected: 0x1_0000 - usize::from(load_address),
                actual: len,
            },
            other => Self::TruncatedImage(other),
        }
    }
}
