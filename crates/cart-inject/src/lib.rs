//! Cartridge firmware injection.
//!
//! Takes one entry from a menu of firmware images, decodes it into address
//! mappings, writes it into a target C64 through a [`TargetBus`], drives
//! the EXROM/GAME lines for the image's memory mode and releases reset.
//!
//! ```text
//! MenuItem ─ classify ─> Selection ─ load_crt / load_prg / map_raw ─> LoadedImage
//!                                                                        │
//!                                  Handoff<B: TargetBus> <───────────────┘
//! ```
//!
//! Every loader validates the whole image before the handoff writes a
//! byte, so a rejected image leaves target memory untouched.

pub mod bank;
pub mod crt;
pub mod error;
pub mod handoff;
pub mod image;
pub mod kind;
pub mod menu;
pub mod prg;
pub mod raw;
pub mod run;
pub mod target;

pub use bank::{BankRegister, BankSwitch, BankTable};
pub use crt::load_crt;
pub use error::{BusError, LoadError};
pub use handoff::{Handoff, HandoffState, HandoffStatus, Launch, Outcome};
pub use image::{ControlLines, LoadedImage, Mapping, MemoryMode, Window};
pub use kind::{ImageKind, MenuItem, Selection, Socket, classify};
pub use menu::{ConfigError, Menu, MenuConfig, MenuEntry};
pub use prg::load_prg;
pub use raw::map_raw;
pub use run::{RunCommand, RunPolicy};
pub use target::{TargetBus, TargetMemory};
