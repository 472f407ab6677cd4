//! Deferred run command for PRG images.
//!
//! A program placed in RAM does not start by itself: once the Kernal has
//! finished booting, the command is typed into the keyboard buffer so the
//! BASIC editor runs it on its next pass.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LoadError;
use crate::target::TargetBus;

/// Kernal keyboard buffer.
pub const KEYBOARD_BUFFER: u16 = 0x0277;

/// Number of characters pending in the keyboard buffer.
pub const KEYBOARD_COUNT: u16 = 0x00C6;

/// Keyboard buffer capacity.
pub const KEYBOARD_BUFFER_LEN: usize = 10;

/// How a loaded program is started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunPolicy {
    /// `RUN` for BASIC programs at $0801, `SYS` for anything else.
    #[default]
    Auto,
    Run,
    Sys,
    /// Leave the program at the READY prompt.
    None,
}

/// Command typed once the target has booted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "command", content = "address", rename_all = "kebab-case")]
pub enum RunCommand {
    Run,
    Sys(u16),
}

impl RunCommand {
    /// Pick the command for a program loaded at `load_address`.
    #[must_use]
    pub fn for_program(policy: RunPolicy, load_address: u16) -> Option<Self> {
        match policy {
            RunPolicy::Auto if load_address == format_prg::BASIC_START => Some(Self::Run),
            RunPolicy::Auto | RunPolicy::Sys => Some(Self::Sys(load_address)),
            RunPolicy::Run => Some(Self::Run),
            RunPolicy::None => None,
        }
    }

    /// PETSCII keystrokes, RETURN included.
    #[must_use]
    pub fn keystrokes(&self) -> Vec<u8> {
        let mut keys = self.to_string().into_bytes();
        keys.push(0x0D);
        keys
    }

    /// Stuff the keystrokes into the Kernal keyboard buffer.
    pub fn deliver<B: TargetBus>(&self, bus: &mut B) -> Result<(), LoadError> {
        let keys = self.keystrokes();
        debug_assert!(keys.len() <= KEYBOARD_BUFFER_LEN);
        bus.write_block(KEYBOARD_BUFFER, &keys)?;
        bus.write(KEYBOARD_COUNT, keys.len() as u8)?;
        Ok(())
    }
}

impl fmt::Display for RunCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Run => f.write_str("RUN"),
            Self::Sys(addr) => write!(f, "SYS{addr}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_policy() {
        assert_eq!(
            RunCommand::for_program(RunPolicy::Auto, 0x0801),
            Some(RunCommand::Run)
        );
        assert_eq!(
            RunCommand::for_program(RunPolicy::Auto, 0xC000),
            Some(RunCommand::Sys(0xC000))
        );
        assert_eq!(RunCommand::for_program(RunPolicy::None, 0x0801), None);
        assert_eq!(
            RunCommand::for_program(RunPolicy::Sys, 0x0801),
            Some(RunCommand::Sys(0x0801))
        );
    }

    #[test]
    fn keystrokes_end_with_return() {
        assert_eq!(RunCommand::Run.keystrokes(), b"RUN\r");
        assert_eq!(RunCommand::Sys(2064).keystrokes(), b"SYS2064\r");
    }

    #[test]
    fn longest_command_fits_buffer() {
        assert!(RunCommand::Sys(0xFFFF).keystrokes().len() <= KEYBOARD_BUFFER_LEN);
    }
}
