//! Target bus interface.
//!
//! The handoff drives the host machine through this trait: address and
//! data lines for memory writes, the two cartridge configuration lines and
//! the reset line. Nothing else in the crate talks to the target.

use crate::error::BusError;
use crate::image::ControlLines;

/// Bus the cartridge drives into the host machine.
pub trait TargetBus {
    /// Write a byte to the given address.
    fn write(&mut self, address: u16, value: u8) -> Result<(), BusError>;

    /// Drive the EXROM/GAME lines.
    fn set_control_lines(&mut self, lines: ControlLines);

    /// Assert (`true`) or release the target reset line.
    fn set_reset(&mut self, asserted: bool);

    /// Whether the target is currently held in reset.
    fn reset_asserted(&self) -> bool;

    /// Write a contiguous block starting at `start`.
    fn write_block(&mut self, start: u16, bytes: &[u8]) -> Result<(), BusError> {
        for (i, &byte) in bytes.iter().enumerate() {
            self.write(start.wrapping_add(i as u16), byte)?;
        }
        Ok(())
    }
}

/// In-memory target: a 64K address space plus line state.
///
/// Counts writes and reset transitions so callers can check exactly what
/// a selection did to the bus.
pub struct TargetMemory {
    ram: Box<[u8; 0x10000]>,
    lines: ControlLines,
    reset: bool,
    writes: usize,
    reset_transitions: usize,
    /// Writes accepted before the bus starts timing out.
    write_budget: Option<usize>,
}

impl TargetMemory {
    /// Running target, cartridge invisible.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ram: Box::new([0; 0x10000]),
            lines: ControlLines::OFF,
            reset: false,
            writes: 0,
            reset_transitions: 0,
            write_budget: None,
        }
    }

    /// Target whose bus times out after `writes` successful writes.
    #[must_use]
    pub fn with_write_budget(writes: usize) -> Self {
        Self {
            write_budget: Some(writes),
            ..Self::new()
        }
    }

    #[must_use]
    pub fn read(&self, address: u16) -> u8 {
        self.ram[address as usize]
    }

    /// Borrow a range of the address space.
    #[must_use]
    pub fn slice(&self, start: u16, len: usize) -> &[u8] {
        let start = start as usize;
        &self.ram[start..(start + len).min(0x10000)]
    }

    /// Whole 64K image.
    #[must_use]
    pub fn ram(&self) -> &[u8] {
        &self.ram[..]
    }

    #[must_use]
    pub fn lines(&self) -> ControlLines {
        self.lines
    }

    /// Successful writes since construction.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes
    }

    /// Number of times the reset line changed level.
    #[must_use]
    pub fn reset_transitions(&self) -> usize {
        self.reset_transitions
    }
}

impl Default for TargetMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl TargetBus for TargetMemory {
    fn write(&mut self, address: u16, value: u8) -> Result<(), BusError> {
        if self.write_budget.is_some_and(|budget| self.writes >= budget) {
            return Err(BusError::Timeout { address });
        }
        self.ram[address as usize] = value;
        self.writes += 1;
        Ok(())
    }

    fn set_control_lines(&mut self, lines: ControlLines) {
        self.lines = lines;
    }

    fn set_reset(&mut self, asserted: bool) {
        if self.reset != asserted {
            self.reset_transitions += 1;
        }
        self.reset = asserted;
    }

    fn reset_asserted(&self) -> bool {
        self.reset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_write_lands_contiguously() {
        let mut mem = TargetMemory::new();
        mem.write_block(0x0801, &[1, 2, 3]).expect("no budget");
        assert_eq!(mem.slice(0x0801, 3), &[1, 2, 3]);
        assert_eq!(mem.writes(), 3);
    }

    #[test]
    fn budget_times_out() {
        let mut mem = TargetMemory::with_write_budget(2);
        let err = mem.write_block(0x1000, &[9, 9, 9]).unwrap_err();
        assert_eq!(err, BusError::Timeout { address: 0x1002 });
        assert_eq!(mem.read(0x1002), 0);
    }

    #[test]
    fn reset_transitions_count_level_changes() {
        let mut mem = TargetMemory::new();
        mem.set_reset(true);
        mem.set_reset(true);
        mem.set_reset(false);
        assert_eq!(mem.reset_transitions(), 2);
        assert!(!mem.reset_asserted());
    }

    #[test]
    fn slice_clamps_at_top() {
        let mem = TargetMemory::new();
        assert_eq!(mem.slice(0xFFFE, 8).len(), 2);
    }
}
