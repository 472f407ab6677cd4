//! Bank-switch model.
//!
//! A banked cartridge keeps every bank in its own storage and exposes one
//! at a time through the ROM windows. `BankTable` records what each bank
//! holds; `BankRegister` is the select register. Switching is an explicit
//! transition that yields the window contents to write, plus the ranges
//! the old bank drove and the new one does not. Those read as open bus
//! afterwards, so no byte of the old bank stays visible.

use std::collections::BTreeMap;
use std::ops::Range;

use tracing::debug;

use crate::error::LoadError;
use crate::image::Mapping;

/// Value the target reads from a window no chip drives.
pub const OPEN_BUS: u8 = 0xFF;

/// Bank index to window contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BankTable {
    limit: u16,
    banks: BTreeMap<u16, Vec<Mapping>>,
}

impl BankTable {
    /// Empty table for hardware addressing `limit` banks.
    #[must_use]
    pub fn new(limit: u16) -> Self {
        Self {
            limit,
            banks: BTreeMap::new(),
        }
    }

    /// Record a window image for `bank`.
    pub fn insert(&mut self, bank: u16, mapping: Mapping) {
        self.banks.entry(bank).or_default().push(mapping);
    }

    /// Window contents for `bank`.
    #[must_use]
    pub fn mappings(&self, bank: u16) -> Option<&[Mapping]> {
        self.banks.get(&bank).map(Vec::as_slice)
    }

    /// Banks the hardware can address.
    #[must_use]
    pub fn limit(&self) -> u16 {
        self.limit
    }

    /// Number of populated banks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.banks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.banks.is_empty()
    }
}

/// A completed bank transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankSwitch<'a> {
    pub from: u16,
    pub to: u16,
    /// Ranges the old bank drove that the new bank leaves empty.
    pub vacate: Vec<Range<u32>>,
    /// Window contents now visible.
    pub mappings: &'a [Mapping],
}

/// Bank-select register state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BankRegister {
    current: u16,
}

impl BankRegister {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn current(&self) -> u16 {
        self.current
    }

    /// Power-on state: bank 0.
    pub fn reset(&mut self) {
        self.current = 0;
    }

    /// Select `bank`. The register is unchanged if the bank holds nothing.
    pub fn select<'t>(
        &mut self,
        table: &'t BankTable,
        bank: u16,
    ) -> Result<BankSwitch<'t>, LoadError> {
        let mappings = table.mappings(bank).ok_or(LoadError::BankNotLoaded {
            bank,
            count: table.len(),
        })?;
        let from = self.current;
        let previous = table.mappings(from).unwrap_or_default();
        let vacate = uncovered(previous, mappings);
        self.current = bank;
        debug!(from, to = bank, vacated = vacate.len(), "bank switch");
        Ok(BankSwitch {
            from,
            to: bank,
            vacate,
            mappings,
        })
    }
}

/// Parts of `previous` that no mapping in `next` covers.
fn uncovered(previous: &[Mapping], next: &[Mapping]) -> Vec<Range<u32>> {
    let mut gaps = Vec::new();
    for old in previous {
        let mut pieces = vec![u32::from(old.start)..old.end()];
        for new in next {
            let (start, end) = (u32::from(new.start), new.end());
            pieces = pieces
                .into_iter()
                .flat_map(|piece| {
                    let below = piece.start..start.min(piece.end);
                    let above = end.max(piece.start)..piece.end;
                    [below, above].into_iter().filter(|r| !r.is_empty())
                })
                .collect();
        }
        gaps.extend(pieces);
    }
    gaps
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ocean_table() -> BankTable {
        let mut table = BankTable::new(64);
        for bank in 0..4u16 {
            table.insert(bank, Mapping::new(0x8000, vec![bank as u8 + 0x10; 0x2000]));
        }
        table
    }

    #[test]
    fn select_yields_bank_contents() {
        let table = ocean_table();
        let mut reg = BankRegister::new();
        let switch = reg.select(&table, 2).expect("bank 2 is loaded");
        assert_eq!(switch.from, 0);
        assert_eq!(switch.to, 2);
        assert_eq!(switch.mappings[0].bytes[0], 0x12);
        assert_eq!(reg.current(), 2);
    }

    #[test]
    fn missing_bank_leaves_register_alone() {
        let table = ocean_table();
        let mut reg = BankRegister::new();
        reg.select(&table, 3).expect("loaded");
        let err = reg.select(&table, 9).unwrap_err();
        assert_eq!(err, LoadError::BankNotLoaded { bank: 9, count: 4 });
        assert_eq!(reg.current(), 3);
    }

    #[test]
    fn reset_returns_to_bank_zero() {
        let table = ocean_table();
        let mut reg = BankRegister::new();
        reg.select(&table, 1).expect("loaded");
        reg.reset();
        assert_eq!(reg.current(), 0);
    }

    #[test]
    fn table_groups_windows_per_bank() {
        let mut table = BankTable::new(1);
        table.insert(0, Mapping::new(0x8000, vec![1; 0x2000]));
        table.insert(0, Mapping::new(0xA000, vec![2; 0x2000]));
        assert_eq!(table.len(), 1);
        assert_eq!(table.mappings(0).map(<[Mapping]>::len), Some(2));
    }

    #[test]
    fn switch_vacates_windows_the_new_bank_leaves_empty() {
        let mut table = BankTable::new(64);
        table.insert(0, Mapping::new(0x8000, vec![0x10; 0x2000]));
        table.insert(0, Mapping::new(0xA000, vec![0xA0; 0x2000]));
        table.insert(1, Mapping::new(0x8000, vec![0x11; 0x1000]));
        let mut reg = BankRegister::new();

        let switch = reg.select(&table, 1).expect("loaded");
        assert_eq!(switch.vacate, vec![0x9000..0xA000, 0xA000..0xC000]);

        // Going back covers everything bank 1 drove.
        let switch = reg.select(&table, 0).expect("loaded");
        assert!(switch.vacate.is_empty());
    }

    #[test]
    fn same_bank_vacates_nothing() {
        let table = ocean_table();
        let mut reg = BankRegister::new();
        assert!(reg.select(&table, 0).expect("loaded").vacate.is_empty());
    }
}
