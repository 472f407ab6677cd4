//! Execution handoff.
//!
//! Owns the target bus for the whole life of a selection and sequences it
//! through `Idle → Loading → Configured → Released`:
//!
//! - **Loading**: image decoded and validated, reset asserted, then written.
//! - **Configured**: control lines set for the image just written.
//! - **Released**: reset released, target running the image.
//!
//! `Idle` is the only re-entry point. A new selection always passes
//! through it, and every failure lands back in it with the target held in
//! reset. Selections are serialized by `&mut self`, so two loads can never
//! interleave their writes.

use std::fmt;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::bank::{BankRegister, BankTable, OPEN_BUS};
use crate::crt::load_crt;
use crate::error::LoadError;
use crate::image::{ControlLines, LoadedImage, MemoryMode};
use crate::kind::{ImageKind, MenuItem, Selection, classify};
use crate::prg::load_prg;
use crate::raw::map_raw;
use crate::run::{RunCommand, RunPolicy};
use crate::target::TargetBus;

/// Handoff state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum HandoffState {
    Idle,
    Loading,
    Configured,
    Released,
}

impl fmt::Display for HandoffState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Configured => "configured",
            Self::Released => "released",
        })
    }
}

/// Result of a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Separator entry: nothing happened on the bus.
    Ignored,
    /// Image written and target released.
    Launched(Launch),
}

/// Summary of a launched image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Launch {
    pub label: String,
    pub kind: ImageKind,
    pub lines: ControlLines,
    pub mode: MemoryMode,
    pub entry: Option<u16>,
    pub bytes_written: usize,
    pub banks: usize,
    pub run: Option<RunCommand>,
}

/// Serializable snapshot of the handoff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandoffStatus {
    pub state: HandoffState,
    pub reset_asserted: bool,
    pub lines: ControlLines,
    pub mode: MemoryMode,
    pub bank: u16,
    pub banks: usize,
    pub entry: Option<u16>,
    pub pending_run: Option<RunCommand>,
}

/// Sequencer that owns the target bus.
pub struct Handoff<B: TargetBus> {
    bus: B,
    state: HandoffState,
    policy: RunPolicy,
    lines: ControlLines,
    banks: BankTable,
    bank: BankRegister,
    entry: Option<u16>,
    pending_run: Option<RunCommand>,
}

impl<B: TargetBus> Handoff<B> {
    #[must_use]
    pub fn new(bus: B, policy: RunPolicy) -> Self {
        Self {
            bus,
            state: HandoffState::Idle,
            policy,
            lines: ControlLines::OFF,
            banks: BankTable::default(),
            bank: BankRegister::new(),
            entry: None,
            pending_run: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> HandoffState {
        self.state
    }

    /// Read-only view of the bus.
    #[must_use]
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Give up the bus.
    #[must_use]
    pub fn into_bus(self) -> B {
        self.bus
    }

    #[must_use]
    pub fn status(&self) -> HandoffStatus {
        HandoffStatus {
            state: self.state,
            reset_asserted: self.bus.reset_asserted(),
            lines: self.lines,
            mode: self.lines.mode(),
            bank: self.bank.current(),
            banks: self.banks.len(),
            entry: self.entry,
            pending_run: self.pending_run,
        }
    }

    /// Load and launch a menu item.
    ///
    /// Separators return `Outcome::Ignored` without touching the bus or
    /// the state. Any failure aborts to `Idle` with reset held.
    pub fn select(&mut self, item: &MenuItem) -> Result<Outcome, LoadError> {
        let image = match classify(item).and_then(dispatch) {
            Ok(Some(image)) => image,
            Ok(None) => {
                debug!(label = %item.label, "separator selected");
                return Ok(Outcome::Ignored);
            }
            Err(err) => return Err(self.fail(&item.label, err)),
        };

        self.begin();
        self.launch(&item.label, image).map(Outcome::Launched)
    }

    /// Abandon whatever is running: reset held, back to `Idle`.
    pub fn abort(&mut self) {
        self.bus.set_reset(true);
        self.state = HandoffState::Idle;
        self.lines = ControlLines::OFF;
        self.bus.set_control_lines(self.lines);
        self.banks = BankTable::default();
        self.bank.reset();
        self.entry = None;
        self.pending_run = None;
    }

    /// The target reports that its Kernal finished booting. Delivers the
    /// queued run command, if any.
    pub fn boot_completed(&mut self) -> Result<Option<RunCommand>, LoadError> {
        if self.state != HandoffState::Released {
            return Err(LoadError::NotRunning);
        }
        let Some(command) = self.pending_run.take() else {
            return Ok(None);
        };
        info!(%command, "delivering run command");
        if let Err(err) = command.deliver(&mut self.bus) {
            return Err(self.fail("run command", err));
        }
        Ok(Some(command))
    }

    /// Emulate a write to the bank-select register of a running cartridge.
    pub fn switch_bank(&mut self, bank: u16) -> Result<(), LoadError> {
        if self.state != HandoffState::Released {
            return Err(LoadError::NotRunning);
        }
        let written = {
            let switch = self.bank.select(&self.banks, bank)?;
            let bus = &mut self.bus;
            switch
                .vacate
                .iter()
                .try_for_each(|range| {
                    let fill = vec![OPEN_BUS; (range.end - range.start) as usize];
                    bus.write_block(range.start as u16, &fill)
                })
                .and_then(|()| {
                    switch
                        .mappings
                        .iter()
                        .try_for_each(|m| bus.write_block(m.start, &m.bytes))
                })
        };
        if let Err(err) = written {
            return Err(self.fail("bank switch", err.into()));
        }
        Ok(())
    }

    /// Enter `Loading` from a fresh `Idle`.
    fn begin(&mut self) {
        if self.state != HandoffState::Idle {
            debug!(from = %self.state, "restarting from idle");
        }
        self.abort();
        self.state = HandoffState::Loading;
        debug!("loading");
    }

    fn launch(&mut self, label: &str, image: LoadedImage) -> Result<Launch, LoadError> {
        debug_assert!(image.is_disjoint(), "loader produced overlapping mappings");
        let bytes_written = image.mapped_len();

        for mapping in &image.mappings {
            debug!(
                start = format_args!("${:04X}", mapping.start),
                len = mapping.bytes.len(),
                "commit"
            );
            if let Err(err) = self.bus.write_block(mapping.start, &mapping.bytes) {
                return Err(self.fail(label, err.into()));
            }
        }

        // Configured
        self.lines = image.lines;
        self.bus.set_control_lines(image.lines);
        self.banks = image.banks;
        self.bank.reset();
        self.entry = image.entry;
        self.state = HandoffState::Configured;
        debug!(mode = %image.lines.mode(), "configured");

        // Released
        if image.kind == ImageKind::Prg {
            self.pending_run = image
                .entry
                .and_then(|addr| RunCommand::for_program(self.policy, addr));
        }
        self.bus.set_reset(false);
        self.state = HandoffState::Released;

        let launch = Launch {
            label: label.to_string(),
            kind: image.kind,
            lines: image.lines,
            mode: image.lines.mode(),
            entry: image.entry,
            bytes_written,
            banks: self.banks.len(),
            run: self.pending_run,
        };
        info!(
            label,
            kind = %launch.kind,
            mode = %launch.mode,
            bytes = launch.bytes_written,
            "released"
        );
        Ok(launch)
    }

    fn fail(&mut self, label: &str, err: LoadError) -> LoadError {
        warn!(label, error = %err, "load failed");
        self.abort();
        err
    }
}

/// Run the one loader a selection routes to. Separators load nothing.
fn dispatch(selection: Selection<'_>) -> Result<Option<LoadedImage>, LoadError> {
    match selection {
        Selection::None => Ok(None),
        Selection::Crt(data) => load_crt(data).map(Some),
        Selection::Prg(data) => load_prg(data).map(Some),
        Selection::Raw { socket, data } => map_raw(socket, data).map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::TargetMemory;
    use format_crt::HardwareType;
    use format_crt::builder::CrtBuilder;

    fn handoff() -> Handoff<TargetMemory> {
        Handoff::new(TargetMemory::new(), RunPolicy::Auto)
    }

    #[test]
    fn prg_launch_sequence() {
        let mut h = handoff();
        let item = MenuItem::new(ImageKind::Prg, "demo", vec![0x01, 0x08, 0xAA, 0xBB]);
        let Outcome::Launched(launch) = h.select(&item).expect("valid") else {
            panic!("expected launch");
        };
        assert_eq!(launch.entry, Some(0x0801));
        assert_eq!(launch.run, Some(RunCommand::Run));
        assert_eq!(h.state(), HandoffState::Released);
        assert!(!h.bus().reset_asserted());
        assert_eq!(h.bus().read(0x0801), 0xAA);
        assert_eq!(h.bus().read(0x0802), 0xBB);
        assert_eq!(h.bus().lines(), ControlLines::OFF);
    }

    #[test]
    fn run_command_waits_for_boot() {
        let mut h = handoff();
        let item = MenuItem::new(ImageKind::Prg, "ml", vec![0x00, 0xC0, 0x60]);
        h.select(&item).expect("valid");
        assert_eq!(h.bus().read(crate::run::KEYBOARD_COUNT), 0);

        assert_eq!(h.boot_completed(), Ok(Some(RunCommand::Sys(0xC000))));
        assert_eq!(h.bus().slice(crate::run::KEYBOARD_BUFFER, 9), b"SYS49152\r");
        assert_eq!(h.bus().read(crate::run::KEYBOARD_COUNT), 9);

        // Delivered once.
        assert_eq!(h.boot_completed(), Ok(None));
    }

    #[test]
    fn boot_completed_requires_running_image() {
        let mut h = handoff();
        assert_eq!(h.boot_completed(), Err(LoadError::NotRunning));
    }

    #[test]
    fn cartridge_lines_are_driven() {
        let mut h = handoff();
        let item = MenuItem::new(ImageKind::Bin8kHi, "dead test", vec![0u8; 8192]);
        h.select(&item).expect("valid");
        assert_eq!(h.bus().lines(), ControlLines::ULTIMAX);
        assert_eq!(h.status().mode, MemoryMode::Ultimax);
        assert_eq!(h.status().pending_run, None);
    }

    #[test]
    fn failure_returns_to_idle_in_reset() {
        let mut h = handoff();
        let item = MenuItem::new(ImageKind::Bin16k, "short", vec![0u8; 16383]);
        let err = h.select(&item).unwrap_err();
        assert!(matches!(err, LoadError::SizeMismatch { .. }));
        assert_eq!(h.state(), HandoffState::Idle);
        assert!(h.bus().reset_asserted());
        assert_eq!(h.bus().writes(), 0);
    }

    #[test]
    fn failure_does_not_poison_next_selection() {
        let mut h = handoff();
        let bad = MenuItem::new(ImageKind::Prg, "bad", vec![0x01]);
        assert!(h.select(&bad).is_err());
        let good = MenuItem::new(ImageKind::Prg, "good", vec![0x01, 0x08, 0x00]);
        assert!(matches!(h.select(&good), Ok(Outcome::Launched(_))));
        assert_eq!(h.state(), HandoffState::Released);
    }

    #[test]
    fn separator_is_inert() {
        let mut h = handoff();
        assert_eq!(h.select(&MenuItem::separator("---")), Ok(Outcome::Ignored));
        assert_eq!(h.state(), HandoffState::Idle);
        assert_eq!(h.bus().writes(), 0);
        assert_eq!(h.bus().reset_transitions(), 0);
    }

    #[test]
    fn bank_switch_rewrites_window() {
        let mut builder = CrtBuilder::new(HardwareType::MagicDesk).lines(false, true);
        for bank in 0..3u16 {
            builder = builder.chip(bank, 0x8000, &[bank as u8 + 0x20; 8192]);
        }
        let mut h = handoff();
        let item = MenuItem::new(ImageKind::Crt, "desk", builder.build());
        h.select(&item).expect("valid");
        assert_eq!(h.bus().read(0x8000), 0x20);

        h.switch_bank(2).expect("bank 2 present");
        assert_eq!(h.bus().read(0x9FFF), 0x22);
        assert_eq!(h.status().bank, 2);

        assert_eq!(
            h.switch_bank(7),
            Err(LoadError::BankNotLoaded { bank: 7, count: 3 })
        );
        assert_eq!(h.status().bank, 2);
        assert_eq!(h.state(), HandoffState::Released);
    }

    #[test]
    fn bank_without_romh_clears_romh() {
        let crt = CrtBuilder::new(HardwareType::EasyFlash)
            .lines(false, false)
            .chip(0, 0x8000, &[0x10; 8192])
            .chip(0, 0xA000, &[0xA0; 8192])
            .chip(1, 0x8000, &[0x11; 8192])
            .build();
        let mut h = handoff();
        h.select(&MenuItem::new(ImageKind::Crt, "flash", crt))
            .expect("valid");
        assert_eq!(h.bus().read(0xA000), 0xA0);

        h.switch_bank(1).expect("bank 1 present");
        assert_eq!(h.bus().read(0x8000), 0x11);
        assert!(h.bus().slice(0xA000, 0x2000).iter().all(|&b| b == OPEN_BUS));

        h.switch_bank(0).expect("bank 0 present");
        assert_eq!(h.bus().read(0x8000), 0x10);
        assert_eq!(h.bus().read(0xBFFF), 0xA0);
    }

    #[test]
    fn shorter_bank_leaves_no_tail() {
        let crt = CrtBuilder::new(HardwareType::Ocean)
            .lines(false, true)
            .chip(0, 0x8000, &[0x10; 8192])
            .chip(1, 0x8000, &[0x11; 4096])
            .build();
        let mut h = handoff();
        h.select(&MenuItem::new(ImageKind::Crt, "ocean", crt))
            .expect("valid");

        h.switch_bank(1).expect("bank 1 present");
        assert!(h.bus().slice(0x8000, 0x1000).iter().all(|&b| b == 0x11));
        assert!(h.bus().slice(0x9000, 0x1000).iter().all(|&b| b == OPEN_BUS));
    }

    #[test]
    fn bus_timeout_aborts() {
        let mut h = Handoff::new(TargetMemory::with_write_budget(100), RunPolicy::Auto);
        let item = MenuItem::new(ImageKind::Bin8kLo, "diag", vec![0u8; 8192]);
        let err = h.select(&item).unwrap_err();
        assert!(matches!(err, LoadError::BusTimeout(_)));
        assert_eq!(h.state(), HandoffState::Idle);
        assert!(h.bus().reset_asserted());
    }

    #[test]
    fn new_selection_restarts_from_idle() {
        let mut h = handoff();
        let a = MenuItem::new(ImageKind::Bin8kLo, "a", vec![0u8; 8192]);
        let b = MenuItem::new(ImageKind::Prg, "b", vec![0x01, 0x08, 0x00]);
        h.select(&a).expect("valid");
        h.select(&b).expect("valid");
        // Reset asserted and released once per launch.
        assert_eq!(h.bus().reset_transitions(), 4);
        assert_eq!(h.bus().lines(), ControlLines::OFF);
        assert_eq!(h.status().banks, 0);
    }
}
