//! Cartridge hardware type codes from the CRT header.

/// Cartridge hardware type (header offset $16).
///
/// Each type implies how many banks its bank-select register can address.
/// Packets naming a bank beyond that limit are rejected by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HardwareType {
    /// Type 0: plain 8K or 16K, no bankswitching.
    Normal,
    /// Type 1: Action Replay, 4x8K.
    ActionReplay,
    /// Type 2: KCS Power Cartridge.
    KcsPower,
    /// Type 3: Final Cartridge III, 4x16K.
    FinalCartridgeIii,
    /// Type 4: Simons' BASIC, ROML+ROMH toggled via $DE00.
    SimonsBasic,
    /// Type 5: Ocean type 1, up to 64x8K.
    Ocean,
    /// Type 6: Expert Cartridge.
    Expert,
    /// Type 7: Fun Play / Power Play, 16x8K.
    FunPlay,
    /// Type 8: Super Games, 4x16K.
    SuperGames,
    /// Type 9: Atomic Power, 4x8K.
    AtomicPower,
    /// Type 10: Epyx Fastload.
    EpyxFastload,
    /// Type 11: Westermann Learning.
    Westermann,
    /// Type 12: Rex Utility.
    Rex,
    /// Type 13: Final Cartridge I.
    FinalCartridgeI,
    /// Type 14: Magic Formel, 8x8K.
    MagicFormel,
    /// Type 15: C64 Game System / System 3, 64x8K.
    C64GameSystem,
    /// Type 16: Warp Speed.
    WarpSpeed,
    /// Type 17: Dinamic, 16x8K.
    Dinamic,
    /// Type 18: Zaxxon / Super Zaxxon.
    Zaxxon,
    /// Type 19: Magic Desk / Domark / HES Australia, up to 128x8K.
    MagicDesk,
    /// Type 20: Super Snapshot V5, 4x16K.
    SuperSnapshot5,
    /// Type 21: Comal-80, 4x16K.
    Comal80,
    /// Type 32: EasyFlash, 64 dual banks.
    EasyFlash,
}

impl HardwareType {
    /// Decode a header type code. Unknown codes return `None`.
    #[must_use]
    pub fn from_code(code: u16) -> Option<Self> {
        Some(match code {
            0 => Self::Normal,
            1 => Self::ActionReplay,
            2 => Self::KcsPower,
            3 => Self::FinalCartridgeIii,
            4 => Self::SimonsBasic,
            5 => Self::Ocean,
            6 => Self::Expert,
            7 => Self::FunPlay,
            8 => Self::SuperGames,
            9 => Self::AtomicPower,
            10 => Self::EpyxFastload,
            11 => Self::Westermann,
            12 => Self::Rex,
            13 => Self::FinalCartridgeI,
            14 => Self::MagicFormel,
            15 => Self::C64GameSystem,
            16 => Self::WarpSpeed,
            17 => Self::Dinamic,
            18 => Self::Zaxxon,
            19 => Self::MagicDesk,
            20 => Self::SuperSnapshot5,
            21 => Self::Comal80,
            32 => Self::EasyFlash,
            _ => return None,
        })
    }

    /// The header type code.
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::Normal => 0,
            Self::ActionReplay => 1,
            Self::KcsPower => 2,
            Self::FinalCartridgeIii => 3,
            Self::SimonsBasic => 4,
            Self::Ocean => 5,
            Self::Expert => 6,
            Self::FunPlay => 7,
            Self::SuperGames => 8,
            Self::AtomicPower => 9,
            Self::EpyxFastload => 10,
            Self::Westermann => 11,
            Self::Rex => 12,
            Self::FinalCartridgeI => 13,
            Self::MagicFormel => 14,
            Self::C64GameSystem => 15,
            Self::WarpSpeed => 16,
            Self::Dinamic => 17,
            Self::Zaxxon => 18,
            Self::MagicDesk => 19,
            Self::SuperSnapshot5 => 20,
            Self::Comal80 => 21,
            Self::EasyFlash => 32,
        }
    }

    /// Number of banks the hardware can select. Valid bank indices are
    /// `0..bank_count()`.
    #[must_use]
    pub const fn bank_count(self) -> u16 {
        match self {
            Self::Normal
            | Self::KcsPower
            | Self::SimonsBasic
            | Self::Expert
            | Self::EpyxFastload
            | Self::Westermann
            | Self::Rex
            | Self::FinalCartridgeI
            | Self::WarpSpeed => 1,
            Self::Zaxxon => 2,
            Self::ActionReplay
            | Self::FinalCartridgeIii
            | Self::SuperGames
            | Self::AtomicPower
            | Self::SuperSnapshot5
            | Self::Comal80 => 4,
            Self::MagicFormel => 8,
            Self::FunPlay | Self::Dinamic => 16,
            Self::Ocean | Self::C64GameSystem | Self::EasyFlash => 64,
            Self::MagicDesk => 128,
        }
    }

    /// Whether this hardware has a bank-select register at all.
    #[must_use]
    pub const fn is_banked(self) -> bool {
        self.bank_count() > 1
    }

    /// Human-readable name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Normal => "Normal cartridge",
            Self::ActionReplay => "Action Replay",
            Self::KcsPower => "KCS Power Cartridge",
            Self::FinalCartridgeIii => "Final Cartridge III",
            Self::SimonsBasic => "Simons' BASIC",
            Self::Ocean => "Ocean type 1",
            Self::Expert => "Expert Cartridge",
            Self::FunPlay => "Fun Play, Power Play",
            Self::SuperGames => "Super Games",
            Self::AtomicPower => "Atomic Power",
            Self::EpyxFastload => "Epyx Fastload",
            Self::Westermann => "Westermann Learning",
            Self::Rex => "Rex Utility",
            Self::FinalCartridgeI => "Final Cartridge I",
            Self::MagicFormel => "Magic Formel",
            Self::C64GameSystem => "C64 Game System, System 3",
            Self::WarpSpeed => "Warp Speed",
            Self::Dinamic => "Dinamic",
            Self::Zaxxon => "Zaxxon, Super Zaxxon",
            Self::MagicDesk => "Magic Desk, Domark, HES Australia",
            Self::SuperSnapshot5 => "Super Snapshot V5",
            Self::Comal80 => "Comal-80",
            Self::EasyFlash => "EasyFlash",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for code in (0..=21).chain([32]) {
            let hw = HardwareType::from_code(code).expect("known code");
            assert_eq!(hw.code(), code);
        }
    }

    #[test]
    fn unassigned_codes_are_unknown() {
        assert_eq!(HardwareType::from_code(22), None);
        assert_eq!(HardwareType::from_code(31), None);
        assert_eq!(HardwareType::from_code(0xFFFF), None);
    }

    #[test]
    fn normal_is_not_banked() {
        assert!(!HardwareType::Normal.is_banked());
        assert!(HardwareType::Ocean.is_banked());
        assert_eq!(HardwareType::MagicDesk.bank_count(), 128);
    }
}
