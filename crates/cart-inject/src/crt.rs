//! CRT loader.
//!
//! Decodes the container, records every CHIP packet in the bank table and
//! exposes bank 0 through the ROM windows. The whole packet sequence is
//! validated by the parser before any mapping exists, so a container that
//! fails anywhere produces no writes at all.

use tracing::debug;

use crate::bank::BankTable;
use crate::error::LoadError;
use crate::image::{ControlLines, LoadedImage, Mapping};
use crate::kind::ImageKind;

/// Build a `LoadedImage` from a CRT container.
pub fn load_crt(data: &[u8]) -> Result<LoadedImage, LoadError> {
    let crt = format_crt::parse(data)?;
    let header = &crt.header;
    debug!(
        name = %header.name,
        hardware = header.hardware.name(),
        banked = header.hardware.is_banked(),
        chips = crt.chips.len(),
        banks = crt.bank_span(),
        "CRT container"
    );

    let mut banks = BankTable::new(header.hardware.bank_count());
    for chip in &crt.chips {
        debug!(
            bank = chip.bank,
            address = format_args!("${:04X}", chip.load_address),
            size = chip.data.len(),
            both_windows = chip.spans_both_windows(),
            "CHIP packet"
        );
        banks.insert(chip.bank, Mapping::new(chip.load_address, chip.data));
    }

    let lines = ControlLines {
        exrom: header.exrom,
        game: header.game,
    };
    let boot = banks.mappings(0).map(<[Mapping]>::to_vec).unwrap_or_default();

    let mut image = LoadedImage::new(ImageKind::Crt, lines);
    image.mappings = boot;
    image.banks = banks;
    image.entry = image.cartridge_entry();
    Ok(image)
}
