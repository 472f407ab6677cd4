//! Manifest loading from disk.

use std::fs;

use cart_inject::{
    ConfigError, Handoff, ImageKind, LoadError, Menu, Outcome, RunPolicy, TargetMemory,
};
use format_crt::HardwareType;
use format_crt::builder::CrtBuilder;

#[test]
fn manifest_images_resolve_relative_to_manifest() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::create_dir(dir.path().join("roms")).expect("mkdir");
    fs::write(dir.path().join("roms/hello.prg"), [0x01, 0x08, 0x0B, 0x08]).expect("write prg");
    fs::write(
        dir.path().join("roms/cart.crt"),
        CrtBuilder::new(HardwareType::Normal)
            .chip(0, 0x8000, &[0u8; 0x2000])
            .build(),
    )
    .expect("write crt");

    let manifest = dir.path().join("menu.json");
    fs::write(
        &manifest,
        r#"{
            "run_policy": "run",
            "items": [
                { "kind": "none", "label": "Programs" },
                { "kind": "prg", "label": "Hello", "path": "roms/hello.prg", "size": 4 },
                { "kind": "crt", "label": "Cart", "path": "roms/cart.crt" },
                { "kind": 12, "label": "Odd", "path": "roms/hello.prg" }
            ]
        }"#,
    )
    .expect("write manifest");

    let menu = Menu::load(&manifest).expect("manifest loads");
    assert_eq!(menu.len(), 4);
    assert_eq!(menu.run_policy(), RunPolicy::Run);
    assert_eq!(
        menu.selectable().map(|(i, _)| i).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert_eq!(menu.get(1).and_then(|i| i.kind().ok()), Some(ImageKind::Prg));

    let mut h = Handoff::new(TargetMemory::new(), menu.run_policy());
    let item = menu.get(1).expect("entry 1");
    assert!(matches!(h.select(item), Ok(Outcome::Launched(_))));
    assert_eq!(h.bus().slice(0x0801, 2), &[0x0B, 0x08]);

    // Numeric tags survive loading and fail on selection.
    let odd = menu.get(3).expect("entry 3");
    assert_eq!(
        h.select(odd),
        Err(LoadError::InvalidImageKind("12".to_string()))
    );
}

#[test]
fn missing_image_file_is_reported() {
    let dir = tempfile::tempdir().expect("tempdir");
    let manifest = dir.path().join("menu.json");
    fs::write(
        &manifest,
        r#"{ "items": [ { "kind": "bin8k-lo", "label": "Gone", "path": "gone.bin" } ] }"#,
    )
    .expect("write manifest");

    match Menu::load(&manifest) {
        Err(ConfigError::Io { path, .. }) => assert!(path.ends_with("gone.bin")),
        other => panic!("expected io error, got {other:?}"),
    }
}

#[test]
fn oversized_image_file_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("big.bin"), vec![0u8; 0x1_0001]).expect("write");
    let manifest = dir.path().join("menu.json");
    fs::write(
        &manifest,
        r#"{ "items": [ { "kind": "crt", "label": "Big", "path": "big.bin" } ] }"#,
    )
    .expect("write manifest");

    assert!(matches!(
        Menu::load(&manifest),
        Err(ConfigError::ImageTooLarge { len: 0x1_0001, .. })
    ));
}

#[test]
fn missing_manifest_is_reported() {
    let dir = tempfile::tempdir().expect("tempdir");
    assert!(matches!(
        Menu::load(&dir.path().join("absent.json")),
        Err(ConfigError::Io { .. })
    ));
}
