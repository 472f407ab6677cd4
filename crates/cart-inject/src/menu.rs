//! Menu configuration table.
//!
//! The menu is an ordered, immutable list of `MenuItem`s built once at
//! startup and handed to the handoff by reference. It is usually read from
//! a JSON manifest:
//!
//! ```json
//! {
//!   "run_policy": "auto",
//!   "items": [
//!     { "kind": "none", "label": "Utilities" },
//!     { "kind": "crt", "label": "Epyx Fast Load", "path": "epyx.crt" },
//!     { "kind": "prg", "label": "Hex Mon", "path": "hexmon.prg", "size": 4098 },
//!     { "kind": "bin8k-hi", "label": "Dead Test", "path": "deadtest.bin" }
//!   ]
//! }
//! ```
//!
//! `kind` is a name or a raw numeric tag. Names are checked here; numeric
//! tags are passed through and checked by the classifier on selection.
//! Image paths resolve relative to the manifest.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::error::LoadError;
use crate::kind::{ImageKind, MAX_IMAGE_LEN, MenuItem};
use crate::run::RunPolicy;

/// Failure while building the menu.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid manifest: {0}")]
    Json(#[from] serde_json::Error),

    #[error("item {index}: {source}")]
    Kind {
        index: usize,
        #[source]
        source: LoadError,
    },

    #[error("item {index} ({label:?}) needs an image path")]
    MissingPath { index: usize, label: String },

    #[error("{path}: {len} bytes exceeds the 64 KiB load limit")]
    ImageTooLarge { path: PathBuf, len: usize },
}

/// Kind field: a manifest name or a raw table tag.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum KindSpec {
    Tag(u8),
    Name(String),
}

/// One manifest entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MenuEntry {
    pub kind: KindSpec,
    pub label: String,
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Declared size, meaningful for PRG images only.
    #[serde(default)]
    pub size: Option<usize>,
}

/// Deserialized manifest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MenuConfig {
    #[serde(default)]
    pub run_policy: RunPolicy,
    pub items: Vec<MenuEntry>,
}

impl MenuConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read images and build the menu. Paths resolve against `base_dir`.
    pub fn into_menu(self, base_dir: &Path) -> Result<Menu, ConfigError> {
        let mut items = Vec::with_capacity(self.items.len());
        for (index, entry) in self.items.into_iter().enumerate() {
            items.push(entry.into_item(index, base_dir)?);
        }
        Ok(Menu {
            items,
            run_policy: self.run_policy,
        })
    }
}

impl MenuEntry {
    fn into_item(self, index: usize, base_dir: &Path) -> Result<MenuItem, ConfigError> {
        let tag = match &self.kind {
            KindSpec::Tag(tag) => *tag,
            KindSpec::Name(name) => name
                .parse::<ImageKind>()
                .map_err(|source| ConfigError::Kind { index, source })?
                .tag(),
        };

        let data = match self.path {
            Some(path) => Some(read_image(&base_dir.join(path))?),
            None if tag == ImageKind::None.tag() => None,
            None => {
                return Err(ConfigError::MissingPath {
                    index,
                    label: self.label,
                });
            }
        };

        let mut item = MenuItem::from_tag(tag, self.label, data);
        item.declared_size = self.size;
        Ok(item)
    }
}

fn read_image(path: &Path) -> Result<Arc<[u8]>, ConfigError> {
    let bytes = fs::read(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if bytes.len() > MAX_IMAGE_LEN {
        return Err(ConfigError::ImageTooLarge {
            path: path.to_path_buf(),
            len: bytes.len(),
        });
    }
    debug!(path = %path.display(), len = bytes.len(), "image read");
    Ok(Arc::from(bytes))
}

/// Immutable menu table.
#[derive(Debug, Clone, Default)]
pub struct Menu {
    items: Vec<MenuItem>,
    run_policy: RunPolicy,
}

impl Menu {
    #[must_use]
    pub fn new(items: Vec<MenuItem>, run_policy: RunPolicy) -> Self {
        Self { items, run_policy }
    }

    /// Load a manifest file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let menu = MenuConfig::from_json(&text)?.into_menu(base_dir)?;
        info!(
            path = %path.display(),
            items = menu.len(),
            selectable = menu.selectable().count(),
            "menu loaded"
        );
        Ok(menu)
    }

    #[must_use]
    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&MenuItem> {
        self.items.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn run_policy(&self) -> RunPolicy {
        self.run_policy
    }

    /// Entries that load something, with their table index.
    pub fn selectable(&self) -> impl Iterator<Item = (usize, &MenuItem)> {
        self.items.iter().enumerate().filter(|(_, item)| item.is_selectable())
    }
}
