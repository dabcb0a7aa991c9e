//! Packages found in a game installation and the plugins that find them.
//!
//! Directory layout of a game:
//!
//! ```text
//! <game>/assets/data/changelog.json   game version      (crosscode)
//! <game>/ccloader/package.json        loader            (ccloader)
//! <game>/assets/mods/<name>/          unpacked mod
//! <game>/assets/mods/<name>.ccmod     packed mod
//! <game>/assets/tools/...             same forms, for tools
//! ```

use anyhow::{Context, Result};
use log::debug;
use semver::Version;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::version::parse_lenient;
use super::{
    GAME_NAME, LOADER_NAME, LocalPackage, Package, PackageMetadata, PackageType,
    is_packed_file, read_packed_metadata,
};
use crate::game::LocalPackagePlugin;
use crate::runtime::Runtime;

/// A mod or tool, either as a directory or as a packed `.ccmod` file.
pub struct ModPackage {
    runtime: Arc<dyn Runtime>,
    location: PathBuf,
    packed: bool,
    metadata: PackageMetadata,
}

impl ModPackage {
    /// Load a mod from a directory containing `package.json`.
    pub fn from_directory(runtime: Arc<dyn Runtime>, location: &Path) -> Result<Self> {
        let metadata_path = location.join("package.json");
        let text = runtime
            .read_to_string(&metadata_path)
            .with_context(|| format!("Failed to read {:?}", metadata_path))?;
        let metadata = PackageMetadata::from_json(&text)?.finish_local();
        Ok(Self {
            runtime,
            location: location.to_path_buf(),
            packed: false,
            metadata,
        })
    }

    /// Load a mod from a packed `.ccmod` file.
    pub fn from_packed(runtime: Arc<dyn Runtime>, location: &Path) -> Result<Self> {
        let raw = read_packed_metadata(runtime.as_ref(), location)?;
        let metadata = PackageMetadata::try_from(raw)?.finish_local();
        Ok(Self {
            runtime,
            location: location.to_path_buf(),
            packed: true,
            metadata,
        })
    }

    pub fn is_packed(&self) -> bool {
        self.packed
    }
}

impl Package for ModPackage {
    fn metadata(&self) -> &PackageMetadata {
        &self.metadata
    }
}

impl LocalPackage for ModPackage {
    #[tracing::instrument(skip(self), fields(name = %self.metadata.name))]
    fn remove(&self) -> Result<()> {
        debug!("Removing {:?}", self.location);
        if self.packed {
            self.runtime.remove_file(&self.location)
        } else {
            self.runtime.remove_dir_all(&self.location)
        }
    }
}

/// Scans an `assets/mods`-like directory for unpacked and packed mods.
pub struct ModlikePlugin {
    runtime: Arc<dyn Runtime>,
    dir: PathBuf,
}

impl ModlikePlugin {
    pub fn new(runtime: Arc<dyn Runtime>, dir: PathBuf) -> Self {
        Self { runtime, dir }
    }
}

impl LocalPackagePlugin for ModlikePlugin {
    #[tracing::instrument(skip(self), fields(dir = ?self.dir))]
    fn packages(&self) -> Vec<Arc<dyn LocalPackage>> {
        let mut entries = match self.runtime.read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Unable to scan {:?}: {}", self.dir, e);
                return Vec::new();
            }
        };
        entries.sort();

        let mut packages: Vec<Arc<dyn LocalPackage>> = Vec::new();
        for entry in entries {
            let found = if self.runtime.is_dir(&entry) {
                ModPackage::from_directory(Arc::clone(&self.runtime), &entry)
            } else if is_packed_file(&entry) {
                ModPackage::from_packed(Arc::clone(&self.runtime), &entry)
            } else {
                continue;
            };
            match found {
                Ok(package) => packages.push(Arc::new(package)),
                Err(e) => debug!("Skipping {:?}: {:#}", entry, e),
            }
        }
        packages
    }
}

/// The CCLoader mod loader installed at `<game>/ccloader`.
pub struct LoaderPackage {
    runtime: Arc<dyn Runtime>,
    dir: PathBuf,
    metadata: PackageMetadata,
}

impl Package for LoaderPackage {
    fn metadata(&self) -> &PackageMetadata {
        &self.metadata
    }
}

impl LocalPackage for LoaderPackage {
    fn remove(&self) -> Result<()> {
        debug!("Removing loader at {:?}", self.dir);
        self.runtime.remove_dir_all(&self.dir)
    }
}

pub struct LoaderPlugin {
    runtime: Arc<dyn Runtime>,
    game_base: PathBuf,
}

impl LoaderPlugin {
    pub fn new(runtime: Arc<dyn Runtime>, game_base: PathBuf) -> Self {
        Self { runtime, game_base }
    }

    fn load(&self) -> Result<LoaderPackage> {
        let dir = self.game_base.join(LOADER_NAME);
        let text = self.runtime.read_to_string(&dir.join("package.json"))?;
        let mut metadata = PackageMetadata::from_json(&text)?.finish_local();
        // The loader's own package.json is not required to use the canonical name.
        metadata.name = LOADER_NAME.to_string();
        metadata.package_type = PackageType::Base;
        Ok(LoaderPackage {
            runtime: Arc::clone(&self.runtime),
            dir,
            metadata,
        })
    }
}

impl LocalPackagePlugin for LoaderPlugin {
    fn packages(&self) -> Vec<Arc<dyn LocalPackage>> {
        match self.load() {
            Ok(loader) => vec![Arc::new(loader)],
            Err(e) => {
                debug!("No loader found in {:?}: {:#}", self.game_base, e);
                Vec::new()
            }
        }
    }
}

/// The game itself, versioned by its changelog. It can be depended upon but
/// never removed.
pub struct GamePackage {
    metadata: PackageMetadata,
}

impl GamePackage {
    pub fn new(version: Version) -> Self {
        Self {
            metadata: PackageMetadata {
                name: GAME_NAME.to_string(),
                package_type: PackageType::Base,
                description: "CrossCode.".to_string(),
                version,
                dependencies: BTreeMap::new(),
            },
        }
    }
}

impl Package for GamePackage {
    fn metadata(&self) -> &PackageMetadata {
        &self.metadata
    }
}

impl LocalPackage for GamePackage {
    fn remove(&self) -> Result<()> {
        anyhow::bail!("The game itself cannot be removed")
    }
}

#[derive(Deserialize)]
struct Changelog {
    changelog: Vec<ChangelogEntry>,
}

#[derive(Deserialize)]
struct ChangelogEntry {
    version: String,
}

pub struct GamePlugin {
    runtime: Arc<dyn Runtime>,
    game_base: PathBuf,
}

impl GamePlugin {
    pub fn new(runtime: Arc<dyn Runtime>, game_base: PathBuf) -> Self {
        Self { runtime, game_base }
    }

    fn version(&self) -> Result<Version> {
        let path = self.game_base.join("assets/data/changelog.json");
        let text = self.runtime.read_to_string(&path)?;
        let changelog: Changelog =
            serde_json::from_str(&text).with_context(|| format!("Failed to parse {:?}", path))?;
        changelog
            .changelog
            .iter()
            .filter_map(|entry| parse_lenient(&entry.version))
            .max_by(super::compare_precedence)
            .context("Changelog has no parseable version")
    }
}

impl LocalPackagePlugin for GamePlugin {
    fn packages(&self) -> Vec<Arc<dyn LocalPackage>> {
        match self.version() {
            Ok(version) => vec![Arc::new(GamePackage::new(version))],
            Err(e) => {
                debug!("Unable to detect game version in {:?}: {:#}", self.game_base, e);
                Vec::new()
            }
        }
    }
}
