//! Package model
//!
//! This module provides the metadata and version model shared by every
//! package, the capability traits local and remote packages implement, and
//! the local package kinds found in a game installation.

mod local;
mod metadata;
mod packed;
pub mod version;

use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::game::GameInstance;

pub use local::{GamePackage, GamePlugin, LoaderPackage, LoaderPlugin, ModPackage, ModlikePlugin};
pub use metadata::{
    LOADER_ASSISTANT_DESCRIPTION, MetadataError, PackageMetadata, PackageType, RawMetadata,
    is_valid_name,
};
pub use packed::{PACKED_EXTENSION, is_packed_file, read_packed_metadata};
pub use version::{VersionRange, compare_precedence};

/// Name of the mod loader package.
pub const LOADER_NAME: &str = "ccloader";

/// Name of the package representing the game itself.
pub const GAME_NAME: &str = "crosscode";

/// Receives progress lines while a package installs.
pub type LogFn<'l> = dyn for<'a> Fn(&'a str) + Send + Sync + 'l;

/// Anything that has package metadata.
pub trait Package: Send + Sync {
    fn metadata(&self) -> &PackageMetadata;
}

/// A package that can be installed into a game from somewhere other than the
/// installed set.
#[async_trait]
pub trait RemotePackage: Package {
    /// Install the package. Dependencies are not checked. Installing the
    /// loader writes into the game's base directory.
    async fn install(
        &self,
        game: &GameInstance,
        log: &LogFn<'_>,
    ) -> Result<()>;
}

/// A package physically present in a game installation.
pub trait LocalPackage: Package {
    /// Remove the package. Dependents are not checked.
    fn remove(&self) -> Result<()>;

    /// Map of required package name to version range.
    fn dependencies(&self) -> &BTreeMap<String, VersionRange> {
        &self.metadata().dependencies
    }
}

pub type LocalPackages = BTreeMap<String, Arc<dyn LocalPackage>>;
pub type RemotePackages = BTreeMap<String, Arc<dyn RemotePackage>>;
