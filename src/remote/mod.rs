//! Remote packages: the CCModDB catalog and packed files given on the
//! command line.

mod method;
mod packed;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use log::{debug, warn};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::game::GameInstance;
use crate::http::HttpClient;
use crate::package::{
    LOADER_NAME, LogFn, Package, PackageMetadata, PackageType, RawMetadata, RemotePackage,
    RemotePackages,
};

pub use method::{CCMOD, InstallError, InstallationMethod, MOD_ZIP, MethodRunner, packed_target};
pub use packed::PackedRemotePackage;

pub const DEFAULT_CATALOG_URL: &str =
    "https://raw.githubusercontent.com/CCDirectLink/CCModDB/master/npDatabase.json";

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    metadata: RawMetadata,
    #[serde(default)]
    installation: Vec<InstallationMethod>,
}

/// A package offered by the catalog.
pub struct CatalogPackage {
    metadata: PackageMetadata,
    methods: Vec<InstallationMethod>,
    runner: Arc<MethodRunner>,
}

impl Package for CatalogPackage {
    fn metadata(&self) -> &PackageMetadata {
        &self.metadata
    }
}

#[async_trait]
impl RemotePackage for CatalogPackage {
    #[tracing::instrument(skip(self, game, log), fields(name = %self.metadata.name))]
    async fn install(&self, game: &GameInstance, log: &LogFn<'_>) -> Result<()> {
        let name = &self.metadata.name;
        let target = match self.metadata.package_type {
            PackageType::Base if name == LOADER_NAME => game.base().to_path_buf(),
            PackageType::Base => bail!("Unable to handle special behavior for '{}'", name),
            kind => game
                .package_dir(kind, name)
                .with_context(|| format!("No install location for {} '{}'", kind, name))?,
        };
        self.runner
            .install(game.runtime(), name, &self.methods, &target, log)
            .await
    }
}

/// The CCModDB package database.
pub struct Catalog;

impl Catalog {
    /// Download the catalog and build its packages.
    #[tracing::instrument(skip(http, runner))]
    pub async fn fetch(
        http: &HttpClient,
        url: &str,
        runner: Arc<MethodRunner>,
    ) -> Result<RemotePackages> {
        let entries: BTreeMap<String, serde_json::Value> = http
            .get_json(url)
            .await
            .with_context(|| format!("Unable to fetch the mod catalog from {}", url))?;
        Ok(Self::from_entries(entries, runner))
    }

    /// Parse a catalog document.
    pub fn parse(text: &str, runner: Arc<MethodRunner>) -> Result<RemotePackages> {
        let entries = serde_json::from_str(text).context("Unable to parse the mod catalog")?;
        Ok(Self::from_entries(entries, runner))
    }

    /// Entries that fail to parse, fail verification, or are stored under a
    /// key other than their own name are left out.
    fn from_entries(
        entries: BTreeMap<String, serde_json::Value>,
        runner: Arc<MethodRunner>,
    ) -> RemotePackages {
        let mut packages = RemotePackages::new();
        for (key, value) in entries {
            let entry: CatalogEntry = match serde_json::from_value(value) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Ignoring catalog entry '{}': {}", key, e);
                    continue;
                }
            };
            let metadata = match PackageMetadata::try_from(entry.metadata) {
                Ok(metadata) => metadata,
                Err(e) => {
                    warn!("Ignoring catalog entry '{}': {}", key, e);
                    continue;
                }
            };
            if metadata.name != key {
                warn!(
                    "Ignoring catalog entry '{}': it describes '{}'",
                    key, metadata.name
                );
                continue;
            }
            debug!("Catalog offers {} {}", key, metadata.version);
            packages.insert(
                key,
                Arc::new(CatalogPackage {
                    metadata,
                    methods: entry.installation,
                    runner: Arc::clone(&runner),
                }),
            );
        }
        packages
    }
}
