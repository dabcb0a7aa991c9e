//! Installation methods listed by catalog entries, and the code that runs them.

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::archive::{ArchiveExtractor, ArchiveExtractorImpl};
use crate::download::{download_file, url_file_name};
use crate::http::HttpClient;
use crate::package::{LogFn, PACKED_EXTENSION};
use crate::platform::Platform;
use crate::runtime::{Runtime, copy_tree, join_within};

pub const MOD_ZIP: &str = "modZip";
pub const CCMOD: &str = "ccmod";

const FALLBACK_ARCHIVE_NAME: &str = "archive.zip";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InstallError {
    #[error("All installation methods for '{0}' failed")]
    AllMethodsFailed(String),
    #[error("Unable to interpret installation method of type {0}")]
    UnsupportedType(String),
    #[error("Installation method requires platform {required}, this is {actual}")]
    PlatformMismatch { required: String, actual: String },
    #[error("Installation method of type {0} has no url")]
    MissingUrl(String),
    #[error("Source path '{0}' leaves the archive")]
    UnsafeSource(String),
}

/// One way of getting a package onto disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationMethod {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Subdirectory of a `modZip` archive to install instead of its root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}

impl InstallationMethod {
    fn url(&self) -> Result<&str, InstallError> {
        self.url
            .as_deref()
            .ok_or_else(|| InstallError::MissingUrl(self.kind.clone()))
    }
}

/// Shared machinery for running installation methods.
pub struct MethodRunner {
    http: HttpClient,
    extractor: ArchiveExtractorImpl,
    platform: Platform,
}

impl MethodRunner {
    pub fn new(http: HttpClient, platform: Platform) -> Self {
        Self {
            http,
            extractor: ArchiveExtractorImpl::new(),
            platform,
        }
    }

    /// Try each method in order until one succeeds.
    ///
    /// Methods for another platform are skipped. When exactly one method was
    /// attempted its error is returned as is.
    #[tracing::instrument(skip(self, runtime, methods, log))]
    pub async fn install(
        &self,
        runtime: &dyn Runtime,
        name: &str,
        methods: &[InstallationMethod],
        target: &Path,
        log: &LogFn<'_>,
    ) -> Result<()> {
        let mut errors = Vec::new();
        for (index, method) in methods.iter().enumerate() {
            if let Some(required) = &method.platform
                && !self.platform.matches(required)
            {
                debug!(
                    "Skipping method {} of {}: {}",
                    index,
                    name,
                    InstallError::PlatformMismatch {
                        required: required.clone(),
                        actual: self.platform.to_string(),
                    }
                );
                continue;
            }

            log(&format!("Trying installation method {} ({})", index, method.kind));
            match self.run(runtime, method, target).await {
                Ok(()) => {
                    info!("Installed {} with method {}", name, index);
                    return Ok(());
                }
                Err(e) => {
                    log(&format!("Failed: {:#}", e));
                    errors.push(e);
                }
            }
        }

        if errors.len() == 1 {
            return Err(errors.remove(0));
        }
        Err(InstallError::AllMethodsFailed(name.to_string()).into())
    }

    async fn run(
        &self,
        runtime: &dyn Runtime,
        method: &InstallationMethod,
        target: &Path,
    ) -> Result<()> {
        match method.kind.as_str() {
            MOD_ZIP => {
                self.run_mod_zip(runtime, method.url()?, method.source.as_deref(), target)
                    .await
            }
            CCMOD => self.run_ccmod(runtime, method.url()?, target).await,
            other => Err(InstallError::UnsupportedType(other.to_string()).into()),
        }
    }

    async fn run_mod_zip(
        &self,
        runtime: &dyn Runtime,
        url: &str,
        source: Option<&str>,
        target: &Path,
    ) -> Result<()> {
        let staging = staging_dir()?;
        let archive_name = url_file_name(url)
            .filter(|name| self.extractor.can_handle(Path::new(name)))
            .unwrap_or(FALLBACK_ARCHIVE_NAME);
        let archive = staging.path().join(archive_name);

        download_file(runtime, url, &archive, &self.http)
            .await
            .context("Unable to download")?;

        let extracted = staging.path().join("extracted");
        self.extractor
            .extract(runtime, &archive, &extracted)
            .context("Unable to extract")?;

        let root = match source {
            Some(source) => join_within(&extracted, source)
                .ok_or_else(|| InstallError::UnsafeSource(source.to_string()))?,
            None => extracted,
        };
        copy_tree(runtime, &root, target)
            .with_context(|| format!("Unable to copy into {:?}", target))
    }

    async fn run_ccmod(&self, runtime: &dyn Runtime, url: &str, target: &Path) -> Result<()> {
        let staging = staging_dir()?;
        let download = staging.path().join(format!("package.{}", PACKED_EXTENSION));

        download_file(runtime, url, &download, &self.http)
            .await
            .context("Unable to download")?;

        let dest = packed_target(target);
        if let Some(parent) = dest.parent() {
            runtime.create_dir_all(parent)?;
        }
        runtime
            .copy(&download, &dest)
            .with_context(|| format!("Unable to copy into {:?}", dest))?;
        Ok(())
    }
}

fn staging_dir() -> Result<tempfile::TempDir> {
    tempfile::Builder::new()
        .prefix("ccupdater-")
        .tempdir()
        .context("Unable to make temp directory")
}

/// `<target>.ccmod`
pub fn packed_target(target: &Path) -> PathBuf {
    let mut name = OsString::from(target.as_os_str());
    name.push(".");
    name.push(PACKED_EXTENSION);
    PathBuf::from(name)
}
