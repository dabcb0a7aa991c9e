use anyhow::{Context as _, Result, bail};
use log::debug;
use std::path::PathBuf;
use std::sync::Arc;

use super::check_installed;
use crate::context::{Context, ContextOptions, Stats};
use crate::package::Package;
use crate::remote::PackedRemotePackage;
use crate::runtime::Runtime;
use crate::transaction::PackageTx;

fn already_installed(name: &str) -> String {
    format!("Could not install '{}' because it was already installed", name)
}

/// Install packages from the catalog by name.
#[tracing::instrument(skip(runtime, options, stats))]
pub async fn install(
    runtime: Arc<dyn Runtime>,
    options: &ContextOptions,
    names: &[String],
    stats: &mut Stats,
) -> Result<()> {
    if names.is_empty() {
        bail!("No mods installed since no mods were specified");
    }
    let context = Context::online(runtime, options).await?;
    let installed = context.installed();

    let mut tx = PackageTx::new();
    for name in names {
        if installed.contains_key(name) {
            stats.warn(already_installed(name));
            continue;
        }
        tx.install(name.as_str());
    }

    let result = context.execute(&tx, stats).await;
    stats.warnings.extend(check_installed(&context.installed()));
    result
}

/// Install packed `.ccmod` files, optionally alongside catalog packages
/// needed as dependencies.
#[tracing::instrument(skip(runtime, options, stats))]
pub async fn install_from(
    runtime: Arc<dyn Runtime>,
    options: &ContextOptions,
    files: &[PathBuf],
    online: bool,
    stats: &mut Stats,
) -> Result<()> {
    if files.is_empty() {
        bail!("No mods installed since no mods were specified");
    }
    let mut context = if online {
        Context::online_or_offline(Arc::clone(&runtime), options, stats).await?
    } else {
        Context::offline(Arc::clone(&runtime), options)?
    };
    let installed = context.installed();

    let mut tx = PackageTx::new();
    for file in files {
        let package = PackedRemotePackage::open(runtime.as_ref(), file)
            .with_context(|| format!("In packed mod {}", file.display()))?;
        let name = package.metadata().name.clone();
        if installed.contains_key(&name) {
            stats.warn(already_installed(&name));
            continue;
        }
        debug!("Installing {} from {:?}", name, file);
        context.add_remote(Arc::new(package));
        tx.install(name);
    }

    let result = context.execute(&tx, stats).await;
    stats.warnings.extend(check_installed(&context.installed()));
    result
}
