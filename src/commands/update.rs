use anyhow::Result;
use log::info;
use std::cmp::Ordering;
use std::sync::Arc;

use super::check_installed;
use crate::context::{Context, ContextOptions, Stats};
use crate::package::{LocalPackages, RemotePackages, compare_precedence};
use crate::runtime::Runtime;
use crate::transaction::PackageTx;

/// Installed packages for which the catalog offers a newer version, as
/// `(name, installed, offered)`.
pub(crate) fn outdated_packages(
    installed: &LocalPackages,
    remote: &RemotePackages,
) -> Vec<(String, semver::Version, semver::Version)> {
    installed
        .iter()
        .filter_map(|(name, local)| {
            let remote = remote.get(name)?;
            let current = &local.metadata().version;
            let offered = &remote.metadata().version;
            (compare_precedence(offered, current) == Ordering::Greater)
                .then(|| (name.clone(), current.clone(), offered.clone()))
        })
        .collect()
}

/// The transaction an update of `names` asks for, plus warnings for names
/// that were skipped. No names means every outdated package.
pub(crate) fn update_request(
    installed: &LocalPackages,
    remote: &RemotePackages,
    names: &[String],
) -> (PackageTx, Vec<String>) {
    let mut tx = PackageTx::new();
    let mut warnings = Vec::new();
    if names.is_empty() {
        for (name, current, offered) in outdated_packages(installed, remote) {
            info!("{} {} -> {}", name, current, offered);
            tx.install(name);
        }
        return (tx, warnings);
    }

    for name in names {
        let Some(local) = installed.get(name) else {
            warnings.push(format!(
                "Could not update '{}' because it was not installed",
                name
            ));
            continue;
        };
        let Some(offered) = remote.get(name) else {
            warnings.push(format!(
                "Could not update '{}' because it is not in the catalog",
                name
            ));
            continue;
        };
        let current = &local.metadata().version;
        let offered = &offered.metadata().version;
        if compare_precedence(offered, current) != Ordering::Greater {
            warnings.push(format!(
                "Could not update '{}' because it is up to date ({} installed, {} offered)",
                name, current, offered
            ));
            continue;
        }
        info!("{} {} -> {}", name, current, offered);
        tx.install(name.as_str());
    }
    (tx, warnings)
}

/// Update the named packages, or every outdated package when no names are
/// given.
#[tracing::instrument(skip(runtime, options, stats))]
pub async fn update(
    runtime: Arc<dyn Runtime>,
    options: &ContextOptions,
    names: &[String],
    stats: &mut Stats,
) -> Result<()> {
    let context = Context::online(runtime, options).await?;
    let (tx, warnings) = update_request(&context.installed(), &context.remote(), names);
    stats.warnings.extend(warnings);

    let result = context.execute(&tx, stats).await;
    stats.warnings.extend(check_installed(&context.installed()));
    result
}
