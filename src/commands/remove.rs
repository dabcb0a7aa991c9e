use anyhow::{Result, bail};
use std::sync::Arc;

use super::check_installed;
use crate::context::{Context, ContextOptions, Stats};
use crate::runtime::Runtime;
use crate::transaction::PackageTx;

/// Remove installed packages by name.
#[tracing::instrument(skip(runtime, options, stats))]
pub async fn remove(
    runtime: Arc<dyn Runtime>,
    options: &ContextOptions,
    names: &[String],
    stats: &mut Stats,
) -> Result<()> {
    if names.is_empty() {
        bail!("No mods removed since no mods were specified");
    }
    let context = Context::offline(runtime, options)?;
    let installed = context.installed();

    let mut tx = PackageTx::new();
    for name in names {
        if !installed.contains_key(name) {
            stats.warn(format!(
                "Could not remove '{}' because it was not installed",
                name
            ));
            continue;
        }
        tx.remove(name.as_str());
    }

    let result = context.execute(&tx, stats).await;
    stats.warnings.extend(check_installed(&context.installed()));
    result
}
