//! Command implementations behind the CLI.
//!
//! Every command that changes the game takes the [`Stats`] it should add to
//! and returns the error that stopped it, if any. [`print_stats_and_error`]
//! turns both into the final report.

mod install;
mod list;
mod remove;
mod update;

pub use install::{install, install_from};
pub use list::{list, outdated};
pub use remove::remove;
pub use update::update;

use crate::context::Stats;
use crate::package::LocalPackages;

/// Warnings for installed packages whose dependencies are missing or
/// installed at a version outside the required range.
pub fn check_installed(installed: &LocalPackages) -> Vec<String> {
    let mut warnings = Vec::new();
    for (name, package) in installed {
        for (dependency, range) in package.dependencies() {
            match installed.get(dependency) {
                None => warnings.push(format!(
                    "'{}' requires '{}' {}, which is not installed",
                    name, dependency, range
                )),
                Some(provider) if !range.matches(&provider.metadata().version) => {
                    warnings.push(format!(
                        "'{}' requires '{}' {}, which is not satisfied by the installed {}",
                        name,
                        dependency,
                        range,
                        provider.metadata().version
                    ))
                }
                Some(_) => {}
            }
        }
    }
    warnings
}

/// Print collected warnings, the error if there was one, and the totals.
/// Returns false when there was an error.
pub fn print_stats_and_error(stats: &Stats, result: &anyhow::Result<()>) -> bool {
    for warning in &stats.warnings {
        println!("Warning in {}", warning);
    }
    if let Err(e) = result {
        println!("ERROR in {:#}", e);
    }
    println!(
        "Installed {}, updated {}, removed {}",
        stats.installed, stats.updated, stats.removed
    );
    result.is_ok()
}
