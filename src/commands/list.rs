use anyhow::Result;
use std::collections::BTreeSet;
use std::sync::Arc;

use super::update::outdated_packages;
use crate::context::{Context, ContextOptions, Stats};
use crate::package::{LocalPackages, PackageType, RemotePackages};
use crate::runtime::Runtime;

fn list_lines(installed: &LocalPackages, remote: &RemotePackages, all: bool) -> Vec<String> {
    let mut lines = Vec::new();
    for kind in PackageType::ALL {
        if kind == PackageType::Base && !all {
            continue;
        }
        let names: BTreeSet<&String> = installed
            .iter()
            .filter(|(_, p)| p.metadata().package_type == kind)
            .map(|(name, _)| name)
            .chain(
                remote
                    .iter()
                    .filter(|(_, p)| p.metadata().package_type == kind)
                    .map(|(name, _)| name),
            )
            .collect();
        if names.is_empty() {
            continue;
        }

        lines.push(format!("{}:", kind.plural()));
        for name in names {
            let local = installed.get(name).map(|p| &p.metadata().version);
            let offered = remote.get(name).map(|p| p.metadata());
            let status = match (local, offered) {
                (Some(v), Some(r)) if v != &r.version => {
                    format!("{} (installed, {} available)", v, r.version)
                }
                (Some(v), _) => format!("{} (installed)", v),
                (None, Some(r)) => r.version.to_string(),
                (None, None) => continue,
            };
            let description = offered
                .map(|m| m.description.as_str())
                .filter(|d| !d.is_empty())
                .or_else(|| installed.get(name).map(|p| p.metadata().description.as_str()))
                .unwrap_or_default();
            if description.is_empty() {
                lines.push(format!("  {} {}", name, status));
            } else {
                lines.push(format!("  {} {} - {}", name, status, description));
            }
        }
    }
    lines
}

/// Print installed and available packages grouped by type.
#[tracing::instrument(skip(runtime, options, stats))]
pub async fn list(
    runtime: Arc<dyn Runtime>,
    options: &ContextOptions,
    all: bool,
    stats: &mut Stats,
) -> Result<()> {
    let context = Context::online_or_offline(runtime, options, stats).await?;
    let lines = list_lines(&context.installed(), &context.remote(), all);
    if lines.is_empty() {
        println!("No packages found.");
    }
    for line in lines {
        println!("{}", line);
    }
    for warning in &stats.warnings {
        println!("Warning in {}", warning);
    }
    Ok(())
}

fn outdated_lines(installed: &LocalPackages, remote: &RemotePackages) -> Vec<String> {
    let outdated = outdated_packages(installed, remote);
    if outdated.is_empty() {
        return Vec::new();
    }
    let mut lines = vec!["New     Current Name".to_string()];
    lines.extend(
        outdated
            .into_iter()
            .map(|(name, current, offered)| format!("{}   {}   {}", offered, current, name)),
    );
    lines
}

/// Print installed packages with newer catalog versions.
#[tracing::instrument(skip(runtime, options))]
pub async fn outdated(runtime: Arc<dyn Runtime>, options: &ContextOptions) -> Result<()> {
    let context = Context::online(runtime, options).await?;
    for line in outdated_lines(&context.installed(), &context.remote()) {
        println!("{}", line);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FakeLocal, FakeRemote, locals, remotes};

    fn fixture() -> (LocalPackages, RemotePackages) {
        (
            locals(vec![
                FakeLocal::new("ccloader", "2.20.0").kind(PackageType::Base),
                FakeLocal::new("tweaks", "1.0.0"),
                FakeLocal::new("editor", "0.5.0").kind(PackageType::Tool),
            ]),
            remotes(vec![
                FakeRemote::new("ccloader", "2.22.0").kind(PackageType::Base),
                FakeRemote::new("tweaks", "1.1.0").describe("Small tweaks"),
                FakeRemote::new("hats", "0.2.0"),
            ]),
        )
    }

    #[test]
    fn test_list_hides_base_by_default() {
        let (installed, remote) = fixture();
        assert_eq!(
            list_lines(&installed, &remote, false),
            vec![
                "Mods:",
                "  hats 0.2.0",
                "  tweaks 1.0.0 (installed, 1.1.0 available) - Small tweaks",
                "Tools:",
                "  editor 0.5.0 (installed)",
            ]
        );
    }

    #[test]
    fn test_list_all_shows_base_first() {
        let (installed, remote) = fixture();
        let lines = list_lines(&installed, &remote, true);
        assert_eq!(lines[0], "Base Packages:");
        assert_eq!(lines[1], "  ccloader 2.20.0 (installed, 2.22.0 available)");
    }

    #[test]
    fn test_outdated_table() {
        let (installed, remote) = fixture();
        assert_eq!(
            outdated_lines(&installed, &remote),
            vec![
                "New     Current Name",
                "2.22.0   2.20.0   ccloader",
                "1.1.0   1.0.0   tweaks",
            ]
        );
    }

    #[test]
    fn test_outdated_table_empty_when_current() {
        let installed = locals(vec![FakeLocal::new("a", "1.0.0")]);
        let remote = remotes(vec![FakeRemote::new("a", "1.0.0")]);
        assert!(outdated_lines(&installed, &remote).is_empty());
    }
}
