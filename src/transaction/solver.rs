//! Dependency closure and consistency checks.

use log::debug;
use semver::Version;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::{Operation, PackageTx, PackageTxContext, REQUEST, SolveError};
use crate::package::{VersionRange, compare_precedence};

/// A package as it would exist once the transaction has been applied.
struct Planned<'a> {
    version: &'a Version,
    dependencies: &'a BTreeMap<String, VersionRange>,
    /// Installed or updated by the transaction, as opposed to left alone.
    changing: bool,
}

enum Step {
    Done,
    Schedule(String),
}

impl PackageTxContext {
    /// Expand `tx` into the transactions that satisfy it.
    ///
    /// Implicit installs are added for dependencies the remote set can
    /// satisfy. Installs of an installed package at the offered version are
    /// dropped. Neither snapshot is changed.
    #[tracing::instrument(skip(self))]
    pub fn solve(&self, tx: &PackageTx) -> Result<Vec<PackageTx>, SolveError> {
        let mut solution = BTreeMap::new();
        for (name, op) in tx.iter() {
            match op {
                Operation::Remove => {
                    if !self.installed.contains_key(name) {
                        return Err(SolveError::NotInstalled(name.to_string()));
                    }
                    solution.insert(name.to_string(), Operation::Remove);
                }
                Operation::Install => {
                    let installed = self.installed.get(name).map(|p| &p.metadata().version);
                    match (self.remote.get(name), installed) {
                        (Some(remote), Some(current))
                            if compare_precedence(&remote.metadata().version, current)
                                == Ordering::Equal =>
                        {
                            debug!("{} {} is already installed", name, current);
                        }
                        (Some(_), _) => {
                            solution.insert(name.to_string(), Operation::Install);
                        }
                        (None, Some(current)) => {
                            debug!("{} {} is installed and nothing newer is offered", name, current);
                        }
                        (None, None) => {
                            return Err(SolveError::MissingDependency {
                                package: REQUEST.to_string(),
                                dependency: name.to_string(),
                                range: VersionRange::any().to_string(),
                            });
                        }
                    }
                }
            }
        }

        // Each pass schedules at most one new name, and never reschedules
        // one, so this terminates.
        loop {
            match self.check(&solution)? {
                Step::Done => break,
                Step::Schedule(name) => {
                    debug!("Scheduling {} to satisfy a dependency", name);
                    solution.insert(name, Operation::Install);
                }
            }
        }

        Ok(vec![solution.into_iter().collect()])
    }

    fn planned(&self, solution: &BTreeMap<String, Operation>) -> BTreeMap<&str, Planned<'_>> {
        let mut planned = BTreeMap::new();
        for (name, package) in &self.installed {
            if !solution.contains_key(name) {
                planned.insert(
                    name.as_str(),
                    Planned {
                        version: &package.metadata().version,
                        dependencies: package.dependencies(),
                        changing: false,
                    },
                );
            }
        }
        for (name, op) in solution {
            if *op != Operation::Install {
                continue;
            }
            // Only names present in the remote set are ever scheduled.
            if let Some((key, package)) = self.remote.get_key_value(name) {
                planned.insert(
                    key.as_str(),
                    Planned {
                        version: &package.metadata().version,
                        dependencies: &package.metadata().dependencies,
                        changing: true,
                    },
                );
            }
        }
        planned
    }

    /// Find the first unmet requirement in the planned state and either fix
    /// it by scheduling a remote package or report it.
    fn check(&self, solution: &BTreeMap<String, Operation>) -> Result<Step, SolveError> {
        let planned = self.planned(solution);
        for (package, plan) in &planned {
            for (dependency, range) in plan.dependencies {
                if planned
                    .get(dependency.as_str())
                    .is_some_and(|provider| range.matches(provider.version))
                {
                    continue;
                }

                let missing = || SolveError::MissingDependency {
                    package: package.to_string(),
                    dependency: dependency.clone(),
                    range: range.to_string(),
                };
                let broken = || SolveError::BrokenDependency {
                    package: package.to_string(),
                    dependency: dependency.clone(),
                    range: range.to_string(),
                };

                if solution.contains_key(dependency) {
                    // Removed, or replaced by a version that does not fit.
                    return Err(if plan.changing { missing() } else { broken() });
                }

                return match self.remote.get(dependency) {
                    Some(candidate) if range.matches(&candidate.metadata().version) => {
                        Ok(Step::Schedule(dependency.clone()))
                    }
                    _ => Err(missing()),
                };
            }
        }
        Ok(Step::Done)
    }
}
