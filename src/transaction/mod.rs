//! Package transactions.
//!
//! A [`PackageTx`] says what should happen to each named package. A
//! [`PackageTxContext`] holds snapshots of the installed and remote package
//! sets, expands a request into a consistent transaction with
//! [`PackageTxContext::solve`] and applies it with
//! [`PackageTxContext::perform`].
//!
//! An `Install` of a name that is already installed is an update: the
//! executor removes the old package and then installs the new one.

mod executor;
mod solver;

use std::collections::BTreeMap;
use std::fmt;

use crate::package::{LocalPackages, RemotePackages};

/// Requester named in errors raised for the request itself rather than for
/// a dependency.
pub const REQUEST: &str = "<request>";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operation {
    Install,
    Remove,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Install => write!(f, "install"),
            Operation::Remove => write!(f, "remove"),
        }
    }
}

/// Package name to requested operation, ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageTx(BTreeMap<String, Operation>);

impl PackageTx {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install(&mut self, name: impl Into<String>) -> &mut Self {
        self.0.insert(name.into(), Operation::Install);
        self
    }

    pub fn remove(&mut self, name: impl Into<String>) -> &mut Self {
        self.0.insert(name.into(), Operation::Remove);
        self
    }

    pub fn get(&self, name: &str) -> Option<Operation> {
        self.0.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Operation)> {
        self.0.iter().map(|(name, op)| (name.as_str(), *op))
    }
}

impl FromIterator<(String, Operation)> for PackageTx {
    fn from_iter<I: IntoIterator<Item = (String, Operation)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[(&str, Operation); N]> for PackageTx {
    fn from(entries: [(&str, Operation); N]) -> Self {
        entries
            .into_iter()
            .map(|(name, op)| (name.to_string(), op))
            .collect()
    }
}

/// Why a request cannot be turned into a consistent transaction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SolveError {
    #[error("'{package}' requires '{dependency}' {range}, which is not available")]
    MissingDependency {
        package: String,
        dependency: String,
        range: String,
    },
    #[error("'{package}' requires '{dependency}' {range}, which would no longer be satisfied")]
    BrokenDependency {
        package: String,
        dependency: String,
        range: String,
    },
    #[error("'{0}' is not installed")]
    NotInstalled(String),
    #[error("{0} possible solutions, refusing to guess")]
    AmbiguousSolution(usize),
    #[error("No solution")]
    NoSolution,
}

/// Why a transaction cannot be performed at all.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransactionError {
    #[error("Cannot install '{0}': it is not available")]
    NotAvailable(String),
    #[error("Cannot remove '{0}': it is not installed")]
    NotInstalled(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Before,
    After,
}

/// Emitted around every entry of a transaction being performed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub name: String,
    pub phase: Phase,
    pub removing: bool,
    pub installing: bool,
}

impl Progress {
    pub fn is_update(&self) -> bool {
        self.removing && self.installing
    }
}

/// Receives progress and log output while a transaction is performed.
pub trait TransactionObserver: Send + Sync {
    fn progress(&self, progress: &Progress);

    fn log(&self, text: &str);

    /// An entry failed. Execution continues with the next entry.
    fn warn(&self, package: &str, cause: &str) {
        self.log(&format!("{}: {}", package, cause));
    }
}

/// Snapshots a transaction is solved and performed against.
pub struct PackageTxContext {
    installed: LocalPackages,
    remote: RemotePackages,
}

impl PackageTxContext {
    pub fn new(installed: LocalPackages, remote: RemotePackages) -> Self {
        Self { installed, remote }
    }

    pub fn installed(&self) -> &LocalPackages {
        &self.installed
    }

    pub fn remote(&self) -> &RemotePackages {
        &self.remote
    }
}
