//! Per-invocation state: the game, the remote package set, and the
//! statistics collected while transactions run.

use anyhow::{Context as _, Result};
use log::{debug, warn};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::game::GameInstance;
use crate::http::HttpClient;
use crate::package::{LocalPackages, RemotePackage, RemotePackages};
use crate::platform::Platform;
use crate::remote::{Catalog, DEFAULT_CATALOG_URL, MethodRunner};
use crate::runtime::Runtime;
use crate::transaction::{
    PackageTx, PackageTxContext, Phase, Progress, SolveError, TransactionObserver,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextOptions {
    /// Game base directory. Defaults to the current directory.
    pub game: Option<PathBuf>,
    pub catalog_url: String,
    /// Perform transactions as requested instead of solving them first.
    pub force: bool,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            game: None,
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            force: false,
        }
    }
}

/// Remote packages known to a context.
pub enum RemoteSet {
    Offline,
    /// Catalog snapshot taken when the context was built, plus anything
    /// added afterwards.
    Online(RemotePackages),
}

/// Totals for one command invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub installed: usize,
    pub updated: usize,
    pub removed: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl Stats {
    pub fn warn(&mut self, text: impl Into<String>) {
        self.warnings.push(text.into());
    }

    pub fn merge(&mut self, other: Stats) {
        self.installed += other.installed;
        self.updated += other.updated;
        self.removed += other.removed;
        self.warnings.extend(other.warnings);
    }
}

/// Counts completed entries and prints progress to stderr.
#[derive(Default)]
pub struct StatsObserver {
    stats: Mutex<Stats>,
}

impl StatsObserver {
    pub fn into_stats(self) -> Stats {
        self.stats.into_inner().unwrap_or_else(|e| e.into_inner())
    }

    fn with_stats(&self, f: impl FnOnce(&mut Stats)) {
        let mut stats = self.stats.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut stats);
    }
}

impl TransactionObserver for StatsObserver {
    fn progress(&self, progress: &Progress) {
        match progress.phase {
            Phase::Before => {
                let verb = match (progress.removing, progress.installing) {
                    (true, true) => "updating",
                    (false, true) => "installing",
                    _ => "removing",
                };
                eprintln!("{} {}", verb, progress.name);
            }
            Phase::After => self.with_stats(|stats| match (progress.removing, progress.installing) {
                (true, true) => stats.updated += 1,
                (false, true) => stats.installed += 1,
                _ => stats.removed += 1,
            }),
        }
    }

    fn log(&self, text: &str) {
        eprintln!("{}", text);
    }

    fn warn(&self, package: &str, cause: &str) {
        let line = format!("{}: {}", package, cause);
        warn!("{}", line);
        self.with_stats(|stats| stats.warn(line));
    }
}

pub struct Context {
    game: GameInstance,
    remote: RemoteSet,
    force: bool,
}

impl Context {
    /// A context without remote packages.
    pub fn offline(runtime: Arc<dyn Runtime>, options: &ContextOptions) -> Result<Self> {
        let base = match &options.game {
            Some(path) => path.clone(),
            None => runtime.current_dir()?,
        };
        debug!("Using game at {:?}", base);
        Ok(Self {
            game: GameInstance::with_default_plugins(runtime, base),
            remote: RemoteSet::Offline,
            force: options.force,
        })
    }

    /// A context with a snapshot of the catalog.
    pub async fn online(runtime: Arc<dyn Runtime>, options: &ContextOptions) -> Result<Self> {
        let mut context = Self::offline(runtime, options)?;
        let http = HttpClient::new()?;
        let runner = Arc::new(MethodRunner::new(http.clone(), Platform::detect()));
        let catalog = Catalog::fetch(&http, &options.catalog_url, runner).await?;
        debug!("Catalog lists {} packages", catalog.len());
        context.remote = RemoteSet::Online(catalog);
        Ok(context)
    }

    /// Go online if possible, otherwise continue offline with a warning.
    pub async fn online_or_offline(
        runtime: Arc<dyn Runtime>,
        options: &ContextOptions,
        stats: &mut Stats,
    ) -> Result<Self> {
        match Self::online(Arc::clone(&runtime), options).await {
            Ok(context) => Ok(context),
            Err(e) => {
                stats.warn(format!("Working offline: {:#}", e));
                Self::offline(runtime, options)
            }
        }
    }

    pub fn game(&self) -> &GameInstance {
        &self.game
    }

    pub fn is_online(&self) -> bool {
        matches!(self.remote, RemoteSet::Online(_))
    }

    /// Currently installed packages.
    pub fn installed(&self) -> LocalPackages {
        self.game.packages()
    }

    pub fn remote(&self) -> RemotePackages {
        match &self.remote {
            RemoteSet::Offline => RemotePackages::new(),
            RemoteSet::Online(packages) => packages.clone(),
        }
    }

    /// Make a package available to transactions run by this context. It
    /// hides a catalog package of the same name.
    pub fn add_remote(&mut self, package: Arc<dyn RemotePackage>) {
        let name = package.metadata().name.clone();
        match &mut self.remote {
            RemoteSet::Online(packages) => {
                packages.insert(name, package);
            }
            RemoteSet::Offline => {
                self.remote = RemoteSet::Online(RemotePackages::from([(name, package)]));
            }
        }
    }

    /// Solve (unless forced) and perform a transaction, adding the outcome
    /// to `stats`.
    #[tracing::instrument(skip(self, stats))]
    pub async fn execute(&self, tx: &PackageTx, stats: &mut Stats) -> Result<()> {
        let tx_context = PackageTxContext::new(self.installed(), self.remote());
        let chosen = if self.force {
            tx.clone()
        } else {
            let mut solutions = tx_context.solve(tx)?;
            match solutions.len() {
                0 => return Err(SolveError::NoSolution.into()),
                1 => solutions.remove(0),
                n => return Err(SolveError::AmbiguousSolution(n).into()),
            }
        };

        let observer = StatsObserver::default();
        let result = tx_context
            .perform(&self.game, &chosen, &observer)
            .await
            .context("Unable to perform transaction");
        stats.merge(observer.into_stats());
        result
    }
}
