//! Applying a transaction to a game.

use log::{debug, info};

use super::{Operation, PackageTx, PackageTxContext, Phase, Progress, TransactionError, TransactionObserver};
use crate::game::GameInstance;

impl PackageTxContext {
    /// Apply `tx` to `game`, best effort.
    ///
    /// Pure removals run first, then installs and updates in name order. A
    /// failing entry is reported through the observer and the rest still
    /// run. `After` is only emitted for entries that completed. The only
    /// errors returned are for a transaction naming packages these
    /// snapshots do not have, and those are raised before anything is
    /// touched.
    #[tracing::instrument(skip(self, game, observer))]
    pub async fn perform(
        &self,
        game: &GameInstance,
        tx: &PackageTx,
        observer: &dyn TransactionObserver,
    ) -> Result<(), TransactionError> {
        self.validate(tx)?;

        for (name, op) in tx.iter() {
            if op != Operation::Remove {
                continue;
            }
            let progress = |phase| Progress {
                name: name.to_string(),
                phase,
                removing: true,
                installing: false,
            };
            observer.progress(&progress(Phase::Before));
            match self.remove_one(name) {
                Ok(()) => observer.progress(&progress(Phase::After)),
                Err(cause) => observer.warn(name, &cause),
            }
        }

        for (name, op) in tx.iter() {
            if op != Operation::Install {
                continue;
            }
            let updating = self.installed.contains_key(name);
            let progress = |phase| Progress {
                name: name.to_string(),
                phase,
                removing: updating,
                installing: true,
            };
            observer.progress(&progress(Phase::Before));

            if updating && let Err(cause) = self.remove_one(name) {
                observer.warn(name, &cause);
                continue;
            }
            match self.install_one(game, name, observer).await {
                Ok(()) => observer.progress(&progress(Phase::After)),
                Err(cause) => observer.warn(name, &cause),
            }
        }

        info!("Transaction of {} entries performed", tx.len());
        Ok(())
    }

    fn validate(&self, tx: &PackageTx) -> Result<(), TransactionError> {
        for (name, op) in tx.iter() {
            match op {
                Operation::Install if !self.remote.contains_key(name) => {
                    return Err(TransactionError::NotAvailable(name.to_string()));
                }
                Operation::Remove if !self.installed.contains_key(name) => {
                    return Err(TransactionError::NotInstalled(name.to_string()));
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn remove_one(&self, name: &str) -> Result<(), String> {
        let package = self
            .installed
            .get(name)
            .ok_or_else(|| format!("{} is not installed", name))?;
        debug!("Removing {} {}", name, package.metadata().version);
        package
            .remove()
            .map_err(|e| format!("Unable to remove: {:#}", e))
    }

    async fn install_one(
        &self,
        game: &GameInstance,
        name: &str,
        observer: &dyn TransactionObserver,
    ) -> Result<(), String> {
        let package = self
            .remote
            .get(name)
            .ok_or_else(|| format!("{} is not available", name))?;
        debug!("Installing {} {}", name, package.metadata().version);
        package
            .install(game, &|line| observer.log(line))
            .await
            .map_err(|e| format!("Unable to install: {:#}", e))
    }
}
