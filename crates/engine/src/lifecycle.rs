//! Lifecycle state machine: install, activate, promote, retire.
//!
//! Install and activation each run to completion while holding the state
//! write lock, the only ordering guarantee the engine needs. A failed
//! phase leaves the engine in its prior stable state; a version is never
//! partially promoted.

use std::fmt;

use url::Url;

use overcast_core::Error;

use crate::engine::Engine;

/// Where an engine instance is in its life. Exactly one instance is
/// `Active` per database at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Fetching and caching the application shell.
    Installing,
    /// Shell cached; holding until promoted (or auto-activated at
    /// startup when no other version is active).
    Waiting,
    /// Pruning stores from other versions.
    Activating,
    /// Intercepting requests.
    Active,
    /// Superseded by a newer version; forwards without caching.
    Redundant,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Installing => "installing",
            LifecycleState::Waiting => "waiting",
            LifecycleState::Activating => "activating",
            LifecycleState::Active => "active",
            LifecycleState::Redundant => "redundant",
        };
        f.write_str(name)
    }
}

impl Engine {
    /// Fetch every shell-manifest URL and cache the results in the shell
    /// store. Any unfetchable entry (including a non-2xx status) fails
    /// the whole install; no partial shell is ever kept.
    pub async fn install(&self) -> Result<(), Error> {
        let mut state = self.state.write().await;
        if *state != LifecycleState::Installing {
            return Err(Error::InvalidTransition(format!("install from {state}")));
        }

        let base = Url::parse(&self.config.base_url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let shell = self.config.shell_store();

        let mut entries = Vec::with_capacity(self.config.shell_manifest.len());
        for path in &self.config.shell_manifest {
            let url = base.join(path).map_err(|e| Error::InvalidUrl(format!("{path}: {e}")))?;
            let response = self
                .fetch
                .get(&url)
                .await
                .map_err(|e| Error::InstallFailed(format!("{path}: {e}")))?;
            if !response.status.is_success() {
                return Err(Error::InstallFailed(format!("{path}: status {}", response.status.as_u16())));
            }
            entries.push(response.to_stored(&shell, "GET"));
        }

        self.db.put_many(&shell, entries).await?;
        *state = LifecycleState::Waiting;
        tracing::info!(
            store = %shell,
            urls = self.config.shell_manifest.len(),
            "application shell cached; install complete"
        );
        Ok(())
    }

    /// Delete stores from other versions, record this version as active,
    /// and start intercepting. A pruning failure reverts to `Waiting`.
    pub async fn activate(&self) -> Result<(), Error> {
        let mut state = self.state.write().await;
        if *state != LifecycleState::Waiting {
            return Err(Error::InvalidTransition(format!("activate from {state}")));
        }
        *state = LifecycleState::Activating;

        match self.prune_stale_stores().await {
            Ok(()) => {
                *state = LifecycleState::Active;
                tracing::info!(version = %self.config.version, "active; intercepting requests");
                Ok(())
            }
            Err(e) => {
                *state = LifecycleState::Waiting;
                Err(e)
            }
        }
    }

    /// Skip the wait: activate a `Waiting` engine now. No-op when already
    /// `Active`; rejected from any other state.
    pub async fn promote(&self) -> Result<(), Error> {
        match self.state().await {
            LifecycleState::Waiting => self.activate().await,
            LifecycleState::Active => Ok(()),
            other => Err(Error::InvalidTransition(format!("promote from {other}"))),
        }
    }

    /// Mark this instance superseded. It keeps forwarding requests to the
    /// network but no longer caches.
    pub async fn retire(&self) {
        let mut state = self.state.write().await;
        *state = LifecycleState::Redundant;
        tracing::info!(version = %self.config.version, "engine retired");
    }

    /// Delete every store whose name is not one of this version's
    /// expected names. The dynamic store is not created here; it appears
    /// lazily on first write.
    async fn prune_stale_stores(&self) -> Result<(), Error> {
        let expected = self.config.expected_stores();
        for name in self.db.list_stores().await? {
            if !expected.contains(&name) {
                tracing::info!(store = %name, "deleting stale store");
                self.db.delete_store(&name).await?;
            }
        }
        self.db.set_active_version(&self.config.version).await?;
        Ok(())
    }
}
