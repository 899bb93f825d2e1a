// SPDX-License-Identifier: Apache-2.0

//! Startup/shutdown hooks for the coordinator process.
//!
//! Restart terminates any bundle left in flight (no resumption, per the coordination core's
//! non-goals): [`Lifecycle::startup`] sweeps the store for profiles abandoned mid-fetch by a
//! previous process instance and marks them terminal, while [`Lifecycle::shutdown`] cancels
//! and drains every task still running in the current process.

use profcoord_coordinator::Coordinator;
use std::sync::Arc;
use tracing::{info, warn};

/// Ties the coordinator's orphan-recovery and shutdown-drain hooks to process startup and
/// teardown.
pub struct Lifecycle {
    coordinator: Arc<Coordinator>,
    recover_orphans_on_startup: bool,
}

impl Lifecycle {
    /// Builds a lifecycle hook around `coordinator`. `recover_orphans_on_startup` mirrors
    /// `profcoord_config::Config::recover_orphans_on_startup`.
    #[must_use]
    pub fn new(coordinator: Arc<Coordinator>, recover_orphans_on_startup: bool) -> Self {
        Self {
            coordinator,
            recover_orphans_on_startup,
        }
    }

    /// Runs once, before the process admits any new `StartBundle` request.
    ///
    /// If orphan recovery is enabled, marks every profile still `Running` from a previous
    /// process as `Error`, so a restart never leaves a bundle reading perpetually `Running`.
    pub async fn startup(&self) {
        if !self.recover_orphans_on_startup {
            return;
        }
        match self.coordinator.recover_orphans().await {
            Ok(recovered) if recovered > 0 => {
                warn!(recovered, "recovered orphaned profiles from a previous process run");
            }
            Ok(_) => {
                info!("no orphaned profiles found on startup");
            }
            Err(error) => {
                warn!(%error, "failed to recover orphaned profiles on startup");
            }
        }
    }

    /// Runs once, when the process has been asked to shut down.
    ///
    /// Cancels every in-flight task's context and waits for the process-wide task tracker to
    /// drain before returning, so no fetch outlives process teardown.
    pub async fn shutdown(&self) {
        info!("shutdown requested, draining in-flight profile tasks");
        self.coordinator.shutdown().await;
        info!("all profile tasks drained, shutdown complete");
    }
}
