// SPDX-License-Identifier: Apache-2.0

//! The coordination core: target admission, the bundle coordinator, the profile task, and the
//! read-side bundle aggregator.
//!
//! [`Coordinator`] owns the process-wide [`TaskTracker`]/[`CancellationToken`] pair that
//! lifecycle shutdown drains (see [`Coordinator::shutdown`]), and is the only component that
//! spawns profile tasks.

pub mod aggregator;
pub mod error;
mod task;

pub use aggregator::derive_bundle_state;
pub use error::Error;

use profcoord_fetch::{HttpClientBundle, Scheme};
use profcoord_signing::{DescriptorSigner, verify_targets};
use profcoord_store::{NewBundle, NewProfile, Store};
use profcoord_types::{
    BundleId, ComponentDescriptor, ComponentKind, ProfileId, ProfileKind, ProfileState,
    StartBundleRequest,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::info;

/// Orchestrates `StartBundle` and owns the shared task-tracking/cancellation pair every
/// spawned profile task registers against.
#[derive(Clone)]
pub struct Coordinator {
    store: Arc<dyn Store>,
    signer: Arc<dyn DescriptorSigner>,
    clients: Arc<HttpClientBundle>,
    scheme: Scheme,
    max_duration_secs: u32,
    tick_interval: Duration,
    tracker: TaskTracker,
    cancel: CancellationToken,
}

impl Coordinator {
    /// Builds a coordinator. `max_duration_secs` bounds `StartBundle`'s `duration_sec` (see
    /// `profcoord-config`'s `Config::max_duration_secs`); `tick_interval` is the progress
    /// ticker's cadence.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        signer: Arc<dyn DescriptorSigner>,
        clients: Arc<HttpClientBundle>,
        scheme: Scheme,
        max_duration_secs: u32,
        tick_interval: Duration,
    ) -> Self {
        Self {
            store,
            signer,
            clients,
            scheme,
            max_duration_secs,
            tick_interval,
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Validates and admits `req`, persists the bundle and its child profile rows, and spawns
    /// one task per row. Returns as soon as rows are persisted; does not wait for any task to
    /// complete.
    ///
    /// # Errors
    /// Returns [`Error::Validation`] if `req` is malformed or any target's signature fails to
    /// verify; in that case no bundle row is created. Returns [`Error::Store`] if persisting
    /// the bundle or its profiles fails.
    pub async fn start_bundle(&self, req: StartBundleRequest) -> Result<BundleId, Error> {
        if req.duration_sec == 0 {
            return Err(Error::Validation("duration_sec must be greater than 0".to_string()));
        }
        if req.duration_sec > self.max_duration_secs {
            return Err(Error::Validation(format!(
                "duration_sec {} exceeds the configured maximum of {}",
                req.duration_sec, self.max_duration_secs
            )));
        }
        if req.targets.is_empty() {
            return Err(Error::Validation("at least one target is required".to_string()));
        }

        let kinds_all = req.kinds.clone();
        let kinds = dedupe_kinds(&req.kinds);
        if kinds.is_empty() {
            return Err(Error::Validation("at least one profile kind is required".to_string()));
        }

        verify_targets(&*self.signer, &req.targets)?;

        let targets: Vec<ComponentDescriptor> = req
            .targets
            .into_iter()
            .map(|signed| signed.descriptor)
            .collect();
        let targets_count = count_by_kind(&targets);

        let bundle_id = self
            .store
            .create_bundle(NewBundle {
                duration_sec: req.duration_sec,
                kinds: kinds.clone(),
                kinds_all,
                targets_count,
            })
            .await;
        info!(bundle_id = %bundle_id, targets = targets.len(), kinds = kinds.len(), "bundle created");

        let mut new_profiles = Vec::with_capacity(targets.len() * kinds.len());
        for target in &targets {
            for &kind in &kinds {
                new_profiles.push(NewProfile {
                    bundle_id,
                    target: target.clone(),
                    kind,
                });
            }
        }

        let profile_ids = self.store.create_profiles(new_profiles).await;

        let mut index = 0usize;
        for target in targets {
            for &kind in &kinds {
                let profile_id = profile_ids[index];
                index += 1;
                self.spawn_task(profile_id, target.clone(), kind, req.duration_sec);
            }
        }

        Ok(bundle_id)
    }

    fn spawn_task(&self, profile_id: ProfileId, target: ComponentDescriptor, kind: ProfileKind, duration_sec: u32) {
        let store = Arc::clone(&self.store);
        let clients = Arc::clone(&self.clients);
        let scheme = self.scheme;
        let tick_interval = self.tick_interval;
        let cancel = self.cancel.child_token();

        info!(profile_id = %profile_id, target = %target.label(), kind = kind.as_str(), "profile started");
        self.tracker.spawn(task::run_profile_task(
            store,
            clients,
            scheme,
            profile_id,
            target,
            kind,
            duration_sec,
            tick_interval,
            cancel,
        ));
    }

    /// Scans the store for profiles still `Running` — abandoned by a previous process
    /// instance, since bundles never survive a restart — and marks each `Error` with the
    /// fixed message `"orphaned: server restarted while profiling"`.
    ///
    /// Returns the number of profiles recovered. Intended to run once at startup, before any
    /// new bundle is admitted.
    pub async fn recover_orphans(&self) -> Result<usize, Error> {
        let mut recovered = 0usize;
        for bundle in self.store.list_bundles().await {
            let profiles = self.store.get_profiles_by_bundle(bundle.bundle_id).await;
            for profile in profiles {
                if profile.state != ProfileState::Running {
                    continue;
                }
                let now = chrono::Utc::now();
                self.store
                    .update_profile(
                        profile.profile_id,
                        Box::new(move |p| {
                            p.state = ProfileState::Error;
                            p.progress = 1.0;
                            p.error = "orphaned: server restarted while profiling".to_string();
                            p.finished_at = Some(now);
                        }),
                    )
                    .await?;
                recovered += 1;
                info!(profile_id = %profile.profile_id, "profile recovered from orphaned running state");
            }
        }
        Ok(recovered)
    }

    /// Cancels every in-flight task's cancellation token, then waits for all of them (and any
    /// spawned afterwards, since no new ones can be after [`TaskTracker::close`]) to finish.
    ///
    /// Intended to run once, from the lifecycle shutdown hook.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }
}

fn dedupe_kinds(kinds: &[ProfileKind]) -> Vec<ProfileKind> {
    let mut seen = std::collections::HashSet::new();
    kinds
        .iter()
        .copied()
        .filter(|kind| seen.insert(*kind))
        .collect()
}

fn count_by_kind(targets: &[ComponentDescriptor]) -> BTreeMap<ComponentKind, u32> {
    let mut counts = BTreeMap::new();
    for target in targets {
        *counts.entry(target.kind).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use profcoord_signing::HmacSigner;
    use profcoord_store::InMemoryStore;
    use std::time::Duration;

    fn descriptor(kind: ComponentKind, ip: &str) -> ComponentDescriptor {
        ComponentDescriptor {
            ip: ip.to_string(),
            port: 4000,
            status_port: 10080,
            kind,
        }
    }

    fn coordinator(signer: Arc<HmacSigner>) -> Coordinator {
        Coordinator::new(
            Arc::new(InMemoryStore::new()),
            signer,
            Arc::new(HttpClientBundle::new()),
            Scheme::Http,
            300,
            Duration::from_millis(10),
        )
    }

    #[tokio::test]
    async fn unsigned_target_is_rejected_and_no_bundle_is_created() {
        let signer = Arc::new(HmacSigner::new(b"key".to_vec()));
        let coordinator = coordinator(Arc::clone(&signer));

        let mut signed = signer.sign(descriptor(ComponentKind::Tidb, "10.0.0.1"));
        signed.signature = "invalid signature".to_string();

        let err = coordinator
            .start_bundle(StartBundleRequest {
                duration_sec: 10,
                kinds: vec![ProfileKind::Cpu],
                targets: vec![signed],
            })
            .await
            .unwrap_err();

        assert!(err.to_string().contains("targets are not valid"));
        assert!(coordinator.store.list_bundles().await.is_empty());
    }

    #[tokio::test]
    async fn duration_above_the_configured_maximum_is_rejected() {
        let signer = Arc::new(HmacSigner::new(b"key".to_vec()));
        let coordinator = coordinator(Arc::clone(&signer));
        let signed = signer.sign(descriptor(ComponentKind::Tidb, "10.0.0.1"));

        let err = coordinator
            .start_bundle(StartBundleRequest {
                duration_sec: 10_000,
                kinds: vec![ProfileKind::Cpu],
                targets: vec![signed],
            })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn missing_client_drains_to_a_skipped_all_succeeded_bundle() {
        let signer = Arc::new(HmacSigner::new(b"key".to_vec()));
        let coordinator = coordinator(Arc::clone(&signer));
        let signed = signer.sign(descriptor(ComponentKind::Tiflash, "10.0.0.1"));

        let bundle_id = coordinator
            .start_bundle(StartBundleRequest {
                duration_sec: 10,
                kinds: vec![ProfileKind::Cpu],
                targets: vec![signed],
            })
            .await
            .unwrap();

        coordinator.tracker.close();
        coordinator.tracker.wait().await;

        let profiles = coordinator.store.get_profiles_by_bundle(bundle_id).await;
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].state, ProfileState::Skipped);
        assert_eq!(profiles[0].progress, 1.0);
        assert!(profiles[0].error.is_empty());
        assert_eq!(derive_bundle_state(&profiles), profcoord_types::BundleState::AllSucceeded);
    }

    #[tokio::test]
    async fn recover_orphans_marks_stuck_running_profiles_as_error() {
        let store = Arc::new(InMemoryStore::new());
        let bundle_id = store
            .create_bundle(NewBundle {
                duration_sec: 10,
                kinds: vec![ProfileKind::Cpu],
                kinds_all: vec![ProfileKind::Cpu],
                targets_count: BTreeMap::new(),
            })
            .await;
        let ids = store
            .create_profiles(vec![NewProfile {
                bundle_id,
                target: descriptor(ComponentKind::Tidb, "10.0.0.1"),
                kind: ProfileKind::Cpu,
            }])
            .await;

        let signer = Arc::new(HmacSigner::new(b"key".to_vec()));
        let coordinator = Coordinator::new(
            Arc::clone(&store) as Arc<dyn Store>,
            signer,
            Arc::new(HttpClientBundle::new()),
            Scheme::Http,
            300,
            Duration::from_millis(10),
        );

        let recovered = coordinator.recover_orphans().await.unwrap();
        assert_eq!(recovered, 1);

        let profile = store.get_profile(ids[0]).await.unwrap();
        assert_eq!(profile.state, ProfileState::Error);
        assert_eq!(profile.error, "orphaned: server restarted while profiling");
    }
}
