// SPDX-License-Identifier: Apache-2.0

//! The public API surface: `ListTargets`, `StartBundle`, `ListBundles`, `GetBundle`,
//! `GetBundleData`, `GetProfileData`.
//!
//! Expressed as a plain async trait ([`ProfilingApi`]) consumed by value or reference — no
//! HTTP/CLI transport lives in this crate (out of scope per the coordination core's charter);
//! a future transport crate, or tests, drive it directly. [`ProfilingService`] is the
//! reference implementation, wiring together the [`profcoord_store::Store`], the
//! [`profcoord_signing::DescriptorSigner`], the [`profcoord_topology::TopologyProvider`], and
//! the [`profcoord_coordinator::Coordinator`].

pub mod error;
pub mod lifecycle;
mod response;

pub use error::Error;
pub use lifecycle::Lifecycle;
pub use response::{BundleDataResponse, BundleDetail, ProfileView};

use async_trait::async_trait;
use profcoord_coordinator::{derive_bundle_state, Coordinator};
use profcoord_signing::DescriptorSigner;
use profcoord_store::Store;
use profcoord_topology::TopologyProvider;
use profcoord_types::{
    BundleId, BundleSummary, Profile, ProfileId, ProfileState, SignedComponentDescriptor,
    StartBundleRequest,
};
use std::sync::Arc;

/// The transport-agnostic public API surface of the profiling bundle coordinator.
#[async_trait]
pub trait ProfilingApi: Send + Sync {
    /// Discovers the cluster's current endpoints and signs each, proving they came from this
    /// server's own topology source.
    async fn list_targets(&self) -> Vec<SignedComponentDescriptor>;

    /// Admits `req`, persists a bundle and its child profile rows, and spawns one fetch task
    /// per row. Returns as soon as the rows are persisted; does not wait for any fetch.
    ///
    /// # Errors
    /// Returns [`Error::Validation`] if `req` is malformed or any target's signature fails to
    /// verify; in that case no bundle row is created.
    async fn start_bundle(&self, req: StartBundleRequest) -> Result<BundleId, Error>;

    /// Lists every bundle, newest first, with its aggregate state derived at read time. Child
    /// profile rows are not included.
    async fn list_bundles(&self) -> Vec<BundleSummary>;

    /// Fetches one bundle and its child profile rows (data bytes omitted).
    ///
    /// # Errors
    /// Returns [`Error::BundleNotFound`] if `id` is unknown.
    async fn get_bundle(&self, id: BundleId) -> Result<BundleDetail, Error>;

    /// Fetches the succeeded children of a bundle, each carrying its full data bytes.
    ///
    /// Never errors: an unknown `id` yields an empty list, matching the contract that a
    /// caller racing a bundle's creation should see "nothing ready yet", not a failure.
    async fn get_bundle_data(&self, id: BundleId) -> BundleDataResponse;

    /// Fetches one profile's full data bytes.
    ///
    /// # Errors
    /// Returns [`Error::ProfileNotFound`] if `id` is unknown, [`Error::ProfileInErrorState`]
    /// if the profile's fetch failed, or [`Error::ProfileInSkippedState`] if the profile was
    /// never attempted.
    async fn get_profile_data(&self, id: ProfileId) -> Result<Profile, Error>;
}

/// The reference [`ProfilingApi`] implementation.
#[derive(Clone)]
pub struct ProfilingService {
    store: Arc<dyn Store>,
    signer: Arc<dyn DescriptorSigner>,
    topology: Arc<dyn TopologyProvider>,
    coordinator: Arc<Coordinator>,
}

impl ProfilingService {
    /// Wires together the collaborators this API surface delegates to.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        signer: Arc<dyn DescriptorSigner>,
        topology: Arc<dyn TopologyProvider>,
        coordinator: Arc<Coordinator>,
    ) -> Self {
        Self {
            store,
            signer,
            topology,
            coordinator,
        }
    }

    /// The coordinator this service delegates bundle creation and shutdown to, for callers
    /// (e.g. [`Lifecycle`]) that need it directly.
    #[must_use]
    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.coordinator
    }

    async fn bundle_state(&self, id: BundleId) -> (Vec<Profile>, profcoord_types::BundleState) {
        let profiles = self.store.get_profiles_by_bundle(id).await;
        let state = derive_bundle_state(&profiles);
        (profiles, state)
    }
}

#[async_trait]
impl ProfilingApi for ProfilingService {
    async fn list_targets(&self) -> Vec<SignedComponentDescriptor> {
        self.topology
            .all()
            .await
            .into_iter()
            .map(|descriptor| self.signer.sign(descriptor))
            .collect()
    }

    async fn start_bundle(&self, req: StartBundleRequest) -> Result<BundleId, Error> {
        Ok(self.coordinator.start_bundle(req).await?)
    }

    async fn list_bundles(&self) -> Vec<BundleSummary> {
        let mut summaries = Vec::new();
        for bundle in self.store.list_bundles().await {
            let (_, state) = self.bundle_state(bundle.bundle_id).await;
            summaries.push(BundleSummary { bundle, state });
        }
        summaries
    }

    async fn get_bundle(&self, id: BundleId) -> Result<BundleDetail, Error> {
        let bundle = self.store.get_bundle(id).await?;
        let (profiles, state) = self.bundle_state(id).await;
        Ok(BundleDetail {
            bundle,
            state,
            profiles: profiles.iter().map(ProfileView::from).collect(),
        })
    }

    async fn get_bundle_data(&self, id: BundleId) -> BundleDataResponse {
        let profiles = self
            .store
            .get_profiles_by_bundle(id)
            .await
            .into_iter()
            .filter(|profile| profile.state == ProfileState::Succeeded)
            .collect();
        BundleDataResponse { profiles }
    }

    async fn get_profile_data(&self, id: ProfileId) -> Result<Profile, Error> {
        let profile = self.store.get_profile(id).await?;
        match profile.state {
            ProfileState::Error => Err(Error::ProfileInErrorState),
            ProfileState::Skipped => Err(Error::ProfileInSkippedState),
            ProfileState::Running | ProfileState::Succeeded => Ok(profile),
        }
    }
}
