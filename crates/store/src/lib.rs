// SPDX-License-Identifier: Apache-2.0

//! The persistence adapter for bundles and profiles.
//!
//! The [`Store`] trait is the only component that touches persistent storage; concurrency
//! safety is the adapter's responsibility. [`InMemoryStore`] is the reference implementation
//! used by tests and by the example binary; a production deployment would satisfy the same
//! trait against an on-disk engine without leaking storage semantics into the coordinator.

use async_trait::async_trait;
use chrono::Utc;
use profcoord_types::{Bundle, BundleId, ComponentDescriptor, ComponentKind, Profile, ProfileId, ProfileKind, ProfileState};
use std::collections::BTreeMap;

pub mod error;
mod in_memory;

pub use error::Error;
pub use in_memory::InMemoryStore;

/// Fields needed to create a new [`Bundle`]; the store assigns `bundle_id` and `created_at`.
#[derive(Debug, Clone)]
pub struct NewBundle {
    /// Fetch duration parameter, in seconds.
    pub duration_sec: u32,
    /// Requested profile kinds, deduplicated, request order preserved.
    pub kinds: Vec<ProfileKind>,
    /// Requested profile kinds exactly as they appeared on the request, before deduplication.
    pub kinds_all: Vec<ProfileKind>,
    /// Number of targets requested per component kind.
    pub targets_count: BTreeMap<ComponentKind, u32>,
}

/// Fields needed to create a new [`Profile`] row; the store assigns `profile_id` and
/// `started_at`, and initializes `state = Running`, `progress = 0.0`.
#[derive(Debug, Clone)]
pub struct NewProfile {
    /// The bundle this profile belongs to.
    pub bundle_id: BundleId,
    /// The component endpoint to fetch from.
    pub target: ComponentDescriptor,
    /// The kind of profile to fetch.
    pub kind: ProfileKind,
}

/// A closure that atomically reads-modifies-writes one [`Profile`] row.
pub type ProfileMutator = Box<dyn FnOnce(&mut Profile) + Send>;

/// Persists bundles and profiles, and serves the read paths the coordinator and public API
/// need. See module docs for the ownership contract.
#[async_trait]
pub trait Store: Send + Sync {
    /// Inserts a new bundle row, assigning it a fresh, unique [`BundleId`].
    async fn create_bundle(&self, bundle: NewBundle) -> BundleId;

    /// Bulk-inserts new profile rows, assigning each a fresh, unique [`ProfileId`] in the order
    /// given. All rows start in `state = Running, progress = 0.0`.
    async fn create_profiles(&self, profiles: Vec<NewProfile>) -> Vec<ProfileId>;

    /// Atomically applies `mutate` to the profile identified by `id`.
    ///
    /// # Errors
    /// Returns [`Error::ProfileNotFound`] if `id` is unknown.
    async fn update_profile(&self, id: ProfileId, mutate: ProfileMutator) -> Result<(), Error>;

    /// Fetches a single bundle by id.
    ///
    /// # Errors
    /// Returns [`Error::BundleNotFound`] if `id` is unknown.
    async fn get_bundle(&self, id: BundleId) -> Result<Bundle, Error>;

    /// Fetches every profile belonging to `id`, ordered by [`ProfileId`] (creation order).
    ///
    /// Returns an empty list if the bundle is unknown, rather than an error: callers that
    /// already hold a valid `id` from [`Store::create_bundle`] only ever observe this as "no
    /// children yet", which cannot happen once rows are created atomically with the bundle.
    async fn get_profiles_by_bundle(&self, id: BundleId) -> Vec<Profile>;

    /// Lists every bundle, newest first.
    async fn list_bundles(&self) -> Vec<Bundle>;

    /// Fetches a single profile by id.
    ///
    /// # Errors
    /// Returns [`Error::ProfileNotFound`] if `id` is unknown.
    async fn get_profile(&self, id: ProfileId) -> Result<Profile, Error>;
}

pub(crate) fn new_profile_row(id: ProfileId, new: NewProfile) -> Profile {
    Profile {
        profile_id: id,
        bundle_id: new.bundle_id,
        target: new.target,
        kind: new.kind,
        state: ProfileState::Running,
        progress: 0.0,
        error: String::new(),
        data: Vec::new(),
        started_at: Utc::now(),
        finished_at: None,
    }
}

pub(crate) fn new_bundle_row(id: BundleId, new: NewBundle) -> Bundle {
    Bundle {
        bundle_id: id,
        duration_sec: new.duration_sec,
        kinds: new.kinds,
        kinds_all: new.kinds_all,
        targets_count: new.targets_count,
        created_at: Utc::now(),
    }
}
