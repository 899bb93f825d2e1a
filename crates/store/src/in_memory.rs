// SPDX-License-Identifier: Apache-2.0

//! An in-memory [`Store`] implementation, used by tests and the example binary.

use crate::{new_bundle_row, new_profile_row, Error, NewBundle, NewProfile, ProfileMutator, Store};
use async_trait::async_trait;
use parking_lot::Mutex;
use profcoord_types::ids::IdGenerator;
use profcoord_types::{Bundle, BundleId, Profile, ProfileId};
use std::collections::HashMap;

#[derive(Default)]
struct Inner {
    bundles: HashMap<BundleId, Bundle>,
    /// Bundle ids in creation order; reversed on read to serve newest-first.
    bundle_order: Vec<BundleId>,
    profiles: HashMap<ProfileId, Profile>,
    /// Profile ids per bundle, in creation order.
    profiles_by_bundle: HashMap<BundleId, Vec<ProfileId>>,
}

/// An in-memory [`Store`], backed by a single mutex-guarded map.
///
/// Suitable for tests and single-process demos; a production deployment should implement
/// [`Store`] against a durable engine instead.
pub struct InMemoryStore {
    bundle_ids: IdGenerator,
    profile_ids: IdGenerator,
    inner: Mutex<Inner>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Creates an empty store.
    ///
    /// Uses [`IdGenerator::new`] for both id counters, not `IdGenerator::default`: the former
    /// starts at `1`, reserving `0` as a never-issued sentinel, per its own doc comment.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bundle_ids: IdGenerator::new(),
            profile_ids: IdGenerator::new(),
            inner: Mutex::new(Inner::default()),
        }
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn create_bundle(&self, bundle: NewBundle) -> BundleId {
        let id = BundleId(self.bundle_ids.next());
        let row = new_bundle_row(id, bundle);
        let mut inner = self.inner.lock();
        let _ = inner.bundles.insert(id, row);
        inner.bundle_order.push(id);
        id
    }

    async fn create_profiles(&self, profiles: Vec<NewProfile>) -> Vec<ProfileId> {
        let mut inner = self.inner.lock();
        let mut ids = Vec::with_capacity(profiles.len());
        for new in profiles {
            let id = ProfileId(self.profile_ids.next());
            let bundle_id = new.bundle_id;
            let row = new_profile_row(id, new);
            let _ = inner.profiles.insert(id, row);
            inner.profiles_by_bundle.entry(bundle_id).or_default().push(id);
            ids.push(id);
        }
        ids
    }

    async fn update_profile(&self, id: ProfileId, mutate: ProfileMutator) -> Result<(), Error> {
        let mut inner = self.inner.lock();
        match inner.profiles.get_mut(&id) {
            Some(profile) => {
                mutate(profile);
                Ok(())
            }
            None => Err(Error::ProfileNotFound(id)),
        }
    }

    async fn get_bundle(&self, id: BundleId) -> Result<Bundle, Error> {
        self.inner
            .lock()
            .bundles
            .get(&id)
            .cloned()
            .ok_or(Error::BundleNotFound(id))
    }

    async fn get_profiles_by_bundle(&self, id: BundleId) -> Vec<Profile> {
        let inner = self.inner.lock();
        inner
            .profiles_by_bundle
            .get(&id)
            .into_iter()
            .flatten()
            .filter_map(|pid| inner.profiles.get(pid).cloned())
            .collect()
    }

    async fn list_bundles(&self) -> Vec<Bundle> {
        let inner = self.inner.lock();
        inner
            .bundle_order
            .iter()
            .rev()
            .filter_map(|id| inner.bundles.get(id).cloned())
            .collect()
    }

    async fn get_profile(&self, id: ProfileId) -> Result<Profile, Error> {
        self.inner
            .lock()
            .profiles
            .get(&id)
            .cloned()
            .ok_or(Error::ProfileNotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use profcoord_types::{ComponentDescriptor, ComponentKind, ProfileKind, ProfileState};
    use std::collections::BTreeMap;

    fn target() -> ComponentDescriptor {
        ComponentDescriptor {
            ip: "10.0.0.1".to_string(),
            port: 4000,
            status_port: 10080,
            kind: ComponentKind::Tidb,
        }
    }

    #[tokio::test]
    async fn create_profiles_assigns_unique_ids_in_order() {
        let store = InMemoryStore::new();
        let bundle_id = store
            .create_bundle(NewBundle {
                duration_sec: 10,
                kinds: vec![ProfileKind::Cpu],
                kinds_all: vec![ProfileKind::Cpu],
                targets_count: BTreeMap::new(),
            })
            .await;
        let ids = store
            .create_profiles(vec![
                NewProfile {
                    bundle_id,
                    target: target(),
                    kind: ProfileKind::Cpu,
                },
                NewProfile {
                    bundle_id,
                    target: target(),
                    kind: ProfileKind::Heap,
                },
            ])
            .await;
        assert_eq!(ids.len(), 2);
        assert!(ids[0] < ids[1]);

        let profiles = store.get_profiles_by_bundle(bundle_id).await;
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].kind, ProfileKind::Cpu);
        assert_eq!(profiles[1].kind, ProfileKind::Heap);
        assert!(profiles.iter().all(|p| p.state == ProfileState::Running));
    }

    #[tokio::test]
    async fn update_profile_is_atomic_read_modify_write() {
        let store = InMemoryStore::new();
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
                target: target(),
                kind: ProfileKind::Cpu,
            }])
            .await;
        let id = ids[0];

        store
            .update_profile(
                id,
                Box::new(|p| {
                    p.state = ProfileState::Succeeded;
                    p.progress = 1.0;
                    p.data = b"ok".to_vec();
                }),
            )
            .await
            .unwrap();

        let profile = store.get_profile(id).await.unwrap();
        assert_eq!(profile.state, ProfileState::Succeeded);
        assert_eq!(profile.progress, 1.0);
        assert_eq!(profile.data, b"ok");
    }

    #[tokio::test]
    async fn update_profile_reports_not_found() {
        let store = InMemoryStore::new();
        let err = store
            .update_profile(ProfileId(999), Box::new(|_| {}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ProfileNotFound(_)));
    }

    #[tokio::test]
    async fn list_bundles_is_newest_first() {
        let store = InMemoryStore::new();
        let first = store
            .create_bundle(NewBundle {
                duration_sec: 10,
                kinds: vec![ProfileKind::Cpu],
                kinds_all: vec![ProfileKind::Cpu],
                targets_count: BTreeMap::new(),
            })
            .await;
        let second = store
            .create_bundle(NewBundle {
                duration_sec: 10,
                kinds: vec![ProfileKind::Cpu],
                kinds_all: vec![ProfileKind::Cpu],
                targets_count: BTreeMap::new(),
            })
            .await;

        let bundles = store.list_bundles().await;
        assert_eq!(bundles[0].bundle_id, second);
        assert_eq!(bundles[1].bundle_id, first);
    }

    #[tokio::test]
    async fn get_bundle_reports_not_found() {
        let store = InMemoryStore::new();
        let err = store.get_bundle(BundleId(42)).await.unwrap_err();
        assert!(matches!(err, Error::BundleNotFound(_)));
    }
}
