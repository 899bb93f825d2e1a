// SPDX-License-Identifier: Apache-2.0

//! The topology discovery collaborator: `ListTargets` delegates to this trait to discover the
//! cluster's current component endpoints. The real discovery subsystem (talking to PD,
//! service discovery, etc.) lives outside this crate; only the narrow interface is consumed
//! here.

use async_trait::async_trait;
use profcoord_types::ComponentDescriptor;

/// Discovers the cluster's current component endpoints, grouped by kind.
#[async_trait]
pub trait TopologyProvider: Send + Sync {
    /// Placement Driver endpoints.
    async fn get_pd(&self) -> Vec<ComponentDescriptor>;
    /// TiDB endpoints.
    async fn get_tidb(&self) -> Vec<ComponentDescriptor>;
    /// TiKV endpoints.
    async fn get_tikv(&self) -> Vec<ComponentDescriptor>;
    /// TiFlash endpoints.
    async fn get_tiflash(&self) -> Vec<ComponentDescriptor>;

    /// Concatenates PD + TiDB + TiKV + TiFlash in that order, matching the wire order
    /// `ListTargets` is specified to return.
    async fn all(&self) -> Vec<ComponentDescriptor> {
        let mut all = self.get_pd().await;
        all.extend(self.get_tidb().await);
        all.extend(self.get_tikv().await);
        all.extend(self.get_tiflash().await);
        all
    }
}

/// A fixed-list [`TopologyProvider`], useful for tests and for running the coordinator without
/// a live cluster discovery service.
#[derive(Debug, Clone, Default)]
pub struct StaticTopologyProvider {
    pd: Vec<ComponentDescriptor>,
    tidb: Vec<ComponentDescriptor>,
    tikv: Vec<ComponentDescriptor>,
    tiflash: Vec<ComponentDescriptor>,
}

impl StaticTopologyProvider {
    /// Builds a provider from descriptors already partitioned by kind.
    #[must_use]
    pub fn new(
        pd: Vec<ComponentDescriptor>,
        tidb: Vec<ComponentDescriptor>,
        tikv: Vec<ComponentDescriptor>,
        tiflash: Vec<ComponentDescriptor>,
    ) -> Self {
        Self {
            pd,
            tidb,
            tikv,
            tiflash,
        }
    }

    /// Builds a provider from a single unsorted list, partitioning by each descriptor's own
    /// [`profcoord_types::ComponentKind`].
    #[must_use]
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = ComponentDescriptor>) -> Self {
        let mut provider = Self::default();
        for descriptor in descriptors {
            use profcoord_types::ComponentKind;
            match descriptor.kind {
                ComponentKind::Pd => provider.pd.push(descriptor),
                ComponentKind::Tidb => provider.tidb.push(descriptor),
                ComponentKind::Tikv => provider.tikv.push(descriptor),
                ComponentKind::Tiflash => provider.tiflash.push(descriptor),
            }
        }
        provider
    }
}

#[async_trait]
impl TopologyProvider for StaticTopologyProvider {
    async fn get_pd(&self) -> Vec<ComponentDescriptor> {
        self.pd.clone()
    }

    async fn get_tidb(&self) -> Vec<ComponentDescriptor> {
        self.tidb.clone()
    }

    async fn get_tikv(&self) -> Vec<ComponentDescriptor> {
        self.tikv.clone()
    }

    async fn get_tiflash(&self) -> Vec<ComponentDescriptor> {
        self.tiflash.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use profcoord_types::ComponentKind;

    fn descriptor(kind: ComponentKind, ip: &str) -> ComponentDescriptor {
        ComponentDescriptor {
            ip: ip.to_string(),
            port: 4000,
            status_port: 10080,
            kind,
        }
    }

    #[tokio::test]
    async fn all_concatenates_pd_tidb_tikv_tiflash_in_order() {
        let provider = StaticTopologyProvider::from_descriptors([
            descriptor(ComponentKind::Tiflash, "10.0.0.4"),
            descriptor(ComponentKind::Pd, "10.0.0.1"),
            descriptor(ComponentKind::Tikv, "10.0.0.3"),
            descriptor(ComponentKind::Tidb, "10.0.0.2"),
        ]);

        let all = provider.all().await;
        let kinds: Vec<_> = all.iter().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ComponentKind::Pd,
                ComponentKind::Tidb,
                ComponentKind::Tikv,
                ComponentKind::Tiflash,
            ]
        );
    }
}
