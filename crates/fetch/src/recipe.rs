// SPDX-License-Identifier: Apache-2.0

//! The ProfFetcher registry: a static, process-wide table keyed by `(componentKind,
//! profileKind)` yielding either a [`FetchRecipe`] or [`RecipeLookup::Unsupported`].
//!
//! Modeled as a pure lookup (a `match` over tagged enum variants), not subclassing. Missing
//! entries are first-class (`Unsupported`), not exceptions: resolving one never errors, it just
//! tells the caller to skip.

use profcoord_types::{ComponentKind, ProfileKind};
use std::time::Duration;

/// The URL scheme to use for outbound fetches, mirroring the component's TLS configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// Plain HTTP.
    Http,
    /// TLS-wrapped HTTP.
    Https,
}

impl Scheme {
    /// The scheme's wire prefix, e.g. `"http"`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

/// Which port on the target a recipe fetches from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostPortSelector {
    /// The component's primary service port.
    Port,
    /// The component's status/metrics port. Used by every recipe in this registry today, but
    /// kept distinct from [`HostPortSelector::Port`] since some deployments expose profiling
    /// only on the primary port.
    StatusPort,
}

/// A static description of how to fetch one `(componentKind, profileKind)` pair.
#[derive(Debug, Clone, Copy)]
pub struct FetchRecipe {
    /// Which port on the target to connect to.
    pub host_port: HostPortSelector,
    /// The URL path, e.g. `/debug/pprof/profile`.
    pub path: &'static str,
    /// Whether the query string carries a `seconds=<durationSec>` parameter.
    pub timed: bool,
    /// The HTTP client (keyed by component kind) that should perform the request.
    ///
    /// Usually equal to the target's own [`ComponentKind`], but not always: see
    /// [`recipe_for`]'s doc comment for the one exception this registry carries.
    pub client: ComponentKind,
}

impl FetchRecipe {
    /// Builds the query string for this recipe given the bundle's `duration_sec`.
    #[must_use]
    pub fn query(&self, duration_sec: u32) -> String {
        if self.timed {
            format!("seconds={duration_sec}")
        } else {
            String::new()
        }
    }

    /// The duration this fetch is expected to take, used only for progress estimation.
    ///
    /// Timed profiles (CPU) are expected to take roughly `duration_sec`; untimed snapshot
    /// kinds (heap, mutex, goroutine) are expected to return quickly regardless of
    /// `duration_sec`.
    #[must_use]
    pub fn expected_duration(&self, duration_sec: u32) -> Duration {
        if self.timed {
            Duration::from_secs(u64::from(duration_sec))
        } else {
            Duration::from_secs(2)
        }
    }
}

/// The result of a registry lookup.
#[derive(Debug, Clone, Copy)]
pub enum RecipeLookup {
    /// A recipe exists for this pair.
    Recipe(FetchRecipe),
    /// This pair is declared unsupported; the task must terminate in state `Skipped`, never
    /// `Error`, without issuing any HTTP request.
    Unsupported,
}

/// Resolves the fetch recipe for `(component, profile)`.
///
/// PD and TiDB are Go binaries exposing the full `net/http/pprof` surface on their status
/// port. TiKV is a Rust binary that bridges only `cpu` and `heap` through its status server;
/// it has no notion of goroutines and does not expose a mutex profile there. TiFlash exposes
/// only a CPU profile, and — mirroring how the original deployment topology groups TiFlash's
/// plain-HTTP debug surface under the same client pool as TiDB's — fetches it using the
/// `Tidb` client rather than a dedicated `Tiflash` one. A deployment that only configures a
/// TiDB client therefore also serves TiFlash CPU profiles; one that omits the TiDB client
/// skips TiFlash CPU profiles as well as every TiDB profile.
#[must_use]
pub fn recipe_for(component: ComponentKind, profile: ProfileKind) -> RecipeLookup {
    use ComponentKind::{Pd, Tidb, Tiflash, Tikv};
    use ProfileKind::{Cpu, Goroutine, Heap, Mutex};
    use RecipeLookup::{Recipe, Unsupported};

    match (component, profile) {
        (Pd, Cpu) => Recipe(pprof_recipe("/debug/pprof/profile", true, Pd)),
        (Pd, Heap) => Recipe(pprof_recipe("/debug/pprof/heap", false, Pd)),
        (Pd, Mutex) => Recipe(pprof_recipe("/debug/pprof/mutex", false, Pd)),
        (Pd, Goroutine) => Recipe(pprof_recipe("/debug/pprof/goroutine", false, Pd)),

        (Tidb, Cpu) => Recipe(pprof_recipe("/debug/pprof/profile", true, Tidb)),
        (Tidb, Heap) => Recipe(pprof_recipe("/debug/pprof/heap", false, Tidb)),
        (Tidb, Mutex) => Recipe(pprof_recipe("/debug/pprof/mutex", false, Tidb)),
        (Tidb, Goroutine) => Recipe(pprof_recipe("/debug/pprof/goroutine", false, Tidb)),

        (Tikv, Cpu) => Recipe(pprof_recipe("/debug/pprof/profile", true, Tikv)),
        (Tikv, Heap) => Recipe(pprof_recipe("/debug/pprof/heap", false, Tikv)),
        (Tikv, Mutex | Goroutine) => Unsupported,

        (Tiflash, Cpu) => Recipe(pprof_recipe("/debug/pprof/profile", true, Tidb)),
        (Tiflash, Heap | Mutex | Goroutine) => Unsupported,
    }
}

const fn pprof_recipe(path: &'static str, timed: bool, client: ComponentKind) -> FetchRecipe {
    FetchRecipe {
        host_port: HostPortSelector::StatusPort,
        path,
        timed,
        client,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tikv_mutex_and_goroutine_are_unsupported() {
        assert!(matches!(
            recipe_for(ComponentKind::Tikv, ProfileKind::Mutex),
            RecipeLookup::Unsupported
        ));
        assert!(matches!(
            recipe_for(ComponentKind::Tikv, ProfileKind::Goroutine),
            RecipeLookup::Unsupported
        ));
    }

    #[test]
    fn tiflash_only_supports_cpu() {
        assert!(matches!(
            recipe_for(ComponentKind::Tiflash, ProfileKind::Cpu),
            RecipeLookup::Recipe(_)
        ));
        assert!(matches!(
            recipe_for(ComponentKind::Tiflash, ProfileKind::Heap),
            RecipeLookup::Unsupported
        ));
    }

    #[test]
    fn tiflash_cpu_recipe_routes_through_the_tidb_client() {
        let RecipeLookup::Recipe(recipe) = recipe_for(ComponentKind::Tiflash, ProfileKind::Cpu)
        else {
            panic!("expected a recipe");
        };
        assert_eq!(recipe.client, ComponentKind::Tidb);
    }

    #[test]
    fn pd_and_tidb_support_every_profile_kind() {
        for kind in [
            ProfileKind::Cpu,
            ProfileKind::Heap,
            ProfileKind::Mutex,
            ProfileKind::Goroutine,
        ] {
            assert!(matches!(
                recipe_for(ComponentKind::Pd, kind),
                RecipeLookup::Recipe(_)
            ));
            assert!(matches!(
                recipe_for(ComponentKind::Tidb, kind),
                RecipeLookup::Recipe(_)
            ));
        }
    }

    #[test]
    fn cpu_query_carries_seconds_timed_kinds_do_not() {
        let RecipeLookup::Recipe(cpu) = recipe_for(ComponentKind::Pd, ProfileKind::Cpu) else {
            panic!("expected a recipe");
        };
        assert_eq!(cpu.query(20), "seconds=20");

        let RecipeLookup::Recipe(heap) = recipe_for(ComponentKind::Pd, ProfileKind::Heap) else {
            panic!("expected a recipe");
        };
        assert_eq!(heap.query(20), "");
    }

    #[test]
    fn expected_duration_matches_duration_sec_for_timed_kinds() {
        let RecipeLookup::Recipe(cpu) = recipe_for(ComponentKind::Pd, ProfileKind::Cpu) else {
            panic!("expected a recipe");
        };
        assert_eq!(cpu.expected_duration(20), Duration::from_secs(20));

        let RecipeLookup::Recipe(heap) = recipe_for(ComponentKind::Pd, ProfileKind::Heap) else {
            panic!("expected a recipe");
        };
        assert_eq!(heap.expected_duration(20), Duration::from_secs(2));
    }
}
