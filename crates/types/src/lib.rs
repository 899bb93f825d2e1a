// SPDX-License-Identifier: Apache-2.0

//! Domain and wire types shared by every layer of the profiling bundle coordinator.
//!
//! Data Model:
//! - a [`Bundle`] groups one [`Profile`] per (target, kind) pair requested together
//! - a [`Profile`] is the leaf unit of work: one fetch against one component endpoint
//! - [`ComponentDescriptor`] identifies a fetchable endpoint; [`SignedComponentDescriptor`]
//!   additionally proves the descriptor came from the server's own topology source

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod ids;

pub use ids::{BundleId, ProfileId};

/// The kind of cluster component an endpoint belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    /// Placement Driver.
    Pd,
    /// TiDB SQL layer node.
    Tidb,
    /// TiKV storage node.
    Tikv,
    /// TiFlash columnar storage node.
    Tiflash,
}

impl ComponentKind {
    /// All component kinds, in the order [`TopologyProvider`]-style collaborators are expected
    /// to concatenate them (PD, TiDB, TiKV, TiFlash).
    pub const ALL: [ComponentKind; 4] = [
        ComponentKind::Pd,
        ComponentKind::Tidb,
        ComponentKind::Tikv,
        ComponentKind::Tiflash,
    ];

    /// Stable lowercase wire name, matching the spec's enumerated wire values.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ComponentKind::Pd => "pd",
            ComponentKind::Tidb => "tidb",
            ComponentKind::Tikv => "tikv",
            ComponentKind::Tiflash => "tiflash",
        }
    }
}

/// The kind of runtime profile to collect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileKind {
    /// CPU profile, sampled over `durationSec`.
    Cpu,
    /// Heap allocation snapshot.
    Heap,
    /// Mutex contention profile.
    Mutex,
    /// Goroutine (lightweight-task) stack dump.
    Goroutine,
}

impl ProfileKind {
    /// Stable lowercase wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ProfileKind::Cpu => "cpu",
            ProfileKind::Heap => "heap",
            ProfileKind::Mutex => "mutex",
            ProfileKind::Goroutine => "goroutine",
        }
    }
}

/// Terminal and in-flight states of a single [`Profile`].
///
/// ```text
///   Running ──success──▶ Succeeded  (terminal)
///          ──failure──▶ Error      (terminal)
///          ──unsupp.──▶ Skipped    (terminal, direct, no HTTP issued)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileState {
    /// The fetch is in flight.
    Running,
    /// The fetch completed and returned profile data.
    Succeeded,
    /// The fetch was attempted and failed.
    Error,
    /// The (component kind, profile kind) pair is unsupported, or its client was not
    /// configured; no HTTP request was ever issued.
    Skipped,
}

impl ProfileState {
    /// Whether this state is terminal (the profile task has finished, one way or another).
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, ProfileState::Running)
    }

    /// Stable lowercase wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ProfileState::Running => "running",
            ProfileState::Succeeded => "succeeded",
            ProfileState::Error => "error",
            ProfileState::Skipped => "skipped",
        }
    }
}

/// The aggregate state of a [`Bundle`], derived from its children on every read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BundleState {
    /// At least one child profile is still running.
    Running,
    /// Every child is Succeeded or Skipped.
    AllSucceeded,
    /// Every child is Error.
    AllFailed,
    /// A mix of terminal states including at least one Error and at least one non-Error.
    PartialSucceeded,
}

impl BundleState {
    /// Stable lowercase wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            BundleState::Running => "running",
            BundleState::AllSucceeded => "all_succeeded",
            BundleState::AllFailed => "all_failed",
            BundleState::PartialSucceeded => "partial_succeeded",
        }
    }
}

/// A cluster component endpoint, as returned by topology discovery.
///
/// Pure value type: carries no proof of provenance on its own, see
/// [`SignedComponentDescriptor`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDescriptor {
    /// IP address or hostname of the component.
    pub ip: String,
    /// Primary service port.
    pub port: u16,
    /// Status/metrics port; most profiling recipes fetch from this port.
    pub status_port: u16,
    /// The kind of component this descriptor identifies.
    pub kind: ComponentKind,
}

impl ComponentDescriptor {
    /// A short identifier useful in log lines and error messages, e.g. `tidb@10.0.0.1:10080`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}@{}:{}", self.kind.as_str(), self.ip, self.status_port)
    }

    /// Canonical byte encoding used as the HMAC message when signing this descriptor.
    ///
    /// Deliberately simple and field-delimited rather than JSON: the signature must bind the
    /// exact tuple of fields regardless of any future serde attribute changes to the wire
    /// format.
    #[must_use]
    pub fn canonical_bytes(&self) -> Vec<u8> {
        format!(
            "{}|{}|{}|{}",
            self.kind.as_str(),
            self.ip,
            self.port,
            self.status_port
        )
        .into_bytes()
    }
}

/// A [`ComponentDescriptor`] bound to a signature proving it came from the server's own
/// topology source (see the `DescriptorSigner` collaborator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedComponentDescriptor {
    /// The signed descriptor.
    #[serde(flatten)]
    pub descriptor: ComponentDescriptor,
    /// Base64-encoded HMAC-SHA256 signature over [`ComponentDescriptor::canonical_bytes`].
    pub signature: String,
}

/// A user-visible request grouping one fetch per (target, kind).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    /// Unique, monotonically assigned identifier.
    pub bundle_id: BundleId,
    /// Fetch duration parameter, in seconds, applied to timed profile kinds.
    pub duration_sec: u32,
    /// The requested profile kinds, deduplicated, in request order.
    pub kinds: Vec<ProfileKind>,
    /// The requested profile kinds exactly as they appeared on the request, before
    /// deduplication.
    pub kinds_all: Vec<ProfileKind>,
    /// Number of targets requested per component kind, derived at creation time.
    pub targets_count: std::collections::BTreeMap<ComponentKind, u32>,
    /// Wall-clock creation time.
    pub created_at: DateTime<Utc>,
}

/// A summary view of a [`Bundle`] plus its derived [`BundleState`], without child profile rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleSummary {
    /// The underlying bundle.
    #[serde(flatten)]
    pub bundle: Bundle,
    /// The bundle's aggregate state, derived from its children at the time of the read.
    pub state: BundleState,
}

/// One leaf fetch and its resulting bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Unique, monotonically assigned identifier.
    pub profile_id: ProfileId,
    /// The bundle this profile belongs to.
    pub bundle_id: BundleId,
    /// The component endpoint this profile was fetched from.
    pub target: ComponentDescriptor,
    /// The kind of profile fetched.
    pub kind: ProfileKind,
    /// Current lifecycle state.
    pub state: ProfileState,
    /// Estimated completion, in `[0.0, 1.0]`. Always `1.0` once `state` is terminal.
    pub progress: f64,
    /// Error message; non-empty only when `state == Error`.
    pub error: String,
    /// Fetched profile bytes; non-empty only when `state == Succeeded`.
    ///
    /// Omitted from [`Bundle`]-level reads (`GetBundle`); present only from
    /// `GetBundleData`/`GetProfileData`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<u8>,
    /// When the underlying task started running.
    pub started_at: DateTime<Utc>,
    /// When `state` left `Running`; `None` while still running.
    pub finished_at: Option<DateTime<Utc>>,
}

impl Profile {
    /// A profile carries success-equivalent weight in bundle aggregation if it is `Succeeded`
    /// or `Skipped` (a deployment-level omission is not a per-bundle failure).
    #[must_use]
    pub fn counts_as_success(&self) -> bool {
        matches!(self.state, ProfileState::Succeeded | ProfileState::Skipped)
    }
}

/// Request payload for `StartBundle`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartBundleRequest {
    /// Fetch duration parameter, in seconds.
    pub duration_sec: u32,
    /// Requested profile kinds. Deduplicated by the coordinator, request order preserved.
    pub kinds: Vec<ProfileKind>,
    /// Targets to fetch from, each proven authentic by its signature.
    pub targets: Vec<SignedComponentDescriptor>,
}
