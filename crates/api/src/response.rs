// SPDX-License-Identifier: Apache-2.0

//! Response shapes for the read-side API methods.
//!
//! `GetBundle` must never carry profile `data` bytes (only `GetBundleData`/`GetProfileData`
//! do), so its child rows are projected through [`ProfileView`] rather than reusing
//! [`Profile`] directly.

use chrono::{DateTime, Utc};
use profcoord_types::{
    Bundle, BundleId, BundleState, ComponentDescriptor, Profile, ProfileId, ProfileKind,
    ProfileState,
};
use serde::{Deserialize, Serialize};

/// A [`Profile`] with its `data` bytes omitted, as returned by `GetBundle`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
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
    /// Estimated completion, in `[0.0, 1.0]`.
    pub progress: f64,
    /// Error message; non-empty only when `state == Error`.
    pub error: String,
    /// When the underlying task started running.
    pub started_at: DateTime<Utc>,
    /// When `state` left `Running`; `None` while still running.
    pub finished_at: Option<DateTime<Utc>>,
}

impl From<&Profile> for ProfileView {
    fn from(profile: &Profile) -> Self {
        Self {
            profile_id: profile.profile_id,
            bundle_id: profile.bundle_id,
            target: profile.target.clone(),
            kind: profile.kind,
            state: profile.state,
            progress: profile.progress,
            error: profile.error.clone(),
            started_at: profile.started_at,
            finished_at: profile.finished_at,
        }
    }
}

/// The response to `GetBundle`: the bundle row, its derived aggregate state, and every child
/// profile with its data bytes redacted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleDetail {
    /// The underlying bundle row.
    pub bundle: Bundle,
    /// The bundle's aggregate state, derived from its children at read time.
    pub state: BundleState,
    /// Every child profile, data bytes omitted, in creation order.
    pub profiles: Vec<ProfileView>,
}

/// The response to `GetBundleData`: every child profile in state `Succeeded`, each carrying
/// its full `data` bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleDataResponse {
    /// The bundle's succeeded children, in creation order. Empty if the bundle does not exist
    /// or has no succeeded children yet; never an error.
    pub profiles: Vec<Profile>,
}
