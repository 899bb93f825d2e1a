// SPDX-License-Identifier: Apache-2.0

//! The bundle aggregator: a bundle's state is never stored, only derived from its children's
//! live states on every read.

use profcoord_types::{BundleState, Profile, ProfileState};

/// Derives a bundle's aggregate state from its children.
///
/// - Any child `Running` → `Running`.
/// - Every child `Succeeded` or `Skipped` → `AllSucceeded`.
/// - Every child `Error` → `AllFailed`.
/// - Otherwise (a mix including at least one `Error` and at least one non-`Error`) →
///   `PartialSucceeded`.
///
/// A bundle with zero children (impossible for a bundle created through `StartBundle`, whose
/// `targets` and `kinds` are both required non-empty) is reported `AllSucceeded` vacuously.
#[must_use]
pub fn derive_bundle_state(profiles: &[Profile]) -> BundleState {
    if profiles
        .iter()
        .any(|profile| profile.state == ProfileState::Running)
    {
        return BundleState::Running;
    }

    let total = profiles.len();
    let errored = profiles
        .iter()
        .filter(|profile| profile.state == ProfileState::Error)
        .count();
    let succeeded = total - errored;

    if errored == 0 {
        BundleState::AllSucceeded
    } else if succeeded == 0 {
        BundleState::AllFailed
    } else {
        BundleState::PartialSucceeded
    }
}
