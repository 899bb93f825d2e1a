// SPDX-License-Identifier: Apache-2.0

//! Errors for the store crate.

use miette::Diagnostic;
use profcoord_types::{BundleId, ProfileId};
use thiserror::Error;

/// Errors the store adapter can report back to its callers.
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// No bundle exists with the given id.
    #[error("bundle {0} not found")]
    BundleNotFound(BundleId),

    /// No profile exists with the given id.
    #[error("profile {0} not found")]
    ProfileNotFound(ProfileId),
}
