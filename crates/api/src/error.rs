// SPDX-License-Identifier: Apache-2.0

//! Errors for the public API surface.

use miette::Diagnostic;
use profcoord_types::{BundleId, ProfileId};
use thiserror::Error;

/// Errors the public API surface can report back to its callers.
///
/// Fetch failures never appear here: they are recorded inside a [`profcoord_types::Profile`]
/// row (`state = Error`), not raised from the method that started the bundle.
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// The request was malformed or its targets failed authentication. No bundle row was
    /// created.
    #[error("{0}")]
    Validation(String),

    /// No bundle exists with the given id.
    #[error("bundle {0} not found")]
    BundleNotFound(BundleId),

    /// No profile exists with the given id.
    #[error("profile {0} not found")]
    ProfileNotFound(ProfileId),

    /// `GetProfileData` was called on a profile in state `Error`.
    #[error("the profile is in error state")]
    ProfileInErrorState,

    /// `GetProfileData` was called on a profile in state `Skipped`.
    #[error("the profile is in skipped state")]
    ProfileInSkippedState,
}

impl From<profcoord_store::Error> for Error {
    fn from(source: profcoord_store::Error) -> Self {
        match source {
            profcoord_store::Error::BundleNotFound(id) => Error::BundleNotFound(id),
            profcoord_store::Error::ProfileNotFound(id) => Error::ProfileNotFound(id),
        }
    }
}

impl From<profcoord_coordinator::Error> for Error {
    fn from(source: profcoord_coordinator::Error) -> Self {
        match source {
            profcoord_coordinator::Error::Validation(message) => Error::Validation(message),
            profcoord_coordinator::Error::Store(source) => source.into(),
        }
    }
}
