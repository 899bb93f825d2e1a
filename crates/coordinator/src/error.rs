// SPDX-License-Identifier: Apache-2.0

//! Errors for the coordinator crate.

use miette::Diagnostic;
use thiserror::Error;

/// Errors the bundle coordinator can report back to its callers.
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// The request was malformed or its targets failed authentication. No bundle row was
    /// created.
    #[error("{0}")]
    Validation(String),

    /// A store operation failed.
    #[error("store error: {0}")]
    Store(#[from] profcoord_store::Error),
}

impl From<profcoord_signing::Error> for Error {
    fn from(source: profcoord_signing::Error) -> Self {
        Error::Validation(source.to_string())
    }
}
