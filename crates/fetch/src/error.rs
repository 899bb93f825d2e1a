// SPDX-License-Identifier: Apache-2.0

//! Errors for the fetch crate.

use miette::Diagnostic;
use thiserror::Error;

/// A fetch failure. Recorded verbatim inside a profile row (`state = Error, error =
/// <message>`); never surfaced from the API methods that started the bundle.
#[derive(Error, Diagnostic, Debug)]
pub enum FetchError {
    /// The HTTP request itself failed (connection refused, DNS failure, timeout, ...).
    #[error("request to {target} failed: {source}")]
    Transport {
        /// A short label identifying the target that was being fetched.
        target: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The server responded with a non-2xx status.
    #[error("request to {target} returned status {status}")]
    Status {
        /// A short label identifying the target that was being fetched.
        target: String,
        /// The HTTP status code returned.
        status: u16,
    },

    /// The response body could not be read in full.
    #[error("reading response body from {target} failed: {source}")]
    BodyRead {
        /// A short label identifying the target that was being fetched.
        target: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },
}
