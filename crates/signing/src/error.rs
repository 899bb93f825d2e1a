// SPDX-License-Identifier: Apache-2.0

//! Errors for the signing crate.

use miette::Diagnostic;
use thiserror::Error;

/// Errors that can occur while signing or verifying component descriptors.
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// A single descriptor's signature did not verify.
    #[error("signature for target '{target}' did not verify")]
    InvalidSignature {
        /// A short label identifying the offending target, for diagnosis.
        target: String,
    },

    /// One or more targets in a batch failed verification; the whole request is rejected.
    #[error("targets are not valid: {target}: {source}")]
    TargetsNotValid {
        /// A short label identifying the first offending target.
        target: String,
        /// The underlying verification failure.
        #[source]
        source: Box<Error>,
    },
}
