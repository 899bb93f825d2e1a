// SPDX-License-Identifier: Apache-2.0

//! Errors for the config crate.

use miette::Diagnostic;
use thiserror::Error;

/// Errors that can occur while loading or validating a [`crate::Config`].
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// The configuration file could not be read from disk.
    #[error("failed to read config file '{path}': {source}")]
    Read {
        /// The path that failed to read.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file's contents could not be parsed as YAML.
    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        /// The path whose contents failed to parse.
        path: String,
        /// The underlying parse error.
        #[source]
        source: serde_yaml::Error,
    },

    /// A parsed configuration failed validation.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
