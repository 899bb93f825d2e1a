// SPDX-License-Identifier: Apache-2.0

//! Typed configuration for the profiling bundle coordinator.
//!
//! Loadable from a YAML file ([`Config::load`]) or built programmatically (`Config::default()`
//! plus field assignment), matching the shape the teacher workspace uses for its own engine
//! configuration: a single root struct, `#[serde(deny_unknown_fields)]`, `#[serde(default)]`
//! sections, and a dedicated [`error::Error`] type.

use profcoord_types::ComponentKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

pub mod error;

pub use error::Error;

/// Root configuration for the coordinator process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Descriptor signing configuration.
    #[serde(default)]
    pub signing: SigningConfig,

    /// Outbound HTTP fetch configuration.
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Upper bound accepted for `StartBundle`'s `durationSec`, rejected with a validation
    /// error above this. The original source enforces only positivity; this bound is a
    /// deliberate addition (see `DESIGN.md`) guarding against unbounded resource use.
    #[serde(default = "default_max_duration_secs")]
    pub max_duration_secs: u32,

    /// Whether to scan the store for profiles stuck in `Running` from a previous process and
    /// mark them `Error` on startup. See `DESIGN.md` for the rationale.
    #[serde(default = "default_true")]
    pub recover_orphans_on_startup: bool,

    /// How often the progress ticker writes an updated estimate for a running profile.
    #[serde(default = "default_progress_tick_interval", with = "humantime_serde")]
    pub progress_tick_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            signing: SigningConfig::default(),
            fetch: FetchConfig::default(),
            max_duration_secs: default_max_duration_secs(),
            recover_orphans_on_startup: true,
            progress_tick_interval: default_progress_tick_interval(),
        }
    }
}

impl Config {
    /// Loads and validates configuration from a YAML file at `path`.
    ///
    /// # Errors
    /// Returns [`Error::Read`] if the file cannot be read, [`Error::Parse`] if it is not valid
    /// YAML matching this schema, or [`Error::Invalid`] if validation fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = serde_yaml::from_str(&contents).map_err(|source| Error::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validates this configuration, independent of how it was constructed.
    ///
    /// # Errors
    /// Returns [`Error::Invalid`] describing the first violation found.
    pub fn validate(&self) -> Result<(), Error> {
        if self.max_duration_secs == 0 {
            return Err(Error::Invalid(
                "max_duration_secs must be greater than 0".to_string(),
            ));
        }
        if self.progress_tick_interval.is_zero() {
            return Err(Error::Invalid(
                "progress_tick_interval must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Descriptor signing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SigningConfig {
    /// Where to obtain the HMAC signing key.
    #[serde(default)]
    pub key_source: SigningKeySource,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            key_source: SigningKeySource::default(),
        }
    }
}

/// Where the server's HMAC signing key comes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SigningKeySource {
    /// The key is read from an environment variable at startup.
    Env {
        /// The environment variable name.
        var: String,
    },
    /// The key is given inline in the configuration file.
    ///
    /// Only intended for local development and tests; production deployments should use
    /// [`SigningKeySource::Env`].
    Inline {
        /// The raw key bytes, as a UTF-8 string.
        key: String,
    },
}

impl Default for SigningKeySource {
    fn default() -> Self {
        SigningKeySource::Env {
            var: "PROFCOORD_SIGNING_KEY".to_string(),
        }
    }
}

impl SigningKeySource {
    /// Resolves this source to the raw key bytes.
    ///
    /// # Errors
    /// Returns [`Error::Invalid`] if an `Env` source names a variable that is not set.
    pub fn resolve(&self) -> Result<Vec<u8>, Error> {
        match self {
            SigningKeySource::Env { var } => std::env::var(var)
                .map(String::into_bytes)
                .map_err(|_| Error::Invalid(format!("signing key env var '{var}' is not set"))),
            SigningKeySource::Inline { key } => Ok(key.clone().into_bytes()),
        }
    }
}

/// Outbound HTTP fetch configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FetchConfig {
    /// Whether profiling endpoints are fetched over `http` or `https`.
    #[serde(default)]
    pub tls: bool,

    /// Per-component-kind client request timeouts. Components not present here fall back to
    /// [`default_client_timeout`].
    #[serde(default, with = "timeout_map")]
    pub client_timeouts: BTreeMap<ComponentKind, Duration>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            tls: false,
            client_timeouts: BTreeMap::new(),
        }
    }
}

impl FetchConfig {
    /// The timeout to use for `kind`'s client: the configured override, or
    /// [`default_client_timeout`].
    #[must_use]
    pub fn client_timeout(&self, kind: ComponentKind) -> Duration {
        self.client_timeouts
            .get(&kind)
            .copied()
            .unwrap_or_else(default_client_timeout)
    }
}

/// The default per-client request timeout, comfortably above the longest untimed (snapshot)
/// profile fetch.
#[must_use]
pub fn default_client_timeout() -> Duration {
    Duration::from_secs(30)
}

const fn default_max_duration_secs() -> u32 {
    300
}

const fn default_true() -> bool {
    true
}

const fn default_progress_tick_interval() -> Duration {
    Duration::from_secs(1)
}

mod timeout_map {
    use super::ComponentKind;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;
    use std::time::Duration;

    #[derive(Serialize, Deserialize)]
    struct Entry {
        component: ComponentKind,
        #[serde(with = "humantime_serde")]
        timeout: Duration,
    }

    pub(super) fn serialize<S: Serializer>(
        map: &BTreeMap<ComponentKind, Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let entries: Vec<Entry> = map
            .iter()
            .map(|(component, timeout)| Entry {
                component: *component,
                timeout: *timeout,
            })
            .collect();
        entries.serialize(serializer)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<ComponentKind, Duration>, D::Error> {
        let entries = Vec::<Entry>::deserialize(deserializer)?;
        Ok(entries
            .into_iter()
            .map(|entry| (entry.component, entry.timeout))
            .collect())
    }
}
