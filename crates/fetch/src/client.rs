// SPDX-License-Identifier: Apache-2.0

//! Per-component-kind HTTP clients. Any subset may be absent; an absent client causes the
//! profile task to terminate in state `Skipped` rather than `Error`, since a deployment that
//! omits a client chose not to probe that component kind at all.

use profcoord_types::ComponentKind;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;

/// A bundle of HTTP clients, one per [`ComponentKind`] a deployment has chosen to configure.
#[derive(Debug, Clone, Default)]
pub struct HttpClientBundle {
    clients: HashMap<ComponentKind, Client>,
}

impl HttpClientBundle {
    /// Builds an empty bundle; no component kinds are configured.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the client used for `kind`, building a fresh [`reqwest::Client`] whose
    /// request timeout is derived from `timeout`.
    ///
    /// The timeout should comfortably exceed the longest expected profile fetch for this
    /// kind; the profiling task additionally bounds each individual request using the fetch
    /// recipe's own expected duration plus slack, so this is a coarse backstop rather than the
    /// primary timeout mechanism.
    #[must_use]
    pub fn with_client_timeout(mut self, kind: ComponentKind, timeout: Duration) -> Self {
        #[allow(clippy::unwrap_used)]
        let client = Client::builder().timeout(timeout).build().unwrap();
        let _ = self.clients.insert(kind, client);
        self
    }

    /// Directly installs a pre-built client for `kind`. Primarily useful in tests that need
    /// fine-grained control over client configuration.
    pub fn with_client(mut self, kind: ComponentKind, client: Client) -> Self {
        let _ = self.clients.insert(kind, client);
        self
    }

    /// Returns the configured client for `kind`, if any.
    #[must_use]
    pub fn client_for(&self, kind: ComponentKind) -> Option<&Client> {
        self.clients.get(&kind)
    }
}
