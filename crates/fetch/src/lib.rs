// SPDX-License-Identifier: Apache-2.0

//! Per-target capability routing: resolves which (if any) outbound HTTP fetch to issue for a
//! `(target, profileKind)` pair, and performs it.

pub mod client;
pub mod error;
pub mod recipe;

pub use client::HttpClientBundle;
pub use error::FetchError;
pub use recipe::{FetchRecipe, HostPortSelector, RecipeLookup, Scheme, recipe_for};

use profcoord_types::{ComponentDescriptor, ProfileKind};
use std::time::Duration;

/// The outcome of attempting to fetch one profile.
#[derive(Debug)]
pub enum FetchOutcome {
    /// The pair is unsupported, or its client is not configured. No HTTP request was issued.
    Skipped,
    /// The fetch succeeded; carries the full response body.
    Succeeded(Vec<u8>),
    /// The fetch was attempted and failed.
    Failed(FetchError),
}

/// Resolves and, unless skipped, issues the fetch for `(target, kind)`.
///
/// `duration_sec` parameterizes timed recipes (CPU); `scheme` mirrors the deployment's TLS
/// configuration, since [`ComponentDescriptor`] itself carries no TLS flag.
pub async fn fetch_profile(
    clients: &HttpClientBundle,
    scheme: Scheme,
    target: &ComponentDescriptor,
    kind: ProfileKind,
    duration_sec: u32,
) -> FetchOutcome {
    let recipe = match recipe_for(target.kind, kind) {
        RecipeLookup::Unsupported => return FetchOutcome::Skipped,
        RecipeLookup::Recipe(recipe) => recipe,
    };

    let Some(client) = clients.client_for(recipe.client) else {
        return FetchOutcome::Skipped;
    };

    let host_port = match recipe.host_port {
        HostPortSelector::Port => target.port,
        HostPortSelector::StatusPort => target.status_port,
    };
    let query = recipe.query(duration_sec);
    let url = if query.is_empty() {
        format!("{}://{}:{}{}", scheme.as_str(), target.ip, host_port, recipe.path)
    } else {
        format!(
            "{}://{}:{}{}?{}",
            scheme.as_str(),
            target.ip,
            host_port,
            recipe.path,
            query
        )
    };

    let label = target.label();
    let response = match client
        .get(&url)
        .timeout(recipe.expected_duration(duration_sec) + Duration::from_secs(5))
        .send()
        .await
    {
        Ok(response) => response,
        Err(source) => {
            return FetchOutcome::Failed(FetchError::Transport {
                target: label,
                source,
            });
        }
    };

    if !response.status().is_success() {
        return FetchOutcome::Failed(FetchError::Status {
            target: label,
            status: response.status().as_u16(),
        });
    }

    match response.bytes().await {
        Ok(bytes) => FetchOutcome::Succeeded(bytes.to_vec()),
        Err(source) => FetchOutcome::Failed(FetchError::BodyRead {
            target: label,
            source,
        }),
    }
}
