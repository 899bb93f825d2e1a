// SPDX-License-Identifier: Apache-2.0

//! The profile task: the unit of work spawned once per `(target, kind)` pair. Ticks progress,
//! calls the fetcher, and writes the terminal state back to the store exactly once.

use profcoord_fetch::{FetchOutcome, HttpClientBundle, RecipeLookup, Scheme, fetch_profile, recipe_for};
use profcoord_store::Store;
use profcoord_types::{ComponentDescriptor, ProfileId, ProfileKind, ProfileState};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Runs one profile task to completion, writing its terminal state to `store` exactly once.
///
/// Never panics and never returns early on its own account: the only way this future resolves
/// without writing a terminal state is if `store.update_profile` itself errors (the row having
/// vanished, which cannot happen for a row this task was handed fresh from
/// [`profcoord_store::Store::create_profiles`]).
#[allow(clippy::too_many_arguments)]
pub async fn run_profile_task(
    store: Arc<dyn Store>,
    clients: Arc<HttpClientBundle>,
    scheme: Scheme,
    profile_id: ProfileId,
    target: ComponentDescriptor,
    kind: ProfileKind,
    duration_sec: u32,
    tick_interval: Duration,
    cancel: CancellationToken,
) {
    let recipe = match recipe_for(target.kind, kind) {
        RecipeLookup::Unsupported => None,
        RecipeLookup::Recipe(recipe) => {
            if clients.client_for(recipe.client).is_some() {
                Some(recipe)
            } else {
                None
            }
        }
    };

    let Some(recipe) = recipe else {
        debug!(profile_id = %profile_id, kind = kind.as_str(), "profile skipped: unsupported or client not configured");
        write_terminal(&store, profile_id, ProfileState::Skipped, String::new()).await;
        return;
    };

    let expected = recipe.expected_duration(duration_sec);
    let ticker = tokio::spawn(run_ticker(
        Arc::clone(&store),
        profile_id,
        expected,
        tick_interval,
    ));

    let outcome = tokio::select! {
        outcome = fetch_profile(&clients, scheme, &target, kind, duration_sec) => outcome,
        () = cancel.cancelled() => FetchOutcome::Failed(cancelled_error()),
    };
    ticker.abort();

    match outcome {
        FetchOutcome::Skipped => {
            write_terminal(&store, profile_id, ProfileState::Skipped, String::new()).await;
        }
        FetchOutcome::Succeeded(data) => {
            info!(profile_id = %profile_id, kind = kind.as_str(), bytes = data.len(), "profile succeeded");
            write_succeeded(&store, profile_id, data).await;
        }
        FetchOutcome::Failed(err) => {
            warn!(profile_id = %profile_id, kind = kind.as_str(), error = %err, "profile failed");
            write_terminal(&store, profile_id, ProfileState::Error, err.to_string()).await;
        }
    }
}

fn cancelled_error() -> profcoord_fetch::FetchError {
    profcoord_fetch::FetchError::Status {
        target: "shutdown".to_string(),
        status: 0,
    }
}

async fn run_ticker(store: Arc<dyn Store>, id: ProfileId, expected: Duration, tick_interval: Duration) {
    let start = Instant::now();
    loop {
        tokio::time::sleep(tick_interval).await;
        let elapsed = start.elapsed();
        let progress = if expected.is_zero() {
            0.99
        } else {
            (elapsed.as_secs_f64() / expected.as_secs_f64()).min(0.99)
        };
        // Conditional: only applies while the row is still Running. The terminal write races
        // this and always wins once it lands, since the ticker task is aborted right after.
        let result = store
            .update_profile(
                id,
                Box::new(move |profile| {
                    if profile.state == ProfileState::Running {
                        profile.progress = progress;
                    }
                }),
            )
            .await;
        if let Err(error) = result {
            debug!(profile_id = %id, %error, "progress tick skipped: store update failed");
        }
    }
}

async fn write_succeeded(store: &Arc<dyn Store>, id: ProfileId, data: Vec<u8>) {
    let now = chrono::Utc::now();
    let result = store
        .update_profile(
            id,
            Box::new(move |profile| {
                profile.state = ProfileState::Succeeded;
                profile.progress = 1.0;
                profile.data = data;
                profile.finished_at = Some(now);
            }),
        )
        .await;
    if let Err(error) = result {
        warn!(profile_id = %id, %error, "failed to write succeeded profile state; row stays stuck Running");
    }
}

async fn write_terminal(store: &Arc<dyn Store>, id: ProfileId, state: ProfileState, error: String) {
    let now = chrono::Utc::now();
    let result = store
        .update_profile(
            id,
            Box::new(move |profile| {
                profile.state = state;
                profile.progress = 1.0;
                profile.error = error;
                profile.finished_at = Some(now);
            }),
        )
        .await;
    if let Err(store_error) = result {
        warn!(profile_id = %id, error = %store_error, "failed to write terminal profile state; row stays stuck Running");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use profcoord_store::{InMemoryStore, NewBundle, NewProfile};
    use profcoord_types::ComponentKind;
    use std::collections::BTreeMap;

    fn descriptor() -> ComponentDescriptor {
        ComponentDescriptor {
            ip: "10.0.0.1".to_string(),
            port: 4000,
            status_port: 10080,
            kind: ComponentKind::Tidb,
        }
    }

    async fn running_profile(store: &Arc<dyn Store>) -> ProfileId {
        let bundle_id = store
            .create_bundle(NewBundle {
                duration_sec: 20,
                kinds: vec![ProfileKind::Cpu],
                kinds_all: vec![ProfileKind::Cpu],
                targets_count: BTreeMap::new(),
            })
            .await;
        let ids = store
            .create_profiles(vec![NewProfile {
                bundle_id,
                target: descriptor(),
                kind: ProfileKind::Cpu,
            }])
            .await;
        ids[0]
    }

    /// Drives the progress ticker purely against the virtual clock — no wall-clock sleeps — so
    /// the assertions are exact rather than a bounded-wait approximation.
    #[tokio::test]
    async fn ticker_advances_progress_on_virtual_time_and_never_overwrites_a_terminal_write() {
        tokio::time::pause();

        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        let id = running_profile(&store).await;

        let tick_interval = Duration::from_secs(1);
        let expected = Duration::from_secs(20);
        let ticker = tokio::spawn(run_ticker(Arc::clone(&store), id, expected, tick_interval));

        tokio::time::advance(tick_interval).await;
        let profile = store.get_profile(id).await.unwrap();
        assert!(profile.progress > 0.0 && profile.progress < 0.1, "progress was {}", profile.progress);

        tokio::time::advance(tick_interval * 9).await;
        let profile = store.get_profile(id).await.unwrap();
        assert!((profile.progress - 0.5).abs() < 0.01, "progress was {}", profile.progress);

        // Simulate the terminal write landing while the ticker is still alive (it is aborted
        // only afterwards by `run_profile_task`, never before). The ticker's conditional
        // mutator must leave this alone on every subsequent tick.
        store
            .update_profile(
                id,
                Box::new(|profile| {
                    profile.state = ProfileState::Succeeded;
                    profile.progress = 1.0;
                }),
            )
            .await
            .unwrap();

        tokio::time::advance(tick_interval * 5).await;
        let profile = store.get_profile(id).await.unwrap();
        assert_eq!(profile.state, ProfileState::Succeeded);
        assert_eq!(profile.progress, 1.0);

        ticker.abort();
    }

    #[tokio::test]
    async fn ticker_caps_progress_at_0_99_for_a_long_running_fetch() {
        tokio::time::pause();

        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        let id = running_profile(&store).await;

        let tick_interval = Duration::from_secs(1);
        let expected = Duration::from_secs(5);
        let ticker = tokio::spawn(run_ticker(Arc::clone(&store), id, expected, tick_interval));

        tokio::time::advance(tick_interval * 50).await;
        let profile = store.get_profile(id).await.unwrap();
        assert_eq!(profile.progress, 0.99);
        assert_eq!(profile.state, ProfileState::Running);

        ticker.abort();
    }
}
