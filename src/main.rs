// SPDX-License-Identifier: Apache-2.0

//! Entry point for the profiling bundle coordinator daemon.
//!
//! Wires together the collaborators the coordination core consumes — signing, store, HTTP
//! clients, topology — and runs the [`Lifecycle`] startup hook, then blocks until asked to
//! shut down (`Ctrl+C` or `SIGTERM`), at which point it runs the shutdown hook and exits.
//!
//! The HTTP/CLI transport for the public API surface is out of scope for this core (see
//! `SPEC_FULL.md` §1); this binary only demonstrates that the wiring runs end to end. A real
//! deployment would front [`ProfilingService`] with its own transport crate.

use clap::Parser;
use miette::{Context, IntoDiagnostic};
use profcoord_api::{Lifecycle, ProfilingApi, ProfilingService};
use profcoord_config::Config;
use profcoord_coordinator::Coordinator;
use profcoord_fetch::{HttpClientBundle, Scheme};
use profcoord_signing::HmacSigner;
use profcoord_store::InMemoryStore;
use profcoord_topology::StaticTopologyProvider;
use profcoord_types::{ComponentDescriptor, ComponentKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Command-line arguments for `profcoordd`.
#[derive(Debug, Parser)]
#[command(name = "profcoordd", about = "Profiling bundle coordinator daemon")]
struct Cli {
    /// Path to a YAML configuration file. Defaults to built-in defaults when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to a JSON file listing the cluster's component endpoints, used in place of a live
    /// topology discovery service (out of scope for this core).
    #[arg(long)]
    topology: Option<PathBuf>,

    /// Component kinds to configure an HTTP client for; omitted kinds are skipped, not
    /// errored, by every profile task targeting them.
    #[arg(long, value_delimiter = ',', default_value = "pd,tidb,tikv,tiflash")]
    components: Vec<String>,
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path).into_diagnostic().wrap_err("loading configuration")?,
        None => Config::default(),
    };

    let signing_key = config
        .signing
        .key_source
        .resolve()
        .into_diagnostic()
        .wrap_err("resolving signing key")?;
    let signer = Arc::new(HmacSigner::new(signing_key));

    let components = parse_components(&cli.components)?;
    let scheme = if config.fetch.tls { Scheme::Https } else { Scheme::Http };
    let mut clients = HttpClientBundle::new();
    for component in components {
        clients = clients.with_client_timeout(component, config.fetch.client_timeout(component));
    }

    let descriptors = match &cli.topology {
        Some(path) => load_topology(path)?,
        None => Vec::new(),
    };
    let topology = Arc::new(StaticTopologyProvider::from_descriptors(descriptors));

    let store = Arc::new(InMemoryStore::new());
    let coordinator = Arc::new(Coordinator::new(
        store.clone(),
        signer.clone(),
        Arc::new(clients),
        scheme,
        config.max_duration_secs,
        config.progress_tick_interval,
    ));
    let service = ProfilingService::new(store, signer, topology, Arc::clone(&coordinator));
    let lifecycle = Lifecycle::new(coordinator, config.recover_orphans_on_startup);

    lifecycle.startup().await;
    let targets = service.list_targets().await;
    info!(target_count = targets.len(), "profiling bundle coordinator ready");

    wait_for_shutdown_signal().await;
    lifecycle.shutdown().await;
    Ok(())
}

fn parse_components(names: &[String]) -> miette::Result<Vec<ComponentKind>> {
    names
        .iter()
        .map(|name| match name.trim().to_ascii_lowercase().as_str() {
            "pd" => Ok(ComponentKind::Pd),
            "tidb" => Ok(ComponentKind::Tidb),
            "tikv" => Ok(ComponentKind::Tikv),
            "tiflash" => Ok(ComponentKind::Tiflash),
            other => Err(miette::miette!("unknown component kind '{other}'")),
        })
        .collect()
}

fn load_topology(path: &Path) -> miette::Result<Vec<ComponentDescriptor>> {
    let contents = std::fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("reading topology file '{}'", path.display()))?;
    serde_json::from_str(&contents)
        .into_diagnostic()
        .wrap_err_with(|| format!("parsing topology file '{}'", path.display()))
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut terminate = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(signal) => signal,
            Err(_) => {
                let _ = ctrl_c.await;
                return;
            }
        };
        tokio::select! {
            _ = ctrl_c => {}
            _ = terminate.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }
}
