//! Binary entrypoint for one discovery crawl (§6: no CLI, no arguments —
//! every setting is read from the environment by `DiscoveryConfig::from_env`).
//!
//! Exit codes follow §6/§7 exactly: `0` on success, `0` on the
//! `DiscoveryAlreadyRunning` sentinel (logged at info, not an error), `1`
//! on every other fatal `EngineError`, with `AggregatorNotFound` and
//! `OrgAggregatorValidation` printing their own named message and anything
//! else falling through to its `Display` impl.

use discovery_engine::{DiscoveryConfig, EngineError, Orchestrator};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let config = match DiscoveryConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            // Logging isn't configured yet without a parsed config; fall
            // back to the default filter so a config error is still visible.
            tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).json().init();
            tracing::error!(error = %err, "failed to load discovery configuration");
            std::process::exit(1);
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).json().init();

    match Orchestrator::new(config).run().await {
        Ok(summary) => {
            tracing::info!(?summary, "crawl finished successfully");
            std::process::exit(0);
        }
        Err(EngineError::DiscoveryAlreadyRunning) => {
            tracing::info!("another discovery instance is already running; exiting without error");
            std::process::exit(0);
        }
        Err(err @ EngineError::AggregatorNotFound(_)) => {
            print_fatal("AggregatorNotFoundError", &err);
            std::process::exit(1);
        }
        Err(err @ EngineError::OrgAggregatorValidation(_)) => {
            print_fatal("OrgAggregatorValidationError", &err);
            std::process::exit(1);
        }
        Err(err) => {
            print_fatal("DiscoveryError", &err);
            std::process::exit(1);
        }
    }
}

/// Emits the structured JSON failure event described in §7 ("A failed
/// crawl produces a structured JSON log with the error kind, message, and
/// stack") — `{kind}: {message}` stands in for a stack trace, since Rust
/// error chains don't carry one by default.
fn print_fatal(kind: &str, err: &EngineError) {
    tracing::error!(kind, error = %err, "discovery crawl failed fatally");
    eprintln!("{kind}: {err}");
}
