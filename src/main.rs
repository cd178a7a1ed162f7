//! Standalone monitoring daemon.
//!
//! Loads the TOML configuration, registers the configured probes,
//! starts the background monitor and, if enabled, the HTTP status
//! endpoints, then runs until ctrl-c.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use resilience_engine::config::{self, ProbeConfig};
use resilience_engine::lifecycle;
use resilience_engine::observability::{logging, metrics};
use resilience_engine::probe::http::HttpProbe;
use resilience_engine::probe::tcp::TcpProbe;
use resilience_engine::probe::HealthProbe;
use resilience_engine::{export, EngineConfig, ResilienceEngine};

#[derive(Debug, Parser)]
#[command(name = "resilience-engine", about = "Dependency health monitor with automated recovery")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "engine.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = if args.config.exists() {
        match config::load_config(&args.config) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        EngineConfig::default()
    };

    logging::init(&config.observability.log_level);
    if !args.config.exists() {
        tracing::warn!(path = %args.config.display(), "config file not found, using defaults");
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "metrics exporter failed to start");
                }
            }
            Err(e) => {
                tracing::error!(
                    addr = %config.observability.metrics_address,
                    error = %e,
                    "invalid metrics address, metrics disabled"
                );
            }
        }
    }

    let export_config = config.export.clone();
    let services = config.services.clone();
    let engine = Arc::new(ResilienceEngine::new(config));

    for service in &services {
        match build_probe(service) {
            Some(probe) => engine.register(service.name.as_str(), probe),
            None => tracing::error!(service = %service.name, "invalid probe target, service skipped"),
        }
    }

    engine.start().await;

    let export_shutdown = lifecycle::Shutdown::new();
    let mut export_task = None;
    if export_config.enabled {
        match export_config.bind_address.parse() {
            Ok(addr) => {
                let engine = Arc::clone(&engine);
                let receiver = export_shutdown.subscribe();
                export_task = Some(tokio::spawn(async move {
                    if let Err(e) = export::serve(engine, addr, receiver).await {
                        tracing::error!(error = %e, "status endpoint server failed");
                    }
                }));
            }
            Err(e) => {
                tracing::error!(
                    addr = %export_config.bind_address,
                    error = %e,
                    "invalid export address, status endpoints disabled"
                );
            }
        }
    }

    lifecycle::wait_for_shutdown().await;

    engine.stop().await;
    export_shutdown.trigger();
    if let Some(task) = export_task {
        let _ = task.await;
    }
    tracing::info!("shutdown complete");
    ExitCode::SUCCESS
}

// Targets were validated at load time; None here means the defaults
// path was reached with a malformed hand-built config.
fn build_probe(service: &config::ServiceConfig) -> Option<Arc<dyn HealthProbe>> {
    match &service.probe {
        ProbeConfig::Http { url } => url
            .parse()
            .ok()
            .map(|url| Arc::new(HttpProbe::new(service.name.as_str(), url)) as Arc<dyn HealthProbe>),
        ProbeConfig::Tcp { addr } => addr
            .parse()
            .ok()
            .map(|addr| Arc::new(TcpProbe::new(service.name.as_str(), addr)) as Arc<dyn HealthProbe>),
    }
}
