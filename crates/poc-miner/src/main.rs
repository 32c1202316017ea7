//! # PoC Miner
//!
//! Entry point: loads configuration, wires the round engine to its HTTP
//! pool adapters, the filesystem plot reader, and a verifier backend, then
//! runs until interrupted.

use anyhow::{Context, Result};
use clap::Parser;
use poc_miner::config::MinerConfig;
use round_engine::{MiningRoundEngine, RoundEngineConfig, RoundEngineService};
use shared_bus::InMemoryEventBus;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "poc-miner", about = "Proof-of-capacity mining round engine")]
struct Args {
    /// Path to the miner's YAML configuration file.
    #[arg(short, long, default_value = "miner.yaml")]
    config: PathBuf,

    /// Override the configured log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

fn backend_for(processor_type: round_engine::ProcessorType) -> poc_verify::Backend {
    match processor_type {
        round_engine::ProcessorType::Cpu => poc_verify::Backend::Cpu,
        round_engine::ProcessorType::Gpu => poc_verify::Backend::OpenCl,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut miner_config =
        MinerConfig::load(&args.config).with_context(|| format!("loading {}", args.config.display()))?;
    if let Some(level) = args.log_level {
        miner_config.log_level = level;
    }

    let bus = Arc::new(InMemoryEventBus::new());

    let telemetry_config = telemetry::TelemetryConfig {
        service_name: "poc-miner".to_string(),
        log_level: miner_config.log_level.clone(),
        json_logs: miner_config.json_logs,
        metrics_addr: miner_config.metrics_addr.clone(),
    };
    let _telemetry_guard =
        telemetry::init_telemetry(telemetry_config, bus.clone()).context("initializing telemetry")?;

    if let Some(addr) = &miner_config.metrics_addr {
        spawn_metrics_endpoint(addr.clone());
    }

    info!("===========================================");
    info!("  PoC Miner");
    info!("===========================================");

    let engine = build_engine(miner_config.round_engine.clone(), bus)?;

    let engine = Arc::new(engine);
    let run_handle = {
        let engine = engine.clone();
        tokio::spawn(async move {
            if let Err(e) = engine.run().await {
                tracing::error!(error = %e, "mining round engine exited with an error");
            }
        })
    };

    info!("miner running, press Ctrl+C to stop");
    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
    info!("shutting down...");
    engine.stop().await.context("stopping engine")?;
    let _ = run_handle.await;

    Ok(())
}

fn build_engine(config: RoundEngineConfig, bus: Arc<InMemoryEventBus>) -> Result<RoundEngineService> {
    use round_engine::adapters::{EventBusProgressSink, FilesystemPlotReader, HttpPoolClient, HttpSubmitter};

    let pool_urls: Vec<String> = config.pool_urls().into_iter().map(String::from).collect();
    let pool_client = Arc::new(HttpPoolClient::new(pool_urls.clone()));
    let submitter = Arc::new(HttpSubmitter::new(pool_urls));
    let plot_reader =
        Arc::new(FilesystemPlotReader::new(config.max_buffer_size_bytes).context("sizing plot reader")?);
    let progress_sink = Arc::new(EventBusProgressSink::new(bus));
    let verifier = poc_verify::auto_detect(backend_for(config.processor_type));

    Ok(RoundEngineService::new(config, pool_client, submitter, plot_reader, progress_sink, verifier))
}

/// Serve the Prometheus text exposition format on `addr` at any path.
///
/// A hand-rolled HTTP/1.0 responder: the request is never parsed, the
/// metrics body is always returned, which is all a scrape target needs.
fn spawn_metrics_endpoint(addr: String) {
    tokio::task::spawn_blocking(move || {
        let listener = match std::net::TcpListener::bind(&addr) {
            Ok(l) => l,
            Err(e) => {
                tracing::warn!(addr, error = %e, "could not bind metrics endpoint");
                return;
            }
        };
        info!(addr, "metrics endpoint listening");
        for stream in listener.incoming().flatten() {
            serve_metrics_once(stream);
        }
    });
}

fn serve_metrics_once(mut stream: std::net::TcpStream) {
    use std::io::{Read, Write};

    let mut discard = [0u8; 1024];
    let _ = stream.read(&mut discard);

    let body = telemetry::render().unwrap_or_else(|e| format!("# error rendering metrics: {e}\n"));
    let response = format!(
        "HTTP/1.0 200 OK\r\nContent-Type: text/plain; version=0.0.4\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
}
