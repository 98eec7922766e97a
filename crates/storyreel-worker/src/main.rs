//! StoryReel command-line binary.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use storyreel_client::{GeminiClient, YouTubeClient};
use storyreel_worker::logging::init_tracing;
use storyreel_worker::metrics::init_metrics;
use storyreel_worker::{BatchOrchestrator, CliArgs, WorkerConfig};

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    dotenvy::dotenv().ok();
    init_tracing();

    let args = CliArgs::parse();

    if let Ok(addr) = std::env::var("METRICS_ADDR") {
        match addr.parse::<SocketAddr>() {
            Ok(addr) => match init_metrics(addr) {
                Ok(()) => info!("Metrics exporter listening on {}", addr),
                Err(e) => warn!("Failed to start metrics exporter: {}", e),
            },
            Err(e) => warn!("Invalid METRICS_ADDR {}: {}", addr, e),
        }
    }

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);
    let style = args.style.unwrap_or(config.image_style);

    let generator = match GeminiClient::from_env() {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create Gemini client: {}", e);
            std::process::exit(1);
        }
    };
    let source = match YouTubeClient::from_env() {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create YouTube client: {}", e);
            std::process::exit(1);
        }
    };

    let orchestrator = Arc::new(BatchOrchestrator::new(
        Arc::new(generator),
        Arc::new(source),
        config,
    ));

    // Print every event as a JSON line until the work below is finished
    let finished = CancellationToken::new();
    let mut events = orchestrator.subscribe();
    let printer_done = finished.clone();
    let printer = tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                event = events.next() => match event {
                    Some(event) => match serde_json::to_string(&event) {
                        Ok(line) => println!("{}", line),
                        Err(e) => warn!("Failed to serialize event: {}", e),
                    },
                    None => break,
                },
                _ = printer_done.cancelled() => break,
            }
        }
    });

    let signal_target = orchestrator.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal");
            signal_target.shutdown();
        }
    });

    let mut exit_code = 0;
    match orchestrator.run(&args.search_term()).await {
        Ok(summary) => {
            info!(
                items = summary.items.len(),
                scripted = summary.scripted,
                "Batch finished"
            );

            let mut handles = Vec::new();
            for item in orchestrator.board().snapshot().await {
                if args.images {
                    match orchestrator.generate_all_images(&item.id, style).await {
                        Ok(handle) => handles.push(handle),
                        Err(e) => warn!(item_id = %item.id, "Images skipped: {}", e),
                    }
                }
                if args.audio {
                    match orchestrator.generate_audio(&item.id).await {
                        Ok(handle) => handles.push(handle),
                        Err(e) => warn!(item_id = %item.id, "Audio skipped: {}", e),
                    }
                }
            }

            for handle in handles {
                let job_id = handle.id().clone();
                let status = handle.wait().await;
                info!(job_id = %job_id, %status, "Job finished");
            }
        }
        Err(e) => {
            error!("Batch failed: {}", e);
            exit_code = 1;
        }
    }

    finished.cancel();
    printer.await.ok();

    info!("StoryReel run complete");
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}
