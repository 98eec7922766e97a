//! Smoke test against the real providers.

use std::sync::Arc;

use storyreel_client::{GeminiClient, YouTubeClient};
use storyreel_worker::{BatchOrchestrator, WorkerConfig};

/// Run one full batch with live API keys.
#[tokio::test]
#[ignore = "requires GEMINI_API_KEY and YOUTUBE_API_KEY"]
async fn test_live_batch() {
    let _ = rustls::crypto::ring::default_provider().install_default();
    dotenvy::dotenv().ok();

    let generator = GeminiClient::from_env().expect("Failed to create Gemini client");
    let source = YouTubeClient::from_env().expect("Failed to create YouTube client");
    let orchestrator = BatchOrchestrator::new(
        Arc::new(generator),
        Arc::new(source),
        WorkerConfig::from_env(),
    );

    let summary = orchestrator.run("뉴스").await.expect("Batch failed");
    println!("Selected: {:?}", summary.items);

    assert_eq!(summary.items.len(), 4);
    for item in orchestrator.board().snapshot().await {
        assert!(item.is_scripted());
        println!("{}: {}", item.title, item.analysis_display());
    }
}
