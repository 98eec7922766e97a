use storyreel_client::{GeminiConfig, YouTubeConfig};
use storyreel_media::{wrap_pcm, WavFormat, WAV_HEADER_LEN};
use storyreel_worker::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = WorkerConfig::from_env();

    println!(
        "storyreel-selfcheck: starting with scene_count={} style={}",
        config.scene_count, config.image_style
    );
    ensure_env_present(&["GEMINI_API_KEY", "YOUTUBE_API_KEY"])?;
    ensure_client_config()?;
    ensure_wav_packaging()?;

    println!("storyreel-selfcheck: ok");
    Ok(())
}

fn ensure_client_config() -> anyhow::Result<()> {
    let gemini = GeminiConfig::from_env()?;
    let youtube = YouTubeConfig::from_env()?;
    println!(
        "storyreel-selfcheck: gemini={} youtube={}",
        gemini.base_url, youtube.base_url
    );
    Ok(())
}

fn ensure_wav_packaging() -> anyhow::Result<()> {
    let wav = wrap_pcm(&[0u8; 4], WavFormat::default())?;
    if wav.len() != WAV_HEADER_LEN + 4 {
        return Err(anyhow::anyhow!("unexpected WAV length {}", wav.len()));
    }
    Ok(())
}

fn ensure_env_present(vars: &[&str]) -> anyhow::Result<()> {
    for var in vars {
        if std::env::var(var).is_err() {
            return Err(anyhow::anyhow!("missing required env var {}", var));
        }
    }
    Ok(())
}
