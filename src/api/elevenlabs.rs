use crate::config::Config;
use crate::error::ProviderError;
use reqwest::Client;
use std::path::Path;
use tokio::fs;
use tracing::warn;

/// Synthesize speech with a remote voice and write the mp3 to disk. Errors
/// feed the caller's cascade; nothing here is fatal to a job.
pub async fn tts_to_mp3(
    client: &Client,
    cfg: &Config,
    text: &str,
    voice_id: &str,
    out_mp3_path: &Path,
) -> Result<(), ProviderError> {
    let url = format!(
        "https://api.elevenlabs.io/v1/text-to-speech/{}?output_format=mp3_44100_128",
        voice_id
    );

    let body = serde_json::json!({
        "text": text,
        "model_id": cfg.eleven_model_id,
    });

    let resp = client
        .post(url)
        .header("Content-Type", "application/json")
        .header("xi-api-key", &cfg.elevenlabs_key)
        .json(&body)
        .timeout(std::time::Duration::from_secs(300))
        .send()
        .await?;

    if !resp.status().is_success() {
        warn!("ElevenLabs TTS failed HTTP {}", resp.status().as_u16());
        return Err(ProviderError::Http(resp.status().as_u16()));
    }

    let bytes = resp.bytes().await?;
    if bytes.is_empty() {
        return Err(ProviderError::Malformed("empty audio body".to_string()));
    }

    if let Some(parent) = out_mp3_path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| ProviderError::Engine(e.to_string()))?;
    }
    fs::write(out_mp3_path, &bytes)
        .await
        .map_err(|e| ProviderError::Engine(e.to_string()))?;

    Ok(())
}

/// Clone a voice from an uploaded sample. Returns the provider-owned
/// voice id.
pub async fn clone_voice(
    client: &Client,
    cfg: &Config,
    name: &str,
    sample_path: &Path,
) -> Result<String, ProviderError> {
    let sample = fs::read(sample_path)
        .await
        .map_err(|e| ProviderError::Engine(e.to_string()))?;
    let file_name = sample_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "sample.wav".to_string());

    let form = reqwest::multipart::Form::new()
        .text("name", name.to_string())
        .text("description", "Cloned voice from user sample".to_string())
        .part(
            "files",
            reqwest::multipart::Part::bytes(sample).file_name(file_name),
        );

    let resp = client
        .post("https://api.elevenlabs.io/v1/voices/add")
        .header("xi-api-key", &cfg.elevenlabs_key)
        .multipart(form)
        .timeout(std::time::Duration::from_secs(300))
        .send()
        .await?;

    if !resp.status().is_success() {
        warn!("ElevenLabs clone failed HTTP {}", resp.status().as_u16());
        return Err(ProviderError::Http(resp.status().as_u16()));
    }

    let root: serde_json::Value = resp
        .json()
        .await
        .map_err(|e| ProviderError::Malformed(e.to_string()))?;
    root.get("voice_id")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| ProviderError::Malformed("no voice_id in response".to_string()))
}
