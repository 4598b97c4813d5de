use crate::config::Config;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

const WORKSPACE_DIRS: &[&str] = &[
    "jobs",
    "voices",
    "store/drafts",
    "store/videos",
];

pub async fn ensure_workspace(root: &Path) -> Result<()> {
    for dir in WORKSPACE_DIRS {
        let path = root.join(dir);
        if !path.exists() {
            fs::create_dir_all(&path)
                .await
                .with_context(|| format!("create workspace dir: {}", path.display()))?;
            info!("Created directory: {}", path.display());
        }
    }
    Ok(())
}

pub async fn check_ffmpeg() -> bool {
    match tokio::process::Command::new("ffmpeg")
        .arg("-version")
        .output()
        .await
    {
        Ok(output) => output.status.success(),
        Err(_) => false,
    }
}

pub async fn check_espeak() -> bool {
    match tokio::process::Command::new("espeak")
        .arg("--version")
        .output()
        .await
    {
        Ok(output) => output.status.success(),
        Err(_) => false,
    }
}

pub async fn check_festival() -> bool {
    match tokio::process::Command::new("festival")
        .arg("--version")
        .output()
        .await
    {
        Ok(output) => output.status.success(),
        Err(_) => false,
    }
}

/// Which capabilities are backed by a real model versus a fallback. Probed
/// once at initialization and read-only afterwards; re-running `probe` is the
/// only way to change it.
#[derive(Debug, Clone, Serialize)]
pub struct CapabilityStatus {
    pub remote_text: bool,
    pub remote_image: bool,
    pub remote_tts: bool,
    pub voice_cloning: bool,
    pub local_tts: bool,
    pub local_festival: bool,
    pub translation: bool,
    pub asr: bool,
}

impl CapabilityStatus {
    pub async fn probe(config: &Config) -> Self {
        let has_openai = !config.openai_key.is_empty();
        let has_eleven = !config.elevenlabs_key.is_empty();
        Self {
            remote_text: has_openai,
            remote_image: has_openai,
            remote_tts: has_eleven,
            voice_cloning: has_eleven,
            local_tts: check_espeak().await,
            local_festival: check_festival().await,
            // No translation or speech-recognition model is wired; these
            // stay on their marked fallbacks.
            translation: false,
            asr: false,
        }
    }

    /// Everything on fallbacks. Used for forced-offline runs and tests.
    pub fn offline() -> Self {
        Self {
            remote_text: false,
            remote_image: false,
            remote_tts: false,
            voice_cloning: false,
            local_tts: false,
            local_festival: false,
            translation: false,
            asr: false,
        }
    }
}

/// The explicitly constructed context passed down the pipeline: one HTTP
/// client, credentials, probed capability status and the workspace root.
#[derive(Debug, Clone)]
pub struct Services {
    pub client: reqwest::Client,
    pub config: Config,
    pub status: CapabilityStatus,
    pub workspace: PathBuf,
}

impl Services {
    pub async fn init(config: Config, workspace: PathBuf) -> Result<Self> {
        ensure_workspace(&workspace).await?;
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .context("Failed to build HTTP client")?;
        let status = CapabilityStatus::probe(&config).await;
        info!(
            "Capabilities: text={} image={} tts={} clone={} espeak={}",
            status.remote_text,
            status.remote_image,
            status.remote_tts,
            status.voice_cloning,
            status.local_tts
        );
        Ok(Self {
            client,
            config,
            status,
            workspace,
        })
    }

    /// A context with every remote capability disabled. Never touches the
    /// network or the workspace.
    pub fn offline(workspace: PathBuf) -> Self {
        Self {
            client: reqwest::Client::new(),
            config: Config::default(),
            status: CapabilityStatus::offline(),
            workspace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn probe_without_keys_disables_remote() {
        let status = CapabilityStatus::probe(&Config::default()).await;
        assert!(!status.remote_text);
        assert!(!status.remote_image);
        assert!(!status.remote_tts);
        assert!(!status.voice_cloning);
        assert!(!status.translation);
        assert!(!status.asr);
    }

    #[tokio::test]
    async fn workspace_dirs_are_created() {
        let tmp = tempfile::tempdir().unwrap();
        ensure_workspace(tmp.path()).await.unwrap();
        assert!(tmp.path().join("jobs").is_dir());
        assert!(tmp.path().join("voices").is_dir());
        assert!(tmp.path().join("store/drafts").is_dir());
        assert!(tmp.path().join("store/videos").is_dir());
    }
}
