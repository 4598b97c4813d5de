use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

/// API credentials. Every key is optional: a missing key marks the matching
/// remote capability unavailable instead of failing startup, so the whole
/// pipeline can run offline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "openai_api_key")]
    #[serde(default)]
    pub openai_key: String,
    #[serde(rename = "elevenlabs_api_key")]
    #[serde(default)]
    pub elevenlabs_key: String,
    #[serde(rename = "eleven_voice_id")]
    #[serde(default = "default_voice_id")]
    pub eleven_voice_id: String,
    #[serde(rename = "eleven_model_id")]
    #[serde(default = "default_model_id")]
    pub eleven_model_id: String,
}

fn default_voice_id() -> String {
    "JBFqnCBsd6RMkjVDRZzb".to_string()
}

fn default_model_id() -> String {
    "eleven_multilingual_v2".to_string()
}

impl Config {
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read config: {}", path.as_ref().display()))?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }
}

/// Per-job generation options, with the documented defaults applied for any
/// field the caller omits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOptions {
    #[serde(default = "default_style")]
    pub style: String,
    #[serde(default = "default_duration_per_scene")]
    pub duration_per_scene: f64,
    #[serde(default = "default_resolution")]
    pub resolution: String,
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_voice")]
    pub voice: String,
    #[serde(default = "default_true")]
    pub include_subtitles: bool,
    #[serde(default)]
    pub background_music: bool,
}

fn default_style() -> String {
    "realistic".to_string()
}

fn default_duration_per_scene() -> f64 {
    3.0
}

fn default_resolution() -> String {
    "1280x720".to_string()
}

fn default_fps() -> u32 {
    30
}

fn default_voice() -> String {
    "default".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            style: default_style(),
            duration_per_scene: default_duration_per_scene(),
            resolution: default_resolution(),
            fps: default_fps(),
            voice: default_voice(),
            include_subtitles: true,
            background_music: false,
        }
    }
}

impl JobOptions {
    /// Parsed `WxH` target dimensions. Unparseable strings fall back to the
    /// default 1280x720 rather than failing the job.
    pub fn dimensions(&self) -> (u32, u32) {
        let mut parts = self.resolution.split('x');
        let w = parts.next().and_then(|v| v.parse::<u32>().ok());
        let h = parts.next().and_then(|v| v.parse::<u32>().ok());
        match (w, h) {
            (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
            _ => (1280, 720),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_defaults_from_empty_json() {
        let opts: JobOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(opts.style, "realistic");
        assert_eq!(opts.duration_per_scene, 3.0);
        assert_eq!(opts.resolution, "1280x720");
        assert_eq!(opts.fps, 30);
        assert_eq!(opts.voice, "default");
        assert!(opts.include_subtitles);
        assert!(!opts.background_music);
    }

    #[test]
    fn dimensions_parse_and_fall_back() {
        let mut opts = JobOptions::default();
        assert_eq!(opts.dimensions(), (1280, 720));
        opts.resolution = "1080x1920".to_string();
        assert_eq!(opts.dimensions(), (1080, 1920));
        opts.resolution = "garbage".to_string();
        assert_eq!(opts.dimensions(), (1280, 720));
    }

    #[test]
    fn config_tolerates_missing_keys() {
        let cfg: Config = serde_json::from_str("{}").unwrap();
        assert!(cfg.openai_key.is_empty());
        assert_eq!(cfg.eleven_model_id, "eleven_multilingual_v2");
    }
}
