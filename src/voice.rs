//! Voice identities and cloning. A voice id always routes text-to-speech to
//! the provider that owns its provenance; fallback ids are derived with a
//! stable, documented hash so the same sample and name reproduce the same id
//! across processes.

use crate::api::elevenlabs;
use crate::init::Services;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::fs;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VoiceProvenance {
    RemoteCloned,
    RemotePreset,
    FallbackSynthetic,
}

impl VoiceProvenance {
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::RemoteCloned | Self::RemotePreset)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceIdentity {
    pub voice_id: String,
    pub provenance: VoiceProvenance,
}

/// Minimal provenance record persisted for fallback voices so a later
/// lookup can still tell where an id came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceMetadata {
    pub voice_id: String,
    pub voice_name: String,
    pub sample_path: String,
    pub service: String,
    pub created_at: DateTime<Utc>,
}

const FALLBACK_PREFIX: &str = "fallback-";

/// Stable fallback id: `fallback-` plus the first 16 hex chars of
/// SHA-256(sample_path, '\n', name).
pub fn fallback_voice_id(sample_path: &Path, name: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(sample_path.to_string_lossy().as_bytes());
    hasher.update(b"\n");
    hasher.update(name.as_bytes());
    let digest = hasher.finalize();
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    format!("{}{}", FALLBACK_PREFIX, &hex[..16])
}

/// Map the voice named in job options to a routable identity. Unknown names
/// pass through as remote presets when a remote provider is configured.
pub fn resolve_voice(svc: &Services, name: &str) -> VoiceIdentity {
    if name.starts_with(FALLBACK_PREFIX) {
        return VoiceIdentity {
            voice_id: name.to_string(),
            provenance: VoiceProvenance::FallbackSynthetic,
        };
    }

    if svc.status.remote_tts {
        let voice_id = if name == "default" {
            svc.config.eleven_voice_id.clone()
        } else {
            name.to_string()
        };
        return VoiceIdentity {
            voice_id,
            provenance: VoiceProvenance::RemotePreset,
        };
    }

    VoiceIdentity {
        voice_id: name.to_string(),
        provenance: VoiceProvenance::FallbackSynthetic,
    }
}

/// Clone a voice from an audio sample. Remote cloning is attempted first;
/// any failure degrades to a deterministic fallback identity whose metadata
/// is persisted under the workspace for later lookup.
pub async fn clone_voice(svc: &Services, sample_path: &Path, name: &str) -> Result<VoiceIdentity> {
    if svc.status.voice_cloning {
        match elevenlabs::clone_voice(&svc.client, &svc.config, name, sample_path).await {
            Ok(voice_id) => {
                info!("Cloned voice {name} -> {voice_id}");
                return Ok(VoiceIdentity {
                    voice_id,
                    provenance: VoiceProvenance::RemoteCloned,
                });
            }
            Err(err) => {
                warn!("Remote voice cloning failed ({err}); using fallback identity");
            }
        }
    }

    let voice_id = fallback_voice_id(sample_path, name);
    let meta = VoiceMetadata {
        voice_id: voice_id.clone(),
        voice_name: name.to_string(),
        sample_path: sample_path.to_string_lossy().into_owned(),
        service: "fallback".to_string(),
        created_at: Utc::now(),
    };

    let dir = svc.workspace.join("voices");
    fs::create_dir_all(&dir)
        .await
        .with_context(|| format!("create voices dir: {}", dir.display()))?;
    let meta_path = dir.join(format!("{voice_id}.json"));
    fs::write(&meta_path, serde_json::to_vec_pretty(&meta)?)
        .await
        .with_context(|| format!("write voice metadata: {}", meta_path.display()))?;

    Ok(VoiceIdentity {
        voice_id,
        provenance: VoiceProvenance::FallbackSynthetic,
    })
}

/// Look up persisted metadata for a fallback voice id.
pub async fn lookup(svc: &Services, voice_id: &str) -> Option<VoiceMetadata> {
    let path = svc.workspace.join("voices").join(format!("{voice_id}.json"));
    let raw = fs::read_to_string(&path).await.ok()?;
    serde_json::from_str(&raw).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::init::Services;
    use std::path::PathBuf;

    #[test]
    fn fallback_id_is_stable_and_input_sensitive() {
        let a = fallback_voice_id(Path::new("/tmp/sample.wav"), "narrator");
        let b = fallback_voice_id(Path::new("/tmp/sample.wav"), "narrator");
        let c = fallback_voice_id(Path::new("/tmp/sample.wav"), "other");
        let d = fallback_voice_id(Path::new("/tmp/other.wav"), "narrator");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert!(a.starts_with("fallback-"));
        assert_eq!(a.len(), "fallback-".len() + 16);
    }

    #[test]
    fn resolve_routes_fallback_ids_locally() {
        let svc = Services::offline(PathBuf::from("/tmp"));
        let v = resolve_voice(&svc, "fallback-0011223344556677");
        assert_eq!(v.provenance, VoiceProvenance::FallbackSynthetic);
        assert!(!v.provenance.is_remote());
    }

    #[test]
    fn resolve_without_remote_tts_is_synthetic() {
        let svc = Services::offline(PathBuf::from("/tmp"));
        let v = resolve_voice(&svc, "default");
        assert_eq!(v.provenance, VoiceProvenance::FallbackSynthetic);
        assert_eq!(v.voice_id, "default");
    }

    #[tokio::test]
    async fn clone_persists_lookup_metadata_offline() {
        let tmp = tempfile::tempdir().unwrap();
        let svc = Services::offline(tmp.path().to_path_buf());

        let sample = tmp.path().join("sample.wav");
        tokio::fs::write(&sample, b"fake").await.unwrap();

        let identity = clone_voice(&svc, &sample, "narrator").await.unwrap();
        assert_eq!(identity.provenance, VoiceProvenance::FallbackSynthetic);

        let meta = lookup(&svc, &identity.voice_id).await.unwrap();
        assert_eq!(meta.voice_name, "narrator");
        assert_eq!(meta.service, "fallback");
        assert_eq!(meta.voice_id, identity.voice_id);
    }
}
