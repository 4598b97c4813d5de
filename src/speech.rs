//! Speech synthesis cascade: remote provider -> local OS engine -> synthetic
//! tone voice. The last stage is a deterministic function of the input text,
//! so some audio always exists for any script in any writing system.

use crate::api::elevenlabs;
use crate::artifact::{Artifact, ArtifactKind, Provenance};
use crate::error::ProviderError;
use crate::init::Services;
use crate::voice::VoiceIdentity;
use anyhow::{Context, Result};
use async_trait::async_trait;
use hound::{SampleFormat, WavSpec, WavWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const SAMPLE_RATE: u32 = 22_050;
const BASE_FREQ: f64 = 180.0;
const CHAR_SECONDS: f64 = 0.15;
const GAP_SECONDS: f64 = 0.1;
const AMPLITUDE: f64 = 0.3;

const CONSONANTS_START: u32 = 0x0F40;
const CONSONANTS_END: u32 = 0x0F6C;
const SCRIPT_BLOCK_START: u32 = 0x0F00;
const SCRIPT_BLOCK_END: u32 = 0x0FFF;

#[async_trait]
trait SpeechBackend: Send + Sync {
    fn label(&self) -> &'static str;
    fn provenance(&self) -> Provenance;
    fn extension(&self) -> &'static str;
    async fn synth(
        &self,
        svc: &Services,
        text: &str,
        voice: &VoiceIdentity,
        out: &Path,
    ) -> Result<(), ProviderError>;
}

struct RemoteTts;

#[async_trait]
impl SpeechBackend for RemoteTts {
    fn label(&self) -> &'static str {
        "remote"
    }
    fn provenance(&self) -> Provenance {
        Provenance::Remote
    }
    fn extension(&self) -> &'static str {
        "mp3"
    }
    async fn synth(
        &self,
        svc: &Services,
        text: &str,
        voice: &VoiceIdentity,
        out: &Path,
    ) -> Result<(), ProviderError> {
        elevenlabs::tts_to_mp3(&svc.client, &svc.config, text, &voice.voice_id, out).await
    }
}

struct EspeakTts;

fn espeak_voice(voice_id: &str) -> &'static str {
    match voice_id {
        "male" => "en+m3",
        "female" => "en+f3",
        "child" => "en+f4",
        _ => "en",
    }
}

#[async_trait]
impl SpeechBackend for EspeakTts {
    fn label(&self) -> &'static str {
        "espeak"
    }
    fn provenance(&self) -> Provenance {
        Provenance::Fallback
    }
    fn extension(&self) -> &'static str {
        "wav"
    }
    async fn synth(
        &self,
        _svc: &Services,
        text: &str,
        voice: &VoiceIdentity,
        out: &Path,
    ) -> Result<(), ProviderError> {
        let output = tokio::process::Command::new("espeak")
            .args(["-v", espeak_voice(&voice.voice_id), "-s", "150", "-p", "50", "-w"])
            .arg(out)
            .arg(text)
            .output()
            .await
            .map_err(|e| ProviderError::Engine(e.to_string()))?;

        if !output.status.success() {
            return Err(ProviderError::Engine(format!(
                "espeak exited with {}",
                output.status
            )));
        }
        if !out.exists() {
            return Err(ProviderError::Engine("espeak wrote no file".to_string()));
        }
        Ok(())
    }
}

struct FestivalTts;

/// The SayText argument is a Scheme string literal; quotes and backslashes
/// in narration text would terminate it early.
fn festival_escape(text: &str) -> String {
    text.replace('\\', " ").replace('"', " ")
}

#[async_trait]
impl SpeechBackend for FestivalTts {
    fn label(&self) -> &'static str {
        "festival"
    }
    fn provenance(&self) -> Provenance {
        Provenance::Fallback
    }
    fn extension(&self) -> &'static str {
        "wav"
    }
    async fn synth(
        &self,
        _svc: &Services,
        text: &str,
        _voice: &VoiceIdentity,
        out: &Path,
    ) -> Result<(), ProviderError> {
        let script = format!(
            "(voice_kal_diphone)\n(utt.save.wave (SayText \"{}\") \"{}\" 'wav)\n",
            festival_escape(text),
            out.display()
        );
        let script_path = out.with_extension("scm");
        tokio::fs::write(&script_path, script)
            .await
            .map_err(|e| ProviderError::Engine(e.to_string()))?;

        let output = tokio::process::Command::new("festival")
            .arg("-b")
            .arg(&script_path)
            .output()
            .await
            .map_err(|e| ProviderError::Engine(e.to_string()))?;

        if !output.status.success() {
            return Err(ProviderError::Engine(format!(
                "festival exited with {}",
                output.status
            )));
        }
        if !out.exists() {
            return Err(ProviderError::Engine("festival wrote no file".to_string()));
        }
        Ok(())
    }
}

struct ToneTts;

#[async_trait]
impl SpeechBackend for ToneTts {
    fn label(&self) -> &'static str {
        "synthetic"
    }
    fn provenance(&self) -> Provenance {
        Provenance::Synthetic
    }
    fn extension(&self) -> &'static str {
        "wav"
    }
    async fn synth(
        &self,
        _svc: &Services,
        text: &str,
        _voice: &VoiceIdentity,
        out: &Path,
    ) -> Result<(), ProviderError> {
        write_tone_wav(text, out).map_err(|e| ProviderError::Engine(e.to_string()))
    }
}

fn backends(svc: &Services, voice: &VoiceIdentity) -> Vec<Box<dyn SpeechBackend>> {
    let mut chain: Vec<Box<dyn SpeechBackend>> = Vec::new();
    if voice.provenance.is_remote() && svc.status.remote_tts {
        chain.push(Box::new(RemoteTts));
    }
    if svc.status.local_tts {
        chain.push(Box::new(EspeakTts));
    }
    if svc.status.local_festival {
        chain.push(Box::new(FestivalTts));
    }
    chain.push(Box::new(ToneTts));
    chain
}

/// Synthesize narration for one scene. Tries each eligible backend in order;
/// the synthetic tone voice closes the cascade, so provider outages are never
/// surfaced. Only a local write failure on the final stage is an error.
pub async fn synthesize(
    svc: &Services,
    text: &str,
    voice: &VoiceIdentity,
    scene_dir: &Path,
    scene_index: usize,
) -> Result<Artifact> {
    let mut last_err = None;
    for backend in backends(svc, voice) {
        let out: PathBuf = scene_dir.join(format!("audio_{}.{}", scene_index, backend.extension()));
        match backend.synth(svc, text, voice, &out).await {
            Ok(()) => {
                debug!("Speech backend {} produced {}", backend.label(), out.display());
                return Ok(Artifact {
                    path: out,
                    scene_index,
                    kind: ArtifactKind::Audio,
                    provenance: backend.provenance(),
                });
            }
            Err(err) => {
                warn!(
                    "Speech backend {} failed for scene {}: {err}",
                    backend.label(),
                    scene_index
                );
                last_err = Some(err);
            }
        }
    }

    // Only reachable when the tone synthesizer itself could not write.
    Err(anyhow::anyhow!(
        "all speech backends failed: {}",
        last_err.map(|e| e.to_string()).unwrap_or_default()
    ))
    .context("speech synthesis")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Band {
    Low,
    Mid,
    High,
}

/// Frequency band for one character. The consonant subrange is checked
/// before the full block so all three bands are reachable.
pub(crate) fn tone_frequency(ch: char) -> (f64, Band) {
    let code = ch as u32;
    if (CONSONANTS_START..=CONSONANTS_END).contains(&code) {
        (BASE_FREQ + (code % 50) as f64 + 25.0, Band::Mid)
    } else if (SCRIPT_BLOCK_START..=SCRIPT_BLOCK_END).contains(&code) {
        (BASE_FREQ + (code % 100) as f64 + 50.0, Band::High)
    } else {
        (BASE_FREQ + (code % 30) as f64, Band::Low)
    }
}

/// Render text as a tone sequence: one tone per non-whitespace character
/// (frequency from its code point, three harmonics, exponential decay), a
/// short silence per whitespace character. Deterministic for a given text.
pub fn write_tone_wav(text: &str, out: &Path) -> Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create audio dir: {}", parent.display()))?;
    }
    let mut writer = WavWriter::create(out, spec)
        .with_context(|| format!("create wav: {}", out.display()))?;

    let char_samples = (SAMPLE_RATE as f64 * CHAR_SECONDS) as u32;
    let gap_samples = (SAMPLE_RATE as f64 * GAP_SECONDS) as u32;
    let mut wrote_any = false;

    for ch in text.chars() {
        if ch.is_whitespace() {
            for _ in 0..gap_samples {
                writer.write_sample(0i16)?;
            }
            wrote_any = true;
            continue;
        }

        let (freq, band) = tone_frequency(ch);
        let decay = if band == Band::High { 3.0 } else { 2.0 };
        for j in 0..char_samples {
            let t = j as f64 / SAMPLE_RATE as f64;
            let mut value = 0.0;
            value += 0.6 * (2.0 * std::f64::consts::PI * freq * t).sin();
            value += 0.2 * (2.0 * std::f64::consts::PI * freq * 2.0 * t).sin();
            value += 0.1 * (2.0 * std::f64::consts::PI * freq * 3.0 * t).sin();
            value *= (-t * decay).exp() * AMPLITUDE;
            writer.write_sample((value * 32767.0) as i16)?;
        }
        wrote_any = true;
    }

    // Empty input still yields a readable clip: one silence gap.
    if !wrote_any {
        for _ in 0..gap_samples {
            writer.write_sample(0i16)?;
        }
    }

    writer.finalize().context("finalize wav")?;
    Ok(())
}
