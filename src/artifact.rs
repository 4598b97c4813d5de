use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which strategy in a cascade produced an artifact. Anything other than
/// `Remote` marks the owning scene as degraded in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    Remote,
    Fallback,
    Synthetic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    Visual,
    Audio,
}

/// A file-backed generation result tagged with its owning scene. After any
/// capability call returns, the file at `path` exists and is readable.
#[derive(Debug, Clone, Serialize)]
pub struct Artifact {
    pub path: PathBuf,
    pub scene_index: usize,
    pub kind: ArtifactKind,
    pub provenance: Provenance,
}

/// What happened to one scene during generation.
#[derive(Debug, Clone, Serialize)]
pub struct SceneDiagnostic {
    pub index: usize,
    pub visual: Provenance,
    pub audio: Provenance,
    pub subtitled: bool,
}

impl SceneDiagnostic {
    pub fn degraded(&self, subtitles_requested: bool) -> bool {
        self.visual != Provenance::Remote
            || self.audio != Provenance::Remote
            || (subtitles_requested && !self.subtitled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobStatus {
    Completed,
    Degraded,
    Failed,
}

/// The upstream-facing result of a job. `job_dir` is the job-scoped temp
/// directory; cleanup is owned by the caller.
#[derive(Debug, Serialize)]
pub struct JobOutcome {
    pub job_id: String,
    pub status: JobStatus,
    pub video: Option<PathBuf>,
    pub failure: Option<String>,
    pub diagnostics: Vec<SceneDiagnostic>,
    pub job_dir: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_only_scene_is_not_degraded() {
        let diag = SceneDiagnostic {
            index: 0,
            visual: Provenance::Remote,
            audio: Provenance::Remote,
            subtitled: true,
        };
        assert!(!diag.degraded(true));
    }

    #[test]
    fn synthetic_audio_marks_scene_degraded() {
        let diag = SceneDiagnostic {
            index: 2,
            visual: Provenance::Remote,
            audio: Provenance::Synthetic,
            subtitled: true,
        };
        assert!(diag.degraded(false));
    }

    #[test]
    fn missing_requested_subtitles_marks_scene_degraded() {
        let diag = SceneDiagnostic {
            index: 1,
            visual: Provenance::Remote,
            audio: Provenance::Remote,
            subtitled: false,
        };
        assert!(diag.degraded(true));
        assert!(!diag.degraded(false));
    }
}
