pub mod api;
pub mod artifact;
pub mod config;
pub mod error;
pub mod ffmpeg;
pub mod generator;
pub mod init;
pub mod lang;
pub mod scene;
pub mod speech;
pub mod srt;
pub mod store;
pub mod visual;
pub mod voice;

pub use artifact::{Artifact, ArtifactKind, JobOutcome, JobStatus, Provenance, SceneDiagnostic};
pub use config::{Config, JobOptions};
pub use error::{JobError, ProviderError};
pub use generator::{run_job, run_kind, JobKind, Platform};
pub use init::{CapabilityStatus, Services};
