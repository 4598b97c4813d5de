//! Job orchestration: segment the script, generate per-scene artifacts, mux
//! scene segments and concatenate them into the final video. Provider and
//! muxer failures degrade in place; the only fatal conditions are an empty
//! script and zero produced segments.

use crate::artifact::{Artifact, JobOutcome, JobStatus, SceneDiagnostic};
use crate::config::JobOptions;
use crate::error::JobError;
use crate::ffmpeg;
use crate::init::Services;
use crate::scene::{self, Scene};
use crate::speech;
use crate::srt;
use crate::visual;
use crate::voice::{self, VoiceIdentity};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Instagram,
    Youtube,
    Tiktok,
    Linkedin,
}

/// Job variants are parameterizations of the one pipeline, not separate
/// code paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Scripted,
    Avatar,
    Slideshow,
    Explainer,
    Montage,
    Social(Platform),
}

impl JobKind {
    pub fn options(&self) -> JobOptions {
        let mut opts = JobOptions::default();
        match self {
            JobKind::Scripted => {}
            JobKind::Avatar => {
                opts.style = crate::visual::AVATAR_STYLE.to_string();
            }
            JobKind::Slideshow => {
                opts.style = "minimalist".to_string();
                opts.duration_per_scene = 4.0;
                opts.include_subtitles = false;
            }
            JobKind::Explainer => {
                opts.style = "minimalist".to_string();
                opts.duration_per_scene = 5.0;
            }
            JobKind::Montage => {
                opts.style = "dynamic".to_string();
                opts.duration_per_scene = 2.0;
                opts.background_music = true;
            }
            JobKind::Social(platform) => match platform {
                Platform::Instagram => {
                    opts.resolution = "1080x1920".to_string();
                    opts.duration_per_scene = 30.0;
                    opts.style = "trendy".to_string();
                }
                Platform::Youtube => {
                    opts.resolution = "1920x1080".to_string();
                    opts.duration_per_scene = 60.0;
                    opts.style = "professional".to_string();
                }
                Platform::Tiktok => {
                    opts.resolution = "1080x1920".to_string();
                    opts.duration_per_scene = 15.0;
                    opts.style = "dynamic".to_string();
                }
                Platform::Linkedin => {
                    opts.resolution = "1920x1080".to_string();
                    opts.duration_per_scene = 45.0;
                    opts.style = "corporate".to_string();
                }
            },
        }
        opts
    }
}

struct SceneResult {
    diagnostic: SceneDiagnostic,
    segment: Option<PathBuf>,
}

async fn generate_scene(
    svc: &Services,
    scene: &Scene,
    voice: &VoiceIdentity,
    options: &JobOptions,
    job_dir: &Path,
) -> Result<SceneResult> {
    let scene_dir = job_dir.join(format!("scene_{}", scene.index));
    fs::create_dir_all(&scene_dir)
        .await
        .with_context(|| format!("create scene dir: {}", scene_dir.display()))?;

    let image: Artifact =
        visual::generate(svc, &scene.visual_description, &options.style, &scene_dir, scene.index)
            .await?;
    let audio: Artifact = speech::synthesize(svc, &scene.text, voice, &scene_dir, scene.index).await?;

    let (width, height) = options.dimensions();
    let segment_path = scene_dir.join(format!("segment_{}.mp4", scene.index));
    let segment = match ffmpeg::make_segment(
        &image.path,
        &audio.path,
        width,
        height,
        options.fps,
        &segment_path,
    )
    .await
    {
        Ok(true) => Some(segment_path),
        Ok(false) => {
            warn!("Segment mux produced no file for scene {}", scene.index);
            None
        }
        Err(err) => {
            warn!("Segment mux failed for scene {}: {err}", scene.index);
            None
        }
    };

    // Subtitle burn only makes sense on an existing segment. One cue spans
    // the whole clip; duration comes from the probe with the configured
    // per-scene length as the fallback.
    let mut subtitled = false;
    let segment = match (segment, options.include_subtitles) {
        (Some(seg), true) => {
            let duration = ffmpeg::probe_duration_seconds(&seg)
                .await
                .unwrap_or(options.duration_per_scene);
            let srt_path = scene_dir.join(format!("scene_{}.srt", scene.index));
            let burned = scene_dir.join(format!("segment_{}_sub.mp4", scene.index));
            match srt::write_single_cue(&srt_path, &scene.text, duration) {
                Ok(()) => match ffmpeg::burn_subtitles(&seg, &srt_path, &burned).await {
                    Ok(true) => {
                        subtitled = true;
                        Some(burned)
                    }
                    _ => Some(seg),
                },
                Err(err) => {
                    warn!("Subtitle write failed for scene {}: {err}", scene.index);
                    Some(seg)
                }
            }
        }
        (seg, _) => seg,
    };

    Ok(SceneResult {
        diagnostic: SceneDiagnostic {
            index: scene.index,
            visual: image.provenance,
            audio: audio.provenance,
            subtitled,
        },
        segment,
    })
}

/// Concatenate segments into the final video. A single segment is copied;
/// a failed concat degrades to the first segment.
async fn assemble(segments: &[PathBuf], job_dir: &Path) -> Result<(PathBuf, bool)> {
    let final_path = job_dir.join("final.mp4");

    if segments.len() == 1 {
        fs::copy(&segments[0], &final_path)
            .await
            .with_context(|| format!("copy single segment: {}", segments[0].display()))?;
        return Ok((final_path, false));
    }

    let list_path = job_dir.join("segments.txt");
    let mut list = String::new();
    for seg in segments {
        // The concat demuxer needs absolute paths with -safe 0.
        list.push_str(&format!("file '{}'\n", seg.display()));
    }
    fs::write(&list_path, list)
        .await
        .with_context(|| format!("write concat list: {}", list_path.display()))?;

    match ffmpeg::concat_segments(&list_path, &final_path).await {
        Ok(true) => Ok((final_path, false)),
        other => {
            if let Err(err) = other {
                warn!("Concat failed ({err}); degrading to first segment");
            } else {
                warn!("Concat produced no file; degrading to first segment");
            }
            fs::copy(&segments[0], &final_path)
                .await
                .with_context(|| format!("copy first segment: {}", segments[0].display()))?;
            Ok((final_path, true))
        }
    }
}

async fn mix_background_music(video: &Path, job_dir: &Path) -> Option<PathBuf> {
    let duration = match ffmpeg::probe_duration_seconds(video).await {
        Ok(d) => d,
        Err(err) => {
            warn!("Music mix skipped; duration probe failed: {err}");
            return None;
        }
    };
    let bed = job_dir.join("music.wav");
    match ffmpeg::sine_bed(duration, &bed).await {
        Ok(true) => {}
        _ => {
            warn!("Music bed generation failed; keeping music-less video");
            return None;
        }
    }
    let mixed = job_dir.join("final_music.mp4");
    match ffmpeg::mix_music(video, &bed, &mixed).await {
        Ok(true) => Some(mixed),
        _ => {
            warn!("Music mix failed; keeping music-less video");
            None
        }
    }
}

/// Run one generation job end to end. Errors out only on an empty script;
/// every later failure is reflected in the returned outcome instead.
pub async fn run_job(svc: &Services, script: &str, options: &JobOptions) -> Result<JobOutcome> {
    if script.trim().is_empty() {
        return Err(JobError::EmptyScript.into());
    }

    let job_id = Uuid::new_v4().to_string();
    let job_dir = svc.workspace.join("jobs").join(&job_id);
    fs::create_dir_all(&job_dir)
        .await
        .with_context(|| format!("create job dir: {}", job_dir.display()))?;
    info!("Job {job_id}: created at {}", job_dir.display());

    let scenes = scene::segment(svc, script).await;
    info!("Job {job_id}: segmented into {} scenes", scenes.len());

    let voice = voice::resolve_voice(svc, &options.voice);

    let mut diagnostics = Vec::with_capacity(scenes.len());
    let mut segments = Vec::new();
    for scene in &scenes {
        info!("Job {job_id}: generating scene {}", scene.index);
        let result = generate_scene(svc, scene, &voice, options, &job_dir).await?;
        diagnostics.push(result.diagnostic);
        if let Some(seg) = result.segment {
            segments.push(seg);
        }
    }

    if segments.is_empty() {
        warn!("Job {job_id}: {}", JobError::NoSegments);
        return Ok(JobOutcome {
            job_id,
            status: JobStatus::Failed,
            video: None,
            failure: Some(JobError::NoSegments.to_string()),
            diagnostics,
            job_dir,
        });
    }

    info!("Job {job_id}: assembling {} segments", segments.len());
    let dropped = scenes.len() - segments.len();
    let (mut video, concat_degraded) = assemble(&segments, &job_dir).await?;

    let mut music_degraded = false;
    if options.background_music {
        match mix_background_music(&video, &job_dir).await {
            Some(mixed) => video = mixed,
            None => music_degraded = true,
        }
    }

    let scene_degraded = diagnostics
        .iter()
        .any(|d| d.degraded(options.include_subtitles));
    let status = if scene_degraded || concat_degraded || music_degraded || dropped > 0 {
        JobStatus::Degraded
    } else {
        JobStatus::Completed
    };
    info!("Job {job_id}: {:?}, video at {}", status, video.display());

    Ok(JobOutcome {
        job_id,
        status,
        video: Some(video),
        failure: None,
        diagnostics,
        job_dir,
    })
}

/// Run a job with a variant's preset options.
pub async fn run_kind(svc: &Services, script: &str, kind: JobKind) -> Result<JobOutcome> {
    run_job(svc, script, &kind.options()).await
}
