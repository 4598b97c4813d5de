//! JSON-file record store: one file per draft or finished video under the
//! workspace, plus an append-only history log for language-capability events.
//! Deliberately trivial storage; records are small and listing is rare.

use crate::config::JobOptions;
use crate::ffmpeg;
use crate::init::Services;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Draft {
    pub id: String,
    pub title: String,
    pub script: String,
    pub voice_id: String,
    pub options: JobOptions,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoRecord {
    pub id: String,
    pub title: String,
    pub script: String,
    pub video_path: String,
    pub thumbnail_path: Option<String>,
    pub duration: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// One language-capability event: a transcription or translation request and
/// what the pipeline answered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub kind: String,
    pub input: String,
    pub output: String,
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
}

fn drafts_dir(svc: &Services) -> PathBuf {
    svc.workspace.join("store/drafts")
}

fn videos_dir(svc: &Services) -> PathBuf {
    svc.workspace.join("store/videos")
}

fn history_path(svc: &Services) -> PathBuf {
    svc.workspace.join("store/history.jsonl")
}

async fn write_record<T: Serialize>(dir: &Path, id: &str, record: &T) -> Result<()> {
    fs::create_dir_all(dir)
        .await
        .with_context(|| format!("create store dir: {}", dir.display()))?;
    let path = dir.join(format!("{id}.json"));
    fs::write(&path, serde_json::to_vec_pretty(record)?)
        .await
        .with_context(|| format!("write record: {}", path.display()))?;
    Ok(())
}

async fn read_records<T: for<'de> Deserialize<'de>>(dir: &Path) -> Result<Vec<T>> {
    let mut records = Vec::new();
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(_) => return Ok(records),
    };
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        match fs::read_to_string(&path).await {
            Ok(raw) => match serde_json::from_str::<T>(&raw) {
                Ok(record) => records.push(record),
                Err(err) => warn!("Skipping unreadable record {}: {err}", path.display()),
            },
            Err(err) => warn!("Skipping unreadable record {}: {err}", path.display()),
        }
    }
    Ok(records)
}

/// Create or update a draft. A `None` id allocates a new one; the created
/// timestamp of an existing draft is preserved.
pub async fn save_draft(
    svc: &Services,
    id: Option<&str>,
    title: &str,
    script: &str,
    voice_id: &str,
    options: &JobOptions,
) -> Result<Draft> {
    let now = Utc::now();
    let (id, created_at) = match id {
        Some(id) => {
            let created = load_draft(svc, id).await.map(|d| d.created_at).unwrap_or(now);
            (id.to_string(), created)
        }
        None => (Uuid::new_v4().to_string(), now),
    };

    let draft = Draft {
        id: id.clone(),
        title: title.to_string(),
        script: script.to_string(),
        voice_id: voice_id.to_string(),
        options: options.clone(),
        created_at,
        updated_at: now,
    };
    write_record(&drafts_dir(svc), &id, &draft).await?;
    Ok(draft)
}

pub async fn load_draft(svc: &Services, id: &str) -> Option<Draft> {
    let path = drafts_dir(svc).join(format!("{id}.json"));
    let raw = fs::read_to_string(&path).await.ok()?;
    serde_json::from_str(&raw).ok()
}

/// All drafts, most recently updated first.
pub async fn list_drafts(svc: &Services) -> Result<Vec<Draft>> {
    let mut drafts: Vec<Draft> = read_records(&drafts_dir(svc)).await?;
    drafts.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    Ok(drafts)
}

pub async fn delete_draft(svc: &Services, id: &str) -> Result<bool> {
    let path = drafts_dir(svc).join(format!("{id}.json"));
    match fs::remove_file(&path).await {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err).with_context(|| format!("delete draft: {}", path.display())),
    }
}

/// Record a finished video. Duration probe and thumbnail extraction are best
/// effort; a missing muxer leaves those fields empty rather than failing the
/// save.
pub async fn save_video(svc: &Services, title: &str, script: &str, video: &Path) -> Result<VideoRecord> {
    let id = Uuid::new_v4().to_string();

    let duration = match ffmpeg::probe_duration_seconds(video).await {
        Ok(d) => Some(d),
        Err(err) => {
            warn!("Duration probe failed for {}: {err}", video.display());
            None
        }
    };

    let thumb = videos_dir(svc).join(format!("{id}.png"));
    fs::create_dir_all(videos_dir(svc))
        .await
        .with_context(|| format!("create store dir: {}", videos_dir(svc).display()))?;
    let thumbnail_path = match ffmpeg::extract_thumbnail(video, &thumb).await {
        Ok(true) => Some(thumb.display().to_string()),
        _ => None,
    };

    let record = VideoRecord {
        id: id.clone(),
        title: title.to_string(),
        script: script.to_string(),
        video_path: video.display().to_string(),
        thumbnail_path,
        duration,
        created_at: Utc::now(),
    };
    write_record(&videos_dir(svc), &id, &record).await?;
    Ok(record)
}

/// All recorded videos, newest first.
pub async fn list_videos(svc: &Services) -> Result<Vec<VideoRecord>> {
    let mut videos: Vec<VideoRecord> = read_records(&videos_dir(svc)).await?;
    videos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(videos)
}

/// Append one event to the history log.
pub async fn append_history(svc: &Services, kind: &str, input: &str, output: &str, confidence: f64) -> Result<()> {
    let entry = HistoryEntry {
        kind: kind.to_string(),
        input: input.to_string(),
        output: output.to_string(),
        confidence,
        created_at: Utc::now(),
    };

    let path = history_path(svc);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("create store dir: {}", parent.display()))?;
    }
    let mut line = serde_json::to_vec(&entry)?;
    line.push(b'\n');
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .await
        .with_context(|| format!("open history log: {}", path.display()))?;
    file.write_all(&line)
        .await
        .with_context(|| format!("append history log: {}", path.display()))?;
    Ok(())
}

/// Up to `limit` history entries, newest first. Unparseable lines are
/// skipped.
pub async fn recent_history(svc: &Services, limit: usize) -> Result<Vec<HistoryEntry>> {
    let raw = match fs::read_to_string(history_path(svc)).await {
        Ok(raw) => raw,
        Err(_) => return Ok(Vec::new()),
    };
    let mut entries: Vec<HistoryEntry> = raw
        .lines()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect();
    entries.reverse();
    entries.truncate(limit);
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::init::Services;

    #[tokio::test]
    async fn draft_round_trip_and_listing_order() {
        let tmp = tempfile::tempdir().unwrap();
        let svc = Services::offline(tmp.path().to_path_buf());
        let opts = JobOptions::default();

        let first = save_draft(&svc, None, "first", "script one", "default", &opts)
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = save_draft(&svc, None, "second", "script two", "default", &opts)
            .await
            .unwrap();

        let loaded = load_draft(&svc, &first.id).await.unwrap();
        assert_eq!(loaded.title, "first");
        assert_eq!(loaded.script, "script one");

        let listed = list_drafts(&svc).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
    }

    #[tokio::test]
    async fn updating_a_draft_keeps_created_at() {
        let tmp = tempfile::tempdir().unwrap();
        let svc = Services::offline(tmp.path().to_path_buf());
        let opts = JobOptions::default();

        let draft = save_draft(&svc, None, "t", "v1", "default", &opts).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let updated = save_draft(&svc, Some(&draft.id), "t", "v2", "default", &opts)
            .await
            .unwrap();

        assert_eq!(updated.created_at, draft.created_at);
        assert!(updated.updated_at > draft.updated_at);
        assert_eq!(load_draft(&svc, &draft.id).await.unwrap().script, "v2");
    }

    #[tokio::test]
    async fn delete_reports_presence() {
        let tmp = tempfile::tempdir().unwrap();
        let svc = Services::offline(tmp.path().to_path_buf());
        let draft = save_draft(&svc, None, "t", "s", "default", &JobOptions::default())
            .await
            .unwrap();
        assert!(delete_draft(&svc, &draft.id).await.unwrap());
        assert!(!delete_draft(&svc, &draft.id).await.unwrap());
    }

    #[tokio::test]
    async fn history_is_newest_first_and_limited() {
        let tmp = tempfile::tempdir().unwrap();
        let svc = Services::offline(tmp.path().to_path_buf());

        for i in 0..5 {
            append_history(&svc, "translation", &format!("in{i}"), &format!("out{i}"), 0.0)
                .await
                .unwrap();
        }

        let recent = recent_history(&svc, 3).await.unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].input, "in4");
        assert_eq!(recent[2].input, "in2");
    }

    #[tokio::test]
    async fn missing_history_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let svc = Services::offline(tmp.path().to_path_buf());
        assert!(recent_history(&svc, 10).await.unwrap().is_empty());
    }
}
