//! Offline end-to-end coverage: every remote capability disabled, every
//! fallback exercised. Muxer-dependent assertions only run when ffmpeg is on
//! the PATH; the degradation logic before the mux is asserted regardless.

use scenecast::config::JobOptions;
use scenecast::generator::run_job;
use scenecast::init::{self, Services};
use scenecast::{JobStatus, Provenance};

#[tokio::test]
async fn empty_script_is_rejected_immediately() {
    let tmp = tempfile::tempdir().unwrap();
    let svc = Services::offline(tmp.path().to_path_buf());

    let err = run_job(&svc, "   \n ", &JobOptions::default())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("empty"));
    assert!(!tmp.path().join("jobs").exists());
}

#[tokio::test]
async fn offline_scene_artifacts_always_exist() {
    let tmp = tempfile::tempdir().unwrap();
    let svc = Services::offline(tmp.path().to_path_buf());

    let image = scenecast::visual::generate(&svc, "a harbor at dawn", "realistic", tmp.path(), 0)
        .await
        .unwrap();
    assert_eq!(image.provenance, Provenance::Fallback);
    assert!(std::fs::metadata(&image.path).unwrap().len() > 0);

    let voice = scenecast::voice::resolve_voice(&svc, "default");
    let audio = scenecast::speech::synthesize(&svc, "a harbor at dawn", &voice, tmp.path(), 0)
        .await
        .unwrap();
    assert_eq!(audio.provenance, Provenance::Synthetic);
    assert!(std::fs::metadata(&audio.path).unwrap().len() > 0);
}

#[tokio::test]
async fn offline_segmentation_matches_sentences() {
    let tmp = tempfile::tempdir().unwrap();
    let svc = Services::offline(tmp.path().to_path_buf());

    let scenes = scenecast::scene::segment(&svc, "Hello there. How are you?").await;
    assert_eq!(scenes.len(), 2);
    assert_eq!(scenes[0].text, "Hello there.");
    assert_eq!(scenes[1].text, "How are you?");
}

#[tokio::test]
async fn offline_job_completes_degraded_or_reports_failure() {
    let tmp = tempfile::tempdir().unwrap();
    let svc = Services::offline(tmp.path().to_path_buf());
    init::ensure_workspace(tmp.path()).await.unwrap();

    let outcome = run_job(&svc, "Hello there. How are you?", &JobOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.diagnostics.len(), 2);
    for diag in &outcome.diagnostics {
        assert_ne!(diag.visual, Provenance::Remote);
        assert_ne!(diag.audio, Provenance::Remote);
    }

    if init::check_ffmpeg().await {
        // With a muxer present the job finishes on fallbacks alone, and the
        // all-fallback diagnostics must flip the outcome to Degraded.
        assert_eq!(outcome.status, JobStatus::Degraded);
        let video = outcome.video.expect("video path");
        assert!(std::fs::metadata(&video).unwrap().len() > 0);
        assert!(outcome.failure.is_none());

        // The final clip runs as long as its segments combined.
        let mut segment_sum = 0.0;
        for i in 0..2 {
            let scene_dir = outcome.job_dir.join(format!("scene_{i}"));
            let burned = scene_dir.join(format!("segment_{i}_sub.mp4"));
            let plain = scene_dir.join(format!("segment_{i}.mp4"));
            let segment = if burned.exists() { burned } else { plain };
            segment_sum += scenecast::ffmpeg::probe_duration_seconds(&segment)
                .await
                .unwrap();
        }
        let total = scenecast::ffmpeg::probe_duration_seconds(&video).await.unwrap();
        assert!(
            (total - segment_sum).abs() <= 1.0,
            "final runs {total}s but segments sum to {segment_sum}s"
        );
    } else {
        // No muxer: zero segments is the one non-input fatal condition, and
        // it is reported in the outcome rather than as an error.
        assert_eq!(outcome.status, JobStatus::Failed);
        assert!(outcome.video.is_none());
        assert!(outcome.failure.unwrap().contains("segments"));
    }
}

#[tokio::test]
async fn job_directories_are_isolated_per_job() {
    let tmp = tempfile::tempdir().unwrap();
    let svc = Services::offline(tmp.path().to_path_buf());
    init::ensure_workspace(tmp.path()).await.unwrap();

    let a = run_job(&svc, "One scene only", &JobOptions::default())
        .await
        .unwrap();
    let b = run_job(&svc, "One scene only", &JobOptions::default())
        .await
        .unwrap();

    assert_ne!(a.job_id, b.job_id);
    assert_ne!(a.job_dir, b.job_dir);
    assert!(a.job_dir.is_dir());
    assert!(b.job_dir.is_dir());
}
