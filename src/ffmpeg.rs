//! External muxer boundary. Every invocation is a blocking subprocess run
//! under an enforced timeout; a timeout is treated exactly like a non-zero
//! exit, so callers recover through the same degradation paths.

use anyhow::{Context, Result};
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use tracing::warn;

const MUX_TIMEOUT: Duration = Duration::from_secs(120);

async fn run_with_timeout(args: &[String], timeout: Duration) -> Result<()> {
    if args.is_empty() {
        return Ok(());
    }

    let mut cmd = Command::new(&args[0]);
    if args.len() > 1 {
        cmd.args(&args[1..]);
    }
    // Dropping the status future on timeout must take the child with it,
    // not leave an encoder running detached.
    cmd.kill_on_drop(true);

    let status = tokio::time::timeout(timeout, cmd.status())
        .await
        .map_err(|_| anyhow::anyhow!("Command timed out: {:?}", args))?
        .context("Command execution failed")?;
    if !status.success() {
        return Err(anyhow::anyhow!("Command failed: {:?}", args));
    }

    Ok(())
}

async fn run(args: &[String]) -> Result<()> {
    run_with_timeout(args, MUX_TIMEOUT).await
}

pub async fn probe_duration_seconds(path: &Path) -> Result<f64> {
    let mut cmd = Command::new("ffprobe");
    cmd.args([
        "-v",
        "error",
        "-show_entries",
        "format=duration",
        "-of",
        "default=noprint_wrappers=1:nokey=1",
    ])
    .arg(path)
    .kill_on_drop(true);

    let output = tokio::time::timeout(MUX_TIMEOUT, cmd.output())
        .await
        .map_err(|_| anyhow::anyhow!("ffprobe timed out"))?
        .context("ffprobe duration failed")?;

    if !output.status.success() {
        return Err(anyhow::anyhow!("ffprobe failed"));
    }

    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let duration = text.parse::<f64>().unwrap_or(-1.0);
    if duration <= 0.0 {
        return Err(anyhow::anyhow!("Invalid duration"));
    }
    Ok(duration)
}

/// Loop a still image under the scene audio: clip length is capped to the
/// audio duration (`-shortest`), pixel format and target geometry are
/// normalized so segments concat cleanly.
pub async fn make_segment(
    image_path: &Path,
    audio_path: &Path,
    width: u32,
    height: u32,
    fps: u32,
    out_mp4: &Path,
) -> Result<bool> {
    let args = vec![
        "ffmpeg".to_string(),
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-loop".to_string(),
        "1".to_string(),
        "-i".to_string(),
        image_path.display().to_string(),
        "-i".to_string(),
        audio_path.display().to_string(),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-c:a".to_string(),
        "aac".to_string(),
        "-shortest".to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-vf".to_string(),
        format!("scale={}:{}", width, height),
        "-r".to_string(),
        fps.to_string(),
        out_mp4.display().to_string(),
    ];
    run(&args).await?;
    Ok(out_mp4.exists())
}

/// Concatenate segments with the concat demuxer, stream copy only.
pub async fn concat_segments(list_txt: &Path, out_mp4: &Path) -> Result<bool> {
    let args = vec![
        "ffmpeg".to_string(),
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-f".to_string(),
        "concat".to_string(),
        "-safe".to_string(),
        "0".to_string(),
        "-i".to_string(),
        list_txt.display().to_string(),
        "-c".to_string(),
        "copy".to_string(),
        out_mp4.display().to_string(),
    ];
    run(&args).await?;
    Ok(out_mp4.exists())
}

/// Burn a subtitle file into a clip, audio untouched.
pub async fn burn_subtitles(video_in: &Path, srt_path: &Path, video_out: &Path) -> Result<bool> {
    let filter = format!(
        "subtitles={}:force_style='FontSize=24,PrimaryColour=&Hffffff,OutlineColour=&H000000,Outline=2'",
        srt_path.display()
    );
    let args = vec![
        "ffmpeg".to_string(),
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-i".to_string(),
        video_in.display().to_string(),
        "-vf".to_string(),
        filter,
        "-c:a".to_string(),
        "copy".to_string(),
        video_out.display().to_string(),
    ];
    if let Err(err) = run(&args).await {
        warn!("Subtitle burn failed: {err}");
        return Ok(false);
    }
    Ok(video_out.exists())
}

fn escape_drawtext(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('\'', "")
        .replace(':', "\\:")
        .replace(',', "\\,")
}

/// Draw wrapped caption lines onto a still image. Best effort: a missing
/// muxer or font resource reports `false` and the caller keeps the plain
/// image.
pub async fn drawtext_overlay(image_in: &Path, lines: &[String], image_out: &Path) -> Result<bool> {
    if lines.is_empty() {
        return Ok(false);
    }

    let line_height = 56i64;
    let block_top = (720 - lines.len() as i64 * line_height) / 2;
    let mut filters = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        let y = block_top + i as i64 * line_height;
        filters.push(format!(
            "drawtext=text='{}':fontsize=44:fontcolor=white:borderw=2:bordercolor=black:x=(w-text_w)/2:y={}",
            escape_drawtext(line),
            y
        ));
    }
    let filter = filters.join(",");

    let args = vec![
        "ffmpeg".to_string(),
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-i".to_string(),
        image_in.display().to_string(),
        "-vf".to_string(),
        filter,
        "-frames:v".to_string(),
        "1".to_string(),
        image_out.display().to_string(),
    ];
    if let Err(err) = run(&args).await {
        warn!("drawtext overlay failed: {err}");
        return Ok(false);
    }
    Ok(image_out.exists())
}

/// First-second frame, scaled down for listings.
pub async fn extract_thumbnail(video_in: &Path, image_out: &Path) -> Result<bool> {
    let args = vec![
        "ffmpeg".to_string(),
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-i".to_string(),
        video_in.display().to_string(),
        "-ss".to_string(),
        "00:00:01".to_string(),
        "-vframes".to_string(),
        "1".to_string(),
        "-vf".to_string(),
        "scale=320:180".to_string(),
        image_out.display().to_string(),
    ];
    if let Err(err) = run(&args).await {
        warn!("Thumbnail extraction failed: {err}");
        return Ok(false);
    }
    Ok(image_out.exists())
}

/// Quiet sine bed used as the placeholder background-music track.
pub async fn sine_bed(duration_s: f64, out_audio: &Path) -> Result<bool> {
    let args = vec![
        "ffmpeg".to_string(),
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-f".to_string(),
        "lavfi".to_string(),
        "-i".to_string(),
        format!("sine=frequency=440:duration={:.3}", duration_s),
        "-af".to_string(),
        "volume=0.1".to_string(),
        out_audio.display().to_string(),
    ];
    if let Err(err) = run(&args).await {
        warn!("Sine bed generation failed: {err}");
        return Ok(false);
    }
    Ok(out_audio.exists())
}

/// Mix a music track under the narration, video stream untouched.
pub async fn mix_music(video_in: &Path, music_in: &Path, video_out: &Path) -> Result<bool> {
    let args = vec![
        "ffmpeg".to_string(),
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-i".to_string(),
        video_in.display().to_string(),
        "-i".to_string(),
        music_in.display().to_string(),
        "-filter_complex".to_string(),
        "[1:a]volume=0.3[music];[0:a][music]amix=inputs=2:duration=first[audio]".to_string(),
        "-map".to_string(),
        "0:v".to_string(),
        "-map".to_string(),
        "[audio]".to_string(),
        "-c:v".to_string(),
        "copy".to_string(),
        "-c:a".to_string(),
        "aac".to_string(),
        video_out.display().to_string(),
    ];
    if let Err(err) = run(&args).await {
        warn!("Music mix failed: {err}");
        return Ok(false);
    }
    Ok(video_out.exists())
}
