//! Single-cue SRT files for per-scene subtitle burns. Each scene clip gets
//! one cue spanning the whole clip, so the burn step never needs timing data
//! beyond the scene duration.

use anyhow::{Context, Result};
use std::path::Path;

fn format_timestamp(total_ms: u64) -> String {
    let ms = total_ms % 1000;
    let total_s = total_ms / 1000;
    let s = total_s % 60;
    let m = (total_s / 60) % 60;
    let h = total_s / 3600;
    format!("{:02}:{:02}:{:02},{:03}", h, m, s, ms)
}

/// Write an SRT with a single cue running from zero to `duration_s`.
pub fn write_single_cue(path: &Path, text: &str, duration_s: f64) -> Result<()> {
    let end_ms = (duration_s.max(0.0) * 1000.0) as u64;
    let body = format!(
        "1\n{} --> {}\n{}\n\n",
        format_timestamp(0),
        format_timestamp(end_ms),
        text.trim()
    );
    std::fs::write(path, body).with_context(|| format!("write srt: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_are_srt_shaped() {
        assert_eq!(format_timestamp(0), "00:00:00,000");
        assert_eq!(format_timestamp(1500), "00:00:01,500");
        assert_eq!(format_timestamp(61_020), "00:01:01,020");
        assert_eq!(format_timestamp(3_661_007), "01:01:01,007");
    }

    #[test]
    fn single_cue_spans_the_clip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("scene.srt");
        write_single_cue(&path, "  Hello there.  ", 2.5).unwrap();
        let body = std::fs::read_to_string(&path).unwrap();
        assert!(body.starts_with("1\n00:00:00,000 --> 00:00:02,500\n"));
        assert!(body.contains("Hello there."));
        assert!(!body.contains("  Hello"));
    }

    #[test]
    fn negative_duration_clamps_to_zero() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("neg.srt");
        write_single_cue(&path, "x", -1.0).unwrap();
        let body = std::fs::read_to_string(&path).unwrap();
        assert!(body.contains("00:00:00,000 --> 00:00:00,000"));
    }
}
