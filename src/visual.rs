//! Visual generation cascade: remote image model -> procedural template. The
//! template is rendered locally (style-keyed gradient plus pattern) with an
//! rng seeded from the description, so repeated runs produce identical
//! fallback art. The wrapped description is burned on top with the muxer's
//! drawtext filter when available; a plain template is kept otherwise.

use crate::api::openai;
use crate::artifact::{Artifact, ArtifactKind, Provenance};
use crate::ffmpeg;
use crate::init::Services;
use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::{debug, warn};

const WIDTH: u32 = 1280;
const HEIGHT: u32 = 720;
const WRAP_COLUMNS: usize = 38;

fn style_color(style: &str) -> Rgb<u8> {
    match style {
        "business" => Rgb([0x25, 0x63, 0xeb]),
        "nature" => Rgb([0x16, 0xa3, 0x4a]),
        "technology" => Rgb([0x7c, 0x3a, 0xed]),
        "education" => Rgb([0xdc, 0x26, 0x26]),
        "creative" => Rgb([0xea, 0x58, 0x0c]),
        _ => Rgb([0x6b, 0x72, 0x80]),
    }
}

fn seed_from(description: &str) -> [u8; 32] {
    let digest = Sha256::digest(description.as_bytes());
    let mut seed = [0u8; 32];
    seed.copy_from_slice(&digest);
    seed
}

/// Greedy word wrap; a single overlong word becomes its own line rather
/// than being split.
pub fn wrap_text(text: &str, max_columns: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
        } else if current.chars().count() + 1 + word.chars().count() <= max_columns {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn put_white(img: &mut RgbImage, x: i64, y: i64) {
    if x >= 0 && y >= 0 && (x as u32) < WIDTH && (y as u32) < HEIGHT {
        img.put_pixel(x as u32, y as u32, Rgb([255, 255, 255]));
    }
}

fn draw_grid(img: &mut RgbImage) {
    for x in (0..WIDTH).step_by(100) {
        for y in 0..HEIGHT {
            img.put_pixel(x, y, Rgb([255, 255, 255]));
        }
    }
    for y in (0..HEIGHT).step_by(100) {
        for x in 0..WIDTH {
            img.put_pixel(x, y, Rgb([255, 255, 255]));
        }
    }
}

fn draw_waves(img: &mut RgbImage) {
    for i in 0..5 {
        let base = 150.0 + i as f64 * 120.0;
        for x in 0..WIDTH {
            let y = base + 30.0 * ((x as f64) * 0.01 + i as f64).sin();
            put_white(img, x as i64, y as i64);
            put_white(img, x as i64, y as i64 + 1);
        }
    }
}

fn draw_diagonals(img: &mut RgbImage) {
    for start in (0..WIDTH).step_by(200) {
        for y in 0..100u32 {
            let x0 = start + y / 2;
            for x in x0..(x0 + 100).min(WIDTH) {
                img.put_pixel(x, y, Rgb([255, 255, 255]));
            }
        }
    }
}

fn draw_scatter(img: &mut RgbImage, seed: [u8; 32]) {
    let mut rng = rand::rngs::StdRng::from_seed(seed);
    let palette = [
        Rgb([220u8, 60, 60]),
        Rgb([60, 90, 220]),
        Rgb([230, 210, 70]),
        Rgb([70, 180, 90]),
        Rgb([160, 80, 200]),
    ];
    for i in 0..10 {
        let cx = rng.gen_range(100..(WIDTH - 100)) as i64;
        let cy = rng.gen_range(100..(HEIGHT - 100)) as i64;
        let size = rng.gen_range(20..80) as i64;
        let color = palette[rng.gen_range(0..palette.len())];
        for dy in -size..=size {
            for dx in -size..=size {
                let inside = if i % 2 == 0 {
                    dx * dx + dy * dy <= size * size
                } else {
                    dx.abs() <= size / 2 && dy.abs() <= size / 2
                };
                if inside {
                    let x = cx + dx;
                    let y = cy + dy;
                    if x >= 0 && y >= 0 && (x as u32) < WIDTH && (y as u32) < HEIGHT {
                        img.put_pixel(x as u32, y as u32, color);
                    }
                }
            }
        }
    }
}

/// The style name that routes visuals through the presenter pipeline.
pub const AVATAR_STYLE: &str = "avatar";

fn fill_ellipse(img: &mut RgbImage, cx: i64, cy: i64, rx: i64, ry: i64, color: Rgb<u8>) {
    for dy in -ry..=ry {
        for dx in -rx..=rx {
            let nx = dx as f64 / rx as f64;
            let ny = dy as f64 / ry as f64;
            if nx * nx + ny * ny <= 1.0 {
                let x = cx + dx;
                let y = cy + dy;
                if x >= 0 && y >= 0 && (x as u32) < WIDTH && (y as u32) < HEIGHT {
                    img.put_pixel(x as u32, y as u32, color);
                }
            }
        }
    }
}

fn draw_smile(img: &mut RgbImage, cx: i64, cy: i64, radius: i64) {
    // Lower half-circle, plotted as short dabs.
    for step in 0..=90 {
        let angle = std::f64::consts::PI * step as f64 / 90.0;
        let x = cx + (radius as f64 * angle.cos()) as i64;
        let y = cy + (radius as f64 * angle.sin()) as i64;
        fill_ellipse(img, x, y, 3, 3, Rgb([0, 0, 0]));
    }
}

/// Render the fixed-geometry presenter placeholder: head disc, face, eyes,
/// smile on a plain backdrop. Identical on every run.
pub fn render_avatar(out: &Path) -> Result<()> {
    let mut img = RgbImage::from_pixel(WIDTH, HEIGHT, Rgb([211, 211, 211]));

    fill_ellipse(&mut img, 640, 390, 280, 280, Rgb([169, 169, 169]));
    fill_ellipse(&mut img, 640, 330, 140, 140, Rgb([255, 255, 255]));
    fill_ellipse(&mut img, 590, 300, 22, 22, Rgb([0, 0, 0]));
    fill_ellipse(&mut img, 690, 300, 22, 22, Rgb([0, 0, 0]));
    draw_smile(&mut img, 640, 360, 45);

    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create visual dir: {}", parent.display()))?;
    }
    img.save(out)
        .with_context(|| format!("write avatar image: {}", out.display()))?;
    Ok(())
}

/// Render the procedural template: style color, vertical gradient, pattern.
pub fn render_template(description: &str, style: &str, out: &Path) -> Result<()> {
    let base = style_color(style);
    let mut img = RgbImage::new(WIDTH, HEIGHT);

    for y in 0..HEIGHT {
        let shade = (255.0 * (1.0 - y as f64 / HEIGHT as f64) * 0.3) as i32;
        let px = Rgb([
            (base[0] as i32 - shade).max(0) as u8,
            (base[1] as i32 - shade).max(0) as u8,
            (base[2] as i32 - shade).max(0) as u8,
        ]);
        for x in 0..WIDTH {
            img.put_pixel(x, y, px);
        }
    }

    match style {
        "business" => draw_grid(&mut img),
        "nature" => draw_waves(&mut img),
        "technology" => draw_diagonals(&mut img),
        "creative" => draw_scatter(&mut img, seed_from(description)),
        _ => {}
    }

    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create visual dir: {}", parent.display()))?;
    }
    img.save(out)
        .with_context(|| format!("write template image: {}", out.display()))?;
    Ok(())
}

/// Generate the visual artifact for one scene. Remote model first; any
/// provider failure degrades to the procedural template, which never depends
/// on the network. This call always leaves a readable image on disk.
pub async fn generate(
    svc: &Services,
    description: &str,
    style: &str,
    scene_dir: &Path,
    scene_index: usize,
) -> Result<Artifact> {
    let out = scene_dir.join(format!("visual_{scene_index}.png"));

    if svc.status.remote_image {
        match openai::generate_image(&svc.client, &svc.config, description, style).await {
            Ok(bytes) => {
                if let Some(parent) = out.parent() {
                    tokio::fs::create_dir_all(parent).await.ok();
                }
                tokio::fs::write(&out, &bytes)
                    .await
                    .with_context(|| format!("write remote image: {}", out.display()))?;
                debug!("Remote image for scene {scene_index}: {}", out.display());
                return Ok(Artifact {
                    path: out,
                    scene_index,
                    kind: ArtifactKind::Visual,
                    provenance: Provenance::Remote,
                });
            }
            Err(err) => {
                warn!("Remote image failed for scene {scene_index} ({err}); using template");
            }
        }
    }

    // Presenter scenes degrade to the fixed placeholder face; burning the
    // narration over a face would defeat the point.
    if style == AVATAR_STYLE {
        render_avatar(&out)?;
        return Ok(Artifact {
            path: out,
            scene_index,
            kind: ArtifactKind::Visual,
            provenance: Provenance::Fallback,
        });
    }

    render_template(description, style, &out)?;

    // Best-effort caption burn; a missing muxer or font keeps the plain
    // template (the simplest available rendering resource).
    let lines = wrap_text(description, WRAP_COLUMNS);
    if !lines.is_empty() {
        let captioned = scene_dir.join(format!("visual_{scene_index}_text.png"));
        match ffmpeg::drawtext_overlay(&out, &lines, &captioned).await {
            Ok(true) => {
                return Ok(Artifact {
                    path: captioned,
                    scene_index,
                    kind: ArtifactKind::Visual,
                    provenance: Provenance::Fallback,
                });
            }
            Ok(false) => {}
            Err(err) => warn!("Caption overlay failed for scene {scene_index}: {err}"),
        }
    }

    Ok(Artifact {
        path: out,
        scene_index,
        kind: ArtifactKind::Visual,
        provenance: Provenance::Fallback,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_respects_column_budget() {
        let lines = wrap_text("the quick brown fox jumps over the lazy dog", 15);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(line.chars().count() <= 15, "line too long: {line}");
        }
    }

    #[test]
    fn wrap_of_empty_text_is_empty() {
        assert!(wrap_text("", 38).is_empty());
        assert!(wrap_text("   ", 38).is_empty());
    }

    #[test]
    fn wrap_keeps_overlong_word_whole() {
        let lines = wrap_text("supercalifragilisticexpialidocious", 10);
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn template_render_is_deterministic() {
        let tmp = tempfile::tempdir().unwrap();
        let a = tmp.path().join("a.png");
        let b = tmp.path().join("b.png");
        render_template("circuit boards and neon", "creative", &a).unwrap();
        render_template("circuit boards and neon", "creative", &b).unwrap();
        let bytes_a = std::fs::read(&a).unwrap();
        assert!(!bytes_a.is_empty());
        assert_eq!(bytes_a, std::fs::read(&b).unwrap());
    }

    #[test]
    fn every_style_renders() {
        let tmp = tempfile::tempdir().unwrap();
        for style in ["business", "nature", "technology", "education", "creative", "unknown"] {
            let out = tmp.path().join(format!("{style}.png"));
            render_template("sample description", style, &out).unwrap();
            assert!(std::fs::metadata(&out).unwrap().len() > 0);
        }
    }

    #[test]
    fn avatar_render_is_deterministic() {
        let tmp = tempfile::tempdir().unwrap();
        let a = tmp.path().join("a.png");
        let b = tmp.path().join("b.png");
        render_avatar(&a).unwrap();
        render_avatar(&b).unwrap();
        let bytes_a = std::fs::read(&a).unwrap();
        assert!(!bytes_a.is_empty());
        assert_eq!(bytes_a, std::fs::read(&b).unwrap());
    }

    #[tokio::test]
    async fn offline_avatar_scene_gets_placeholder_face_without_caption() {
        let tmp = tempfile::tempdir().unwrap();
        let svc = crate::init::Services::offline(tmp.path().to_path_buf());
        let artifact = generate(&svc, "Welcome to the channel.", AVATAR_STYLE, tmp.path(), 0)
            .await
            .unwrap();
        assert_eq!(artifact.provenance, Provenance::Fallback);
        assert!(std::fs::metadata(&artifact.path).unwrap().len() > 0);
        assert!(!tmp.path().join("visual_0_text.png").exists());
    }

    #[tokio::test]
    async fn offline_generate_always_yields_readable_artifact() {
        let tmp = tempfile::tempdir().unwrap();
        let svc = crate::init::Services::offline(tmp.path().to_path_buf());
        let artifact = generate(&svc, "a quiet mountain village", "nature", tmp.path(), 3)
            .await
            .unwrap();
        assert_eq!(artifact.provenance, Provenance::Fallback);
        assert_eq!(artifact.scene_index, 3);
        assert!(std::fs::metadata(&artifact.path).unwrap().len() > 0);
    }
}
