use crate::config::Config;
use crate::error::ProviderError;
use reqwest::Client;
use serde_json::json;
use tracing::warn;

const MAX_SCRIPT_CHARS: usize = 80_000;
const MAX_PROMPT_CHARS: usize = 1_000;

fn trim_copy_utf8_safe(input: &str, max_bytes: usize) -> String {
    if input.len() <= max_bytes {
        return input.to_string();
    }

    let mut cut = max_bytes.min(input.len());
    while cut > 0 && !input.is_char_boundary(cut) {
        cut -= 1;
    }
    input[..cut].to_string()
}

fn extract_output_text(resp_json: &str) -> Option<String> {
    let root: serde_json::Value = serde_json::from_str(resp_json).ok()?;

    if let Some(err) = root.get("error") {
        if let Some(msg) = err.get("message").and_then(|v| v.as_str()) {
            warn!("OpenAI error message: {msg}");
        }
        if let Some(code) = err.get("code").and_then(|v| v.as_str()) {
            warn!("OpenAI error code: {code}");
        }
        return None;
    }

    let output = root.get("output")?.as_array()?;
    for item in output {
        let content = item.get("content").and_then(|v| v.as_array());
        if let Some(content) = content {
            for entry in content {
                let typ = entry.get("type").and_then(|v| v.as_str());
                let text = entry.get("text").and_then(|v| v.as_str());
                if typ == Some("output_text") {
                    if let Some(text) = text {
                        return Some(text.to_string());
                    }
                }
            }
        }
    }

    None
}

/// Ask the text model to break a script into scenes. Returns ordered
/// (text, visual_description) pairs; any HTTP or shape problem is a
/// `ProviderError` and the caller falls back to mechanical splitting.
pub async fn segment_script(
    client: &Client,
    cfg: &Config,
    script: &str,
) -> Result<Vec<(String, String)>, ProviderError> {
    let script_trim = trim_copy_utf8_safe(script, MAX_SCRIPT_CHARS);

    let prompt = format!(
        "Break this script into logical scenes for video generation. Each scene should be 1-3 sentences.\n\
         Return STRICT JSON with this shape ONLY:\n\
         {{\"scenes\":[{{\"text\":\"...\",\"visual_description\":\"...\"}}, ...]}}\n\
         - Scenes must appear in script order.\n\
         - visual_description guides image synthesis for the scene.\n\n\
         Script:\n{}",
        script_trim
    );

    let body = json!({
        "model": "gpt-4o",
        "input": [
            {"role": "system", "content": "You are a helpful assistant designed to output JSON."},
            {"role": "user", "content": prompt},
        ],
        "text": {"format": {"type": "json_object"}},
    });

    let resp = client
        .post("https://api.openai.com/v1/responses")
        .bearer_auth(&cfg.openai_key)
        .json(&body)
        .timeout(std::time::Duration::from_secs(120))
        .send()
        .await?;

    let status = resp.status();
    let raw = resp.text().await.unwrap_or_default();

    if !status.is_success() {
        if !raw.is_empty() {
            let snippet = raw.chars().take(400).collect::<String>();
            warn!("OpenAI segmentation HTTP {}: {snippet}", status.as_u16());
        }
        return Err(ProviderError::Http(status.as_u16()));
    }

    let out_text = extract_output_text(&raw)
        .ok_or_else(|| ProviderError::Malformed("no output_text in response".to_string()))?;

    let root: serde_json::Value = serde_json::from_str(&out_text)
        .map_err(|e| ProviderError::Malformed(e.to_string()))?;
    let scenes = root
        .get("scenes")
        .and_then(|v| v.as_array())
        .ok_or_else(|| ProviderError::Malformed("missing scenes array".to_string()))?;

    let mut out = Vec::new();
    for scene in scenes {
        let text = scene.get("text").and_then(|v| v.as_str()).unwrap_or("");
        let visual = scene
            .get("visual_description")
            .and_then(|v| v.as_str())
            .unwrap_or(text);
        if !text.trim().is_empty() {
            out.push((text.trim().to_string(), visual.trim().to_string()));
        }
    }

    if out.is_empty() {
        return Err(ProviderError::Malformed("scene list was empty".to_string()));
    }

    Ok(out)
}

fn style_modifier(style: &str) -> &'static str {
    match style {
        "realistic" => "photorealistic, high quality, detailed",
        "artistic" => "artistic, creative, stylized",
        "cartoon" => "cartoon style, animated, colorful",
        "minimalist" => "minimalist, clean, simple design",
        "cinematic" => "cinematic lighting, dramatic, movie-like",
        "avatar" => "professional presenter in an office setting, neutral expression, professional headshot",
        _ => "high quality, detailed",
    }
}

pub fn enhance_prompt(description: &str, style: &str) -> String {
    let enhanced = format!(
        "{}, {}, 16:9 aspect ratio",
        description,
        style_modifier(style)
    );
    trim_copy_utf8_safe(&enhanced, MAX_PROMPT_CHARS)
}

/// Generate one image and download its bytes. The caller writes the file and
/// decides the fallback on any error.
pub async fn generate_image(
    client: &Client,
    cfg: &Config,
    description: &str,
    style: &str,
) -> Result<Vec<u8>, ProviderError> {
    let body = json!({
        "model": "dall-e-3",
        "prompt": enhance_prompt(description, style),
        "size": "1792x1024",
        "quality": "standard",
        "n": 1,
    });

    let resp = client
        .post("https://api.openai.com/v1/images/generations")
        .bearer_auth(&cfg.openai_key)
        .json(&body)
        .timeout(std::time::Duration::from_secs(300))
        .send()
        .await?;

    let status = resp.status();
    if !status.is_success() {
        let raw = resp.text().await.unwrap_or_default();
        if !raw.is_empty() {
            let snippet = raw.chars().take(400).collect::<String>();
            warn!("OpenAI image HTTP {}: {snippet}", status.as_u16());
        }
        return Err(ProviderError::Http(status.as_u16()));
    }

    let root: serde_json::Value = resp
        .json()
        .await
        .map_err(|e| ProviderError::Malformed(e.to_string()))?;
    let url = root
        .get("data")
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .and_then(|item| item.get("url"))
        .and_then(|v| v.as_str())
        .ok_or_else(|| ProviderError::Malformed("no image url in response".to_string()))?;

    let image_resp = client
        .get(url)
        .timeout(std::time::Duration::from_secs(120))
        .send()
        .await?;
    if !image_resp.status().is_success() {
        return Err(ProviderError::Http(image_resp.status().as_u16()));
    }

    let bytes = image_resp.bytes().await?;
    if bytes.is_empty() {
        return Err(ProviderError::Malformed("empty image body".to_string()));
    }
    Ok(bytes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_output_text_finds_payload() {
        let raw = r#"{"output":[{"content":[{"type":"output_text","text":"{\"scenes\":[]}"}]}]}"#;
        assert_eq!(extract_output_text(raw).as_deref(), Some("{\"scenes\":[]}"));
    }

    #[test]
    fn extract_output_text_rejects_error_body() {
        let raw = r#"{"error":{"message":"quota","code":"insufficient_quota"}}"#;
        assert!(extract_output_text(raw).is_none());
    }

    #[test]
    fn enhance_prompt_applies_style_and_caps_length() {
        let p = enhance_prompt("a mountain village", "cinematic");
        assert!(p.starts_with("a mountain village, cinematic lighting"));
        assert!(p.ends_with("16:9 aspect ratio"));

        let long = "x".repeat(5_000);
        assert!(enhance_prompt(&long, "realistic").len() <= MAX_PROMPT_CHARS);
    }

    #[test]
    fn trim_respects_char_boundaries() {
        let s = "aé".repeat(400);
        let trimmed = trim_copy_utf8_safe(&s, 100);
        assert!(trimmed.len() <= 100);
        assert!(s.starts_with(&trimmed));
    }
}
