//! Script segmentation. The remote text model produces scene descriptions
//! with dedicated visual prompts; on any failure the mechanical splitter
//! takes over, so segmentation always yields at least one scene and never
//! reorders the script.

use crate::api::openai;
use crate::init::Services;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    pub index: usize,
    pub text: String,
    pub visual_description: String,
}

/// Sentence-boundary split on `.`, `!` and `?`. The terminator stays with
/// its sentence. A script with no boundaries (or only whitespace) becomes a
/// single scene carrying the original text.
pub fn mechanical_split(script: &str) -> Vec<Scene> {
    let mut scenes = Vec::new();
    let mut current = String::new();

    for ch in script.chars() {
        current.push(ch);
        if matches!(ch, '.' | '!' | '?') {
            let sentence = current.trim();
            if !sentence.is_empty() {
                scenes.push(sentence.to_string());
            }
            current.clear();
        }
    }
    let tail = current.trim();
    if !tail.is_empty() {
        scenes.push(tail.to_string());
    }

    if scenes.is_empty() {
        scenes.push(script.to_string());
    }

    scenes
        .into_iter()
        .enumerate()
        .map(|(index, text)| Scene {
            visual_description: text.clone(),
            index,
            text,
        })
        .collect()
}

/// Segment a script into scenes. Remote segmentation runs first when a text
/// model is configured; any provider failure falls back to the mechanical
/// splitter. The result is never empty.
pub async fn segment(svc: &Services, script: &str) -> Vec<Scene> {
    if svc.status.remote_text {
        match openai::segment_script(&svc.client, &svc.config, script).await {
            Ok(pairs) if !pairs.is_empty() => {
                info!("Remote segmentation produced {} scenes", pairs.len());
                return pairs
                    .into_iter()
                    .enumerate()
                    .map(|(index, (text, visual_description))| Scene {
                        index,
                        text,
                        visual_description,
                    })
                    .collect();
            }
            Ok(_) => warn!("Remote segmentation returned no scenes; splitting locally"),
            Err(err) => warn!("Remote segmentation failed ({err}); splitting locally"),
        }
    }
    mechanical_split(script)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_sentence_boundaries() {
        let scenes = mechanical_split("Hello there. How are you?");
        assert_eq!(scenes.len(), 2);
        assert_eq!(scenes[0].text, "Hello there.");
        assert_eq!(scenes[1].text, "How are you?");
        assert_eq!(scenes[0].index, 0);
        assert_eq!(scenes[1].index, 1);
    }

    #[test]
    fn terminator_stays_with_sentence() {
        let scenes = mechanical_split("One! Two? Three.");
        let texts: Vec<_> = scenes.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, ["One!", "Two?", "Three."]);
    }

    #[test]
    fn unterminated_tail_is_kept() {
        let scenes = mechanical_split("First. and then the rest");
        assert_eq!(scenes.len(), 2);
        assert_eq!(scenes[1].text, "and then the rest");
    }

    #[test]
    fn boundary_free_script_is_one_scene() {
        let scenes = mechanical_split("no punctuation at all");
        assert_eq!(scenes.len(), 1);
        assert_eq!(scenes[0].text, "no punctuation at all");
    }

    #[test]
    fn whitespace_script_still_yields_one_scene() {
        let scenes = mechanical_split("   ");
        assert_eq!(scenes.len(), 1);
        assert_eq!(scenes[0].text, "   ");
    }

    #[test]
    fn visual_description_defaults_to_text() {
        for scene in mechanical_split("A cat. A dog.") {
            assert_eq!(scene.text, scene.visual_description);
        }
    }

    #[test]
    fn scenes_concatenate_back_to_script_content() {
        let script = "Alpha. Beta! Gamma?";
        let joined: String = mechanical_split(script)
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(joined, script);
    }

    #[tokio::test]
    async fn offline_segment_uses_mechanical_split() {
        let svc = crate::init::Services::offline(std::env::temp_dir());
        let scenes = segment(&svc, "One. Two.").await;
        assert_eq!(scenes.len(), 2);
    }
}
