//! Rendering of narration scripts with inline `[k]` scene markers.

use regex::Regex;
use schemars::JsonSchema;
use serde::Serialize;
use std::sync::LazyLock;

use crate::{MediaRef, SceneSlot};

static MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[(\d+)\]").unwrap());

/// A piece of a rendered script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScriptSegment {
    /// Plain narration text
    Text { text: String },
    /// A scene marker whose illustration is ready (scene is 1-based)
    Marker { scene: usize, image: MediaRef },
}

/// Split a script into text and visible markers.
///
/// `[k]` becomes a marker only when `images[k - 1]` is ready. Markers for
/// missing, in-progress or out-of-range scenes (including `[0]`) are dropped,
/// and the surrounding text is merged.
pub fn render_script(script: &str, images: &[SceneSlot]) -> Vec<ScriptSegment> {
    let mut segments = Vec::new();
    let mut pending_text = String::new();
    let mut last = 0;

    for caps in MARKER.captures_iter(script) {
        let Some(whole) = caps.get(0) else { continue };
        pending_text.push_str(&script[last..whole.start()]);
        last = whole.end();

        let media = caps[1]
            .parse::<usize>()
            .ok()
            .filter(|scene| *scene >= 1)
            .and_then(|scene| images.get(scene - 1).map(|slot| (scene, slot)))
            .and_then(|(scene, slot)| slot.media().map(|m| (scene, m.clone())));

        if let Some((scene, image)) = media {
            if !pending_text.is_empty() {
                segments.push(ScriptSegment::Text {
                    text: std::mem::take(&mut pending_text),
                });
            }
            segments.push(ScriptSegment::Marker { scene, image });
        }
    }

    pending_text.push_str(&script[last..]);
    if !pending_text.is_empty() {
        segments.push(ScriptSegment::Text { text: pending_text });
    }

    segments
}

/// Scene numbers referenced by markers, in reading order.
pub fn marker_scenes(script: &str) -> Vec<usize> {
    MARKER
        .captures_iter(script)
        .filter_map(|caps| caps[1].parse().ok())
        .collect()
}
