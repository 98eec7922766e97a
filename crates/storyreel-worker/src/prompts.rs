//! Prompt templates for the text generation calls.

use storyreel_models::{sentinel, Candidate, VideoStats};

/// Inputs to the analysis and script prompt.
#[derive(Debug, Clone, Copy)]
pub struct ScriptPromptInput<'a> {
    pub search_term: &'a str,
    pub title: &'a str,
    pub description: &'a str,
    pub stats: &'a VideoStats,
    pub scene_count: usize,
    pub description_limit: usize,
    pub language: &'a str,
}

/// Truncate to at most `limit` characters.
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Analysis + narration script + scene prompts, answered as one JSON object.
pub fn script_prompt(input: &ScriptPromptInput<'_>) -> String {
    let n = input.scene_count;
    format!(
        r#"Title: {title}
Description: {description}
Stats: views {views}, likes {likes}, comments {comments}
Search topic: {term}

Analyze the core of the content above and answer with a JSON object containing the fields below.
Write "analysis" and "script" in {language}.

IMPORTANT:
- If the title and description are not enough to understand the content, set "analysis" to exactly "{no_analysis}" and "script" to exactly "{no_script}". Do not invent content.

1. "analysis": two sentences explaining why this content matters.
2. "script": a storytelling news narration, as if you researched the story yourself.
   - No greeting, opening remark or preamble. Start directly with the first fact.
   - Never describe the source as a video, never mention timestamps or what "the video shows".
   - Report events declaratively ("The northern expedition was a turning point"), not as commentary about the material.
   - Use the concrete figures from the description (amounts, years, quantities) verbatim.
   - Insert the scene markers [1] through [{n}] exactly once each, in order, spread across the narration between sentences.
   - Do not name broadcasters, reporters or other outlets. Do not address the audience.
   - Friendly, trustworthy tone. Around 800 characters. Use line breaks for readability.
3. "imagePrompts": an array of exactly {n} English prompts, one per scene marker, in order.
   - Describe only the situation to depict in that part of the narration.
   - Never include style words (black and white, line art, photorealistic, ...).
   - Never include text, captions or speech bubbles in the image.

Response format: {{"analysis": "...", "script": "...", "imagePrompts": ["...", ...]}}
"#,
        title = input.title,
        description = truncate_chars(input.description, input.description_limit),
        views = input.stats.views,
        likes = input.stats.likes,
        comments = input.stats.comments,
        term = input.search_term,
        language = input.language,
        no_analysis = sentinel::NO_CONTENT_ANALYSIS,
        no_script = sentinel::NO_CONTENT_SCRIPT,
        n = n,
    )
}

/// Diversity ranking over recency-sorted candidates.
pub fn selection_prompt(search_term: &str, candidates: &[Candidate], count: usize) -> String {
    let listing = candidates
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{}. [{}] {}", i, c.published_date(), c.title))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Below is a list of videos. Search term: "{search_term}"

Selection criteria:
1. Pick {count} videos whose topics overlap by less than 50%, each covering something different.
2. For reporting accuracy, prefer the most recent videos where possible.

Answer with JSON only, no markdown or explanation: {{"selectedIndices": [index1, index2, ...]}}

Videos (most recent first):
{listing}
"#
    )
}
