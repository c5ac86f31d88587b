//! Blog text helpers: slugs, excerpts, reading time, tags and AI drafts.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

pub const POST_STATUSES: &[&str] = &["draft", "published", "archived"];

/// Reading speed used for `reading_time_minutes`.
pub const WORDS_PER_MINUTE: usize = 200;

pub const EXCERPT_MAX_CHARS: usize = 160;

pub const MAX_TAGS: usize = 10;

const MAX_SLUG_LENGTH: usize = 80;

fn non_slug_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"))
}

fn markdown_noise() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[#*_`>\[\]]+|\(https?://[^)]*\)").expect("valid regex"))
}

// ---------------------------------------------------------------------------
// Slugs
// ---------------------------------------------------------------------------

/// Lower-case, ASCII-only, dash-separated slug. Empty titles yield `"post"`.
pub fn slugify(title: &str) -> String {
    let lower = title.to_lowercase();
    let slug = non_slug_chars().replace_all(&lower, "-");
    let mut slug = slug.trim_matches('-').to_string();
    if slug.len() > MAX_SLUG_LENGTH {
        slug.truncate(MAX_SLUG_LENGTH);
        slug = slug.trim_end_matches('-').to_string();
    }
    if slug.is_empty() {
        "post".to_string()
    } else {
        slug
    }
}

/// First of `base`, `base-2`, `base-3`, ... not present in `taken`.
pub fn unique_slug(base: &str, taken: &[String]) -> String {
    if !taken.iter().any(|t| t == base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| !taken.iter().any(|t| t == candidate))
        .unwrap_or_else(|| base.to_string())
}

// ---------------------------------------------------------------------------
// Derived fields
// ---------------------------------------------------------------------------

pub fn reading_time_minutes(content: &str) -> i32 {
    let words = content.split_whitespace().count();
    words.div_ceil(WORDS_PER_MINUTE).max(1) as i32
}

/// Plain-text excerpt of at most `max_chars` characters, cut on a word
/// boundary and suffixed with `…` when shortened.
pub fn auto_excerpt(content: &str, max_chars: usize) -> String {
    let plain = markdown_noise().replace_all(content, "");
    let collapsed = plain.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }

    let budget = max_chars.saturating_sub(1);
    let mut cut: String = collapsed.chars().take(budget).collect();
    let ends_on_boundary = collapsed.chars().nth(budget) == Some(' ');
    if !ends_on_boundary {
        if let Some(idx) = cut.rfind(' ') {
            if idx > 0 {
                cut.truncate(idx);
            }
        }
    }
    format!("{}…", cut.trim_end_matches([',', '.', ';', ':']))
}

/// Trim, lower-case and de-duplicate tags, keeping the first `MAX_TAGS`.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.clone()))
        .take(MAX_TAGS)
        .collect()
}

pub fn validate_post_status(status: &str) -> Result<(), CoreError> {
    if POST_STATUSES.contains(&status) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid post status '{status}'"
        )))
    }
}

// ---------------------------------------------------------------------------
// AI drafts
// ---------------------------------------------------------------------------

/// A generated post before it is saved as a draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiDraft {
    pub title: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Prompt asking the model for a JSON blog post draft.
pub fn build_draft_prompt(topic: &str, keywords: &[String], tone: Option<&str>) -> String {
    let mut prompt = format!(
        "Write a blog post for property managers and landlords about: {}\n",
        topic.trim()
    );
    if !keywords.is_empty() {
        prompt.push_str(&format!("Work in these keywords: {}\n", keywords.join(", ")));
    }
    prompt.push_str(&format!("Tone: {}\n", tone.unwrap_or("professional and practical")));
    prompt.push_str(
        "Respond with a single JSON object with the keys \"title\", \"excerpt\", \
         \"content\" (Markdown) and \"tags\" (array of strings). No other text.",
    );
    prompt
}

/// Parse a model response into a draft.
///
/// Accepts a bare JSON object or one inside a fenced code block. Anything
/// else is read as plain text: the first non-empty line (minus leading
/// `#`) is the title and the remainder the content.
pub fn parse_ai_draft(response: &str) -> Result<AiDraft, CoreError> {
    let text = response.trim();
    if text.is_empty() {
        return Err(CoreError::Internal("AI response was empty".into()));
    }

    let candidate = strip_code_fence(text).unwrap_or(text);
    if let Some(json) = extract_json_object(candidate) {
        if let Ok(mut draft) = serde_json::from_str::<AiDraft>(json) {
            draft.title = draft.title.trim().to_string();
            draft.tags = normalize_tags(&draft.tags);
            if !draft.title.is_empty() && !draft.content.trim().is_empty() {
                return Ok(draft);
            }
        }
    }

    let mut lines = text.lines().skip_while(|l| l.trim().is_empty());
    let title = lines
        .next()
        .map(|l| l.trim().trim_start_matches('#').trim().to_string())
        .unwrap_or_default();
    let content = lines.collect::<Vec<_>>().join("\n").trim().to_string();
    if title.is_empty() || content.is_empty() {
        return Err(CoreError::Internal(
            "AI response did not contain a usable draft".into(),
        ));
    }
    Ok(AiDraft {
        title,
        excerpt: None,
        content,
        tags: Vec::new(),
    })
}

fn strip_code_fence(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after = &text[start + 3..];
    let body_start = after.find('\n')? + 1;
    let body = &after[body_start..];
    let end = body.find("```")?;
    Some(body[..end].trim())
}

fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
