//! Text derivations for blog posts: slugs, excerpts, reading time and tags.

use regex::Regex;

lazy_static::lazy_static! {
    static ref HTML_TAG: Regex = Regex::new(r"<[^>]+>").unwrap();
    static ref NON_SLUG_CHARS: Regex = Regex::new(r"[^a-z0-9\s_-]").unwrap();
    static ref SEPARATOR_RUN: Regex = Regex::new(r"[\s_-]+").unwrap();
    /// Valid slug pattern: lowercase letters, numbers, and single hyphens
    static ref SLUG_REGEX: Regex = Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap();
}

/// Maximum excerpt length in characters, before the ellipsis.
pub const EXCERPT_MAX_CHARS: usize = 200;

pub const WORDS_PER_MINUTE: usize = 200;

const FALLBACK_SLUG: &str = "post";

pub fn is_valid_slug(slug: &str) -> bool {
    SLUG_REGEX.is_match(slug)
}

fn fold_accent(c: char) -> Option<&'static str> {
    let folded = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' => "a",
        'æ' => "ae",
        'ç' | 'ć' | 'č' => "c",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ę' => "e",
        'ì' | 'í' | 'î' | 'ï' | 'ī' => "i",
        'ñ' | 'ń' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' => "o",
        'œ' => "oe",
        'ù' | 'ú' | 'û' | 'ü' | 'ū' => "u",
        'ý' | 'ÿ' => "y",
        'ß' => "ss",
        'ś' | 'š' => "s",
        'ź' | 'ż' | 'ž' => "z",
        'ł' => "l",
        _ => return None,
    };
    Some(folded)
}

/// Derive a URL-safe slug from a title.
///
/// Lowercases, folds accented latin letters to ASCII, drops punctuation and
/// collapses whitespace, underscore and hyphen runs into single hyphens.
/// A title with nothing sluggable left yields `"post"`.
pub fn slugify(title: &str) -> String {
    let mut folded = String::with_capacity(title.len());
    for c in title.to_lowercase().chars() {
        match fold_accent(c) {
            Some(ascii) => folded.push_str(ascii),
            None => folded.push(c),
        }
    }

    let cleaned = NON_SLUG_CHARS.replace_all(&folded, "");
    let hyphenated = SEPARATOR_RUN.replace_all(cleaned.trim(), "-");
    let slug = hyphenated.trim_matches('-');

    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug.to_string()
    }
}

/// `base` for attempt 0, then `base-1`, `base-2`, ...
pub fn slug_with_suffix(base: &str, attempt: u32) -> String {
    if attempt == 0 {
        base.to_string()
    } else {
        format!("{}-{}", base, attempt)
    }
}

/// Remove HTML tags and collapse whitespace.
pub fn strip_tags(content: &str) -> String {
    HTML_TAG
        .replace_all(content, " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Plain-text summary of `content`: at most 200 characters cut on a word
/// boundary, with `...` appended when truncated.
pub fn generate_excerpt(content: &str) -> String {
    let clean = strip_tags(content);
    if clean.chars().count() <= EXCERPT_MAX_CHARS {
        return clean;
    }

    let cut: String = clean.chars().take(EXCERPT_MAX_CHARS).collect();
    let next_is_break = clean
        .chars()
        .nth(EXCERPT_MAX_CHARS)
        .map_or(true, char::is_whitespace);

    let excerpt = if next_is_break {
        cut.as_str()
    } else {
        match cut.rfind(' ') {
            Some(idx) if idx > 0 => &cut[..idx],
            // a single word longer than the limit
            _ => cut.as_str(),
        }
    };

    format!("{}...", excerpt.trim_end())
}

/// Reading time in minutes: `max(1, round(words / 200))`, halves rounding up.
pub fn calculate_read_time(content: &str) -> i64 {
    let words = strip_tags(content).split_whitespace().count();
    let minutes = (words + WORDS_PER_MINUTE / 2) / WORDS_PER_MINUTE;
    minutes.max(1) as i64
}

/// Join tags for storage as `"a, b, c"`; empty input stores nothing.
pub fn join_tags<I, S>(tags: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let cleaned: Vec<String> = tags
        .into_iter()
        .map(|t| t.as_ref().trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();

    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.join(", "))
    }
}

pub fn split_tags(stored: Option<&str>) -> Vec<String> {
    stored
        .map(|s| {
            s.split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
