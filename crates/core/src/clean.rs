//! Best-effort cleanup of dictionary markup into short display strings.
//!
//! Dictionary entries arrive as HTML fragments mixing the translation with
//! grammatical gender, register labels, alternatives and whole example
//! sentences. These heuristics keep the short headword-like candidates and
//! drop the rest; valid but noisy candidates may be lost.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

pub const MAX_ALTERNATIVES: usize = 8;
/// Candidates must be strictly shorter than this many characters.
pub const MAX_CANDIDATE_CHARS: usize = 25;
pub const MAX_DEFINITION_PARTS: usize = 4;
pub const DEFINITION_SEPARATOR: &str = " • ";

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));
static TRAILING_GENDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+[fmn]t?\s*$").expect("valid regex"));
static ALTERNATIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\[or\s+[^\]]+\]").expect("valid regex"));
static USAGE_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:dated|inf|form)\b\.?").expect("valid regex"));
static EMPTY_PARENS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(\s*\)").expect("valid regex"));
static ARTIFACT_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:sb|sth|jdn|etw|dat|akk)\b").expect("valid regex"));
static ENUMERATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.\s*").expect("valid regex"));

/// Removes tags, decodes entities and collapses whitespace.
pub fn strip_markup(fragment: &str) -> String {
    let without_tags = TAG.replace_all(fragment, "");
    let decoded = html_escape::decode_html_entities(&without_tags);
    collapse_whitespace(&decoded)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Example sentences are tagged on the source side of the pair.
pub fn is_example(source_fragment: &str) -> bool {
    source_fragment.contains(r#"class="example""#)
}

/// Turns one target fragment into a bare candidate.
pub fn clean_candidate(target_fragment: &str) -> String {
    let text = strip_markup(target_fragment);
    let text = ALTERNATIVE.replace_all(&text, "");
    let text = USAGE_LABEL.replace_all(&text, " ");
    let text = EMPTY_PARENS.replace_all(&text, " ");
    // The gender marker is only trailing once the suffixes above are gone.
    let text = TRAILING_GENDER.replace(&text, "");
    collapse_whitespace(&text)
}

/// Reflexive and prepositional-phrase entries that read as grammar notes
/// rather than translations.
pub fn is_artifact(candidate: &str) -> bool {
    if ARTIFACT_TOKEN.is_match(candidate) {
        return true;
    }
    if candidate.starts_with("to ") && candidate.chars().count() > 15 {
        return true;
    }
    candidate.starts_with("sich ")
}

/// Cleans `(source, target)` fragment pairs into at most
/// [`MAX_ALTERNATIVES`] distinct candidates, preserving first-seen order.
pub fn clean_translations<'a, I>(pairs: I) -> Vec<String>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for (source, target) in pairs {
        if out.len() == MAX_ALTERNATIVES {
            break;
        }
        if is_example(source) {
            continue;
        }
        let candidate = clean_candidate(target);
        if candidate.is_empty()
            || is_artifact(&candidate)
            || candidate.chars().count() >= MAX_CANDIDATE_CHARS
        {
            continue;
        }
        if seen.insert(candidate.to_lowercase()) {
            out.push(candidate);
        }
    }

    out
}

/// Cleans a sense header such as `"1. <span>building</span>:"`.
pub fn clean_header(header: &str) -> Option<String> {
    let text = strip_markup(header);
    let text = ENUMERATION.replace(&text, "");
    let text = text.trim().trim_end_matches(':').trim();
    (text.chars().count() > 2).then(|| text.to_string())
}

/// Joins definition parts, dropping short and repeated ones, capped at
/// [`MAX_DEFINITION_PARTS`].
pub fn assemble_definition<I>(parts: I) -> String
where
    I: IntoIterator<Item = String>,
{
    let mut unique: Vec<String> = Vec::new();
    for part in parts {
        if unique.len() == MAX_DEFINITION_PARTS {
            break;
        }
        let part = part.trim().trim_end_matches(':').trim();
        if part.chars().count() > 2 && !unique.iter().any(|u| u == part) {
            unique.push(part.to_string());
        }
    }
    unique.join(DEFINITION_SEPARATOR)
}
