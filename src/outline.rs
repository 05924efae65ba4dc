//! Outline assembly: ordering, heading text cleanup, fuzzy deduplication,
//! and document title inference.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{Heading, HeadingCandidate, Outline, PageTextDict};
use crate::normalize::normalize_page;

/// Entries more similar than this to an earlier entry are dropped.
pub const DUPLICATE_RATIO: f64 = 0.85;
const MIN_HEADING_CHARS: usize = 3;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static LEADING_NUMBERING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\d.\-\s]+").unwrap());
static TRAILING_PUNCTUATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.\-\s]+$").unwrap());
static BARE_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").unwrap());

/// Strip numbering, trailing punctuation and extra whitespace.
///
/// Returns `None` when fewer than three characters survive.
pub fn clean_heading_text(text: &str) -> Option<String> {
    let collapsed = WHITESPACE_RUN.replace_all(text.trim(), " ");
    let without_numbering = LEADING_NUMBERING.replace(&collapsed, "");
    let stripped = TRAILING_PUNCTUATION.replace(without_numbering.trim(), "");
    let cleaned = stripped.trim();

    let mut chars = cleaned.chars();
    let cleaned: String = match chars.next() {
        Some(first) if first.is_lowercase() => first.to_uppercase().chain(chars).collect(),
        _ => cleaned.to_string(),
    };

    (cleaned.chars().count() >= MIN_HEADING_CHARS).then_some(cleaned)
}

/// Ratcliff/Obershelp similarity, `2·M / T`, over characters.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_characters(&a, &b) as f64 / total as f64
}

/// Total size of the recursively found longest common blocks.
fn matching_characters(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, k) = longest_match(a, b, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        matched += k;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            pending.push((i + k, ahi, j + k, bhi));
        }
    }
    matched
}

/// Longest common run in `a[alo..ahi]` × `b[blo..bhi]`, earliest in `a` on ties.
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let width = bhi - blo + 1;
    let mut best = (alo, blo, 0);
    let mut prev = vec![0usize; width];
    let mut cur = vec![0usize; width];

    for i in alo..ahi {
        for j in blo..bhi {
            let slot = j - blo + 1;
            if a[i] == b[j] {
                let k = prev[slot - 1] + 1;
                cur[slot] = k;
                if k > best.2 {
                    best = (i + 1 - k, j + 1 - k, k);
                }
            } else {
                cur[slot] = 0;
            }
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    best
}

/// Order, clean and deduplicate candidates into outline entries.
pub fn build_outline(mut candidates: Vec<HeadingCandidate>) -> Vec<Heading> {
    candidates.sort_by(|a, b| {
        a.fragment
            .page
            .cmp(&b.fragment.page)
            .then(a.fragment.y().total_cmp(&b.fragment.y()))
    });

    let mut seen: Vec<String> = Vec::new();
    let mut outline = Vec::new();

    for candidate in candidates {
        let Some(text) = clean_heading_text(&candidate.fragment.text) else {
            continue;
        };
        let key = text.to_lowercase();
        if seen
            .iter()
            .any(|s| similarity_ratio(&key, s) > DUPLICATE_RATIO)
        {
            log::trace!("Dropping near-duplicate heading {:?}", text);
            continue;
        }
        seen.push(key);
        outline.push(Heading {
            level: candidate.level,
            text,
            page: candidate.fragment.page,
        });
    }

    outline
}

// ---------------------------------------------------------------------------
// Title inference
// ---------------------------------------------------------------------------

/// Minimum font size for a typographic title on the first page.
const TITLE_MIN_SIZE: f32 = 14.0;

/// Document title: metadata, then the largest first-page span, then the best
/// scored first-page line, then `"Unknown Document"`.
pub fn infer_title(metadata_title: Option<&str>, first_page: Option<&PageTextDict>) -> String {
    if let Some(title) = metadata_title.map(str::trim).filter(|t| !t.is_empty()) {
        return title.to_string();
    }

    let Some(page) = first_page else {
        return Outline::UNKNOWN_DOCUMENT.to_string();
    };

    if let Some(title) = typographic_title(page) {
        return title;
    }

    let lines: Vec<String> = normalize_page(page, 1).into_iter().map(|f| f.text).collect();
    scored_line_title(&lines).unwrap_or_else(|| Outline::UNKNOWN_DOCUMENT.to_string())
}

/// Largest span with plausible title length; the top-most wins a size tie.
fn typographic_title(page: &PageTextDict) -> Option<String> {
    let mut candidates: Vec<(&str, f32, f32)> = page
        .spans()
        .filter_map(|span| {
            let text = span.text.trim();
            let len = text.chars().count();
            let size = span.font_size();
            (len > 5 && len < 100 && size > TITLE_MIN_SIZE && !BARE_NUMBER.is_match(text))
                .then(|| (text, size, span.bbox().y0))
        })
        .collect();

    candidates.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.2.total_cmp(&b.2)));
    candidates.first().map(|(text, _, _)| text.to_string())
}

const TITLE_INDICATORS: [&str; 20] = [
    "foundation", "guide", "manual", "handbook", "report", "study",
    "analysis", "overview", "introduction", "specification", "standard",
    "requirements", "proposal", "plan", "strategy", "framework",
    "methodology", "principles", "best practices", "guidelines",
];

const PROSE_INDICATORS: [&str; 9] = [
    "the following", "this document", "as described", "according to",
    "it is", "there are", "you will", "we recommend", "please note",
];

/// Heuristic score over the first twenty lines of the first page.
fn scored_line_title(lines: &[String]) -> Option<String> {
    let mut best: Option<(&str, i32)> = None;

    for (i, line) in lines.iter().take(20).enumerate() {
        let line = line.trim();
        let len = line.chars().count();
        if !(5..=200).contains(&len) {
            continue;
        }
        let lower = line.to_lowercase();
        if line.starts_with("Page ")
            || ["http", "www.", "@", "©", "table of contents"]
                .iter()
                .any(|s| lower.contains(s))
        {
            continue;
        }

        let mut score = (20 - i as i32) / 2;
        if (20..=100).contains(&len) {
            score += 15;
        }

        let words: Vec<&str> = line.split_whitespace().collect();
        let capitalized = words
            .iter()
            .filter(|w| w.chars().next().map_or(false, char::is_uppercase))
            .count();
        if words.len() >= 2 && capitalized > words.len() / 2 {
            score += 20;
        }
        if line == line.to_uppercase() && len <= 80 {
            score += 10;
        }

        score += 10 * TITLE_INDICATORS.iter().filter(|w| lower.contains(*w)).count() as i32;
        if PROSE_INDICATORS.iter().any(|p| lower.contains(p)) {
            score -= 20;
        }
        if line.ends_with('.') && words.len() > 8 {
            score -= 10;
        }

        // Strictly greater, so the earliest line wins ties.
        if score > 0 && best.map_or(true, |(_, s)| score > s) {
            best = Some((line, score));
        }
    }

    best.map(|(line, _)| line.to_string())
}
