//! Rule-based heading scoring from text patterns and typography.

use std::collections::{BTreeMap, HashMap};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::cluster::{passes_candidate_filter, HeadingDetector};
use crate::language::Language;
use crate::model::{is_upper, HeadingCandidate, HeadingLevel, TextFragment};

const MIN_CHARS: usize = 3;
const MAX_CHARS: usize = 200;
/// Highest reachable score: rule 2, size 3, bold 1, capitalisation 1.
const MAX_SCORE: u32 = 7;

/// One entry in a language's ordered rule table.
#[derive(Debug)]
pub struct MatcherRule {
    pub pattern: Regex,
    pub score: u32,
    /// Depth-specific numbering pins the level regardless of score.
    pub forced: Option<HeadingLevel>,
}

impl MatcherRule {
    fn new(pattern: &str, score: u32, forced: Option<HeadingLevel>) -> Self {
        Self {
            pattern: Regex::new(pattern).unwrap(),
            score,
            forced,
        }
    }
}

/// Ordered rule tables per language; deeper numbering is tested first so
/// `1.2.3` never matches the `1.2` rule.
pub static HEADING_RULES: Lazy<HashMap<Language, Vec<MatcherRule>>> = Lazy::new(|| {
    use HeadingLevel::*;

    let numbered = || {
        vec![
            MatcherRule::new(r"^\d+\.\d+\.\d+\.?\s*\S", 2, Some(H3)),
            MatcherRule::new(r"^\d+\.\d+\.?\s*\S", 2, Some(H2)),
            MatcherRule::new(r"^\d+\.\s*\S", 2, Some(H1)),
        ]
    };

    let mut english = numbered();
    english.extend([
        MatcherRule::new(r"(?i)^chapter\s+\d+", 2, Some(H1)),
        MatcherRule::new(r"^(Section|Part|Appendix|SECTION|PART|APPENDIX)\s+[A-Z0-9]+", 2, None),
        MatcherRule::new(r"^[IVX]+\.\s*[A-Z]", 2, None),
        MatcherRule::new(r"^[A-Z]\.\s*[A-Z]", 2, None),
        MatcherRule::new(
            r"(?i)^(introduction|conclusions?|abstract|summary|overview|background)$",
            2,
            None,
        ),
        MatcherRule::new(r"^[A-Z][A-Z\s]{3,}$", 2, None),
        MatcherRule::new(r"^[A-Z][A-Za-z\s]{5,}$", 1, None),
    ]);

    let mut japanese = vec![
        MatcherRule::new(r"^第[0-9０-９一二三四五六七八九十百]+章", 2, Some(H1)),
        MatcherRule::new(r"^第[0-9０-９一二三四五六七八九十百]+節", 2, Some(H2)),
    ];
    japanese.extend(numbered());
    japanese.extend([
        MatcherRule::new(r"^[０-９]+[．.]\s*", 2, None),
        MatcherRule::new(r"^[一二三四五六七八九十]+[、.．]", 2, None),
    ]);

    HashMap::from([(Language::English, english), (Language::Japanese, japanese)])
});

/// Result of scoring one fragment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LexicalMatch {
    pub level: HeadingLevel,
    pub score: u32,
    pub forced: bool,
    pub confidence: f32,
}

/// Title case in the `str.istitle` sense: every cased run starts with an
/// upper-case letter followed only by lower-case letters.
pub fn is_title_case(text: &str) -> bool {
    let mut cased = false;
    let mut previous_cased = false;
    for c in text.chars() {
        if c.is_uppercase() {
            if previous_cased {
                return false;
            }
            previous_cased = true;
            cased = true;
        } else if c.is_lowercase() {
            if !previous_cased {
                return false;
            }
            previous_cased = true;
            cased = true;
        } else {
            previous_cased = false;
        }
    }
    cased
}

fn size_score(font_size: f32, page_average: f32) -> u32 {
    if font_size > page_average * 1.5 {
        3
    } else if font_size > page_average * 1.2 {
        2
    } else if font_size > page_average {
        1
    } else {
        0
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalScorer;

impl LexicalScorer {
    /// Score a fragment against its page's average font size.
    pub fn score(
        &self,
        fragment: &TextFragment,
        page_average: f32,
        language: Language,
    ) -> Option<LexicalMatch> {
        let text = fragment.text.trim();
        let len = text.chars().count();
        if !(MIN_CHARS..=MAX_CHARS).contains(&len) {
            return None;
        }
        if text.ends_with(['.', '!', '?', ';', ',']) {
            return None;
        }

        let mut score = 0;
        let mut forced = None;
        if let Some(rule) = HEADING_RULES
            .get(&language)
            .and_then(|rules| rules.iter().find(|r| r.pattern.is_match(text)))
        {
            score += rule.score;
            forced = rule.forced;
        }

        score += size_score(fragment.font_size, page_average);
        if fragment.is_bold {
            score += 1;
        }
        if (len > 5 && is_upper(text)) || is_title_case(text) {
            score += 1;
        }

        let level = forced.or(match score {
            s if s >= 4 => Some(HeadingLevel::H1),
            3 => Some(HeadingLevel::H2),
            2 => Some(HeadingLevel::H3),
            _ => None,
        })?;

        Some(LexicalMatch {
            level,
            score,
            forced: forced.is_some(),
            confidence: (score as f32 / MAX_SCORE as f32).min(1.0),
        })
    }
}

/// Mean font size per page.
pub fn page_averages(fragments: &[TextFragment]) -> BTreeMap<usize, f32> {
    let mut totals: BTreeMap<usize, (f32, usize)> = BTreeMap::new();
    for f in fragments {
        let entry = totals.entry(f.page).or_default();
        entry.0 += f.font_size;
        entry.1 += 1;
    }
    totals
        .into_iter()
        .map(|(page, (sum, n))| (page, sum / n as f32))
        .collect()
}

impl HeadingDetector for LexicalScorer {
    fn detect_headings(&self, fragments: &[TextFragment], language: Language) -> Vec<HeadingCandidate> {
        let averages = page_averages(fragments);
        fragments
            .iter()
            .filter(|f| passes_candidate_filter(&f.text))
            .filter_map(|f| {
                let average = averages.get(&f.page).copied().unwrap_or(f.font_size);
                let found = self.score(f, average, language)?;
                Some(HeadingCandidate::new(f.clone(), found.level).with_confidence(found.confidence))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BBox;

    fn fragment(text: &str, size: f32, bold: bool) -> TextFragment {
        TextFragment {
            text: text.to_string(),
            page: 1,
            font_size: size,
            font_name: String::new(),
            is_bold: bold,
            bbox: BBox::ZERO,
        }
    }

    fn score(text: &str, size: f32, bold: bool) -> Option<LexicalMatch> {
        LexicalScorer.score(&fragment(text, size, bold), 12.0, Language::English)
    }

    #[test]
    fn test_title_case() {
        assert!(is_title_case("Project Overview"));
        assert!(is_title_case("1.1 Background"));
        assert!(!is_title_case("Project overview"));
        assert!(!is_title_case("NASA Budget"));
        assert!(!is_title_case("123"));
    }

    #[test]
    fn test_forced_levels_from_numbering() {
        assert_eq!(score("1. Introduction", 12.0, false).unwrap().level, HeadingLevel::H1);
        assert_eq!(score("2.3 Scope of work", 12.0, false).unwrap().level, HeadingLevel::H2);
        let deep = score("2.3.1 Data sources", 30.0, true).unwrap();
        assert_eq!(deep.level, HeadingLevel::H3);
        assert!(deep.forced);
        assert_eq!(score("Chapter 4 Results", 10.0, false).unwrap().level, HeadingLevel::H1);
    }

    #[test]
    fn test_score_bands() {
        // Generic rule +1, size +3, bold +1, title case +1.
        let big = score("Executive Summary", 20.0, true).unwrap();
        assert_eq!(big.level, HeadingLevel::H1);
        assert_eq!(big.score, 6);
        assert!(!big.forced);
        assert!(big.confidence > 0.8 && big.confidence < 1.0);

        // Generic rule +1, title case +1.
        assert_eq!(score("Budget Notes", 12.0, false).unwrap().level, HeadingLevel::H3);

        // Nothing but a lower-case phrase at body size.
        assert_eq!(score("plain body words", 12.0, false), None);
    }

    #[test]
    fn test_rejects_sentences() {
        assert_eq!(score("This ends with a period.", 30.0, true), None);
        assert_eq!(score("Hi", 30.0, true), None);
        assert_eq!(score(&"A".repeat(201), 30.0, true), None);
    }

    #[test]
    fn test_japanese_rules() {
        let chapter = fragment("第2章 システム設計", 12.0, false);
        let section = fragment("第3節 実装", 12.0, false);
        let scorer = LexicalScorer;
        assert_eq!(
            scorer.score(&chapter, 12.0, Language::Japanese).unwrap().level,
            HeadingLevel::H1
        );
        assert_eq!(
            scorer.score(&section, 12.0, Language::Japanese).unwrap().level,
            HeadingLevel::H2
        );
    }

    #[test]
    fn test_detector_uses_page_average() {
        let mut fragments = vec![fragment("Quarterly Review", 24.0, false)];
        for _ in 0..5 {
            fragments.push(fragment("ordinary sentence text that continues", 10.0, false));
        }
        let candidates = LexicalScorer.detect_headings(&fragments, Language::English);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].level, HeadingLevel::H1);
        assert!(candidates[0].confidence.is_some());
    }
}
