//! Document language: English or Japanese.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::TextFragment;

/// Fragments sampled from the start of the document.
pub const SAMPLE_FRAGMENTS: usize = 100;
/// Fragments this short or shorter are left out of the sample.
const MIN_SAMPLE_CHARS: usize = 5;
/// More Japanese-script characters than this settles the question.
const JAPANESE_CHAR_THRESHOLD: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    English,
    Japanese,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::English => "english",
            Language::Japanese => "japanese",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// General-purpose language identification.
///
/// `None` means the detector could not decide; callers treat that as English.
pub trait LanguageDetector {
    fn detect(&self, text: &str) -> Option<String>;
}

/// [`LanguageDetector`] backed by `whatlang`, reporting ISO 639-1 codes for
/// the two languages we care about.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhatlangDetector;

impl LanguageDetector for WhatlangDetector {
    fn detect(&self, text: &str) -> Option<String> {
        let info = whatlang::detect(text)?;
        if !info.is_reliable() {
            return None;
        }
        let code = match info.lang() {
            whatlang::Lang::Jpn => "ja",
            whatlang::Lang::Eng => "en",
            other => other.code(),
        };
        Some(code.to_string())
    }
}

/// Hiragana, Katakana or CJK unified ideograph.
pub fn is_japanese_char(c: char) -> bool {
    matches!(c as u32, 0x3040..=0x309F | 0x30A0..=0x30FF | 0x4E00..=0x9FAF)
}

/// Classify a document from the leading fragments.
///
/// The script count short-circuits: the detector is only consulted when the
/// sample holds ten or fewer Japanese-script characters.
pub fn detect_language<D>(fragments: &[TextFragment], detector: &D) -> Language
where
    D: LanguageDetector + ?Sized,
{
    let sample = fragments
        .iter()
        .take(SAMPLE_FRAGMENTS)
        .filter(|f| f.text.chars().count() > MIN_SAMPLE_CHARS)
        .map(|f| f.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    let japanese_chars = sample.chars().filter(|c| is_japanese_char(*c)).count();
    if japanese_chars > JAPANESE_CHAR_THRESHOLD {
        return Language::Japanese;
    }

    match detector.detect(&sample).as_deref() {
        Some("ja") => Language::Japanese,
        _ => Language::English,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BBox;
    use std::cell::Cell;

    struct CountingDetector {
        calls: Cell<usize>,
        answer: Option<&'static str>,
    }

    impl CountingDetector {
        fn new(answer: Option<&'static str>) -> Self {
            Self {
                calls: Cell::new(0),
                answer,
            }
        }
    }

    impl LanguageDetector for CountingDetector {
        fn detect(&self, _text: &str) -> Option<String> {
            self.calls.set(self.calls.get() + 1);
            self.answer.map(str::to_string)
        }
    }

    fn fragment(text: &str) -> TextFragment {
        TextFragment {
            text: text.to_string(),
            page: 1,
            font_size: 12.0,
            font_name: String::new(),
            is_bold: false,
            bbox: BBox::ZERO,
        }
    }

    #[test]
    fn test_japanese_script_skips_detector() {
        let detector = CountingDetector::new(Some("en"));
        let fragments = vec![
            fragment("第1章 はじめに"),
            fragment("本書の目的と構成について説明します"),
        ];
        assert_eq!(detect_language(&fragments, &detector), Language::Japanese);
        assert_eq!(detector.calls.get(), 0);
    }

    #[test]
    fn test_detector_codes() {
        let fragments = vec![fragment("Plain English sentence here")];

        let detector = CountingDetector::new(Some("ja"));
        assert_eq!(detect_language(&fragments, &detector), Language::Japanese);
        assert_eq!(detector.calls.get(), 1);

        let detector = CountingDetector::new(Some("fra"));
        assert_eq!(detect_language(&fragments, &detector), Language::English);

        let detector = CountingDetector::new(None);
        assert_eq!(detect_language(&fragments, &detector), Language::English);
    }

    #[test]
    fn test_short_fragments_left_out_of_sample() {
        // Five characters each: none counts towards the script total.
        let fragments: Vec<_> = (0..10).map(|_| fragment("日本語です。")).collect();
        let short: Vec<_> = (0..10).map(|_| fragment("日本語です")).collect();
        let detector = CountingDetector::new(None);

        assert_eq!(detect_language(&fragments, &detector), Language::Japanese);
        assert_eq!(detect_language(&short, &detector), Language::English);
        assert_eq!(detector.calls.get(), 1);
    }

    #[test]
    fn test_whatlang_detects_english_prose() {
        let text = "The quick brown fox jumps over the lazy dog while the committee \
                    reviews the annual report and discusses the budget for next year.";
        assert_eq!(WhatlangDetector.detect(text).as_deref(), Some("en"));
    }
}
