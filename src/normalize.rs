//! Merge extractor spans into one [`TextFragment`] per visual line.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{BBox, LineDict, PageTextDict, TextFragment};

/// Shortest line kept, in characters.
pub const MIN_LINE_CHARS: usize = 3;
/// Longest line kept; longer lines are body text.
pub const MAX_LINE_CHARS: usize = 300;

/// Lower-cased lines that are navigation furniture, not content.
const FURNITURE_LINES: [&str; 5] = ["page", "contents", "index", "references", "bibliography"];

static PAGE_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").unwrap());

/// Normalize one page. `page` is 1-based.
pub fn normalize_page(dict: &PageTextDict, page: usize) -> Vec<TextFragment> {
    dict.lines()
        .filter_map(|line| normalize_line(line, page))
        .collect()
}

/// Normalize a sequence of pages, numbering them from 1.
pub fn normalize_pages<'a, I>(pages: I) -> Vec<TextFragment>
where
    I: IntoIterator<Item = &'a PageTextDict>,
{
    pages
        .into_iter()
        .enumerate()
        .flat_map(|(i, dict)| normalize_page(dict, i + 1))
        .collect()
}

fn normalize_line(line: &LineDict, page: usize) -> Option<TextFragment> {
    let mut parts: Vec<&str> = Vec::with_capacity(line.spans.len());
    let mut bbox: Option<BBox> = None;
    let mut dominant = None;
    let mut dominant_size = 0.0_f32;

    for span in &line.spans {
        let text = span.text.trim();
        if text.is_empty() {
            continue;
        }
        parts.push(text);

        // Strictly larger, so the first span wins ties.
        let size = span.font_size();
        if dominant.is_none() || size > dominant_size {
            dominant = Some(span);
            dominant_size = size;
        }

        let span_box = span.bbox();
        bbox = Some(match bbox {
            Some(b) => b.union(&span_box),
            None => span_box,
        });
    }

    let dominant = dominant?;
    let text = parts.join(" ");
    if !keep_line(&text) {
        return None;
    }

    Some(TextFragment {
        text,
        page,
        font_size: dominant_size,
        font_name: dominant.font.clone(),
        is_bold: dominant.flags.is_bold(),
        bbox: bbox.unwrap_or(BBox::ZERO),
    })
}

/// Length, page-number and furniture filters on the joined line text.
pub fn keep_line(text: &str) -> bool {
    let len = text.chars().count();
    if len < MIN_LINE_CHARS || len > MAX_LINE_CHARS {
        return false;
    }
    if PAGE_NUMBER.is_match(text) {
        return false;
    }
    let lower = text.to_lowercase();
    !FURNITURE_LINES.contains(&lower.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BlockDict, SpanDict, StyleFlags};

    fn span(text: &str, size: f32, bbox: [f32; 4]) -> SpanDict {
        SpanDict::new(text, size, "Helvetica", BBox::from_slice(&bbox))
    }

    fn page(lines: Vec<Vec<SpanDict>>) -> PageTextDict {
        PageTextDict {
            blocks: vec![BlockDict {
                lines: lines.into_iter().map(|spans| LineDict { spans }).collect(),
            }],
        }
    }

    #[test]
    fn test_joins_spans_and_unions_boxes() {
        let dict = page(vec![vec![
            span("  1.1 ", 12.0, [72.0, 100.0, 90.0, 114.0]),
            span("", 30.0, [0.0, 0.0, 0.0, 0.0]),
            span("Background", 14.0, [95.0, 98.0, 180.0, 115.0]),
        ]]);
        let fragments = normalize_page(&dict, 2);

        assert_eq!(fragments.len(), 1);
        let f = &fragments[0];
        assert_eq!(f.text, "1.1 Background");
        assert_eq!(f.page, 2);
        assert_eq!(f.font_size, 14.0);
        assert_eq!(f.bbox, BBox::new(72.0, 98.0, 180.0, 115.0));
    }

    #[test]
    fn test_dominant_font_first_on_tie() {
        let bold = span("Bold", 12.0, [0.0, 0.0, 10.0, 10.0])
            .with_flags(StyleFlags::from_bits(StyleFlags::BOLD));
        let mut plain = span("plain text", 12.0, [10.0, 0.0, 20.0, 10.0]);
        plain.font = "Times-Roman".to_string();

        let fragments = normalize_page(&page(vec![vec![bold, plain]]), 1);
        assert!(fragments[0].is_bold);
        assert_eq!(fragments[0].font_name, "Helvetica");
    }

    #[test]
    fn test_filters_noise_lines() {
        let dict = page(vec![
            vec![span("42", 10.0, [0.0; 4])],
            vec![span("ab", 10.0, [0.0; 4])],
            vec![span("Contents", 10.0, [0.0; 4])],
            vec![span(&"x".repeat(301), 10.0, [0.0; 4])],
            vec![span("Real line", 10.0, [0.0; 4])],
        ]);
        let fragments = normalize_page(&dict, 1);
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].text, "Real line");
    }

    #[test]
    fn test_missing_size_and_bbox_defaults() {
        let dict: PageTextDict = serde_json::from_str(
            r#"{"blocks": [{"lines": [{"spans": [{"text": "No metrics here", "bbox": [1, 2]}]}]}]}"#,
        )
        .unwrap();
        let fragments = normalize_page(&dict, 1);
        assert_eq!(fragments[0].font_size, 12.0);
        assert_eq!(fragments[0].bbox, BBox::ZERO);
    }

    #[test]
    fn test_normalize_pages_numbers_from_one() {
        let first = page(vec![vec![span("First page", 12.0, [0.0; 4])]]);
        let second = page(vec![vec![span("Second page", 12.0, [0.0; 4])]]);
        let fragments = normalize_pages([&first, &second]);
        assert_eq!(fragments.iter().map(|f| f.page).collect::<Vec<_>>(), vec![1, 2]);
    }
}
