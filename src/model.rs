//! Document model shared by the outline and task-section pipelines.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Font size assumed when a span carries none.
pub const DEFAULT_FONT_SIZE: f32 = 12.0;

/// Axis-aligned box in page space, top-left origin (y grows downwards).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BBox {
    pub const ZERO: BBox = BBox {
        x0: 0.0,
        y0: 0.0,
        x1: 0.0,
        y1: 0.0,
    };

    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Build a box from an `[x0, y0, x1, y1]` slice.
    ///
    /// Anything other than four finite numbers yields [`BBox::ZERO`].
    pub fn from_slice(values: &[f32]) -> Self {
        match values {
            [x0, y0, x1, y1] if values.iter().all(|v| v.is_finite()) => {
                Self::new(*x0, *y0, *x1, *y1)
            }
            _ => Self::ZERO,
        }
    }

    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }
}

/// Span style bits, laid out like the extractor's `flags` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StyleFlags(u32);

impl StyleFlags {
    pub const ITALIC: u32 = 1 << 1;
    pub const SERIFED: u32 = 1 << 2;
    pub const MONOSPACED: u32 = 1 << 3;
    pub const BOLD: u32 = 1 << 4;

    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub fn bits(&self) -> u32 {
        self.0
    }

    pub fn with(self, bit: u32) -> Self {
        Self(self.0 | bit)
    }

    pub fn is_bold(&self) -> bool {
        self.0 & Self::BOLD != 0
    }

    pub fn is_italic(&self) -> bool {
        self.0 & Self::ITALIC != 0
    }

    /// Derive style bits from a base-font name such as `Helvetica-BoldOblique`.
    pub fn from_font_name(font_name: &str) -> Self {
        let lower = font_name.to_lowercase();
        let mut flags = Self::default();

        if ["bold", "black", "heavy", "semibold", "demi"]
            .iter()
            .any(|w| lower.contains(w))
        {
            flags = flags.with(Self::BOLD);
        }
        if lower.contains("italic") || lower.contains("oblique") {
            flags = flags.with(Self::ITALIC);
        }
        if lower.contains("mono") || lower.contains("courier") {
            flags = flags.with(Self::MONOSPACED);
        }
        if lower.contains("times") || (lower.contains("serif") && !lower.contains("sans")) {
            flags = flags.with(Self::SERIFED);
        }
        flags
    }
}

/// One visual line of text after normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct TextFragment {
    pub text: String,
    /// 1-based page number.
    pub page: usize,
    pub font_size: f32,
    pub font_name: String,
    pub is_bold: bool,
    pub bbox: BBox,
}

impl TextFragment {
    pub fn x(&self) -> f32 {
        self.bbox.x0
    }

    pub fn y(&self) -> f32 {
        self.bbox.y0
    }

    pub fn width(&self) -> f32 {
        self.bbox.width()
    }

    pub fn height(&self) -> f32 {
        self.bbox.height()
    }

    /// Fully upper-case and longer than five characters.
    pub fn is_all_caps(&self) -> bool {
        self.text.chars().count() > 5 && is_upper(&self.text)
    }
}

/// True when the text has at least one cased character and none is lower-case.
pub fn is_upper(text: &str) -> bool {
    let mut cased = false;
    for c in text.chars() {
        if c.is_lowercase() {
            return false;
        }
        if c.is_uppercase() {
            cased = true;
        }
    }
    cased
}

/// Heading rank in the three-tier outline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HeadingLevel {
    H1,
    H2,
    H3,
}

impl HeadingLevel {
    pub const ALL: [HeadingLevel; 3] = [HeadingLevel::H1, HeadingLevel::H2, HeadingLevel::H3];

    /// Level for a 0-based rank; ranks past H3 have no level.
    pub fn from_rank(rank: usize) -> Option<Self> {
        Self::ALL.get(rank).copied()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HeadingLevel::H1 => "H1",
            HeadingLevel::H2 => "H2",
            HeadingLevel::H3 => "H3",
        }
    }
}

impl fmt::Display for HeadingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fragment tagged with an inferred heading level.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadingCandidate {
    pub fragment: TextFragment,
    pub level: HeadingLevel,
    pub confidence: Option<f32>,
}

impl HeadingCandidate {
    pub fn new(fragment: TextFragment, level: HeadingLevel) -> Self {
        Self {
            fragment,
            level,
            confidence: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

/// A single outline entry.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Heading {
    pub level: HeadingLevel,
    pub text: String,
    pub page: usize,
}

/// Title plus ordered heading list, as written to disk.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Outline {
    pub title: String,
    pub outline: Vec<Heading>,
}

impl Outline {
    /// Title used when a document yields no title candidate.
    pub const UNKNOWN_DOCUMENT: &'static str = "Unknown Document";
    /// Title used when the whole document failed to extract.
    pub const UNKNOWN: &'static str = "Unknown";

    pub fn new(title: impl Into<String>, outline: Vec<Heading>) -> Self {
        Self {
            title: title.into(),
            outline,
        }
    }

    /// Degraded result for a document that could not be read at all.
    pub fn unknown() -> Self {
        Self::new(Self::UNKNOWN, Vec::new())
    }
}

// ---------------------------------------------------------------------------
// Page text dictionaries (extractor output)
// ---------------------------------------------------------------------------

/// One styled run of text as reported by the layout extractor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpanDict {
    pub text: String,
    pub size: Option<f32>,
    pub font: String,
    pub flags: StyleFlags,
    pub bbox: Vec<f32>,
}

impl SpanDict {
    pub fn new(text: impl Into<String>, size: f32, font: impl Into<String>, bbox: BBox) -> Self {
        let font = font.into();
        Self {
            text: text.into(),
            size: Some(size),
            flags: StyleFlags::from_font_name(&font),
            font,
            bbox: vec![bbox.x0, bbox.y0, bbox.x1, bbox.y1],
        }
    }

    pub fn with_flags(mut self, flags: StyleFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Font size, defaulting when absent or non-positive.
    pub fn font_size(&self) -> f32 {
        match self.size {
            Some(size) if size.is_finite() && size > 0.0 => size,
            _ => DEFAULT_FONT_SIZE,
        }
    }

    pub fn bbox(&self) -> BBox {
        BBox::from_slice(&self.bbox)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineDict {
    pub spans: Vec<SpanDict>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockDict {
    pub lines: Vec<LineDict>,
}

/// Blocks → lines → spans for one page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageTextDict {
    pub blocks: Vec<BlockDict>,
}

impl PageTextDict {
    pub fn lines(&self) -> impl Iterator<Item = &LineDict> {
        self.blocks.iter().flat_map(|b| b.lines.iter())
    }

    pub fn spans(&self) -> impl Iterator<Item = &SpanDict> {
        self.lines().flat_map(|l| l.spans.iter())
    }

    /// Plain text with lines joined by newlines and blocks by blank lines.
    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .map(|block| {
                block
                    .lines
                    .iter()
                    .map(|line| {
                        line.spans
                            .iter()
                            .map(|s| s.text.trim())
                            .filter(|t| !t.is_empty())
                            .collect::<Vec<_>>()
                            .join(" ")
                    })
                    .filter(|l| !l.is_empty())
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .filter(|b| !b.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
