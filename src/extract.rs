//! Layout extraction: positioned, font-annotated spans per page.
//!
//! [`PdfDocument`] walks each page's content stream with `lopdf`, tracking
//! the text state (font, size, text and line matrices, graphics CTM) to emit
//! spans with a bounding box, base-font name and style flags. Spans sharing a
//! baseline become lines, and lines separated by a vertical gap become blocks,
//! giving the same blocks → lines → spans shape as [`PageTextDict`].
//!
//! The pipelines only see the [`LayoutSource`] trait, so they run unchanged
//! over [`MemoryDocument`] page dictionaries.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::error::{Error, Result};
use crate::model::{BBox, BlockDict, LineDict, PageTextDict, SpanDict, StyleFlags, DEFAULT_FONT_SIZE};

/// Page height assumed when a page has no usable MediaBox (US Letter).
const DEFAULT_PAGE_HEIGHT: f32 = 792.0;
/// Average glyph advance as a fraction of the font size.
const APPROX_CHAR_WIDTH_RATIO: f32 = 0.5;
/// Ascender/descender split of the font size around the baseline.
const ASCENT_RATIO: f32 = 0.8;
const DESCENT_RATIO: f32 = 0.2;
/// Baselines closer than this fraction of the font size share a line.
const LINE_Y_TOLERANCE: f32 = 0.35;
/// TJ adjustment (thousandths of an em) treated as a word space.
const TJ_SPACE_THRESHOLD: f32 = 200.0;
/// Horizontal gap (fraction of font size) under which spans are glued.
const GLUE_GAP_RATIO: f32 = 0.1;
/// Vertical gap (fraction of font size) that starts a new block.
const BLOCK_GAP_RATIO: f32 = 0.5;
/// Parent-chain depth limit when resolving inherited page attributes.
const MAX_INHERIT_DEPTH: usize = 16;
/// FontDescriptor `ForceBold` flag.
const FORCE_BOLD_FLAG: i64 = 1 << 18;

/// Source of per-page layout for one document.
pub trait LayoutSource {
    /// Number of pages in the document.
    fn page_count(&self) -> usize;

    /// Title from document metadata, if any.
    fn title(&self) -> Option<String>;

    /// Blocks → lines → spans for a 0-based page index.
    fn page_text_dict(&self, page_index: usize) -> Result<PageTextDict>;

    /// Whole-document plain text from a secondary extractor, pages separated
    /// by form feeds. Used when the layout pass yields no text.
    fn fallback_text(&self) -> Option<String> {
        None
    }
}

// ---------------------------------------------------------------------------
// In-memory source
// ---------------------------------------------------------------------------

/// A document held as page dictionaries, e.g. loaded from a JSON fixture.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocument {
    pub title: Option<String>,
    pub pages: Vec<PageTextDict>,
}

impl MemoryDocument {
    pub fn new(pages: Vec<PageTextDict>) -> Self {
        Self { title: None, pages }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Parse a JSON array of page dictionaries.
    pub fn from_json(json: &str) -> Result<Self> {
        let pages: Vec<PageTextDict> = serde_json::from_str(json)?;
        Ok(Self::new(pages))
    }
}

impl LayoutSource for MemoryDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn title(&self) -> Option<String> {
        self.title.clone()
    }

    fn page_text_dict(&self, page_index: usize) -> Result<PageTextDict> {
        self.pages
            .get(page_index)
            .cloned()
            .ok_or(Error::PageOutOfRange(page_index + 1, self.pages.len()))
    }
}

// ---------------------------------------------------------------------------
// Input validation
// ---------------------------------------------------------------------------

/// Cheap pre-flight checks: the file exists, has a `.pdf` extension and
/// starts with the `%PDF` signature.
pub fn check_pdf_file(path: &Path) -> Result<()> {
    if !path.is_file() {
        return Err(Error::NotFound(path.to_path_buf()));
    }
    let has_pdf_ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e.eq_ignore_ascii_case("pdf"));
    if !has_pdf_ext {
        return Err(Error::NotPdf(path.to_path_buf()));
    }
    let mut header = [0u8; 8];
    let read = {
        use std::io::Read;
        let mut file = fs::File::open(path)?;
        file.read(&mut header)?
    };
    if !is_pdf_bytes(&header[..read]) {
        return Err(Error::NotPdf(path.to_path_buf()));
    }
    Ok(())
}

/// Full validation: the pre-flight checks plus a successful open with at
/// least one page. Returns the page count.
pub fn validate_pdf_file(path: &Path) -> Result<usize> {
    let document = PdfDocument::open(path, None)?;
    Ok(document.page_count())
}

/// True when the bytes start with the PDF magic.
pub fn is_pdf_bytes(data: &[u8]) -> bool {
    data.starts_with(b"%PDF")
}

// ---------------------------------------------------------------------------
// PDF-backed source
// ---------------------------------------------------------------------------

/// A PDF opened with `lopdf`.
pub struct PdfDocument {
    doc: Document,
    bytes: Vec<u8>,
    page_ids: Vec<ObjectId>,
}

impl PdfDocument {
    /// Validate and open a PDF file.
    ///
    /// Rejects missing files, non-PDF inputs, encrypted and empty documents,
    /// and documents longer than `max_pages` when a limit is given.
    pub fn open<P: AsRef<Path>>(path: P, max_pages: Option<usize>) -> Result<Self> {
        let path = path.as_ref();
        check_pdf_file(path)?;
        let bytes = fs::read(path)?;
        let document = Self::from_bytes(bytes)?;

        if let Some(limit) = max_pages {
            if document.page_count() > limit {
                return Err(Error::TooManyPages(document.page_count(), limit));
            }
        }
        Ok(document)
    }

    /// Open a PDF held in memory.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        if !is_pdf_bytes(&bytes) {
            return Err(Error::PdfParse("missing %PDF header".to_string()));
        }
        let doc = Document::load_mem(&bytes)?;
        if doc.trailer.get(b"Encrypt").is_ok() {
            return Err(Error::Encrypted);
        }
        let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
        if page_ids.is_empty() {
            return Err(Error::EmptyDocument);
        }
        Ok(Self {
            doc,
            bytes,
            page_ids,
        })
    }

    fn page_height(&self, page_id: ObjectId) -> f32 {
        inherited_attribute(&self.doc, page_id, b"MediaBox")
            .and_then(|obj| obj.as_array().ok())
            .and_then(|arr| {
                let nums: Vec<f32> = arr.iter().filter_map(|o| number(&self.doc, o)).collect();
                match nums.as_slice() {
                    [_, y0, _, y1] => Some((y1 - y0).abs()),
                    _ => None,
                }
            })
            .filter(|h| *h > 0.0)
            .unwrap_or(DEFAULT_PAGE_HEIGHT)
    }

    /// Map of font resource key (`F1`) to base-font name and style flags.
    fn page_fonts(&self, page_id: ObjectId) -> BTreeMap<Vec<u8>, FontInfo> {
        let mut fonts = BTreeMap::new();
        let font_dict = inherited_attribute(&self.doc, page_id, b"Resources")
            .and_then(|res| res.as_dict().ok())
            .and_then(|res| res.get(b"Font").ok())
            .and_then(|f| resolve(&self.doc, f))
            .and_then(|f| f.as_dict().ok());

        if let Some(font_dict) = font_dict {
            for (key, value) in font_dict.iter() {
                if let Some(font) = resolve(&self.doc, value).and_then(|f| f.as_dict().ok()) {
                    fonts.insert(key.clone(), FontInfo::from_dict(&self.doc, font));
                }
            }
        }
        fonts
    }

    fn extract_page(&self, page_index: usize) -> Result<PageTextDict> {
        let page_id = *self
            .page_ids
            .get(page_index)
            .ok_or(Error::PageOutOfRange(page_index + 1, self.page_ids.len()))?;
        let page_number = page_index + 1;

        let data = self
            .doc
            .get_page_content(page_id)
            .map_err(|e| Error::PageExtract {
                page: page_number,
                reason: e.to_string(),
            })?;
        let content = Content::decode(&data).map_err(|e| Error::PageExtract {
            page: page_number,
            reason: e.to_string(),
        })?;

        let fonts = self.page_fonts(page_id);
        let spans = walk_content(&content, &fonts);
        log::trace!("page {}: {} raw spans", page_number, spans.len());

        Ok(layout_page(spans, self.page_height(page_id)))
    }
}

impl LayoutSource for PdfDocument {
    fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    fn title(&self) -> Option<String> {
        let info = self.doc.trailer.get(b"Info").ok()?;
        let info = resolve(&self.doc, info)?.as_dict().ok()?;
        match info.get(b"Title").ok().and_then(|t| resolve(&self.doc, t))? {
            Object::String(bytes, _) => {
                let title = decode_text_simple(bytes).trim().to_string();
                (!title.is_empty()).then_some(title)
            }
            _ => None,
        }
    }

    fn page_text_dict(&self, page_index: usize) -> Result<PageTextDict> {
        self.extract_page(page_index)
    }

    fn fallback_text(&self) -> Option<String> {
        match pdf_extract::extract_text_from_mem(&self.bytes) {
            Ok(text) if !text.trim().is_empty() => Some(text),
            Ok(_) => None,
            Err(e) => {
                log::warn!("Fallback text extraction failed: {}", Error::from(e));
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// lopdf helpers
// ---------------------------------------------------------------------------

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Look up a page attribute, following `Parent` links for inherited keys.
fn inherited_attribute<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut dict = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_INHERIT_DEPTH {
        if let Ok(value) = dict.get(key) {
            return resolve(doc, value);
        }
        let parent = dict.get(b"Parent").ok()?.as_reference().ok()?;
        dict = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn number(doc: &Document, obj: &Object) -> Option<f32> {
    match resolve(doc, obj)? {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

fn operand_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

#[derive(Debug, Clone, Default)]
struct FontInfo {
    base_font: String,
    flags: StyleFlags,
}

impl FontInfo {
    fn from_dict(doc: &Document, font: &Dictionary) -> Self {
        let base_font = font
            .get(b"BaseFont")
            .ok()
            .and_then(|o| o.as_name().ok())
            .map(|n| strip_subset_prefix(&String::from_utf8_lossy(n)).to_string())
            .unwrap_or_default();

        let mut flags = StyleFlags::from_font_name(&base_font);
        if let Some(descriptor) = font
            .get(b"FontDescriptor")
            .ok()
            .and_then(|d| resolve(doc, d))
            .and_then(|d| d.as_dict().ok())
        {
            let pdf_flags = descriptor.get(b"Flags").ok().and_then(|f| f.as_i64().ok());
            let weight = descriptor.get(b"FontWeight").ok().and_then(|w| number(doc, w));
            if pdf_flags.map_or(false, |f| f & FORCE_BOLD_FLAG != 0)
                || weight.map_or(false, |w| w >= 600.0)
            {
                flags = flags.with(StyleFlags::BOLD);
            }
        }
        Self { base_font, flags }
    }
}

/// `ABCDEF+Helvetica-Bold` → `Helvetica-Bold`.
fn strip_subset_prefix(name: &str) -> &str {
    match name.split_once('+') {
        Some((prefix, rest))
            if prefix.len() == 6 && prefix.chars().all(|c| c.is_ascii_uppercase()) =>
        {
            rest
        }
        _ => name,
    }
}

/// Simple text decoding fallback when no font encoding is used.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    // Latin-1
    bytes.iter().map(|&b| b as char).collect()
}

// ---------------------------------------------------------------------------
// Content stream state machine
// ---------------------------------------------------------------------------

type Matrix = [f32; 6];

const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// `m1 × m2` for PDF row-vector affine matrices.
fn multiply(m1: &Matrix, m2: &Matrix) -> Matrix {
    [
        m1[0] * m2[0] + m1[1] * m2[2],
        m1[0] * m2[1] + m1[1] * m2[3],
        m1[2] * m2[0] + m1[3] * m2[2],
        m1[2] * m2[1] + m1[3] * m2[3],
        m1[4] * m2[0] + m1[5] * m2[2] + m2[4],
        m1[4] * m2[1] + m1[5] * m2[3] + m2[5],
    ]
}

/// A shown string in device space, baseline origin, PDF (bottom-up) y.
#[derive(Debug, Clone)]
struct RawSpan {
    text: String,
    x: f32,
    y: f32,
    width: f32,
    size: f32,
    font: String,
    flags: StyleFlags,
}

#[derive(Debug, Clone)]
struct TextState {
    font_key: Vec<u8>,
    font_size: f32,
    text_matrix: Matrix,
    line_matrix: Matrix,
    leading: f32,
    ctm: Matrix,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font_key: Vec::new(),
            font_size: DEFAULT_FONT_SIZE,
            text_matrix: IDENTITY,
            line_matrix: IDENTITY,
            leading: 0.0,
            ctm: IDENTITY,
        }
    }
}

impl TextState {
    fn rendering_matrix(&self) -> Matrix {
        multiply(&self.text_matrix, &self.ctm)
    }

    fn translate_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = multiply(&[1.0, 0.0, 0.0, 1.0, tx, ty], &self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        let leading = if self.leading != 0.0 {
            self.leading
        } else {
            self.font_size * 1.2
        };
        self.translate_line(0.0, -leading);
    }

    /// Advance along the baseline by `dx` unscaled text-space units.
    fn advance(&mut self, dx: f32) {
        self.text_matrix = multiply(&[1.0, 0.0, 0.0, 1.0, dx, 0.0], &self.text_matrix);
    }

    fn effective_size(&self) -> f32 {
        let m = self.rendering_matrix();
        (self.font_size * (m[2] * m[2] + m[3] * m[3]).sqrt()).abs()
    }

    fn horizontal_scale(&self) -> f32 {
        let m = self.rendering_matrix();
        (m[0] * m[0] + m[1] * m[1]).sqrt()
    }
}

fn walk_content(content: &Content, fonts: &BTreeMap<Vec<u8>, FontInfo>) -> Vec<RawSpan> {
    let mut spans = Vec::new();
    let mut state = TextState::default();
    let mut ctm_stack: Vec<Matrix> = Vec::new();

    for op in &content.operations {
        let nums: Vec<f32> = op.operands.iter().filter_map(operand_number).collect();
        match op.operator.as_str() {
            "q" => ctm_stack.push(state.ctm),
            "Q" => {
                if let Some(ctm) = ctm_stack.pop() {
                    state.ctm = ctm;
                }
            }
            "cm" if nums.len() == 6 => {
                let m = [nums[0], nums[1], nums[2], nums[3], nums[4], nums[5]];
                state.ctm = multiply(&m, &state.ctm);
            }
            "BT" => {
                state.text_matrix = IDENTITY;
                state.line_matrix = IDENTITY;
            }
            "Tf" => {
                if let Some(Object::Name(name)) = op.operands.first() {
                    state.font_key = name.clone();
                }
                if let Some(size) = op.operands.get(1).and_then(operand_number) {
                    state.font_size = size;
                }
            }
            "TL" if !nums.is_empty() => state.leading = nums[0],
            "Td" if nums.len() >= 2 => state.translate_line(nums[0], nums[1]),
            "TD" if nums.len() >= 2 => {
                state.leading = -nums[1];
                state.translate_line(nums[0], nums[1]);
            }
            "Tm" if nums.len() >= 6 => {
                state.line_matrix = [nums[0], nums[1], nums[2], nums[3], nums[4], nums[5]];
                state.text_matrix = state.line_matrix;
            }
            "T*" => state.next_line(),
            "Tj" => {
                if let Some(Object::String(bytes, _)) = op.operands.first() {
                    show_text(&mut spans, &mut state, fonts, decode_text_simple(bytes));
                }
            }
            "'" => {
                state.next_line();
                if let Some(Object::String(bytes, _)) = op.operands.first() {
                    show_text(&mut spans, &mut state, fonts, decode_text_simple(bytes));
                }
            }
            "\"" => {
                state.next_line();
                if let Some(Object::String(bytes, _)) = op.operands.get(2) {
                    show_text(&mut spans, &mut state, fonts, decode_text_simple(bytes));
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = op.operands.first() {
                    show_array(&mut spans, &mut state, fonts, items);
                }
            }
            _ => {}
        }
    }

    spans
}

fn show_array(
    spans: &mut Vec<RawSpan>,
    state: &mut TextState,
    fonts: &BTreeMap<Vec<u8>, FontInfo>,
    items: &[Object],
) {
    let mut combined = String::new();
    let start = state.clone();
    let mut kerning = 0.0;

    for item in items {
        match item {
            Object::String(bytes, _) => combined.push_str(&decode_text_simple(bytes)),
            other => {
                if let Some(adjust) = operand_number(other) {
                    kerning -= adjust / 1000.0 * state.font_size;
                    if -adjust > TJ_SPACE_THRESHOLD
                        && !combined.is_empty()
                        && !combined.ends_with(' ')
                        && !combined.chars().last().map_or(false, is_spaceless_script_char)
                    {
                        combined.push(' ');
                    }
                }
            }
        }
    }

    *state = start;
    show_text(spans, state, fonts, combined);
    state.advance(kerning);
}

fn show_text(
    spans: &mut Vec<RawSpan>,
    state: &mut TextState,
    fonts: &BTreeMap<Vec<u8>, FontInfo>,
    text: String,
) {
    let advance = text.chars().count() as f32 * state.font_size * APPROX_CHAR_WIDTH_RATIO;

    if !text.trim().is_empty() {
        let m = state.rendering_matrix();
        let font = fonts.get(&state.font_key).cloned().unwrap_or_else(|| FontInfo {
            base_font: String::from_utf8_lossy(&state.font_key).to_string(),
            flags: StyleFlags::default(),
        });
        spans.push(RawSpan {
            text,
            x: m[4],
            y: m[5],
            width: advance * state.horizontal_scale(),
            size: state.effective_size(),
            font: font.base_font,
            flags: font.flags,
        });
    }

    state.advance(advance);
}

/// Scripts written without inter-word spaces (CJK ideographs and kana).
pub fn is_spaceless_script_char(c: char) -> bool {
    matches!(
        c as u32,
        0x3000..=0x303F | 0x3040..=0x309F | 0x30A0..=0x30FF | 0x3400..=0x4DBF | 0x4E00..=0x9FFF
    )
}

// ---------------------------------------------------------------------------
// Lines and blocks
// ---------------------------------------------------------------------------

fn layout_page(mut spans: Vec<RawSpan>, page_height: f32) -> PageTextDict {
    if spans.is_empty() {
        return PageTextDict::default();
    }

    // Top of page first, then left to right.
    spans.sort_by(|a, b| b.y.total_cmp(&a.y).then(a.x.total_cmp(&b.x)));

    let mut lines: Vec<Vec<RawSpan>> = Vec::new();
    for span in spans {
        match lines.last_mut() {
            Some(line)
                if (line[0].y - span.y).abs()
                    <= LINE_Y_TOLERANCE * line[0].size.min(span.size).max(1.0) =>
            {
                line.push(span)
            }
            _ => lines.push(vec![span]),
        }
    }

    let mut blocks: Vec<BlockDict> = Vec::new();
    let mut prev: Option<(f32, f32)> = None; // (bottom, size) of the previous line
    for raw_line in lines {
        let line = assemble_line(raw_line, page_height);
        let Some(bbox) = line
            .spans
            .iter()
            .map(SpanDict::bbox)
            .reduce(|a, b| a.union(&b))
        else {
            continue;
        };
        let size = line
            .spans
            .iter()
            .map(SpanDict::font_size)
            .fold(0.0_f32, f32::max);

        let starts_block = match prev {
            Some((bottom, prev_size)) => bbox.y0 - bottom > BLOCK_GAP_RATIO * prev_size.max(size),
            None => true,
        };
        if starts_block || blocks.is_empty() {
            blocks.push(BlockDict::default());
        }
        if let Some(block) = blocks.last_mut() {
            block.lines.push(line);
        }
        prev = Some((bbox.y1, size));
    }

    PageTextDict { blocks }
}

/// Sort a baseline's spans left to right and glue fragments of one run.
fn assemble_line(mut spans: Vec<RawSpan>, page_height: f32) -> LineDict {
    spans.sort_by(|a, b| a.x.total_cmp(&b.x));

    let mut merged: Vec<RawSpan> = Vec::with_capacity(spans.len());
    for span in spans {
        if let Some(prev) = merged.last_mut() {
            let same_style = prev.font == span.font
                && (prev.size - span.size).abs() < 0.5
                && prev.flags == span.flags;
            let gap = span.x - (prev.x + prev.width);
            if same_style && gap < GLUE_GAP_RATIO * prev.size && gap > -prev.size {
                prev.text.push_str(&span.text);
                prev.width = span.x + span.width - prev.x;
                continue;
            }
        }
        merged.push(span);
    }

    LineDict {
        spans: merged
            .into_iter()
            .map(|s| {
                let bbox = BBox::new(
                    s.x,
                    page_height - (s.y + ASCENT_RATIO * s.size),
                    s.x + s.width,
                    page_height - (s.y - DESCENT_RATIO * s.size),
                );
                SpanDict::new(s.text, s.size, s.font, bbox).with_flags(s.flags)
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::Operation;

    fn raw(text: &str, x: f32, y: f32, size: f32) -> RawSpan {
        RawSpan {
            text: text.to_string(),
            x,
            y,
            width: text.chars().count() as f32 * size * APPROX_CHAR_WIDTH_RATIO,
            size,
            font: "Helvetica".to_string(),
            flags: StyleFlags::default(),
        }
    }

    #[test]
    fn test_decode_text_simple() {
        assert_eq!(decode_text_simple(b"Hello"), "Hello");
        assert_eq!(decode_text_simple(&[0x48, 0x65, 0x6C, 0x6C, 0xE9]), "Hellé");
        assert_eq!(decode_text_simple(&[0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69]), "Hi");
    }

    #[test]
    fn test_strip_subset_prefix() {
        assert_eq!(strip_subset_prefix("ABCDEF+Helvetica-Bold"), "Helvetica-Bold");
        assert_eq!(strip_subset_prefix("Helvetica"), "Helvetica");
        assert_eq!(strip_subset_prefix("abc+Font"), "abc+Font");
    }

    #[test]
    fn test_walk_content_positions_and_fonts() {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), 24.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal("Chapter 1")]),
                Operation::new("Tf", vec![Object::Name(b"F2".to_vec()), 11.into()]),
                Operation::new("Td", vec![0.into(), (-40).into()]),
                Operation::new("Tj", vec![Object::string_literal("Body text")]),
                Operation::new("ET", vec![]),
            ],
        };
        let mut fonts = BTreeMap::new();
        fonts.insert(
            b"F1".to_vec(),
            FontInfo {
                base_font: "Helvetica-Bold".to_string(),
                flags: StyleFlags::from_font_name("Helvetica-Bold"),
            },
        );

        let spans = walk_content(&content, &fonts);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].text, "Chapter 1");
        assert_eq!((spans[0].x, spans[0].y), (72.0, 700.0));
        assert_eq!(spans[0].size, 24.0);
        assert!(spans[0].flags.is_bold());
        assert_eq!((spans[1].x, spans[1].y), (72.0, 660.0));
        assert_eq!(spans[1].size, 11.0);
        // Unknown font key falls back to the resource name.
        assert_eq!(spans[1].font, "F2");
    }

    #[test]
    fn test_tj_array_inserts_word_space() {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), 12.into()]),
                Operation::new(
                    "TJ",
                    vec![Object::Array(vec![
                        Object::string_literal("Hello"),
                        (-250).into(),
                        Object::string_literal("World"),
                        (-20).into(),
                        Object::string_literal("!"),
                    ])],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let spans = walk_content(&content, &BTreeMap::new());
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "Hello World!");
    }

    #[test]
    fn test_layout_groups_lines_and_blocks() {
        let spans = vec![
            raw("Heading", 72.0, 700.0, 18.0),
            raw("first line", 72.0, 660.0, 11.0),
            raw("same line", 200.0, 660.5, 11.0),
            raw("second line", 72.0, 647.0, 11.0),
        ];
        let page = layout_page(spans, 792.0);

        assert_eq!(page.blocks.len(), 2);
        assert_eq!(page.blocks[0].lines.len(), 1);
        assert_eq!(page.blocks[1].lines.len(), 2);
        assert_eq!(page.blocks[1].lines[0].spans.len(), 2);

        // Top-left origin: the heading sits above the body.
        let heading_box = page.blocks[0].lines[0].spans[0].bbox();
        let body_box = page.blocks[1].lines[0].spans[0].bbox();
        assert!(heading_box.y0 < body_box.y0);
    }

    #[test]
    fn test_assemble_line_glues_adjacent_runs() {
        let a = raw("Intro", 72.0, 700.0, 12.0);
        let b = raw("duction", 72.0 + a.width, 700.0, 12.0);
        let line = assemble_line(vec![b, a], 792.0);
        assert_eq!(line.spans.len(), 1);
        assert_eq!(line.spans[0].text, "Introduction");
    }

    #[test]
    fn test_memory_document_out_of_range() {
        let doc = MemoryDocument::new(vec![PageTextDict::default()]);
        assert_eq!(doc.page_count(), 1);
        assert!(matches!(doc.page_text_dict(3), Err(Error::PageOutOfRange(4, 1))));
    }

    #[test]
    fn test_is_pdf_bytes() {
        assert!(is_pdf_bytes(b"%PDF-1.4\n"));
        assert!(!is_pdf_bytes(b"<html>"));
        assert!(!is_pdf_bytes(b""));
    }

    #[test]
    fn test_from_bytes_rejects_garbage() {
        assert!(PdfDocument::from_bytes(b"not a pdf".to_vec()).is_err());
    }
}
