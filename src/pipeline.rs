//! End-to-end extraction over a [`LayoutSource`].
//!
//! Both extractors degrade instead of failing once a document is open: a page
//! that cannot be read is logged and skipped, and a document with nothing
//! readable yields an empty result.

use std::path::Path;
use std::sync::Arc;

use crate::classifier::TaskClassifier;
use crate::cluster::{passes_candidate_filter, FontClusterer, HeadingDetector};
use crate::config::{ExtractorConfig, HeadingStrategy};
use crate::error::Result;
use crate::extract::{LayoutSource, PdfDocument};
use crate::language::{detect_language, Language, LanguageDetector, WhatlangDetector};
use crate::lexical::{page_averages, LexicalScorer};
use crate::model::{HeadingCandidate, Outline, PageTextDict, TextFragment};
use crate::normalize::normalize_page;
use crate::outline::{build_outline, infer_title};
use crate::relevance::{RelevanceScorer, TaskSections};

/// Lexical-only candidates need at least this score in combined mode.
const COMBINED_MIN_LEXICAL_SCORE: u32 = 4;

/// Page dictionaries in page order; `None` for pages that failed.
fn read_pages<S: LayoutSource + ?Sized>(source: &S) -> Vec<Option<PageTextDict>> {
    (0..source.page_count())
        .map(|i| match source.page_text_dict(i) {
            Ok(dict) => Some(dict),
            Err(e) => {
                log::warn!("Skipping page {}: {}", i + 1, e);
                None
            }
        })
        .collect()
}

fn fragments_of(pages: &[Option<PageTextDict>]) -> Vec<TextFragment> {
    pages
        .iter()
        .enumerate()
        .filter_map(|(i, dict)| dict.as_ref().map(|d| normalize_page(d, i + 1)))
        .flatten()
        .collect()
}

/// Open a PDF, passing input errors through and turning anything else into
/// `None` after logging it.
fn open_document(path: &Path, max_pages: Option<usize>) -> Result<Option<PdfDocument>> {
    match PdfDocument::open(path, max_pages) {
        Ok(document) => Ok(Some(document)),
        Err(e) if e.is_input_error() => Err(e),
        Err(e) => {
            log::error!("Error reading {}: {}", path.display(), e);
            Ok(None)
        }
    }
}

/// Title and heading outline extraction.
#[derive(Debug, Clone)]
pub struct OutlineExtractor<D = WhatlangDetector> {
    config: ExtractorConfig,
    detector: D,
}

impl OutlineExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self {
            config,
            detector: WhatlangDetector,
        }
    }
}

impl Default for OutlineExtractor {
    fn default() -> Self {
        Self::new(ExtractorConfig::default())
    }
}

impl<D: LanguageDetector> OutlineExtractor<D> {
    /// Swap the general-purpose language detector.
    pub fn with_detector<E: LanguageDetector>(self, detector: E) -> OutlineExtractor<E> {
        OutlineExtractor {
            config: self.config,
            detector,
        }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Validate and process a PDF file.
    ///
    /// Only input errors are returned; a document that opens but cannot be
    /// parsed yields [`Outline::unknown`].
    pub fn extract<P: AsRef<Path>>(&self, path: P) -> Result<Outline> {
        let path = path.as_ref();
        let Some(document) = open_document(path, self.config.max_pages)? else {
            return Ok(Outline::unknown());
        };
        let outline = self.extract_from_source(&document);
        log::info!(
            "Extracted outline with {} items from {}",
            outline.outline.len(),
            path.display()
        );
        Ok(outline)
    }

    pub fn extract_from_source<S: LayoutSource + ?Sized>(&self, source: &S) -> Outline {
        let pages = read_pages(source);
        if !pages.is_empty() && pages.iter().all(Option::is_none) {
            log::error!("No page of the document could be read");
            return Outline::unknown();
        }

        let first_page = pages.first().and_then(Option::as_ref);
        let title = infer_title(source.title().as_deref(), first_page);

        let fragments = fragments_of(&pages);
        let language = detect_language(&fragments, &self.detector);
        log::debug!("{} fragments, language {}", fragments.len(), language);

        let candidates = self.heading_candidates(&fragments, language);
        Outline::new(title, build_outline(candidates))
    }

    pub fn heading_candidates(
        &self,
        fragments: &[TextFragment],
        language: Language,
    ) -> Vec<HeadingCandidate> {
        match self.config.strategy {
            HeadingStrategy::Clustering => FontClusterer.detect_headings(fragments, language),
            HeadingStrategy::Lexical => LexicalScorer.detect_headings(fragments, language),
            HeadingStrategy::Combined => combined_candidates(fragments, language),
        }
    }
}

/// Clustering levels, overridden by forced lexical levels, plus strong
/// lexical-only headings.
fn combined_candidates(fragments: &[TextFragment], language: Language) -> Vec<HeadingCandidate> {
    let levels = FontClusterer.assign_levels(fragments);
    let averages = page_averages(fragments);
    let scorer = LexicalScorer;

    fragments
        .iter()
        .zip(levels)
        .filter_map(|(fragment, clustered)| {
            let average = averages.get(&fragment.page).copied().unwrap_or(fragment.font_size);
            let lexical = scorer.score(fragment, average, language);

            let level = match (clustered, lexical) {
                (Some(_), Some(found)) if found.forced => found.level,
                (Some(level), _) => level,
                (None, Some(found))
                    if passes_candidate_filter(&fragment.text)
                        && (found.forced || found.score >= COMBINED_MIN_LEXICAL_SCORE) =>
                {
                    found.level
                }
                _ => return None,
            };

            let candidate = HeadingCandidate::new(fragment.clone(), level);
            Some(match lexical {
                Some(found) => candidate.with_confidence(found.confidence),
                None => candidate,
            })
        })
        .collect()
}

/// Persona task section extraction.
#[derive(Debug, Clone)]
pub struct TaskSectionExtractor<D = WhatlangDetector> {
    config: ExtractorConfig,
    scorer: RelevanceScorer,
    detector: D,
}

impl TaskSectionExtractor {
    pub fn new(config: ExtractorConfig, classifier: Arc<TaskClassifier>) -> Self {
        Self {
            config,
            scorer: RelevanceScorer::new(classifier),
            detector: WhatlangDetector,
        }
    }
}

impl<D: LanguageDetector> TaskSectionExtractor<D> {
    pub fn with_detector<E: LanguageDetector>(self, detector: E) -> TaskSectionExtractor<E> {
        TaskSectionExtractor {
            config: self.config,
            scorer: self.scorer,
            detector,
        }
    }

    /// Validate and process a PDF file. Unreadable documents yield no sections.
    pub fn extract<P: AsRef<Path>>(&self, path: P) -> Result<TaskSections> {
        let path = path.as_ref();
        let Some(document) = open_document(path, self.config.max_pages)? else {
            return Ok(TaskSections::default());
        };
        let sections = self.extract_from_source(&document);
        log::info!(
            "Extracted {} task-relevant sections from {}",
            sections.task_sections.len(),
            path.display()
        );
        Ok(sections)
    }

    pub fn extract_from_source<S: LayoutSource + ?Sized>(&self, source: &S) -> TaskSections {
        let pages = read_pages(source);

        let fragments = fragments_of(&pages);
        if !fragments.is_empty() {
            let language = detect_language(&fragments, &self.detector);
            log::debug!("Document language: {}", language);
        }

        let mut texts: Vec<(usize, String)> = pages
            .iter()
            .enumerate()
            .filter_map(|(i, dict)| dict.as_ref().map(|d| (i + 1, d.plain_text())))
            .filter(|(_, text)| !text.trim().is_empty())
            .collect();

        if texts.is_empty() {
            if let Some(text) = source.fallback_text() {
                log::debug!("Layout pass found no text, using plain-text fallback");
                texts = text
                    .split('\x0C')
                    .enumerate()
                    .map(|(i, page)| (i + 1, page.to_string()))
                    .collect();
            }
        }

        self.scorer
            .extract_sections(texts.iter().map(|(page, text)| (*page, text.as_str())))
    }
}

/// Outline for a PDF with default settings.
pub fn extract_outline<P: AsRef<Path>>(path: P) -> Result<Outline> {
    OutlineExtractor::default().extract(path)
}
