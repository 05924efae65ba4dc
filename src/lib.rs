//! Heading outlines and persona task sections from PDF documents.
//!
//! The outline pipeline reads styled text lines from each page, detects the
//! document language, assigns H1/H2/H3 levels by font clustering or lexical
//! scoring, and emits a title plus a deduplicated outline. The persona
//! pipeline splits page text into paragraphs and keeps those relevant to at
//! least one task category.
//!
//! ```no_run
//! let outline = docoutline::extract_outline("report.pdf")?;
//! println!("{}", serde_json::to_string_pretty(&outline)?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod batch;
pub mod classifier;
pub mod cluster;
pub mod config;
pub mod error;
pub mod extract;
pub mod language;
pub mod lexical;
pub mod model;
pub mod normalize;
pub mod outline;
pub mod pipeline;
pub mod processor;
pub mod relevance;

pub use batch::{find_pdf_files, process_directory, BatchReport, FileReport, FileStatus};
pub use classifier::TaskClassifier;
pub use cluster::{FontClusterer, HeadingDetector};
pub use config::{ExtractorConfig, HeadingStrategy, ProcessingMode};
pub use error::{Error, Result};
pub use extract::{LayoutSource, MemoryDocument, PdfDocument};
pub use language::{Language, LanguageDetector, WhatlangDetector};
pub use lexical::LexicalScorer;
pub use model::{Heading, HeadingCandidate, HeadingLevel, Outline, PageTextDict, TextFragment};
pub use pipeline::{extract_outline, OutlineExtractor, TaskSectionExtractor};
pub use processor::{save_json, ProcessReport, Processor};
pub use relevance::{PersonaSummary, RelevanceScorer, RelevanceSection, TaskCategory, TaskSections};
