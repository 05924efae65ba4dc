//! Extraction settings shared by the library and the CLI.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Upper bound on PDFs picked up by one batch run.
pub const DEFAULT_MAX_FILES: usize = 100;

/// How heading candidates are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadingStrategy {
    /// Font clustering only.
    #[default]
    Clustering,
    /// Pattern and typography scoring only.
    Lexical,
    /// Clustering, corrected and extended by lexical numbering rules.
    Combined,
}

impl fmt::Display for HeadingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HeadingStrategy::Clustering => "clustering",
            HeadingStrategy::Lexical => "lexical",
            HeadingStrategy::Combined => "combined",
        })
    }
}

/// Which result a document is processed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingMode {
    /// Title and heading outline.
    #[default]
    Outline,
    /// Persona task sections.
    Persona,
}

impl ProcessingMode {
    /// Suffix appended to the input stem for batch outputs.
    pub fn output_suffix(&self) -> &'static str {
        match self {
            ProcessingMode::Outline => "_outline.json",
            ProcessingMode::Persona => "_task_sections.json",
        }
    }
}

impl fmt::Display for ProcessingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProcessingMode::Outline => "outline",
            ProcessingMode::Persona => "persona",
        })
    }
}

/// Options for outline and task-section extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractorConfig {
    pub strategy: HeadingStrategy,
    /// Reject documents with more pages than this.
    pub max_pages: Option<usize>,
    /// Cap on files discovered in batch mode.
    pub max_files: usize,
    /// Batch worker threads; `None` uses rayon's default.
    pub jobs: Option<usize>,
    /// Descend into subdirectories in batch mode.
    pub recursive: bool,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            strategy: HeadingStrategy::default(),
            max_pages: None,
            max_files: DEFAULT_MAX_FILES,
            jobs: None,
            recursive: true,
        }
    }
}

impl ExtractorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_strategy(mut self, strategy: HeadingStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = Some(max_pages);
        self
    }

    pub fn with_max_files(mut self, max_files: usize) -> Self {
        self.max_files = max_files;
        self
    }

    /// Worker threads for batch runs. Zero means rayon's default.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = (jobs > 0).then_some(jobs);
        self
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = ExtractorConfig::new()
            .with_strategy(HeadingStrategy::Combined)
            .with_max_pages(50)
            .with_jobs(0)
            .recursive(false);
        assert_eq!(config.strategy, HeadingStrategy::Combined);
        assert_eq!(config.max_pages, Some(50));
        assert_eq!(config.jobs, None);
        assert_eq!(config.max_files, DEFAULT_MAX_FILES);
        assert!(!config.recursive);
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!(
            HeadingStrategy::from_str("lexical", true).unwrap(),
            HeadingStrategy::Lexical
        );
        assert_eq!(HeadingStrategy::default().to_string(), "clustering");
    }
}
