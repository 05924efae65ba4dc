//! Single-document processing: extract, save, and report.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::classifier::TaskClassifier;
use crate::config::{ExtractorConfig, ProcessingMode};
use crate::error::{Error, Result};
use crate::pipeline::{OutlineExtractor, TaskSectionExtractor};
use crate::relevance::PersonaSummary;

/// Outcome of processing one document. Never an error: failures are recorded
/// in `success` and `error`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessReport {
    pub success: bool,
    pub input_file: PathBuf,
    pub output_file: PathBuf,
    /// Seconds, rounded to two decimals.
    pub execution_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outline_items: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sections_found: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<PersonaSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProcessReport {
    pub(crate) fn failed(input: &Path, output: &Path, started: Instant, error: &Error) -> Self {
        Self {
            success: false,
            input_file: input.to_path_buf(),
            output_file: output.to_path_buf(),
            execution_time: elapsed_secs(started),
            error: Some(error.to_string()),
            ..Default::default()
        }
    }
}

pub(crate) fn elapsed_secs(started: Instant) -> f64 {
    (started.elapsed().as_secs_f64() * 100.0).round() / 100.0
}

/// Write `value` as pretty JSON, creating parent directories.
pub fn save_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    let write_err = |source: std::io::Error| Error::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    fs::write(path, json).map_err(write_err)?;
    log::info!("Saved {}", path.display());
    Ok(())
}

/// Runs either pipeline over files on disk.
#[derive(Debug, Clone)]
pub struct Processor {
    outline: OutlineExtractor,
    sections: TaskSectionExtractor,
}

impl Processor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self::with_classifier(config, Arc::new(TaskClassifier::new()))
    }

    pub fn with_classifier(config: ExtractorConfig, classifier: Arc<TaskClassifier>) -> Self {
        Self {
            outline: OutlineExtractor::new(config.clone()),
            sections: TaskSectionExtractor::new(config, classifier),
        }
    }

    pub fn process(&self, mode: ProcessingMode, input: &Path, output: &Path) -> ProcessReport {
        match mode {
            ProcessingMode::Outline => self.process_outline(input, output),
            ProcessingMode::Persona => self.process_task_sections(input, output),
        }
    }

    pub fn process_outline(&self, input: &Path, output: &Path) -> ProcessReport {
        let started = Instant::now();
        log::info!("Starting outline extraction for {}", input.display());

        let outline = match self.outline.extract(input) {
            Ok(outline) => outline,
            Err(e) => {
                log::error!("Error processing outline: {}", e);
                return ProcessReport::failed(input, output, started, &e);
            }
        };
        if let Err(e) = save_json(&outline, output) {
            log::error!("{}", e);
            return ProcessReport::failed(input, output, started, &e);
        }

        let report = ProcessReport {
            success: true,
            input_file: input.to_path_buf(),
            output_file: output.to_path_buf(),
            execution_time: elapsed_secs(started),
            outline_items: Some(outline.outline.len()),
            document_title: Some(outline.title),
            ..Default::default()
        };
        log::info!("Outline extraction completed in {:.2}s", report.execution_time);
        report
    }

    pub fn process_task_sections(&self, input: &Path, output: &Path) -> ProcessReport {
        let started = Instant::now();
        log::info!("Starting task section extraction for {}", input.display());

        let sections = match self.sections.extract(input) {
            Ok(sections) => sections,
            Err(e) => {
                log::error!("Error processing task sections: {}", e);
                return ProcessReport::failed(input, output, started, &e);
            }
        };
        if let Err(e) = save_json(&sections, output) {
            log::error!("{}", e);
            return ProcessReport::failed(input, output, started, &e);
        }

        let report = ProcessReport {
            success: true,
            input_file: input.to_path_buf(),
            output_file: output.to_path_buf(),
            execution_time: elapsed_secs(started),
            sections_found: Some(sections.task_sections.len()),
            summary: (!sections.task_sections.is_empty()).then(|| sections.summary()),
            ..Default::default()
        };
        log::info!("Task section extraction completed in {:.2}s", report.execution_time);
        report
    }
}
