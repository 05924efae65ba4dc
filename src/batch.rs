//! Directory batch processing on a bounded worker pool.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use ignore::WalkBuilder;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{ExtractorConfig, ProcessingMode};
use crate::error::{Error, Result};
use crate::extract::validate_pdf_file;
use crate::processor::{elapsed_secs, ProcessReport, Processor};

/// Discover PDF files under `dir`, sorted by path and capped at `max_files`.
///
/// Files that do not open as a PDF with at least one page are skipped.
pub fn find_pdf_files(dir: &Path, recursive: bool, max_files: usize) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::NotFound(dir.to_path_buf()));
    }

    let mut candidates: Vec<PathBuf> = WalkBuilder::new(dir)
        .standard_filters(false)
        .max_depth(if recursive { None } else { Some(1) })
        .build()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::warn!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().map_or(false, |t| t.is_file()))
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|e| e.to_str())
                .map_or(false, |e| e.eq_ignore_ascii_case("pdf"))
        })
        .collect();
    candidates.sort();

    let mut files = Vec::new();
    for path in candidates {
        if files.len() >= max_files {
            log::warn!("File limit of {} reached, ignoring the rest", max_files);
            break;
        }
        match validate_pdf_file(&path) {
            Ok(_) => files.push(path),
            Err(e) => log::warn!("Skipping {}: {}", path.display(), e),
        }
    }

    log::info!("Found {} PDF files in {}", files.len(), dir.display());
    Ok(files)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileReport {
    pub file: PathBuf,
    pub status: FileStatus,
    pub execution_time: f64,
    pub result: ProcessReport,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub success: bool,
    pub total_files: usize,
    pub successful: usize,
    pub failed: usize,
    pub processed_files: Vec<FileReport>,
    pub total_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Output path for one input: its subdirectory under `input_dir` is mirrored
/// under `output_dir`, and the file is named `<stem><mode suffix>`.
pub fn output_path_for(
    input: &Path,
    input_dir: &Path,
    output_dir: &Path,
    mode: ProcessingMode,
) -> PathBuf {
    let subdir = input
        .strip_prefix(input_dir)
        .ok()
        .and_then(Path::parent)
        .unwrap_or_else(|| Path::new(""));
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    output_dir
        .join(subdir)
        .join(format!("{}{}", stem, mode.output_suffix()))
}

/// One input with its output, or the earlier input that already claimed it.
struct Job {
    input: PathBuf,
    output: PathBuf,
    claimed_by: Option<PathBuf>,
}

fn plan_jobs(files: Vec<PathBuf>, input_dir: &Path, output_dir: &Path, mode: ProcessingMode) -> Vec<Job> {
    let mut owners: HashMap<PathBuf, PathBuf> = HashMap::new();
    files
        .into_iter()
        .map(|input| {
            let output = output_path_for(&input, input_dir, output_dir, mode);
            let claimed_by = match owners.get(&output) {
                Some(owner) => Some(owner.clone()),
                None => {
                    owners.insert(output.clone(), input.clone());
                    None
                }
            };
            Job {
                input,
                output,
                claimed_by,
            }
        })
        .collect()
}

/// Process every PDF under `input_dir`, writing one JSON file per document.
///
/// A failing file never affects the others; the batch succeeds only when
/// every file did. Inputs that would overwrite another input's output are
/// reported as failed without being processed.
pub fn process_directory(
    input_dir: &Path,
    output_dir: &Path,
    mode: ProcessingMode,
    config: &ExtractorConfig,
) -> BatchReport {
    let started = Instant::now();

    let files = match find_pdf_files(input_dir, config.recursive, config.max_files) {
        Ok(files) if files.is_empty() => {
            return BatchReport {
                error: Some(Error::NoInputFiles(input_dir.to_path_buf()).to_string()),
                ..Default::default()
            }
        }
        Ok(files) => files,
        Err(e) => {
            return BatchReport {
                error: Some(e.to_string()),
                ..Default::default()
            }
        }
    };

    let jobs = plan_jobs(files, input_dir, output_dir, mode);
    let processor = Processor::new(config.clone());
    let run = || -> Vec<FileReport> {
        jobs.par_iter()
            .map(|job| {
                let file_started = Instant::now();
                let result = match &job.claimed_by {
                    Some(owner) => {
                        let conflict = Error::OutputConflict {
                            path: job.output.clone(),
                            other: owner.clone(),
                        };
                        log::error!("Skipping {}: {}", job.input.display(), conflict);
                        ProcessReport::failed(&job.input, &job.output, file_started, &conflict)
                    }
                    None => processor.process(mode, &job.input, &job.output),
                };
                FileReport {
                    file: job.input.clone(),
                    status: if result.success {
                        FileStatus::Success
                    } else {
                        FileStatus::Failed
                    },
                    execution_time: elapsed_secs(file_started),
                    result,
                }
            })
            .collect()
    };

    let processed_files = match config.jobs {
        Some(jobs) => match rayon::ThreadPoolBuilder::new().num_threads(jobs).build() {
            Ok(pool) => pool.install(run),
            Err(e) => {
                log::warn!("Could not build a {}-thread pool ({}), using the global pool", jobs, e);
                run()
            }
        },
        None => run(),
    };

    let successful = processed_files
        .iter()
        .filter(|f| f.status == FileStatus::Success)
        .count();
    let failed = processed_files.len() - successful;

    BatchReport {
        success: failed == 0,
        total_files: processed_files.len(),
        successful,
        failed,
        processed_files,
        total_time: elapsed_secs(started),
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Document, Object};
    use std::fs;
    use tempfile::TempDir;

    fn create_parent(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
    }

    /// A PDF with `pages` blank pages.
    fn write_pdf(path: &Path, pages: usize) {
        create_parent(path);
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let kids: Vec<Object> = (0..pages)
            .map(|_| {
                doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => pages_id,
                })
                .into()
            })
            .collect();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => pages as i64,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).unwrap();
    }

    /// PDF signature, nothing parseable behind it.
    fn write_broken_pdf(path: &Path) {
        create_parent(path);
        fs::write(path, b"%PDF-1.4\n%%EOF\n").unwrap();
    }

    fn relative_names(root: &Path, paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_find_pdf_files() {
        let dir = TempDir::new().unwrap();
        write_pdf(&dir.path().join("b.pdf"), 1);
        write_pdf(&dir.path().join("a.PDF"), 1);
        write_pdf(&dir.path().join("sub/c.pdf"), 2);
        fs::write(dir.path().join("fake.pdf"), b"hello").unwrap();
        fs::write(dir.path().join("notes.txt"), b"%PDF-1.4").unwrap();

        let found = find_pdf_files(dir.path(), true, 100).unwrap();
        assert_eq!(relative_names(dir.path(), &found), vec!["a.PDF", "b.pdf", "sub/c.pdf"]);

        let flat = find_pdf_files(dir.path(), false, 100).unwrap();
        assert_eq!(flat.len(), 2);

        let capped = find_pdf_files(dir.path(), true, 1).unwrap();
        assert_eq!(relative_names(dir.path(), &capped), vec!["a.PDF"]);
    }

    #[test]
    fn test_unopenable_and_empty_pdfs_are_skipped() {
        let dir = TempDir::new().unwrap();
        write_broken_pdf(&dir.path().join("broken.pdf"));
        write_pdf(&dir.path().join("empty.pdf"), 0);
        write_pdf(&dir.path().join("good.pdf"), 1);

        let found = find_pdf_files(dir.path(), true, 100).unwrap();
        assert_eq!(relative_names(dir.path(), &found), vec!["good.pdf"]);
    }

    #[test]
    fn test_missing_directory() {
        let dir = TempDir::new().unwrap();
        let err = find_pdf_files(&dir.path().join("nope"), true, 100).unwrap_err();
        assert!(err.is_input_error());
    }

    #[test]
    fn test_output_path_for() {
        let input_dir = Path::new("/in");
        let out = output_path_for(Path::new("/in/report.pdf"), input_dir, Path::new("/out"), ProcessingMode::Persona);
        assert_eq!(out, PathBuf::from("/out/report_task_sections.json"));

        let out = output_path_for(Path::new("/in/a/b/report.pdf"), input_dir, Path::new("/out"), ProcessingMode::Outline);
        assert_eq!(out, PathBuf::from("/out/a/b/report_outline.json"));

        // Inputs outside the input directory land at the top level.
        let out = output_path_for(Path::new("/elsewhere/x.pdf"), input_dir, Path::new("/out"), ProcessingMode::Outline);
        assert_eq!(out, PathBuf::from("/out/x_outline.json"));
    }

    #[test]
    fn test_empty_directory_fails() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let report = process_directory(
            input.path(),
            output.path(),
            ProcessingMode::Outline,
            &ExtractorConfig::default(),
        );
        assert!(!report.success);
        assert!(report.error.unwrap().contains("No PDF files found"));
        assert!(report.processed_files.is_empty());
    }

    #[test]
    fn test_only_broken_files_fails_without_output() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write_broken_pdf(&input.path().join("broken.pdf"));

        let report = process_directory(
            input.path(),
            output.path(),
            ProcessingMode::Outline,
            &ExtractorConfig::default().with_jobs(2),
        );
        assert!(!report.success);
        assert_eq!(report.total_files, 0);
        assert!(report.error.unwrap().starts_with("No PDF files found in"));
        assert_eq!(fs::read_dir(output.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_same_stem_in_different_directories() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write_pdf(&input.path().join("a/report.pdf"), 1);
        write_pdf(&input.path().join("b/report.pdf"), 1);

        let report = process_directory(
            input.path(),
            output.path(),
            ProcessingMode::Outline,
            &ExtractorConfig::default().with_jobs(2),
        );
        assert!(report.success);
        assert_eq!(report.successful, 2);
        assert!(output.path().join("a/report_outline.json").is_file());
        assert!(output.path().join("b/report_outline.json").is_file());
        assert!(!output.path().join("report_outline.json").exists());
    }

    #[test]
    fn test_output_conflict_is_reported() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        // Same directory, same stem, different extension case.
        write_pdf(&input.path().join("report.PDF"), 1);
        write_pdf(&input.path().join("report.pdf"), 1);

        let report = process_directory(
            input.path(),
            output.path(),
            ProcessingMode::Outline,
            &ExtractorConfig::default(),
        );
        assert!(!report.success);
        assert_eq!(report.total_files, 2);
        assert_eq!(report.successful, 1);
        assert_eq!(report.failed, 1);

        let loser = &report.processed_files[1];
        assert_eq!(loser.file, input.path().join("report.pdf"));
        assert_eq!(loser.status, FileStatus::Failed);
        assert!(loser.result.error.as_deref().unwrap().contains("already claimed by"));
        assert_eq!(report.processed_files[0].status, FileStatus::Success);
        assert!(output.path().join("report_outline.json").is_file());
    }

    #[test]
    fn test_failing_file_keeps_other_outputs() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write_pdf(&input.path().join("good.pdf"), 1);
        write_pdf(&input.path().join("long.pdf"), 3);

        let report = process_directory(
            input.path(),
            output.path(),
            ProcessingMode::Outline,
            &ExtractorConfig::default().with_max_pages(2).with_jobs(2),
        );
        assert!(!report.success);
        assert_eq!(report.successful, 1);
        assert_eq!(report.failed, 1);

        let good = &report.processed_files[0];
        let long = &report.processed_files[1];
        assert_eq!(good.status, FileStatus::Success);
        assert_eq!(long.status, FileStatus::Failed);
        assert!(long.result.error.as_deref().unwrap().contains("too many pages"));
        assert!(output.path().join("good_outline.json").is_file());
        assert!(!output.path().join("long_outline.json").exists());
    }
}
