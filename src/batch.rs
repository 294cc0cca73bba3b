// Concurrent analysis of many inputs for the `check` and `stats` commands

use anyhow::Result;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, warn};

use crate::grammar::{default_checker, AnalyzerOptions, GrammarIssue};
use crate::reader::{AsyncFileReader, InputSource, ReaderConfig};
use crate::stats::{calculate_text_stats_with, TextStats};

/// Per-input result of a batch run
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FileReport {
    /// File path, or `<stdin>`
    pub source: String,
    /// Empty when only statistics were requested
    pub issues: Vec<GrammarIssue>,
    pub stats: TextStats,
    pub bytes_read: u64,
    pub processing_time_ms: u64,
    /// Read failure when the input was skipped
    pub error: Option<String>,
    /// Input text, kept only when fixes will be applied afterwards
    #[serde(skip)]
    pub text: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub reader: ReaderConfig,
    pub analyzer: AnalyzerOptions,
    pub words_per_minute: u32,
    /// Run the rule table; false computes statistics only
    pub find_issues: bool,
    pub keep_text: bool,
    /// Inputs in flight at once; 0 means one per CPU
    pub concurrency: usize,
    pub show_progress: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            reader: ReaderConfig::default(),
            analyzer: AnalyzerOptions::default(),
            words_per_minute: crate::stats::DEFAULT_WORDS_PER_MINUTE,
            find_issues: true,
            keep_text: false,
            concurrency: 0,
            show_progress: false,
        }
    }
}

impl BatchOptions {
    fn effective_concurrency(&self) -> usize {
        match self.concurrency {
            0 => num_cpus::get().max(1),
            n => n,
        }
    }
}

fn progress_bar(total: usize, visible: bool) -> Result<ProgressBar> {
    if !visible {
        return Ok(ProgressBar::hidden());
    }
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

async fn process_source(
    reader: &AsyncFileReader,
    source: InputSource,
    options: &BatchOptions,
) -> Result<FileReport> {
    let start_time = Instant::now();
    let (text, read_stats) = reader.read_source(&source).await?;

    if let Some(error) = read_stats.read_error {
        return Ok(FileReport {
            source: read_stats.source,
            issues: Vec::new(),
            stats: calculate_text_stats_with("", options.words_per_minute)?,
            bytes_read: 0,
            processing_time_ms: start_time.elapsed().as_millis() as u64,
            error: Some(error),
            text: None,
        });
    }

    // Rule matching is CPU bound; keep it off the reader tasks
    let analyzer = options.analyzer.clone();
    let find_issues = options.find_issues;
    let words_per_minute = options.words_per_minute;
    let (issues, stats, text) = tokio::task::spawn_blocking(move || -> Result<_> {
        let issues = if find_issues {
            default_checker()?.analyze_with(&text, &analyzer)
        } else {
            Vec::new()
        };
        let stats = calculate_text_stats_with(&text, words_per_minute)?;
        Ok((issues, stats, text))
    })
    .await??;

    Ok(FileReport {
        source: read_stats.source,
        issues,
        stats,
        bytes_read: read_stats.bytes_read,
        processing_time_ms: start_time.elapsed().as_millis() as u64,
        error: None,
        text: options.keep_text.then_some(text),
    })
}

/// Analyze every source concurrently; reports come back in input order.
/// With `reader.fail_fast` the first failure aborts the run.
pub async fn process_inputs(sources: Vec<InputSource>, options: &BatchOptions) -> Result<Vec<FileReport>> {
    let total = sources.len();
    let concurrency = options.effective_concurrency();
    info!("Processing {} inputs with concurrency {}", total, concurrency);

    let reader = AsyncFileReader::new(options.reader.clone());
    let pb = progress_bar(total, options.show_progress && total > 1)?;

    let mut results = stream::iter(sources.into_iter().enumerate())
        .map(|(index, source)| {
            let reader = &reader;
            async move { (index, process_source(reader, source, options).await) }
        })
        .buffer_unordered(concurrency);

    let mut slots: Vec<Option<FileReport>> = vec![None; total];
    while let Some((index, result)) = results.next().await {
        pb.inc(1);
        match result {
            Ok(report) => {
                if let Some(error) = &report.error {
                    warn!("Skipped {}: {}", report.source, error);
                }
                pb.set_message(report.source.clone());
                slots[index] = Some(report);
            }
            Err(e) => {
                pb.abandon_with_message("aborted");
                return Err(e);
            }
        }
    }
    pb.finish_and_clear();

    let reports: Vec<FileReport> = slots.into_iter().flatten().collect();
    let failed = reports.iter().filter(|r| r.error.is_some()).count();
    info!("Processed {} inputs: {} ok, {} failed", reports.len(), reports.len() - failed, failed);
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> InputSource {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        InputSource::File(path)
    }

    #[tokio::test]
    async fn test_reports_keep_input_order() {
        let temp_dir = TempDir::new().unwrap();
        let sources: Vec<_> = (0..8)
            .map(|i| write(&temp_dir, &format!("f{i}.txt"), &"recieve ".repeat(i + 1)))
            .collect();

        let options = BatchOptions {
            concurrency: 3,
            ..BatchOptions::default()
        };
        let reports = process_inputs(sources, &options).await.unwrap();

        assert_eq!(reports.len(), 8);
        for (i, report) in reports.iter().enumerate() {
            assert!(report.source.ends_with(&format!("f{i}.txt")));
            assert_eq!(report.issues.len(), i + 1);
            assert_eq!(report.stats.words, i + 1);
        }
    }

    #[tokio::test]
    async fn test_stats_only_skips_rules() {
        let temp_dir = TempDir::new().unwrap();
        let source = write(&temp_dir, "a.txt", "I could of recieved it.");
        let options = BatchOptions {
            find_issues: false,
            ..BatchOptions::default()
        };
        let reports = process_inputs(vec![source], &options).await.unwrap();
        assert!(reports[0].issues.is_empty());
        assert_eq!(reports[0].stats.words, 5);
        assert!(reports[0].text.is_none());
    }

    #[tokio::test]
    async fn test_missing_input_is_skipped_or_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let good = write(&temp_dir, "good.txt", "Fine text.");
        let missing = InputSource::File(PathBuf::from("/no/such/input.txt"));

        let reports = process_inputs(vec![good.clone(), missing.clone()], &BatchOptions::default())
            .await
            .unwrap();
        assert!(reports[0].error.is_none());
        assert!(reports[1].error.is_some());

        let strict = BatchOptions {
            reader: ReaderConfig {
                fail_fast: true,
                ..ReaderConfig::default()
            },
            ..BatchOptions::default()
        };
        assert!(process_inputs(vec![good, missing], &strict).await.is_err());
    }
}
