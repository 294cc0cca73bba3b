use anyhow::{Context, Result};
use memmap2::Mmap;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, BufReader};
use tracing::{debug, info, warn};

/// Configuration for input reading behavior
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Whether to fail fast on first error or continue processing
    pub fail_fast: bool,
    /// Buffer size for async reading (default: 8KB)
    pub buffer_size: usize,
    /// Map files into memory instead of streaming them
    pub use_mmap: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            fail_fast: false,
            buffer_size: 8192,
            use_mmap: false,
        }
    }
}

/// Where a text comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Stdin,
    File(PathBuf),
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputSource::Stdin => f.write_str("<stdin>"),
            InputSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Statistics for one read
#[derive(Debug, Clone)]
pub struct ReadStats {
    pub source: String,
    pub bytes_read: u64,
    pub duration_ms: u64,
    pub read_error: Option<String>,
}

fn has_glob_meta(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// Turn CLI arguments into sources: `-` or nothing is stdin, glob patterns are expanded
pub fn expand_inputs(args: &[String]) -> Result<Vec<InputSource>> {
    if args.is_empty() {
        return Ok(vec![InputSource::Stdin]);
    }

    let mut sources = Vec::new();
    for arg in args {
        if arg == "-" {
            sources.push(InputSource::Stdin);
        } else if has_glob_meta(arg) {
            let mut matched: Vec<PathBuf> = glob::glob(arg)
                .with_context(|| format!("Invalid glob pattern: {arg}"))?
                .filter_map(|entry| match entry {
                    Ok(path) if path.is_file() => Some(path),
                    Ok(_) => None,
                    Err(e) => {
                        warn!("Skipping unreadable glob entry: {}", e);
                        None
                    }
                })
                .collect();
            if matched.is_empty() {
                anyhow::bail!("No files match pattern: {arg}");
            }
            matched.sort();
            debug!("Pattern {} matched {} files", arg, matched.len());
            sources.extend(matched.into_iter().map(InputSource::File));
        } else {
            sources.push(InputSource::File(PathBuf::from(arg)));
        }
    }
    Ok(sources)
}

/// Reads whole inputs as UTF-8 text
pub struct AsyncFileReader {
    config: ReaderConfig,
}

impl AsyncFileReader {
    pub fn new(config: ReaderConfig) -> Self {
        Self { config }
    }

    /// Read a source; without fail-fast a failure yields empty text and `read_error`
    pub async fn read_source(&self, source: &InputSource) -> Result<(String, ReadStats)> {
        let start_time = std::time::Instant::now();

        let outcome = match source {
            InputSource::Stdin => self.read_stdin().await,
            InputSource::File(path) if self.config.use_mmap => read_mmap(path),
            InputSource::File(path) => self.read_file(path).await,
        };

        let duration_ms = start_time.elapsed().as_millis() as u64;
        match outcome {
            Ok(text) => {
                info!("Read {}: {} bytes in {}ms", source, text.len(), duration_ms);
                let stats = ReadStats {
                    source: source.to_string(),
                    bytes_read: text.len() as u64,
                    duration_ms,
                    read_error: None,
                };
                Ok((text, stats))
            }
            Err(e) => {
                let error_msg = format!("{e:#}");
                warn!("{}", error_msg);
                if self.config.fail_fast {
                    return Err(e);
                }
                let stats = ReadStats {
                    source: source.to_string(),
                    bytes_read: 0,
                    duration_ms,
                    read_error: Some(error_msg),
                };
                Ok((String::new(), stats))
            }
        }
    }

    async fn read_file(&self, path: &Path) -> Result<String> {
        let file = File::open(path)
            .await
            .with_context(|| format!("Failed to open file {}", path.display()))?;
        let mut reader = BufReader::with_capacity(self.config.buffer_size, file);
        let mut text = String::new();
        reader
            .read_to_string(&mut text)
            .await
            .with_context(|| format!("Failed to read {} as UTF-8 text", path.display()))?;
        Ok(text)
    }

    async fn read_stdin(&self) -> Result<String> {
        let mut reader = BufReader::with_capacity(self.config.buffer_size, tokio::io::stdin());
        let mut text = String::new();
        reader
            .read_to_string(&mut text)
            .await
            .context("Failed to read stdin as UTF-8 text")?;
        Ok(text)
    }
}

fn read_mmap(path: &Path) -> Result<String> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open file {}", path.display()))?;
    if file.metadata()?.len() == 0 {
        return Ok(String::new());
    }
    // The mapping is only read while the file handle is held here
    let mmap = unsafe { Mmap::map(&file) }
        .with_context(|| format!("Failed to map file {}", path.display()))?;
    let text = std::str::from_utf8(&mmap)
        .with_context(|| format!("Failed to read {} as UTF-8 text", path.display()))?;
    Ok(text.to_string())
}
