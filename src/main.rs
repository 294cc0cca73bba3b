use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use microtools::age::{compute_age, parse_birth};
use microtools::batch::{process_inputs, BatchOptions, FileReport};
use microtools::config::Settings;
use microtools::csv_convert::{convert_text, row_count};
use microtools::grammar::{apply_fixes, count_by_category, Category, Severity};
use microtools::history::{HistoryStore, NewConversion};
use microtools::reader::{expand_inputs, AsyncFileReader, InputSource, ReaderConfig};
use microtools::registry::{ToolModule, ToolRegistry};
use microtools::stats::readability_level;
use microtools::units::{convert_value, format_number, parse_value, Rounding, UnitCategory};

#[derive(Parser, Debug)]
#[command(name = "microtools")]
#[command(about = "Grammar checking, text statistics, CSV to JSON, unit conversion and age calculation")]
#[command(version)]
struct Cli {
    /// Settings file (TOML); defaults to ./microtools.toml when present
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. `info` or `microtools=debug`; falls back to RUST_LOG, then `warn`
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Report grammar, spelling, style and punctuation issues
    Check(CheckArgs),
    /// Word, sentence and paragraph counts, reading time and readability
    Stats(StatsArgs),
    /// Convert CSV or delimited text to JSON
    Csv(CsvArgs),
    /// Convert a value between units
    Convert(ConvertArgs),
    /// Inspect or edit the conversion history
    History(HistoryArgs),
    /// Exact age from a birth date
    Age(AgeArgs),
    /// List registered tools
    Tools(ToolsArgs),
    /// Run a tool by route or id and print its JSON output
    Run(RunArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Files or glob patterns; `-` or nothing reads stdin
    inputs: Vec<String>,

    /// Use memory-mapped I/O instead of async buffered
    #[arg(long)]
    use_mmap: bool,

    /// Suppress console progress bars
    #[arg(long)]
    no_progress: bool,

    /// Abort on first error
    #[arg(long)]
    fail_fast: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Args, Debug)]
struct CheckArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Drop issues of this category (repeatable)
    #[arg(long)]
    exclude: Vec<Category>,

    /// Drop issues below this severity
    #[arg(long)]
    min_severity: Option<Severity>,

    /// Print the text with every non-overlapping suggestion applied
    #[arg(long)]
    fix: bool,
}

#[derive(Args, Debug)]
struct StatsArgs {
    #[command(flatten)]
    input: InputArgs,
}

#[derive(Args, Debug)]
struct CsvArgs {
    /// Input file; `-` or nothing reads stdin
    input: Option<String>,

    /// Field delimiter, or `auto` to detect it
    #[arg(long)]
    delimiter: Option<String>,

    /// Treat the first row as data
    #[arg(long)]
    no_header: bool,

    /// Keep blank lines as empty rows
    #[arg(long)]
    keep_empty_lines: bool,
}

#[derive(Args, Debug)]
struct ConvertArgs {
    category: UnitCategory,

    #[arg(allow_hyphen_values = true)]
    value: String,

    from: String,

    to: String,

    /// Fixed number of decimals instead of automatic rounding
    #[arg(long)]
    digits: Option<u8>,

    /// Do not record the conversion
    #[arg(long)]
    no_history: bool,
}

#[derive(Args, Debug)]
struct HistoryArgs {
    #[command(subcommand)]
    action: Option<HistoryAction>,

    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum HistoryAction {
    /// Show saved conversions, newest first
    List,
    /// Delete all saved conversions
    Clear,
    /// Delete one conversion
    Remove { id: u64 },
    /// Totals per category and time range
    Stats,
}

#[derive(Args, Debug)]
struct AgeArgs {
    /// Birth date as YYYY-MM-DD
    date: String,

    /// Birth time as HH:MM or HH:MM:SS
    #[arg(long)]
    time: Option<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Args, Debug)]
struct ToolsArgs {
    #[arg(long)]
    category: Option<String>,

    #[arg(long)]
    featured: bool,

    #[arg(long)]
    tag: Option<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// `/tools/{id}` or a bare tool id
    target: String,

    /// Input file; `-` or nothing reads stdin
    input: Option<String>,

    /// Use this text as input instead of reading a file
    #[arg(long, conflicts_with = "input")]
    text: Option<String>,
}

fn init_logging(level: Option<&str>) -> Result<()> {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level).with_context(|| format!("Invalid log level: {level}"))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    // stdout carries command output, logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .json()
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref())?;

    info!("Starting microtools");
    debug!(?cli, "Parsed CLI arguments");

    let cwd = std::env::current_dir().context("Cannot determine working directory")?;
    let settings = Settings::load(cli.config.as_deref(), &cwd)?;

    match cli.command {
        Command::Check(args) => run_check(args, &settings).await,
        Command::Stats(args) => run_stats(args, &settings).await,
        Command::Csv(args) => run_csv(args, &settings).await,
        Command::Convert(args) => run_convert(args, &settings, &cwd).await,
        Command::History(args) => run_history(args, &settings, &cwd).await,
        Command::Age(args) => run_age(args),
        Command::Tools(args) => run_tools(args),
        Command::Run(args) => run_tool(args, &settings).await,
    }
}

fn batch_options(input: &InputArgs, settings: &Settings) -> BatchOptions {
    BatchOptions {
        reader: ReaderConfig {
            fail_fast: input.fail_fast || settings.reader.fail_fast,
            buffer_size: settings.reader.buffer_size,
            use_mmap: input.use_mmap,
        },
        analyzer: settings.analyzer.clone(),
        words_per_minute: settings.stats.words_per_minute,
        find_issues: true,
        keep_text: false,
        concurrency: settings.reader.concurrency,
        show_progress: !input.no_progress,
    }
}

fn report_failures(reports: &[FileReport]) {
    for report in reports {
        if let Some(error) = &report.error {
            eprintln!("{}: error: {}", report.source, error);
        }
    }
}

async fn run_check(args: CheckArgs, settings: &Settings) -> Result<()> {
    let sources = expand_inputs(&args.input.inputs)?;
    let mut options = batch_options(&args.input, settings);
    options.analyzer.excluded_categories.extend(args.exclude.iter().copied());
    if let Some(min_severity) = args.min_severity {
        options.analyzer.min_severity = min_severity;
    }
    options.keep_text = args.fix;

    let reports = process_inputs(sources, &options).await?;
    report_failures(&reports);

    if args.fix {
        return print_fixes(&reports, args.input.format);
    }

    match args.input.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
        OutputFormat::Text => {
            let mut total = 0;
            for report in reports.iter().filter(|r| r.error.is_none()) {
                for issue in &report.issues {
                    println!(
                        "{}:{}:{}: {} {}: {} '{}' -> {}",
                        report.source,
                        issue.span.start_line,
                        issue.span.start_col,
                        issue.severity,
                        issue.category,
                        issue.message,
                        issue.text,
                        issue.suggestion
                    );
                }
                total += report.issues.len();
            }
            let all: Vec<_> = reports.iter().flat_map(|r| r.issues.iter().cloned()).collect();
            let breakdown: Vec<String> = count_by_category(&all)
                .into_iter()
                .map(|(category, count)| format!("{category}: {count}"))
                .collect();
            if breakdown.is_empty() {
                println!("{total} issues");
            } else {
                println!("{total} issues ({})", breakdown.join(", "));
            }
        }
    }
    Ok(())
}

fn print_fixes(reports: &[FileReport], format: OutputFormat) -> Result<()> {
    let mut fixed = Vec::new();
    for report in reports {
        if let Some(text) = &report.text {
            fixed.push((report.source.as_str(), apply_fixes(text, &report.issues)?));
        }
    }

    match format {
        OutputFormat::Json => {
            let entries: Vec<_> = fixed
                .iter()
                .map(|(source, text)| serde_json::json!({ "source": source, "fixed": text }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        OutputFormat::Text if fixed.len() == 1 => print!("{}", fixed[0].1),
        OutputFormat::Text => {
            for (source, text) in &fixed {
                println!("==> {source} <==");
                println!("{text}");
            }
        }
    }
    Ok(())
}

async fn run_stats(args: StatsArgs, settings: &Settings) -> Result<()> {
    let sources = expand_inputs(&args.input.inputs)?;
    let mut options = batch_options(&args.input, settings);
    options.find_issues = false;

    let reports = process_inputs(sources, &options).await?;
    report_failures(&reports);

    match args.input.format {
        OutputFormat::Json => {
            let entries: Vec<_> = reports
                .iter()
                .filter(|r| r.error.is_none())
                .map(|r| serde_json::json!({ "source": r.source, "stats": r.stats }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        OutputFormat::Text => {
            for report in reports.iter().filter(|r| r.error.is_none()) {
                let stats = &report.stats;
                println!("{}", report.source);
                println!("  Words: {}", stats.words);
                println!("  Sentences: {}", stats.sentences);
                println!("  Paragraphs: {}", stats.paragraphs);
                println!("  Characters: {}", stats.characters);
                println!("  Reading time: {} min", stats.reading_time);
                println!(
                    "  Readability: {} ({})",
                    stats.readability_score,
                    readability_level(stats.readability_score)
                );
            }
        }
    }
    Ok(())
}

/// Read one input completely; any read failure is fatal here
async fn read_single(input: Option<&str>, settings: &Settings) -> Result<String> {
    let source = match input {
        None | Some("-") => InputSource::Stdin,
        Some(path) => InputSource::File(PathBuf::from(path)),
    };
    let reader = AsyncFileReader::new(ReaderConfig {
        fail_fast: true,
        buffer_size: settings.reader.buffer_size,
        use_mmap: false,
    });
    let (text, _stats) = reader.read_source(&source).await?;
    Ok(text)
}

fn parse_delimiter(raw: &str) -> Result<Option<char>> {
    match raw {
        "auto" => Ok(None),
        "tab" | "\\t" => Ok(Some('\t')),
        other => {
            let mut chars = other.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(Some(c)),
                _ => anyhow::bail!("Delimiter must be a single character or `auto`: {other}"),
            }
        }
    }
}

async fn run_csv(args: CsvArgs, settings: &Settings) -> Result<()> {
    let mut csv_settings = settings.csv.clone();
    if let Some(raw) = &args.delimiter {
        csv_settings.delimiter = parse_delimiter(raw)?;
    }
    if args.no_header {
        csv_settings.header = false;
    }
    if args.keep_empty_lines {
        csv_settings.skip_empty_lines = false;
    }

    let text = read_single(args.input.as_deref(), settings).await?;
    let value = convert_text(&text, &csv_settings)?;
    info!("Successfully converted {} rows", row_count(&value));
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn history_store(settings: &Settings, cwd: &Path) -> HistoryStore {
    let path = settings
        .units
        .history_path
        .clone()
        .unwrap_or_else(|| HistoryStore::default_path(cwd));
    HistoryStore::new(path)
}

async fn run_convert(args: ConvertArgs, settings: &Settings, cwd: &Path) -> Result<()> {
    let value = parse_value(&args.value)?;
    let result = convert_value(args.category, &args.from, &args.to, value).with_context(|| {
        format!("Available {} units: {}", args.category, args.category.units().join(", "))
    })?;
    let rounding = match args.digits {
        Some(digits) => Rounding::Fixed { digits },
        None => settings.units.rounding,
    };
    let formatted = format_number(result, rounding);
    println!("{} {} = {} {}", args.value.trim(), args.from, formatted, args.to);

    if !args.no_history {
        let store = history_store(settings, cwd);
        let saved = store
            .push(NewConversion {
                category: args.category,
                from_value: value,
                from_unit: args.from,
                to_unit: args.to,
                result: formatted,
            })
            .await?;
        if !saved {
            debug!("Conversion repeats a recent one, not saved");
        }
    }
    Ok(())
}

async fn run_history(args: HistoryArgs, settings: &Settings, cwd: &Path) -> Result<()> {
    let store = history_store(settings, cwd);

    match args.action.unwrap_or(HistoryAction::List) {
        HistoryAction::List => {
            let history = store.load().await;
            match args.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&history)?),
                OutputFormat::Text if history.is_empty() => println!("No conversions saved"),
                OutputFormat::Text => {
                    for record in &history {
                        println!(
                            "#{} [{}] {} {} = {} {}",
                            record.id,
                            record.category,
                            format_number(record.from_value, Rounding::Auto),
                            record.from_unit,
                            record.result,
                            record.to_unit
                        );
                    }
                }
            }
        }
        HistoryAction::Clear => {
            store.clear().await?;
            println!("History cleared");
        }
        HistoryAction::Remove { id } => {
            if !store.remove(id).await? {
                anyhow::bail!("No conversion with id {id}");
            }
            println!("Removed conversion #{id}");
        }
        HistoryAction::Stats => {
            let summary = store.summary().await;
            match args.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
                OutputFormat::Text => {
                    println!("Total conversions: {}", summary.total_conversions);
                    for (category, count) in &summary.category_stats {
                        println!("  {category}: {count}");
                    }
                    if let (Some(oldest), Some(newest)) = (summary.oldest_conversion, summary.newest_conversion) {
                        println!("Oldest: {oldest} ms, newest: {newest} ms");
                    }
                }
            }
        }
    }
    Ok(())
}

fn run_age(args: AgeArgs) -> Result<()> {
    let born = parse_birth(&args.date, args.time.as_deref())?;
    let report = compute_age(born, chrono::Local::now().naive_local())?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            println!("Born {} ({})", report.formatted_dob, report.weekday);
            println!(
                "Age: {} years, {} months, {} days, {} hours, {} minutes, {} seconds",
                report.years, report.months, report.days, report.hours, report.minutes, report.seconds
            );
            println!(
                "Total: {} months, {} weeks, {} days, {} hours",
                report.totals.months, report.totals.weeks, report.totals.days, report.totals.hours
            );
            println!(
                "Next birthday: {} ({})",
                report.next_birthday.date, report.next_birthday.countdown
            );
        }
    }
    Ok(())
}

fn run_tools(args: ToolsArgs) -> Result<()> {
    let registry = ToolRegistry::builtin()?;
    let mut tools: Vec<&ToolModule> = if args.featured {
        registry.featured()
    } else {
        registry.tools().iter().collect()
    };
    if let Some(category) = &args.category {
        let allowed = registry.in_category(category);
        tools.retain(|t| allowed.iter().any(|a| a.config.id == t.config.id));
    }
    if let Some(tag) = &args.tag {
        let allowed = registry.search(tag);
        tools.retain(|t| allowed.iter().any(|a| a.config.id == t.config.id));
    }

    match args.format {
        OutputFormat::Json => {
            let configs: Vec<_> = tools.iter().map(|t| &t.config).collect();
            println!("{}", serde_json::to_string_pretty(&configs)?);
        }
        OutputFormat::Text => {
            for category in registry.categories() {
                let in_category: Vec<_> = tools.iter().filter(|t| t.config.category == category).collect();
                if in_category.is_empty() {
                    continue;
                }
                println!("{category}");
                for tool in in_category {
                    let marker = if tool.config.featured { " *" } else { "" };
                    println!("  {:<24} {}{}", tool.config.route(), tool.config.name, marker);
                }
            }
        }
    }
    Ok(())
}

async fn run_tool(args: RunArgs, settings: &Settings) -> Result<()> {
    let registry = ToolRegistry::builtin()?;
    let tool = registry.resolve(&args.target)?;
    info!("Mounted {} at {}", tool.config.name, tool.config.route());

    let input = match args.text {
        Some(text) => text,
        None => read_single(args.input.as_deref(), settings).await?,
    };
    let output = tool.component.run(&input, settings)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
