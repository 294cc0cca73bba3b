pub mod age;
pub mod batch;
pub mod config;
pub mod csv_convert;
pub mod error;
pub mod grammar;
pub mod history;
pub mod reader;
pub mod registry;
pub mod stats;
pub mod tools;
pub mod units;

// Re-export main types for convenient access
pub use error::ToolError;
pub use grammar::{
    analyze_text, apply_fix, apply_fixes, count_by_category, AnalyzerOptions, Category,
    GrammarChecker, GrammarIssue, Severity, Span,
};
pub use stats::{calculate_text_stats, calculate_text_stats_with, readability_level, TextStats};

// Re-export registry types used by the CLI and integration tests
pub use registry::{ToolComponent, ToolConfig, ToolModule, ToolRegistry};

// Re-export batch processing for benchmarking
pub use batch::{process_inputs, BatchOptions, FileReport};
pub use config::Settings;
