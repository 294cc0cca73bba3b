// Components mounted by the registry. Each one wraps a library module and
// renders its result as JSON for the `run` command.

use anyhow::{Context, Result};
use serde_json::{json, Map, Value};

use crate::age::{compute_age, parse_birth};
use crate::config::Settings;
use crate::csv_convert::{convert_text, row_count};
use crate::grammar::{count_by_category, default_checker};
use crate::registry::ToolComponent;
use crate::stats::{calculate_text_stats_with, readability_level};
use crate::units::{convert_value, format_number, parse_value, UnitCategory};

/// Issues, per-category counts and text statistics for the input
pub struct GrammarCheckerTool;

impl ToolComponent for GrammarCheckerTool {
    fn run(&self, input: &str, settings: &Settings) -> Result<Value> {
        let issues = default_checker()?.analyze_with(input, &settings.analyzer);
        let stats = calculate_text_stats_with(input, settings.stats.words_per_minute)?;

        let mut counts = Map::new();
        for (category, count) in count_by_category(&issues) {
            counts.insert(category.as_str().to_string(), json!(count));
        }

        Ok(json!({
            "issues": issues,
            "counts": counts,
            "stats": stats,
            "readability_level": readability_level(stats.readability_score),
        }))
    }
}

/// Delimited text to JSON using the configured CSV settings
pub struct CsvToJsonTool;

impl ToolComponent for CsvToJsonTool {
    fn run(&self, input: &str, settings: &Settings) -> Result<Value> {
        let value = convert_text(input, &settings.csv)?;
        tracing::info!("Converted {} rows", row_count(&value));
        Ok(value)
    }
}

/// Input is `<category> <value> <from> <to>`, optionally `<value> <from> to <to>`
pub struct UnitConverterTool;

impl ToolComponent for UnitConverterTool {
    fn run(&self, input: &str, settings: &Settings) -> Result<Value> {
        let tokens: Vec<&str> = input.split_whitespace().collect();
        let (category, value, from, to) = match tokens.as_slice() {
            [category, value, from, to] => (*category, *value, *from, *to),
            [category, value, from, "to", to] => (*category, *value, *from, *to),
            _ => anyhow::bail!("Expected '<category> <value> <from> <to>', got: {}", input.trim()),
        };

        let category: UnitCategory = category.parse()?;
        let value = parse_value(value)?;
        let result = convert_value(category, from, to, value)
            .with_context(|| format!("Cannot convert {value} {from} to {to}"))?;

        Ok(json!({
            "category": category,
            "value": value,
            "from": from,
            "to": to,
            "result": result,
            "formatted": format_number(result, settings.units.rounding),
        }))
    }
}

/// Input is `<YYYY-MM-DD> [HH:MM]`; the age is taken at the current local time
pub struct AgeCalculatorTool;

impl ToolComponent for AgeCalculatorTool {
    fn run(&self, input: &str, _settings: &Settings) -> Result<Value> {
        let tokens: Vec<&str> = input.split_whitespace().collect();
        let (date, time) = match tokens.as_slice() {
            [date] => (*date, None),
            [date, time] => (*date, Some(*time)),
            _ => anyhow::bail!("Expected '<YYYY-MM-DD> [HH:MM]', got: {}", input.trim()),
        };

        let born = parse_birth(date, time)?;
        let report = compute_age(born, chrono::Local::now().naive_local())?;
        Ok(serde_json::to_value(report)?)
    }
}
