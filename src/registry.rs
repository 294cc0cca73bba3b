//! Static tool registry: each entry pairs a tool's metadata with the component
//! that serves it. Routes, categories and the featured list are derived views.

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::Settings;
use crate::error::ToolError;
use crate::tools::{AgeCalculatorTool, CsvToJsonTool, GrammarCheckerTool, UnitConverterTool};

pub const ROUTE_PREFIX: &str = "/tools/";

/// Display metadata for a tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolConfig {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub category: &'static str,
    pub featured: bool,
    pub tags: &'static [&'static str],
}

impl ToolConfig {
    pub fn route(&self) -> String {
        route_path(self.id)
    }
}

pub fn route_path(id: &str) -> String {
    format!("{ROUTE_PREFIX}{id}")
}

/// What a route mounts: turns the user's input into JSON output
pub trait ToolComponent: Send + Sync {
    fn run(&self, input: &str, settings: &Settings) -> Result<Value>;
}

pub struct ToolModule {
    pub config: ToolConfig,
    pub component: Box<dyn ToolComponent>,
}

impl std::fmt::Debug for ToolModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolModule").field("config", &self.config).finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolRoute {
    pub path: String,
    pub id: &'static str,
}

pub const GRAMMAR_CHECKER: ToolConfig = ToolConfig {
    id: "grammar-checker",
    name: "Grammar Checker Pro",
    description: "Elevate your writing with advanced grammar, spelling, and style suggestions. Check your text for various issues and improve your writing.",
    icon: "FileText",
    category: "Writing",
    featured: true,
    tags: &["grammar", "spelling", "writing", "text", "editor", "proofreading"],
};

pub const CSV_TO_JSON: ToolConfig = ToolConfig {
    id: "csv-to-json",
    name: "CSV to JSON Converter",
    description: "Convert CSV files and text data to JSON format with advanced parsing options. Supports custom delimiters, header settings, and more.",
    icon: "FileSpreadsheet",
    category: "Data Tools",
    featured: true,
    tags: &["csv", "json", "converter", "data", "parser"],
};

pub const UNIT_CONVERTER: ToolConfig = ToolConfig {
    id: "unit-converter",
    name: "Unit Converter",
    description: "Convert between different units of measurement including length, weight, and temperature.",
    icon: "ArrowRightLeft",
    category: "Utilities",
    featured: true,
    tags: &["converter", "measurement", "units", "length", "weight", "temperature"],
};

pub const AGE_CALCULATOR: ToolConfig = ToolConfig {
    id: "age-calculator",
    name: "Age Calculator",
    description: "Calculate your exact age in years, months, days, hours, minutes, and seconds with this precise age calculator.",
    icon: "Cake",
    category: "Calculators",
    featured: true,
    tags: &["age", "calculator", "birthday", "date", "time"],
};

#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolModule>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The tools shipped with the crate, in menu order
    pub fn builtin() -> Result<Self, ToolError> {
        let mut registry = Self::new();
        registry.register(GRAMMAR_CHECKER, Box::new(GrammarCheckerTool))?;
        registry.register(CSV_TO_JSON, Box::new(CsvToJsonTool))?;
        registry.register(UNIT_CONVERTER, Box::new(UnitConverterTool))?;
        registry.register(AGE_CALCULATOR, Box::new(AgeCalculatorTool))?;
        Ok(registry)
    }

    pub fn register(&mut self, config: ToolConfig, component: Box<dyn ToolComponent>) -> Result<(), ToolError> {
        if self.get(config.id).is_some() {
            return Err(ToolError::DuplicateTool(config.id.to_string()));
        }
        debug!("Registered tool {} at {}", config.id, config.route());
        self.tools.push(ToolModule { config, component });
        Ok(())
    }

    pub fn tools(&self) -> &[ToolModule] {
        &self.tools
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&ToolModule> {
        self.tools.iter().find(|t| t.config.id == id)
    }

    pub fn routes(&self) -> Vec<ToolRoute> {
        self.tools
            .iter()
            .map(|t| ToolRoute {
                path: t.config.route(),
                id: t.config.id,
            })
            .collect()
    }

    /// Distinct categories in first-seen order
    pub fn categories(&self) -> Vec<&'static str> {
        let mut categories: Vec<&'static str> = Vec::new();
        for tool in &self.tools {
            if !categories.contains(&tool.config.category) {
                categories.push(tool.config.category);
            }
        }
        categories
    }

    pub fn featured(&self) -> Vec<&ToolModule> {
        self.tools.iter().filter(|t| t.config.featured).collect()
    }

    pub fn in_category(&self, category: &str) -> Vec<&ToolModule> {
        self.tools
            .iter()
            .filter(|t| t.config.category.eq_ignore_ascii_case(category))
            .collect()
    }

    pub fn search(&self, tag: &str) -> Vec<&ToolModule> {
        self.tools
            .iter()
            .filter(|t| t.config.tags.iter().any(|candidate| candidate.eq_ignore_ascii_case(tag)))
            .collect()
    }

    /// Look up a tool by `/tools/{id}` route or bare id
    pub fn resolve(&self, path_or_id: &str) -> Result<&ToolModule, ToolError> {
        let trimmed = path_or_id.trim().trim_end_matches('/');
        let id = trimmed.strip_prefix(ROUTE_PREFIX).unwrap_or(trimmed);
        self.get(id)
            .ok_or_else(|| ToolError::UnknownTool(path_or_id.to_string()))
    }
}
