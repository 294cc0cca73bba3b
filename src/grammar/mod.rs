// Rule-based grammar analyzer: every rule is run over the whole text and all
// matches are returned sorted by start offset. Overlapping matches are kept.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use tracing::debug;

use crate::error::ToolError;

pub mod rules;

pub use rules::{compile_rules, CompiledRule, RuleSpec, DEFAULT_RULES};

/// Kind of problem a rule reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Spelling,
    Grammar,
    Style,
    Punctuation,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Spelling,
        Category::Grammar,
        Category::Style,
        Category::Punctuation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Spelling => "spelling",
            Category::Grammar => "grammar",
            Category::Style => "style",
            Category::Punctuation => "punctuation",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ToolError::UnknownCategory(s.to_string()))
    }
}

/// Severity ordering is `Low < Medium < High`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            _ => Err(ToolError::UnknownSeverity(s.to_string())),
        }
    }
}

/// 1-based line/column position of an issue; columns count Unicode scalar values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start_line: usize,
    pub start_col: usize,
    pub end_line: usize,
    pub end_col: usize,
}

/// One occurrence of a rule firing on a span of the input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrammarIssue {
    /// `"{rule_index}-{start}"`, regenerated on every analysis
    pub id: String,
    pub rule_index: usize,
    pub category: Category,
    pub message: String,
    pub suggestion: String,
    pub explanation: String,
    /// Byte offset of the first matched byte
    pub start: usize,
    /// Byte offset one past the last matched byte
    pub end: usize,
    pub severity: Severity,
    /// The matched text
    pub text: String,
    pub span: Span,
}

/// Post-match filtering; the default keeps every issue
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerOptions {
    pub excluded_categories: Vec<Category>,
    pub min_severity: Severity,
}

impl AnalyzerOptions {
    pub fn keeps(&self, issue: &GrammarIssue) -> bool {
        issue.severity >= self.min_severity && !self.excluded_categories.contains(&issue.category)
    }
}

/// Maps byte offsets to 1-based line/column positions
struct LineIndex<'a> {
    text: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    fn new(text: &'a str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            text.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self { text, line_starts }
    }

    fn position(&self, byte_pos: usize) -> (usize, usize) {
        let line = match self.line_starts.binary_search(&byte_pos) {
            Ok(idx) => idx,
            Err(idx) => idx - 1,
        };
        let line_start = self.line_starts[line];
        let col = self.text[line_start..byte_pos].chars().count() + 1;
        (line + 1, col)
    }

    fn span(&self, start: usize, end: usize) -> Span {
        let (start_line, start_col) = self.position(start);
        let (end_line, end_col) = self.position(end);
        Span {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }
}

/// Compiled rule table plus the analysis pass over it
pub struct GrammarChecker {
    rules: Vec<CompiledRule>,
}

impl GrammarChecker {
    /// Compile a custom rule table
    pub fn new(specs: &[RuleSpec]) -> Result<Self> {
        Ok(Self {
            rules: compile_rules(specs)?,
        })
    }

    pub fn with_default_rules() -> Result<Self> {
        Self::new(DEFAULT_RULES)
    }

    /// Run every rule over `text`; result is sorted by start offset, ties in rule order
    pub fn analyze(&self, text: &str) -> Vec<GrammarIssue> {
        let lines = LineIndex::new(text);
        let mut issues = Vec::new();

        for (rule_index, rule) in self.rules.iter().enumerate() {
            for m in rule.regex.find_iter(text) {
                let (start, end) = (m.start(), m.end());
                issues.push(GrammarIssue {
                    id: format!("{rule_index}-{start}"),
                    rule_index,
                    category: rule.spec.category,
                    message: rule.spec.message.to_string(),
                    suggestion: rule.spec.suggestion.to_string(),
                    explanation: rule.spec.explanation.to_string(),
                    start,
                    end,
                    severity: rule.spec.severity,
                    text: text[start..end].to_string(),
                    span: lines.span(start, end),
                });
            }
        }

        // sort_by_key is stable, so equal offsets stay in rule-table order
        issues.sort_by_key(|issue| issue.start);
        debug!("Found {} issues in {} bytes", issues.len(), text.len());
        issues
    }

    pub fn analyze_with(&self, text: &str, options: &AnalyzerOptions) -> Vec<GrammarIssue> {
        let mut issues = self.analyze(text);
        issues.retain(|issue| options.keeps(issue));
        issues
    }
}

static DEFAULT_CHECKER: OnceLock<GrammarChecker> = OnceLock::new();

/// Shared checker over the built-in rules, compiled on first use
pub fn default_checker() -> Result<&'static GrammarChecker> {
    if let Some(checker) = DEFAULT_CHECKER.get() {
        return Ok(checker);
    }
    let checker = GrammarChecker::with_default_rules()?;
    Ok(DEFAULT_CHECKER.get_or_init(|| checker))
}

/// Analyze `text` against the built-in rules
pub fn analyze_text(text: &str) -> Result<Vec<GrammarIssue>> {
    Ok(default_checker()?.analyze(text))
}

/// Replace the issue's span with its suggestion
pub fn apply_fix(text: &str, issue: &GrammarIssue) -> Result<String, ToolError> {
    let in_bounds = issue.start <= issue.end && issue.end <= text.len();
    if !in_bounds || !text.is_char_boundary(issue.start) || !text.is_char_boundary(issue.end) {
        return Err(ToolError::InvalidFixRange {
            start: issue.start,
            end: issue.end,
            len: text.len(),
        });
    }

    let mut fixed = String::with_capacity(text.len() + issue.suggestion.len());
    fixed.push_str(&text[..issue.start]);
    fixed.push_str(&issue.suggestion);
    fixed.push_str(&text[issue.end..]);
    Ok(fixed)
}

/// Apply every fix in start order; an issue overlapping an already applied one is skipped
pub fn apply_fixes(text: &str, issues: &[GrammarIssue]) -> Result<String, ToolError> {
    let mut ordered: Vec<&GrammarIssue> = issues.iter().collect();
    ordered.sort_by_key(|issue| issue.start);

    let mut fixed = String::with_capacity(text.len());
    let mut cursor = 0;
    for issue in ordered {
        if issue.start < cursor {
            continue;
        }
        let in_bounds = issue.start <= issue.end && issue.end <= text.len();
        if !in_bounds || !text.is_char_boundary(issue.start) || !text.is_char_boundary(issue.end) {
            return Err(ToolError::InvalidFixRange {
                start: issue.start,
                end: issue.end,
                len: text.len(),
            });
        }
        fixed.push_str(&text[cursor..issue.start]);
        fixed.push_str(&issue.suggestion);
        cursor = issue.end;
    }
    fixed.push_str(&text[cursor..]);
    Ok(fixed)
}

/// Issue totals per category, in order of first appearance
pub fn count_by_category(issues: &[GrammarIssue]) -> Vec<(Category, usize)> {
    let mut counts: Vec<(Category, usize)> = Vec::new();
    for issue in issues {
        match counts.iter_mut().find(|(c, _)| *c == issue.category) {
            Some((_, n)) => *n += 1,
            None => counts.push((issue.category, 1)),
        }
    }
    counts
}
