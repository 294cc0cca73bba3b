// Static rule table for the grammar analyzer.
// Rules are declared as plain data and compiled once into meta regexes.

use anyhow::{Context, Result};
use regex_automata::{meta::Regex, util::syntax};
use tracing::debug;

use super::{Category, Severity};

/// Declarative form of a rule, before its pattern is compiled
#[derive(Debug, Clone, Copy)]
pub struct RuleSpec {
    pub pattern: &'static str,
    pub case_insensitive: bool,
    pub category: Category,
    pub message: &'static str,
    pub suggestion: &'static str,
    pub explanation: &'static str,
    pub severity: Severity,
}

/// Built-in rules in evaluation order. Issue ids embed the index into this table.
pub const DEFAULT_RULES: &[RuleSpec] = &[
    // Spelling
    RuleSpec {
        pattern: r"(?-u:\b)(recieve|recieved|recieving)(?-u:\b)",
        case_insensitive: true,
        category: Category::Spelling,
        message: "Spelling error",
        suggestion: "receive/received/receiving",
        explanation: "Remember: \"i\" before \"e\" except after \"c\"",
        severity: Severity::High,
    },
    RuleSpec {
        pattern: r"(?-u:\b)(seperate|seperated|seperating)(?-u:\b)",
        case_insensitive: true,
        category: Category::Spelling,
        message: "Spelling error",
        suggestion: "separate/separated/separating",
        explanation: "The correct spelling uses \"a\" in the middle",
        severity: Severity::High,
    },
    RuleSpec {
        pattern: r"(?-u:\b)(definately)(?-u:\b)",
        case_insensitive: true,
        category: Category::Spelling,
        message: "Spelling error",
        suggestion: "definitely",
        explanation: "Common misspelling - remember \"finite\" is in \"definitely\"",
        severity: Severity::High,
    },
    RuleSpec {
        pattern: r"(?-u:\b)(occured|occurence)(?-u:\b)",
        case_insensitive: true,
        category: Category::Spelling,
        message: "Spelling error",
        suggestion: "occurred/occurrence",
        explanation: "Double \"r\" is needed in these forms",
        severity: Severity::High,
    },
    // Grammar
    RuleSpec {
        pattern: r"(?-u:\b)(your)\s+(doing|going|coming|running|walking)(?-u:\b)",
        case_insensitive: true,
        category: Category::Grammar,
        message: "Incorrect usage of \"your\"",
        suggestion: "you're (you are)",
        explanation: "Use \"you're\" (contraction of \"you are\") instead of \"your\" (possessive)",
        severity: Severity::Medium,
    },
    RuleSpec {
        pattern: r"(?-u:\b)(its)\s+(been|going|important|necessary)(?-u:\b)",
        case_insensitive: true,
        category: Category::Grammar,
        message: "Incorrect usage of \"its\"",
        suggestion: "it's (it is)",
        explanation: "Use \"it's\" (contraction of \"it is\") instead of \"its\" (possessive)",
        severity: Severity::Medium,
    },
    RuleSpec {
        pattern: r"(?-u:\b)(there)\s+(doing|going|coming|happy|sad)(?-u:\b)",
        case_insensitive: true,
        category: Category::Grammar,
        message: "Incorrect usage of \"there\"",
        suggestion: "they're (they are)",
        explanation: "Use \"they're\" (contraction of \"they are\") instead of \"there\" (location)",
        severity: Severity::Medium,
    },
    RuleSpec {
        pattern: r"(?-u:\b)(could|should|would)\s+of(?-u:\b)",
        case_insensitive: true,
        category: Category::Grammar,
        message: "Incorrect phrase",
        suggestion: "could/should/would have",
        explanation: "Use \"have\" instead of \"of\" in these constructions",
        severity: Severity::High,
    },
    // Style
    RuleSpec {
        pattern: r"(?-u:\b)(very|really|extremely|incredibly)\s+(good|bad|big|small|nice|great)(?-u:\b)",
        case_insensitive: true,
        category: Category::Style,
        message: "Weak modifier usage",
        suggestion: "Consider stronger adjectives",
        explanation: "Instead of \"very good\", try \"excellent\". Instead of \"very bad\", try \"terrible\"",
        severity: Severity::Low,
    },
    RuleSpec {
        pattern: r"(?-u:\b)(a lot of|lots of)(?-u:\b)",
        case_insensitive: true,
        category: Category::Style,
        message: "Informal expression",
        suggestion: "many/much",
        explanation: "Use \"many\" (countable) or \"much\" (uncountable) for more formal writing",
        severity: Severity::Low,
    },
    RuleSpec {
        pattern: r"(?-u:\b)(thing|stuff|things|stuffs)(?-u:\b)",
        case_insensitive: true,
        category: Category::Style,
        message: "Vague noun",
        suggestion: "Be more specific",
        explanation: "Use more precise nouns instead of vague terms like \"thing\" or \"stuff\"",
        severity: Severity::Low,
    },
    // Punctuation (case-sensitive: lowercase after terminal punctuation)
    RuleSpec {
        pattern: r"[.!?]\s*[a-z]",
        case_insensitive: false,
        category: Category::Punctuation,
        message: "Missing capitalization",
        suggestion: "Capitalize after sentence endings",
        explanation: "The first letter after a period, exclamation mark, or question mark should be capitalized",
        severity: Severity::Medium,
    },
    RuleSpec {
        pattern: r"\s{2,}",
        case_insensitive: false,
        category: Category::Punctuation,
        message: "Extra spaces",
        suggestion: "Use single space",
        explanation: "Use only one space between words and after punctuation",
        severity: Severity::Low,
    },
];

/// A rule with its compiled pattern
pub struct CompiledRule {
    pub spec: RuleSpec,
    pub regex: Regex,
}

impl std::fmt::Debug for CompiledRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledRule").field("spec", &self.spec).finish()
    }
}

impl CompiledRule {
    pub fn compile(spec: RuleSpec) -> Result<Self> {
        let regex = Regex::builder()
            .syntax(syntax::Config::new().case_insensitive(spec.case_insensitive))
            .build(spec.pattern)
            .with_context(|| format!("Invalid rule pattern: {}", spec.pattern))?;
        Ok(Self { spec, regex })
    }
}

/// Compile a list of rule specs, preserving order
pub fn compile_rules(specs: &[RuleSpec]) -> Result<Vec<CompiledRule>> {
    let rules = specs
        .iter()
        .copied()
        .map(CompiledRule::compile)
        .collect::<Result<Vec<_>>>()?;
    debug!("Compiled {} grammar rules", rules.len());
    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rules_compile() {
        let rules = compile_rules(DEFAULT_RULES).unwrap();
        assert_eq!(rules.len(), DEFAULT_RULES.len());
    }

    #[test]
    fn test_invalid_pattern_names_rule() {
        let spec = RuleSpec {
            pattern: r"(unclosed",
            ..DEFAULT_RULES[0]
        };
        let err = CompiledRule::compile(spec).unwrap_err();
        assert!(err.to_string().contains("(unclosed"));
    }

    #[test]
    fn test_case_sensitivity_flag() {
        let spelling = CompiledRule::compile(DEFAULT_RULES[0]).unwrap();
        assert!(spelling.regex.is_match("RECIEVE"));

        let capitals = CompiledRule::compile(DEFAULT_RULES[11]).unwrap();
        assert!(capitals.regex.is_match("end. next"));
        assert!(!capitals.regex.is_match("end. Next"));
    }
}
