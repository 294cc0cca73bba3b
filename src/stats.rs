// Descriptive text metrics and the Flesch Reading Ease score

use anyhow::Result;
use regex_automata::meta::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Average reading speed used when none is configured
pub const DEFAULT_WORDS_PER_MINUTE: u32 = 200;

/// Metrics derived from a text buffer; recomputed wholesale on every call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextStats {
    pub words: usize,
    pub sentences: usize,
    pub paragraphs: usize,
    pub characters: usize,
    /// Minutes, rounded up
    pub reading_time: usize,
    /// Flesch Reading Ease clamped to 0..=100
    pub readability_score: u32,
}

struct StatsPatterns {
    sentence_end: Regex,
    paragraph_break: Regex,
    silent_suffix: Regex,
    leading_y: Regex,
    vowel_group: Regex,
}

impl StatsPatterns {
    fn compile() -> Result<Self> {
        Ok(Self {
            sentence_end: Regex::new(r"[.!?]+")?,
            paragraph_break: Regex::new(r"\n\s*\n")?,
            silent_suffix: Regex::new(r"(?:[^laeiouy]es|ed|[^laeiouy]e)$")?,
            leading_y: Regex::new(r"^y")?,
            vowel_group: Regex::new(r"[aeiouy]{1,2}")?,
        })
    }
}

static PATTERNS: OnceLock<StatsPatterns> = OnceLock::new();

fn patterns() -> Result<&'static StatsPatterns> {
    if let Some(p) = PATTERNS.get() {
        return Ok(p);
    }
    let compiled = StatsPatterns::compile()?;
    Ok(PATTERNS.get_or_init(|| compiled))
}

/// Pieces of `text` between matches of `separator`, like `String.split` with a regex
fn split_by<'a>(separator: &Regex, text: &'a str) -> Vec<&'a str> {
    let mut pieces = Vec::new();
    let mut last = 0;
    for m in separator.find_iter(text) {
        pieces.push(&text[last..m.start()]);
        last = m.end();
    }
    pieces.push(&text[last..]);
    pieces
}

fn count_non_blank(pieces: &[&str]) -> usize {
    pieces.iter().filter(|p| !p.trim().is_empty()).count()
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

pub fn sentence_count(text: &str) -> Result<usize> {
    let p = patterns()?;
    Ok(count_non_blank(&split_by(&p.sentence_end, text)))
}

/// Blank-line separated blocks; never less than 1
pub fn paragraph_count(text: &str) -> Result<usize> {
    let p = patterns()?;
    Ok(count_non_blank(&split_by(&p.paragraph_break, text)).max(1))
}

/// Vowel-run heuristic; every word has at least one syllable
pub fn count_syllables(word: &str) -> Result<usize> {
    let word = word.to_lowercase();
    if word.chars().count() <= 3 {
        return Ok(1);
    }

    let p = patterns()?;
    let mut word = match p.silent_suffix.find(word.as_str()) {
        Some(m) => word[..m.start()].to_string(),
        None => word,
    };
    if p.leading_y.is_match(word.as_str()) {
        word.remove(0);
    }

    let groups = p.vowel_group.find_iter(word.as_str()).count();
    Ok(if groups == 0 { 1 } else { groups })
}

fn flesch_score(words: usize, sentences: usize, syllables: usize) -> u32 {
    if words == 0 || sentences == 0 {
        return 0;
    }
    let words_per_sentence = words as f64 / sentences as f64;
    let syllables_per_word = syllables as f64 / words as f64;
    let score = 206.835 - 1.015 * words_per_sentence - 84.6 * syllables_per_word;
    score.round().clamp(0.0, 100.0) as u32
}

/// Flesch Reading Ease, rounded and clamped to 0..=100; 0 without words or sentences
pub fn readability_score(text: &str) -> Result<u32> {
    let sentences = sentence_count(text)?;
    let mut words = 0;
    let mut syllables = 0;
    for word in text.split_whitespace() {
        words += 1;
        syllables += count_syllables(word)?;
    }
    Ok(flesch_score(words, sentences, syllables))
}

/// Human label for a readability score
pub fn readability_level(score: u32) -> &'static str {
    if score >= 90 {
        "Very Easy"
    } else if score >= 80 {
        "Easy"
    } else if score >= 70 {
        "Fairly Easy"
    } else if score >= 60 {
        "Standard"
    } else if score >= 50 {
        "Fairly Difficult"
    } else if score >= 30 {
        "Difficult"
    } else {
        "Very Difficult"
    }
}

pub fn calculate_text_stats(text: &str) -> Result<TextStats> {
    calculate_text_stats_with(text, DEFAULT_WORDS_PER_MINUTE)
}

/// Compute all metrics with a custom reading speed
pub fn calculate_text_stats_with(text: &str, words_per_minute: u32) -> Result<TextStats> {
    let words = word_count(text);
    let wpm = words_per_minute.max(1) as usize;
    Ok(TextStats {
        words,
        sentences: sentence_count(text)?,
        paragraphs: paragraph_count(text)?,
        characters: text.chars().count(),
        reading_time: words.div_ceil(wpm),
        readability_score: readability_score(text)?,
    })
}
