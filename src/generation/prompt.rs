//! Prompt Normalization
//!
//! Deterministic rewrite of a raw user prompt before it is sent to a model:
//!
//! 1. Lowercase
//! 2. Append missing quality descriptors
//! 3. Expand abbreviations (whole words)
//! 4. Correct common misspellings (whole words)
//! 5. Append a default style when the user's wording carries none
//! 6. Trim
//!
//! A match that already sits inside a whole-word expansion phrase (the `art` of
//! `digital art`, the `vivid` of `vivid colors`) is left alone, which makes
//! `normalize` idempotent on its own output.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

/// Descriptors appended when absent, in this order
const DESCRIPTORS: &[&str] = &["high quality", "detailed", "realistic", "sharp", "vivid"];

/// Abbreviation expansions, applied in table order
const ABBREVIATIONS: &[(&str, &str)] = &[
    ("hd", "high definition"),
    ("4k", "4k resolution"),
    ("8k", "8k resolution"),
    ("ultra", "ultra high resolution"),
    ("photo", "photorealistic"),
    ("art", "artistic"),
    ("sketch", "sketch style"),
    ("watercolor", "watercolor painting"),
    ("oil", "oil painting"),
    ("digital", "digital art"),
];

/// Misspelling corrections, applied in table order after abbreviations
const MISSPELLINGS: &[(&str, &str)] = &[
    ("realstic", "realistic"),
    ("highqulity", "high quality"),
    ("detaled", "detailed"),
    ("sharpe", "sharp"),
    ("vivid", "vivid colors"),
];

/// Any of these counts as an explicit style
const STYLE_KEYWORDS: &[&str] = &[
    "realistic",
    "artistic",
    "digital art",
    "oil painting",
    "watercolor",
    "sketch style",
];

const DEFAULT_STYLE: &str = "digital art";

struct Rule {
    pattern: Regex,
    replacement: &'static str,
}

static ABBREVIATION_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| compile(ABBREVIATIONS));
static MISSPELLING_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| compile(MISSPELLINGS));

/// Whole-word patterns for every expansion phrase
static EXPANSION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    ABBREVIATIONS
        .iter()
        .chain(MISSPELLINGS)
        .map(|(_, phrase)| whole_word(phrase))
        .collect()
});

fn compile(table: &[(&str, &'static str)]) -> Vec<Rule> {
    table
        .iter()
        .map(|(word, replacement)| Rule {
            pattern: whole_word(word),
            replacement,
        })
        .collect()
}

fn whole_word(word: &str) -> Regex {
    Regex::new(&format!(r"(?i)\b{}\b", regex::escape(word)))
        .expect("table words are plain literals")
}

/// Normalize a raw prompt. Blank input yields an empty string.
pub fn normalize(raw: &str) -> String {
    if raw.trim().is_empty() {
        return String::new();
    }

    let lowered = raw.to_lowercase();

    let missing: Vec<&str> = DESCRIPTORS
        .iter()
        .copied()
        .filter(|desc| !lowered.contains(desc))
        .collect();

    // The user's wording and the injected descriptors are rewritten separately
    // so the style check below only looks at what the user actually asked for.
    let subject = rewrite(&lowered);
    let styled = has_style(&subject);
    let descriptors = rewrite(&missing.join(" "));

    let mut out = subject;
    if !descriptors.is_empty() {
        out.push(' ');
        out.push_str(&descriptors);
    }

    if !styled {
        out.push(' ');
        out.push_str(DEFAULT_STYLE);
    }

    out.trim().to_string()
}

/// Whether the text already names a style
pub fn has_style(text: &str) -> bool {
    let lower = text.to_lowercase();
    STYLE_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

fn rewrite(text: &str) -> String {
    let expanded = apply_rules(text, &ABBREVIATION_RULES);
    apply_rules(&expanded, &MISSPELLING_RULES)
}

fn apply_rules(text: &str, rules: &[Rule]) -> String {
    rules
        .iter()
        .fold(text.to_string(), |acc, rule| apply_rule(&acc, rule))
}

fn apply_rule(text: &str, rule: &Rule) -> String {
    let protected = expansion_spans(text);
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for m in rule.pattern.find_iter(text) {
        let span = m.range();
        if protected.iter().any(|p| contains(p, &span)) {
            continue;
        }
        out.push_str(&text[last..span.start]);
        out.push_str(rule.replacement);
        last = span.end;
    }
    out.push_str(&text[last..]);
    out
}

/// Byte ranges already occupied by a whole-word expansion phrase
fn expansion_spans(text: &str) -> Vec<Range<usize>> {
    EXPANSION_PATTERNS
        .iter()
        .flat_map(|pattern| pattern.find_iter(text).map(|m| m.range()))
        .collect()
}

fn contains(outer: &Range<usize>, inner: &Range<usize>) -> bool {
    outer.start <= inner.start && inner.end <= outer.end
}
