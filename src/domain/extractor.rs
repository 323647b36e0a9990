//! Defensive extraction of JSON objects from untrusted generator output.
//!
//! Generators asked for "JSON only" still wrap objects in prose or code
//! fences, leave trailing commas, or stop mid-object. Extraction is staged:
//! a direct parse first, then - when repair is enabled - a lenient
//! bracket/quote scan that recovers the first balanced object or the
//! longest valid prefix, drops trailing commas, and closes what was left
//! open. The scan is an explicit state machine over (in-string,
//! escape-pending, bracket-stack) so its behavior is testable without a
//! generator.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

/// Length of the diagnostic snippet carried by extraction failures.
pub const DIAGNOSTIC_SNIPPET_CHARS: usize = 600;

/// Why extraction failed. Parse failure and schema rejection are distinct:
/// the former exhausts the repair pipeline, the latter means the text was
/// a well-formed object with the wrong shape.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractionError {
    /// No JSON object could be recovered, even with repair.
    #[error("no JSON object in generator output: {snippet}")]
    Unparseable { snippet: String },

    /// A well-formed object failed schema validation.
    #[error("schema validation failed: {0}")]
    SchemaValidation(String),
}

impl ExtractionError {
    /// Builds an unparseable error carrying the bounded diagnostic snippet
    /// of the original text.
    pub fn unparseable(raw: &str) -> Self {
        Self::Unparseable {
            snippet: diagnostic_snippet(raw),
        }
    }
}

/// First [`DIAGNOSTIC_SNIPPET_CHARS`] characters of the text with control
/// characters normalized to spaces. Safe to put in logs and errors.
pub fn diagnostic_snippet(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.chars().count() <= DIAGNOSTIC_SNIPPET_CHARS {
        return cleaned.to_string();
    }
    let truncated: String = cleaned.chars().take(DIAGNOSTIC_SNIPPET_CHARS).collect();
    format!("{}...(truncated)", truncated)
}

static TRAILING_COMMA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",(\s*[}\]])").expect("trailing comma pattern compiles"));

/// Staged extractor of a single JSON object from free text.
#[derive(Debug, Clone, Copy)]
pub struct JsonExtractor {
    allow_repair: bool,
}

impl Default for JsonExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonExtractor {
    /// Extractor with repair enabled.
    pub fn new() -> Self {
        Self { allow_repair: true }
    }

    /// Extractor that only accepts text that already parses.
    pub fn strict() -> Self {
        Self {
            allow_repair: false,
        }
    }

    /// Extracts a JSON object, repairing near-valid text when permitted.
    /// A parse that succeeds but yields a non-object (bare array, scalar)
    /// is rejected.
    pub fn extract(&self, raw: &str) -> Result<Map<String, Value>, ExtractionError> {
        if let Some(object) = parse_object(raw) {
            return Ok(object);
        }

        if self.allow_repair {
            if let Some(repaired) = repair(raw) {
                if repaired != raw {
                    if let Some(object) = parse_object(&repaired) {
                        debug!("recovered JSON object via repair");
                        return Ok(object);
                    }
                }
            }
        }

        Err(ExtractionError::unparseable(raw))
    }
}

fn parse_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Best-effort repair of near-JSON text. Returns `None` when there is
/// nothing to work with (no opening brace at all).
fn repair(raw: &str) -> Option<String> {
    let mut text = raw.trim().to_string();
    if text.is_empty() {
        return None;
    }

    if text.contains("```") {
        text = text.replace("```", "");
    }

    let start = text.find('{')?;
    let text = first_object_or_prefix(&text[start..]);
    let text = remove_trailing_commas(&text);
    let text = close_open_brackets(&text);
    Some(text.trim().to_string())
}

/// Scans forward from an opening brace tracking string/escape state and a
/// stack of expected closers. Returns the first balanced top-level object,
/// or the input unchanged when it never balances (the longest valid prefix
/// is then the whole text, handled by [`close_open_brackets`]). A closer
/// that does not match the stack top aborts the scan.
fn first_object_or_prefix(text: &str) -> String {
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escape = false;

    for (idx, ch) in text.char_indices() {
        if in_string {
            if escape {
                escape = false;
            } else if ch == '\\' {
                escape = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => {
                in_string = true;
                continue;
            }
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                if stack.last() == Some(&ch) {
                    stack.pop();
                } else {
                    return text.to_string();
                }
            }
            _ => {}
        }

        if idx > 0 && stack.is_empty() {
            return text[..idx + ch.len_utf8()].to_string();
        }
    }

    text.to_string()
}

/// Appends the missing closers in stack order. Mismatched closers leave the
/// text untouched; an unterminated string stays broken and fails the final
/// parse.
fn close_open_brackets(text: &str) -> String {
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escape = false;

    for ch in text.chars() {
        if in_string {
            if escape {
                escape = false;
            } else if ch == '\\' {
                escape = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                if stack.last() == Some(&ch) {
                    stack.pop();
                } else {
                    return text.to_string();
                }
            }
            _ => {}
        }
    }

    if stack.is_empty() {
        return text.to_string();
    }
    let closers: String = stack.into_iter().rev().collect();
    format!("{}{}", text, closers)
}

/// Removes commas that directly precede a closing bracket, applied to a
/// fixed point so nested occurrences all disappear.
fn remove_trailing_commas(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = TRAILING_COMMA.replace_all(&current, "$1").into_owned();
        if next == current {
            return current;
        }
        current = next;
    }
}
