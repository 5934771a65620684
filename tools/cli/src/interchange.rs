//! Plaintext interchange formats for import and export.

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use clap::ValueEnum;

/// Interchange format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// `KEY=value` lines.
    Dotenv,
    /// A JSON object of strings.
    Json,
}

/// Parse `input` into a key to value map.
pub fn parse(format: Format, input: &str) -> Result<BTreeMap<String, String>> {
    match format {
        Format::Dotenv => Ok(parse_dotenv(input)),
        Format::Json => parse_json(input),
    }
}

/// Render `entries` in `format`. Output is ordered by key.
pub fn render(format: Format, entries: &BTreeMap<String, String>) -> Result<String> {
    match format {
        Format::Dotenv => render_dotenv(entries),
        Format::Json => {
            let mut out =
                serde_json::to_string_pretty(entries).context("Failed to encode entries as JSON")?;
            out.push('\n');
            Ok(out)
        }
    }
}

/// Parse dotenv text.
///
/// Blank lines, `#` and `//` comments, lines without `=` and lines with an
/// empty key are skipped. One pair of matching surrounding quotes is
/// stripped from the value. Later duplicates win.
pub fn parse_dotenv(input: &str) -> BTreeMap<String, String> {
    let mut entries = BTreeMap::new();
    for line in input.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        entries.insert(key.to_string(), unquote(value.trim()).to_string());
    }
    entries
}

fn unquote(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'"' || first == b'\'') {
            return &value[1..value.len() - 1];
        }
    }
    value
}

fn parse_json(input: &str) -> Result<BTreeMap<String, String>> {
    serde_json::from_str(input).context("Input is not a JSON object of strings")
}

fn render_dotenv(entries: &BTreeMap<String, String>) -> Result<String> {
    let mut out = String::new();
    for (key, value) in entries {
        if value.contains(['\n', '\r']) {
            bail!("Value of {:?} spans multiple lines; export it with --format json", key);
        }
        let needs_quotes = value
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '#' | '"' | '\''));
        if needs_quotes {
            out.push_str(&format!("{}=\"{}\"\n", key, value));
        } else {
            out.push_str(&format!("{}={}\n", key, value));
        }
    }
    Ok(out)
}
