//! Flattening of Atlassian document format descriptions into plain text

use regex_utils::acceptance_criteria::{HEADING, NEXT_HEADING};
use serde_json::Value;

const BLOCK_NODES: &[&str] = &[
    "paragraph",
    "heading",
    "blockquote",
    "codeBlock",
    "listItem",
    "rule",
    "panel",
    "tableRow",
];

/// Plain text of a description that is either a string or a rich-text document
pub fn flatten(value: &Value) -> String {
    match value {
        Value::String(text) => text.trim().to_string(),
        Value::Object(_) | Value::Array(_) => {
            let mut out = String::new();
            collect(value, &mut out);
            tidy(&out)
        }
        _ => String::new(),
    }
}

fn collect(node: &Value, out: &mut String) {
    match node {
        Value::Array(items) => {
            for item in items {
                collect(item, out);
            }
        }
        Value::Object(fields) => {
            let kind = fields.get("type").and_then(Value::as_str).unwrap_or_default();
            if kind == "hardBreak" {
                out.push('\n');
                return;
            }
            if kind == "listItem" {
                end_line(out);
                out.push_str("- ");
            }
            if let Some(Value::String(text)) = fields.get("text") {
                out.push_str(text);
            }
            if let Some(content) = fields.get("content") {
                collect(content, out);
            }
            if BLOCK_NODES.contains(&kind) {
                end_line(out);
            }
        }
        _ => {}
    }
}

fn end_line(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

fn tidy(text: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    for line in text.lines().map(str::trim_end) {
        if line.trim().is_empty() && lines.last().is_none_or(|last| last.trim().is_empty()) {
            continue;
        }
        lines.push(line);
    }
    lines.join("\n").trim().to_string()
}

/// Block following an "Acceptance Criteria" heading, up to the next heading
pub fn extract_acceptance_criteria(description: &str) -> Option<String> {
    let caps = HEADING.captures(description)?;
    let heading = caps.get(0)?;
    let mut criteria: Vec<&str> = Vec::new();

    if let Some(inline) = caps.get(1).map(|m| m.as_str().trim()).filter(|s| !s.is_empty()) {
        criteria.push(inline);
    }

    for line in description[heading.end()..].lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if NEXT_HEADING.is_match(line) {
            break;
        }
        criteria.push(line);
    }

    (!criteria.is_empty()).then(|| criteria.join("\n"))
}
