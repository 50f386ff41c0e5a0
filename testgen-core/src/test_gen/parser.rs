//! Turns raw provider output into draft test cases
//!
//! JSON is tried first: a fenced block, then the first complete JSON value in
//! the text. When no JSON yields a draft, a line-oriented reader picks test
//! cases out of markdown or plain numbered lists.

use super::GeneratedTestCase;
use regex_utils::{code_fence, list_item, section};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

const DEFAULT_MAX_SCAN_ATTEMPTS: usize = 256;

const CONTAINER_KEYS: &[&str] = &["testCases", "test_cases", "testcases", "tests", "cases"];
const TITLE_KEYS: &[&str] = &["title", "name", "summary"];
const DESCRIPTION_KEYS: &[&str] = &["description", "objective"];
const PRECONDITION_KEYS: &[&str] = &["preconditions", "precondition", "prerequisites"];
const STEP_KEYS: &[&str] = &["steps", "testSteps", "test_steps"];
const STEP_OBJECT_KEYS: &[&str] = &["action", "step", "description", "instruction"];
const EXPECTED_KEYS: &[&str] = &[
    "expectedResult",
    "expected_result",
    "expected",
    "expectedOutcome",
    "expected_outcome",
    "expectedResults",
];
const CATEGORY_KEYS: &[&str] = &["category", "testType", "test_type", "type"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Provider returned an empty response")]
    EmptyResponse,

    #[error("No test cases found in response: {reason}")]
    NoCandidates { reason: String },
}

/// Result of reading a response, tagged with the path that produced it
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Structured(Vec<GeneratedTestCase>),
    Heuristic(Vec<GeneratedTestCase>),
    Unparseable { reason: String },
}

impl ParseOutcome {
    pub fn kind(&self) -> &'static str {
        match self {
            ParseOutcome::Structured(_) => "structured",
            ParseOutcome::Heuristic(_) => "heuristic",
            ParseOutcome::Unparseable { .. } => "unparseable",
        }
    }

    pub fn into_result(self) -> Result<Vec<GeneratedTestCase>, ParseError> {
        match self {
            ParseOutcome::Structured(cases) | ParseOutcome::Heuristic(cases) => Ok(cases),
            ParseOutcome::Unparseable { reason } => Err(ParseError::NoCandidates { reason }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResponseParser {
    max_scan_attempts: usize,
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self { max_scan_attempts: DEFAULT_MAX_SCAN_ATTEMPTS }
    }
}

impl ResponseParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(&self, raw: &str) -> Result<Vec<GeneratedTestCase>, ParseError> {
        if raw.trim().is_empty() {
            return Err(ParseError::EmptyResponse);
        }
        self.parse_outcome(raw).into_result()
    }

    pub fn parse_outcome(&self, raw: &str) -> ParseOutcome {
        if raw.trim().is_empty() {
            return ParseOutcome::Unparseable { reason: "empty response".to_string() };
        }

        if let Some(cases) = self.structured(raw) {
            debug!("Parsed {} drafts from JSON", cases.len());
            return ParseOutcome::Structured(cases);
        }

        let cases = HeuristicReader::default().read(raw);
        if !cases.is_empty() {
            debug!("Parsed {} drafts from plain text", cases.len());
            return ParseOutcome::Heuristic(cases);
        }

        warn!("Response contained no recognizable test cases ({} bytes)", raw.len());
        ParseOutcome::Unparseable {
            reason: "no JSON test cases and no recognizable test case sections".to_string(),
        }
    }

    fn structured(&self, raw: &str) -> Option<Vec<GeneratedTestCase>> {
        if let Some(block) = code_fence::extract(raw)
            && let Some(cases) = self.scan_json(block)
        {
            return Some(cases);
        }
        self.scan_json(raw)
    }

    /// Walks `[`/`{` positions until a container of test cases parses.
    /// Standalone case objects found on the way are kept as a fallback, which
    /// also salvages the complete entries of a truncated array.
    fn scan_json(&self, text: &str) -> Option<Vec<GeneratedTestCase>> {
        let mut loose = Vec::new();
        let mut offset = 0;
        let mut attempts = 0;

        while offset < text.len() && attempts < self.max_scan_attempts {
            let Some(relative) = text[offset..].find(['[', '{']) else {
                break;
            };
            let start = offset + relative;
            attempts += 1;

            let mut stream = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
            match stream.next() {
                Some(Ok(value)) => {
                    offset = start + stream.byte_offset();
                    if let Some(items) = container_items(&value) {
                        let cases: Vec<_> = items.iter().filter_map(case_from_value).collect();
                        if !cases.is_empty() {
                            return Some(cases);
                        }
                    } else if let Some(case) = case_from_value(&value) {
                        loose.push(case);
                    }
                }
                // '[' and '{' are single bytes, so this stays on a char boundary
                _ => offset = start + 1,
            }
        }

        (!loose.is_empty()).then_some(loose)
    }
}

fn container_items(value: &Value) -> Option<&Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(map) => CONTAINER_KEYS.iter().find_map(|key| map.get(*key)?.as_array()),
        _ => None,
    }
}

fn first<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| map.get(*key)).filter(|value| !value.is_null())
}

fn text_of(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items.iter().filter_map(text_of).collect::<Vec<_>>().join(" "),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn string_list(value: &Value, separators: &[char]) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(text_of).collect(),
        Value::String(s) => s
            .split(separators)
            .map(|part| list_item::strip_marker(part).to_string())
            .filter(|part| !part.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

fn steps_of(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::Object(step) => first(step, STEP_OBJECT_KEYS).and_then(text_of),
                other => text_of(other),
            })
            .map(|step| list_item::strip_marker(&step).to_string())
            .collect(),
        Value::String(s) => s
            .lines()
            .map(list_item::strip_marker)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn priority_of(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => n.as_u64().map(|level| format!("p{}", level)),
        other => text_of(other),
    }
}

fn case_from_value(value: &Value) -> Option<GeneratedTestCase> {
    let map = value.as_object()?;
    let title = first(map, TITLE_KEYS);
    let steps = first(map, STEP_KEYS);
    if title.is_none() && steps.is_none() {
        return None;
    }

    Some(GeneratedTestCase {
        title: title.and_then(text_of).unwrap_or_default(),
        description: first(map, DESCRIPTION_KEYS).and_then(text_of).unwrap_or_default(),
        preconditions: first(map, PRECONDITION_KEYS)
            .map(|v| string_list(v, &['\n', ',']))
            .unwrap_or_default(),
        steps: steps.map(steps_of).unwrap_or_default(),
        expected_result: first(map, EXPECTED_KEYS).and_then(text_of).unwrap_or_default(),
        priority: first(map, &["priority"]).and_then(priority_of),
        category: first(map, CATEGORY_KEYS).and_then(text_of),
        tags: first(map, &["tags", "labels"]).map(|v| string_list(v, &[','])).unwrap_or_default(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    None,
    Description,
    Preconditions,
    Steps,
    Expected,
}

impl Field {
    fn is_list(self) -> bool {
        matches!(self, Field::Preconditions | Field::Steps)
    }
}

/// Line-by-line reader for markdown and plain-text listings
#[derive(Debug)]
struct HeuristicReader {
    cases: Vec<GeneratedTestCase>,
    current: Option<GeneratedTestCase>,
    field: Field,
    list_indent: Option<usize>,
}

impl Default for HeuristicReader {
    fn default() -> Self {
        Self { cases: Vec::new(), current: None, field: Field::None, list_indent: None }
    }
}

impl HeuristicReader {
    fn read(mut self, raw: &str) -> Vec<GeneratedTestCase> {
        for line in raw.lines() {
            if line.trim().is_empty() || line.trim_start().starts_with("```") {
                continue;
            }
            self.line(line);
        }
        self.flush();
        self.cases
    }

    fn line(&mut self, line: &str) {
        let indent = line.len() - line.trim_start().len();

        if let Some(heading) = section::heading(line) {
            match section::label(&format!("{}:", heading)) {
                Some((name, value)) => self.label(&name, value),
                None => self.start(heading),
            }
            return;
        }

        if let Some((name, value)) = section::label(line) {
            self.label(&name, value);
            return;
        }

        if let Some(item) = list_item::content(line) {
            let outdented = self.list_indent.is_some_and(|list| indent < list);
            if list_item::is_numbered(line) && (!self.field.is_list() || outdented) {
                self.start(item.trim_matches('*').trim());
                return;
            }
            self.item(item, indent);
            return;
        }

        self.text(line.trim());
    }

    fn start(&mut self, title: &str) {
        self.flush();
        self.current = Some(GeneratedTestCase { title: title.to_string(), ..Default::default() });
    }

    fn flush(&mut self) {
        self.field = Field::None;
        self.list_indent = None;
        if let Some(case) = self.current.take()
            && !case.title.trim().is_empty()
            && !case.steps.is_empty()
        {
            self.cases.push(case);
        }
    }

    fn case(&mut self) -> &mut GeneratedTestCase {
        self.current.get_or_insert_with(GeneratedTestCase::default)
    }

    fn label(&mut self, name: &str, value: &str) {
        self.list_indent = None;
        match name {
            "title" | "name" | "summary" => {
                if self.current.as_ref().is_some_and(|case| !case.title.is_empty()) {
                    self.start(value);
                } else {
                    self.case().title = value.to_string();
                }
                self.field = Field::None;
            }
            "description" => {
                self.field = Field::Description;
                self.append_text(value);
            }
            "steps" | "step" | "test steps" => {
                self.field = Field::Steps;
                if !value.is_empty() {
                    self.case().steps.push(list_item::strip_marker(value).to_string());
                }
            }
            "priority" => {
                self.field = Field::None;
                self.case().priority = Some(value.to_string()).filter(|v| !v.is_empty());
            }
            "category" | "type" | "test type" => {
                self.field = Field::None;
                self.case().category = Some(value.to_string()).filter(|v| !v.is_empty());
            }
            "tag" | "tags" => {
                self.field = Field::None;
                let tags = value.split(',').map(str::trim).filter(|t| !t.is_empty()).map(str::to_string);
                self.case().tags.extend(tags);
            }
            name if name.starts_with("pre") => {
                self.field = Field::Preconditions;
                if !value.is_empty() {
                    self.case().preconditions.push(value.to_string());
                }
            }
            name if name.starts_with("expected") => {
                self.field = Field::Expected;
                self.append_text(value);
            }
            _ => self.field = Field::None,
        }
    }

    fn item(&mut self, item: &str, indent: usize) {
        match self.field {
            Field::Steps | Field::Preconditions => {
                let list_indent = *self.list_indent.get_or_insert(indent);
                let field = self.field;
                let case = self.case();
                let target = if field == Field::Steps { &mut case.steps } else { &mut case.preconditions };
                match target.last_mut() {
                    // Nested bullets belong to the item above them
                    Some(last) if indent > list_indent => {
                        last.push(' ');
                        last.push_str(item);
                    }
                    _ => target.push(list_item::strip_marker(item).to_string()),
                }
            }
            Field::Description | Field::Expected => self.append_text(item),
            Field::None => {}
        }
    }

    fn text(&mut self, line: &str) {
        match self.field {
            Field::Steps => self.case().steps.push(list_item::strip_marker(line).to_string()),
            Field::Preconditions => self.case().preconditions.push(line.to_string()),
            Field::Description | Field::Expected => self.append_text(line),
            Field::None => {}
        }
    }

    fn append_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let field = self.field;
        let case = self.case();
        let target = match field {
            Field::Expected => &mut case.expected_result,
            _ => &mut case.description,
        };
        if !target.is_empty() {
            target.push(' ');
        }
        target.push_str(text);
    }
}
