//! Regex utilities for testgen
//! Extracted to a separate crate for compilation optimization

use once_cell::sync::Lazy;
use regex::Regex;

/// Markdown code fences wrapping model output
pub mod code_fence {
    use super::*;

    pub static JSON_BLOCK: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?is)```[ \t]*json[ \t]*\r?\n(.*?)```").expect("Invalid regex pattern")
    });

    pub static ANY_BLOCK: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?s)```[a-zA-Z0-9_-]*[ \t]*\r?\n(.*?)```").expect("Invalid regex pattern")
    });

    /// Body of the first fenced block, preferring one tagged `json`
    pub fn extract(text: &str) -> Option<&str> {
        if let Some(caps) = JSON_BLOCK.captures(text) {
            return caps.get(1).map(|m| m.as_str());
        }

        ANY_BLOCK.captures(text).and_then(|caps| caps.get(1)).map(|m| m.as_str())
    }
}

/// Numbered and bulleted list markers
pub mod list_item {
    use super::*;

    pub static NUMBERED: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^\s*(\d+)\s*[.)]\s+(.+)$").expect("Invalid regex pattern")
    });

    pub static BULLET: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^\s*[-*•+]\s+(.+)$").expect("Invalid regex pattern")
    });

    pub static ENUMERATION_PREFIX: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?i)^\s*(?:step\s*\d+\s*[:.)-]?\s*|\d+\s*[.)]\s+|[-*•+]\s+)")
            .expect("Invalid regex pattern")
    });

    /// Item text if the line is a numbered or bulleted list entry
    pub fn content(line: &str) -> Option<&str> {
        NUMBERED
            .captures(line)
            .and_then(|caps| caps.get(2))
            .or_else(|| BULLET.captures(line).and_then(|caps| caps.get(1)))
            .map(|m| m.as_str().trim())
    }

    pub fn is_numbered(line: &str) -> bool {
        NUMBERED.is_match(line)
    }

    /// Remove a leading `1.`, `2)`, `Step 3:` or bullet marker
    pub fn strip_marker(line: &str) -> &str {
        match ENUMERATION_PREFIX.find(line) {
            Some(m) => line[m.end()..].trim(),
            None => line.trim(),
        }
    }
}

/// Section boundaries and field labels in plain-text test case listings
pub mod section {
    use super::*;

    pub static MARKDOWN_HEADING: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^\s*#{1,6}\s+(.+?)\s*#*\s*$").expect("Invalid regex pattern")
    });

    pub static TEST_CASE_HEADING: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"(?i)^\s*(?:\*\*)?\s*(?:test[\s_-]*case|tc)[\s_-]*#?\s*\d*\s*(?:\*\*)?\s*[:.\-]\s*(?:\*\*)?\s*(.+?)\s*(?:\*\*)?\s*$",
        )
        .expect("Invalid regex pattern")
    });

    pub static LABEL: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"(?i)^\s*(?:[-*]\s+)?(?:\*\*)?\s*(title|name|description|summary|pre-?conditions?|test steps|steps?|expected(?:\s+results?|\s+outcome)?|priority|category|test type|type|tags?)\s*(?:\*\*)?\s*:\s*(?:\*\*)?\s*(.*?)\s*$",
        )
        .expect("Invalid regex pattern")
    });

    /// Title text if the line opens a new section
    pub fn heading(line: &str) -> Option<&str> {
        let markdown = MARKDOWN_HEADING.captures(line).and_then(|caps| caps.get(1)).map(|m| m.as_str());
        let inner = markdown.unwrap_or(line);

        TEST_CASE_HEADING
            .captures(inner)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .or(markdown)
            .map(|title| title.trim_matches('*').trim())
            .filter(|title| !title.is_empty())
    }

    /// Lower-cased label and inline value for `Label: value` lines
    pub fn label(line: &str) -> Option<(String, &str)> {
        let caps = LABEL.captures(line)?;
        let name = caps.get(1)?.as_str().to_lowercase();
        let value = caps.get(2).map(|m| m.as_str().trim_matches('*').trim()).unwrap_or("");
        Some((name, value))
    }
}

/// Action verbs an executable test step is expected to start with
pub mod action_verb {
    use super::*;

    pub const LEXICON: &[&str] = &[
        "go to", "go back", "log in", "log out", "sign in", "sign out", "navigate", "visit",
        "open", "close", "launch", "click", "double-click", "right-click", "tap", "press",
        "select", "choose", "enter", "type", "input", "fill", "set", "clear", "toggle",
        "enable", "disable", "check", "uncheck", "verify", "validate", "confirm", "assert",
        "ensure", "observe", "inspect", "compare", "wait", "pause", "submit", "send", "post",
        "get", "put", "patch", "delete", "call", "request", "create", "add", "remove",
        "update", "edit", "modify", "change", "rename", "upload", "download", "import",
        "export", "save", "cancel", "refresh", "reload", "scroll", "hover", "drag", "drop",
        "search", "filter", "sort", "login", "logout", "register", "attempt", "try", "repeat",
        "trigger", "execute", "run", "start", "stop", "restart", "configure", "prepare",
        "provide", "use", "access", "apply", "reset", "approve", "reject", "assign", "grant",
        "revoke", "invite", "share", "simulate", "disconnect", "reconnect", "measure",
        "record", "note", "expire", "generate", "leave", "return", "mark", "complete",
    ];

    pub static LEADING_VERB: Lazy<Regex> = Lazy::new(|| {
        let mut verbs: Vec<&str> = LEXICON.to_vec();
        verbs.sort_by_key(|verb| std::cmp::Reverse(verb.len()));
        let alternation =
            verbs.iter().map(|verb| regex::escape(verb)).collect::<Vec<_>>().join("|");
        Regex::new(&format!(r"(?i)^\s*(?:{})\b", alternation)).expect("Invalid regex pattern")
    });

    pub fn starts_with_action_verb(step: &str) -> bool {
        LEADING_VERB.is_match(step)
    }
}

/// Acceptance criteria headings inside ticket descriptions
pub mod acceptance_criteria {
    use super::*;

    pub static HEADING: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"(?im)^[ \t]*(?:#+[ \t]*)?(?:\*\*)?acceptance[ \t]+criteria(?:\*\*)?[ \t]*:?(?:\*\*)?[ \t]*(.*)$",
        )
        .expect("Invalid regex pattern")
    });

    pub static NEXT_HEADING: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^\s*(?:#+\s+\S.*|(?:\*\*)?[A-Z][A-Za-z /-]{2,40}(?:\*\*)?:(?:\*\*)?\s*)$")
            .expect("Invalid regex pattern")
    });
}

/// Issue tracker keys such as `PROJ-123`
pub mod ticket_key {
    use super::*;

    pub static PATTERN: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^([A-Za-z][A-Za-z0-9_]*)-(\d+)$").expect("Invalid regex pattern")
    });

    /// Project prefix of a well-formed key
    pub fn project(key: &str) -> Option<&str> {
        PATTERN.captures(key.trim()).and_then(|caps| caps.get(1)).map(|m| m.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_fence_extraction() {
        let text = "Here you go:\n```json\n[{\"title\": \"a\"}]\n```\nThanks";
        assert_eq!(code_fence::extract(text), Some("[{\"title\": \"a\"}]\n"));

        let bare = "```\n{\"tests\": []}\n```";
        assert_eq!(code_fence::extract(bare), Some("{\"tests\": []}\n"));

        assert_eq!(code_fence::extract("no fences here"), None);
    }

    #[test]
    fn test_list_markers() {
        assert_eq!(list_item::content("1. Navigate to the page"), Some("Navigate to the page"));
        assert_eq!(list_item::content("  - Click Save"), Some("Click Save"));
        assert_eq!(list_item::content("Plain sentence"), None);
        assert!(list_item::is_numbered("12) Submit the form"));

        assert_eq!(list_item::strip_marker("Step 3: Click Login"), "Click Login");
        assert_eq!(list_item::strip_marker("2) Enter the code"), "Enter the code");
        assert_eq!(list_item::strip_marker("Verify banner"), "Verify banner");
    }

    #[test]
    fn test_section_headings_and_labels() {
        assert_eq!(section::heading("## Login with valid credentials"), Some("Login with valid credentials"));
        assert_eq!(section::heading("**Test Case 2: Expired session**"), Some("Expired session"));
        assert_eq!(section::heading("### Test Case 3: Locked account"), Some("Locked account"));
        assert_eq!(section::heading("Just text"), None);

        let (name, value) = section::label("**Expected Result:** Dashboard is shown").unwrap();
        assert_eq!(name, "expected result");
        assert_eq!(value, "Dashboard is shown");

        let (name, value) = section::label("Steps:").unwrap();
        assert_eq!(name, "steps");
        assert_eq!(value, "");
    }

    #[test]
    fn test_action_verbs() {
        assert!(action_verb::starts_with_action_verb("Navigate to the login page"));
        assert!(action_verb::starts_with_action_verb("go to settings"));
        assert!(action_verb::starts_with_action_verb("Log in as an admin user"));
        assert!(!action_verb::starts_with_action_verb("The page loads"));
        assert!(!action_verb::starts_with_action_verb("Opening the app"));
    }

    #[test]
    fn test_ticket_key_project() {
        assert_eq!(ticket_key::project("PROJ-123"), Some("PROJ"));
        assert_eq!(ticket_key::project("not a key"), None);
    }
}
