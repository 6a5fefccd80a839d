//! Checklist extraction from issue bodies.
//!
//! Only unchecked task-list markers are recognised (`- [ ] title`, with
//! optional indentation and a space or tab after the brackets). Everything
//! else in the body, including headings, prose, checked items and nested
//! notes, is ignored; there is no Markdown parse.

use regex::Regex;
use std::str::Lines;
use std::sync::OnceLock;

/// `- [ ]` or `* [ ]` at line start (after optional indentation), then at
/// least one space or tab, then the title.
static UNCHECKED_ITEM_REGEX: OnceLock<Regex> = OnceLock::new();

fn unchecked_item_regex() -> &'static Regex {
    UNCHECKED_ITEM_REGEX.get_or_init(|| {
        Regex::new(r"^[ \t]*[-*+][ \t]+\[ \][ \t]+(.*)$")
            .expect("Checklist regex should compile")
    })
}

/// Lazy scan over the unchecked checklist items of a body.
///
/// Yields trimmed titles in document order. Call [`checklist_items`] again
/// to rescan from the top.
#[derive(Debug, Clone)]
pub struct ChecklistItems<'a> {
    lines: Lines<'a>,
}

impl<'a> Iterator for ChecklistItems<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        for line in self.lines.by_ref() {
            if let Some(captures) = unchecked_item_regex().captures(line) {
                let title = captures.get(1).map_or("", |m| m.as_str()).trim();
                if !title.is_empty() {
                    return Some(title);
                }
            }
        }
        None
    }
}

/// Scan `body` for unchecked checklist items.
pub fn checklist_items(body: &str) -> ChecklistItems<'_> {
    ChecklistItems {
        lines: body.lines(),
    }
}

/// Extract the titles of all unchecked checklist items, in order.
///
/// Returns an empty list when the body has no checklist.
///
/// # Examples
///
/// ```
/// use pmu::checklist::parse;
///
/// let tasks = parse("- [ ] Task one\n- [x] Done task\n- [ ] Task two\n");
/// assert_eq!(tasks, vec!["Task one", "Task two"]);
/// assert!(parse("no checklist here").is_empty());
/// ```
pub fn parse(body: &str) -> Vec<String> {
    checklist_items(body).map(str::to_string).collect()
}

#[cfg(test)]
#[path = "checklist_proptests.rs"]
mod proptests;
