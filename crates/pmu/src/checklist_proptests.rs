//! Property-based tests for checklist extraction
//!
//! Whatever surrounds them, exactly the unchecked items come back, in order
//! and trimmed.

use super::*;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Line {
    Unchecked(String),
    Checked(String),
    Prose(String),
    Note(String),
}

fn title_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9][A-Za-z0-9 ]{0,20}[A-Za-z0-9]"
}

fn line_strategy() -> impl Strategy<Value = Line> {
    prop_oneof![
        3 => title_strategy().prop_map(Line::Unchecked),
        1 => title_strategy().prop_map(Line::Checked),
        1 => "[A-Za-z ]{0,30}".prop_map(Line::Prose),
        1 => title_strategy().prop_map(Line::Note),
    ]
}

fn render(line: &Line, indent: &str, gap: &str) -> String {
    match line {
        Line::Unchecked(title) => format!("{}- [ ]{}{}", indent, gap, title),
        Line::Checked(title) => format!("{}- [x]{}{}", indent, gap, title),
        Line::Prose(text) => text.clone(),
        Line::Note(text) => format!("{}  - {}", indent, text),
    }
}

proptest! {
    #[test]
    fn prop_only_unchecked_items_in_order(
        lines in prop::collection::vec(line_strategy(), 0..20),
        indent in prop_oneof![Just(""), Just("  "), Just("\t")],
        gap in prop_oneof![Just(" "), Just("\t"), Just("   ")],
    ) {
        let body: Vec<String> = lines.iter().map(|l| render(l, indent, gap)).collect();
        let expected: Vec<String> = lines
            .iter()
            .filter_map(|l| match l {
                Line::Unchecked(title) => Some(title.trim().to_string()),
                _ => None,
            })
            .collect();

        prop_assert_eq!(parse(&body.join("\n")), expected);
    }

    #[test]
    fn prop_rescan_yields_same_items(
        lines in prop::collection::vec(line_strategy(), 0..10),
    ) {
        let body: Vec<String> = lines.iter().map(|l| render(l, "", " ")).collect();
        let body = body.join("\n");
        let first: Vec<&str> = checklist_items(&body).collect();
        let second: Vec<&str> = checklist_items(&body).collect();
        prop_assert_eq!(first, second);
    }
}
