//! Apply-string grammar: `key:value[,key:value...]`.
//!
//! `label:<name>` adds a label; any other key names a project field and is
//! resolved through [`crate::resolver`]. There is no escaping: values cannot
//! contain commas, and everything after the first colon belongs to the value.

use crate::domain::{Issue, ProjectMetadata};
use crate::errors::PmuError;
use crate::resolver::{resolve, ResolvedField};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// Key that marks a label entry instead of a field entry
pub const LABEL_KEY: &str = "label";

/// Kind of change a patch entry makes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchKind {
    Field,
    Label,
}

/// One `key:value` entry of a patch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchEntry {
    pub kind: PatchKind,
    pub key: String,
    pub value: String,
}

/// Ordered list of field/label changes parsed from an apply string
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TriagePatch {
    pub entries: Vec<PatchEntry>,
}

impl TriagePatch {
    /// Parse an apply string.
    ///
    /// Tokens are trimmed and empty tokens skipped. A token without a colon is
    /// rejected with [`PmuError::MalformedApplyToken`] naming the token.
    ///
    /// # Examples
    ///
    /// ```
    /// use pmu::patch::{PatchKind, TriagePatch};
    ///
    /// let patch = TriagePatch::parse("status:backlog, label:pm-tracked,").unwrap();
    /// assert_eq!(patch.entries.len(), 2);
    /// assert_eq!(patch.entries[1].kind, PatchKind::Label);
    ///
    /// assert!(TriagePatch::parse("priority").is_err());
    /// ```
    pub fn parse(apply: &str) -> Result<Self, PmuError> {
        let mut entries = Vec::new();
        for token in apply.split(',').map(str::trim) {
            if token.is_empty() {
                continue;
            }
            let (key, value) = token
                .split_once(':')
                .ok_or_else(|| PmuError::MalformedApplyToken(token.to_string()))?;
            let key = key.trim();
            let value = value.trim();
            if key.is_empty() || value.is_empty() {
                return Err(PmuError::MalformedApplyToken(token.to_string()));
            }

            let kind = if key.eq_ignore_ascii_case(LABEL_KEY) {
                PatchKind::Label
            } else {
                PatchKind::Field
            };
            entries.push(PatchEntry {
                kind,
                key: key.to_string(),
                value: value.to_string(),
            });
        }
        Ok(TriagePatch { entries })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a label entry
    pub fn push_label(&mut self, label: impl Into<String>) {
        self.entries.push(PatchEntry {
            kind: PatchKind::Label,
            key: LABEL_KEY.to_string(),
            value: label.into(),
        });
    }

    /// Append a field entry
    pub fn push_field(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.push(PatchEntry {
            kind: PatchKind::Field,
            key: key.into(),
            value: value.into(),
        });
    }

    /// Resolve every field entry against the project's metadata.
    ///
    /// `translate` maps configured aliases to board names before resolution.
    /// Fails on the first unresolvable entry, so a patch that cannot be
    /// satisfied is rejected before any issue is touched. Two entries landing
    /// on the same board field (directly or through an alias) are rejected
    /// with [`PmuError::DuplicateField`].
    pub fn resolve<F>(&self, metadata: &ProjectMetadata, translate: F) -> Result<ResolvedPatch, PmuError>
    where
        F: Fn(&str, &str) -> (String, String),
    {
        let mut changes = Vec::with_capacity(self.entries.len());
        let mut seen = HashSet::new();
        for entry in &self.entries {
            let change = match entry.kind {
                PatchKind::Label => Change::AddLabel(entry.value.clone()),
                PatchKind::Field => {
                    let (field, value) = translate(&entry.key, &entry.value);
                    let resolved = resolve(metadata, &field, &value)?;
                    if !seen.insert(resolved.field_id.clone()) {
                        return Err(PmuError::DuplicateField {
                            field: resolved.field_name,
                        });
                    }
                    Change::SetField(resolved)
                }
            };
            changes.push(change);
        }
        Ok(ResolvedPatch { changes })
    }
}

impl fmt::Display for TriagePatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tokens: Vec<String> = self
            .entries
            .iter()
            .map(|e| format!("{}:{}", e.key, e.value))
            .collect();
        f.write_str(&tokens.join(","))
    }
}

/// A single mutation a resolved patch can make
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Change {
    SetField(ResolvedField),
    AddLabel(String),
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Change::SetField(field) => write!(f, "{} → {}", field.field_name, field.display_value),
            Change::AddLabel(label) => write!(f, "add label: {}", label),
        }
    }
}

/// A patch whose field entries carry platform identifiers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedPatch {
    pub changes: Vec<Change>,
}

impl ResolvedPatch {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Changes that `issue` does not already reflect.
    ///
    /// Field values are compared by name against the issue's current values,
    /// so no reverse lookup from option IDs is needed. Applying the result and
    /// diffing again yields an empty list.
    pub fn diff(&self, issue: &Issue) -> Vec<Change> {
        self.changes
            .iter()
            .filter(|change| match change {
                Change::SetField(field) => !issue
                    .field_value(&field.field_name)
                    .is_some_and(|current| field.matches_current(current)),
                Change::AddLabel(label) => !issue.has_label(label),
            })
            .cloned()
            .collect()
    }
}
