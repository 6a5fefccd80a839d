//! Field resolution: human-readable field/option names to platform identifiers.
//!
//! Resolution is a pure lookup over [`ProjectMetadata`]. Field names and
//! single-select option names are matched case-insensitively. Iterations
//! resolve the same way when the metadata lists them. Values of every other
//! data type pass through untouched (numbers are validated by the mutation
//! layer, not here).

use crate::domain::{FieldDataType, FieldMetadata, ProjectMetadata};
use crate::errors::PmuError;
use serde::Serialize;

/// A field value translated to the identifiers a mutation needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedField {
    pub field_id: String,
    /// Field name as stored on the board
    pub field_name: String,
    pub data_type: FieldDataType,
    /// Option or iteration ID for listed choices, the raw value otherwise
    pub value: String,
    /// Option or iteration name as stored, the raw value otherwise
    pub display_value: String,
}

impl ResolvedField {
    /// Whether `current` (a value by name, as carried by an issue) already
    /// equals this resolved value.
    ///
    /// Choices compare by name ignoring case and numbers compare by value,
    /// so `3.0` matches a stored `3`.
    pub fn matches_current(&self, current: &str) -> bool {
        match self.data_type {
            FieldDataType::SingleSelect | FieldDataType::Iteration => {
                current.eq_ignore_ascii_case(&self.display_value)
            }
            FieldDataType::Number => {
                match (current.trim().parse::<f64>(), self.display_value.trim().parse::<f64>()) {
                    (Ok(stored), Ok(wanted)) => stored == wanted,
                    _ => current == self.display_value,
                }
            }
            FieldDataType::Text | FieldDataType::Date => current == self.display_value,
        }
    }
}

/// Find a field by name, ignoring case.
pub fn find_field<'a>(metadata: &'a ProjectMetadata, field_name: &str) -> Option<&'a FieldMetadata> {
    metadata
        .fields
        .iter()
        .find(|f| f.name.eq_ignore_ascii_case(field_name))
}

/// Resolve `(field_name, raw_value)` against the project's metadata.
///
/// # Errors
///
/// - [`PmuError::UnknownField`] when no field has that name
/// - [`PmuError::UnknownOption`] when the field lists its choices and none
///   has that name
///
/// # Examples
///
/// ```
/// use pmu::domain::{FieldDataType, FieldMetadata, OptionMetadata, ProjectMetadata};
/// use pmu::resolver::resolve;
///
/// let metadata = ProjectMetadata {
///     project_id: "PVT_1".to_string(),
///     fields: vec![FieldMetadata {
///         id: "PVTF_status".to_string(),
///         name: "Status".to_string(),
///         data_type: FieldDataType::SingleSelect,
///         options: vec![OptionMetadata { id: "opt_done".to_string(), name: "Done".to_string() }],
///     }],
/// };
///
/// let resolved = resolve(&metadata, "STATUS", "done").unwrap();
/// assert_eq!(resolved.field_id, "PVTF_status");
/// assert_eq!(resolved.value, "opt_done");
/// ```
pub fn resolve(
    metadata: &ProjectMetadata,
    field_name: &str,
    raw_value: &str,
) -> Result<ResolvedField, PmuError> {
    let field = find_field(metadata, field_name).ok_or_else(|| PmuError::UnknownField {
        field: field_name.to_string(),
        available: metadata.field_names(),
    })?;

    let listed = match field.data_type {
        FieldDataType::SingleSelect => true,
        // Snapshots written before iterations were recorded carry none
        FieldDataType::Iteration => !field.options.is_empty(),
        _ => false,
    };
    if !listed {
        return Ok(ResolvedField {
            field_id: field.id.clone(),
            field_name: field.name.clone(),
            data_type: field.data_type,
            value: raw_value.to_string(),
            display_value: raw_value.to_string(),
        });
    }

    let option = field
        .options
        .iter()
        .find(|o| o.name.eq_ignore_ascii_case(raw_value))
        .or_else(|| {
            // Iterations may also be named by ID
            (field.data_type == FieldDataType::Iteration)
                .then(|| field.options.iter().find(|o| o.id == raw_value))
                .flatten()
        })
        .ok_or_else(|| PmuError::UnknownOption {
            field: field.name.clone(),
            value: raw_value.to_string(),
            available: field.options.iter().map(|o| o.name.clone()).collect(),
        })?;

    Ok(ResolvedField {
        field_id: field.id.clone(),
        field_name: field.name.clone(),
        data_type: field.data_type,
        value: option.id.clone(),
        display_value: option.name.clone(),
    })
}

#[cfg(test)]
#[path = "resolver_proptests.rs"]
mod proptests;

#[cfg(test)]
pub(crate) mod test_fixtures {
    use crate::domain::{FieldDataType, FieldMetadata, OptionMetadata, ProjectMetadata};

    fn select(id: &str, name: &str, options: &[(&str, &str)]) -> FieldMetadata {
        FieldMetadata {
            id: id.to_string(),
            name: name.to_string(),
            data_type: FieldDataType::SingleSelect,
            options: options
                .iter()
                .map(|(id, name)| OptionMetadata {
                    id: id.to_string(),
                    name: name.to_string(),
                })
                .collect(),
        }
    }

    /// Status/Priority selects plus an Estimate number and a Notes text field
    pub fn sample_metadata() -> ProjectMetadata {
        ProjectMetadata {
            project_id: "PVT_test".to_string(),
            fields: vec![
                select(
                    "PVTF_status",
                    "Status",
                    &[
                        ("opt_backlog", "Backlog"),
                        ("opt_progress", "In progress"),
                        ("opt_done", "Done"),
                    ],
                ),
                select(
                    "PVTF_priority",
                    "Priority",
                    &[("opt_p0", "P0"), ("opt_p1", "P1"), ("opt_p2", "P2")],
                ),
                FieldMetadata {
                    id: "PVTF_estimate".to_string(),
                    name: "Estimate".to_string(),
                    data_type: FieldDataType::Number,
                    options: vec![],
                },
                FieldMetadata {
                    id: "PVTF_notes".to_string(),
                    name: "Notes".to_string(),
                    data_type: FieldDataType::Text,
                    options: vec![],
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_fixtures::sample_metadata;
    use super::*;

    #[test]
    fn test_resolve_single_select_to_option_id() {
        let resolved = resolve(&sample_metadata(), "Status", "Done").unwrap();
        assert_eq!(resolved.field_id, "PVTF_status");
        assert_eq!(resolved.value, "opt_done");
        assert_eq!(resolved.display_value, "Done");
    }

    #[test]
    fn test_resolve_is_case_insensitive_on_field_and_option() {
        let metadata = sample_metadata();
        let upper = resolve(&metadata, "STATUS", "done").unwrap();
        let lower = resolve(&metadata, "status", "Done").unwrap();
        assert_eq!(upper, lower);
        assert_eq!(upper.field_name, "Status");
    }

    #[test]
    fn test_unknown_field_names_the_field() {
        let err = resolve(&sample_metadata(), "Sprint", "1").unwrap_err();
        match err {
            PmuError::UnknownField { field, available } => {
                assert_eq!(field, "Sprint");
                assert!(available.contains(&"Status".to_string()));
            }
            other => panic!("expected UnknownField, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_option_is_an_error() {
        let err = resolve(&sample_metadata(), "priority", "p9").unwrap_err();
        assert!(matches!(
            err,
            PmuError::UnknownOption { ref field, ref value, .. } if field == "Priority" && value == "p9"
        ));
    }

    #[test]
    fn test_non_select_values_pass_through() {
        let metadata = sample_metadata();
        let number = resolve(&metadata, "estimate", "not-a-number").unwrap();
        assert_eq!(number.value, "not-a-number");
        assert_eq!(number.data_type, FieldDataType::Number);

        let text = resolve(&metadata, "Notes", "  keep spacing ").unwrap();
        assert_eq!(text.value, "  keep spacing ");
    }

    #[test]
    fn test_matches_current() {
        let metadata = sample_metadata();
        let status = resolve(&metadata, "status", "in progress").unwrap();
        assert!(status.matches_current("In progress"));
        assert!(status.matches_current("in PROGRESS"));
        assert!(!status.matches_current("Done"));

        let notes = resolve(&metadata, "notes", "abc").unwrap();
        assert!(notes.matches_current("abc"));
        assert!(!notes.matches_current("ABC"));
    }

    #[test]
    fn test_repeated_calls_against_same_metadata() {
        let metadata = sample_metadata();
        for _ in 0..3 {
            assert_eq!(resolve(&metadata, "Priority", "P1").unwrap().value, "opt_p1");
        }
    }

    fn schedule_metadata(iterations: &[(&str, &str)]) -> ProjectMetadata {
        let mut metadata = sample_metadata();
        metadata.fields.push(FieldMetadata {
            id: "PVTF_due".to_string(),
            name: "Due".to_string(),
            data_type: FieldDataType::Date,
            options: vec![],
        });
        metadata.fields.push(FieldMetadata {
            id: "PVTF_sprint".to_string(),
            name: "Sprint".to_string(),
            data_type: FieldDataType::Iteration,
            options: iterations
                .iter()
                .map(|(id, title)| crate::domain::OptionMetadata {
                    id: id.to_string(),
                    name: title.to_string(),
                })
                .collect(),
        });
        metadata
    }

    #[test]
    fn test_numbers_match_by_value() {
        let metadata = sample_metadata();
        let estimate = resolve(&metadata, "estimate", "3.0").unwrap();
        assert_eq!(estimate.value, "3.0");
        assert!(estimate.matches_current("3"));
        assert!(resolve(&metadata, "estimate", "03").unwrap().matches_current("3"));
        assert!(!estimate.matches_current("3.5"));

        let unparsable = resolve(&metadata, "estimate", "three").unwrap();
        assert!(unparsable.matches_current("three"));
        assert!(!unparsable.matches_current("3"));
    }

    #[test]
    fn test_dates_pass_through_and_match_exactly() {
        let due = resolve(&schedule_metadata(&[]), "due", "2026-11-02").unwrap();
        assert_eq!(due.field_id, "PVTF_due");
        assert_eq!(due.value, "2026-11-02");
        assert!(due.matches_current("2026-11-02"));
        assert!(!due.matches_current("2026-11-03"));
    }

    #[test]
    fn test_iteration_resolves_title_or_id() {
        let metadata = schedule_metadata(&[("it_122", "Sprint 2"), ("it_123", "Sprint 3")]);

        let by_title = resolve(&metadata, "sprint", "sprint 3").unwrap();
        assert_eq!(by_title.value, "it_123");
        assert_eq!(by_title.display_value, "Sprint 3");
        assert!(by_title.matches_current("Sprint 3"));

        let by_id = resolve(&metadata, "sprint", "it_123").unwrap();
        assert_eq!(by_id, by_title);
        assert!(!by_id.matches_current("Sprint 2"));

        assert!(matches!(
            resolve(&metadata, "sprint", "Sprint 9"),
            Err(PmuError::UnknownOption { .. })
        ));
    }

    #[test]
    fn test_iteration_without_listed_iterations_passes_through() {
        let sprint = resolve(&schedule_metadata(&[]), "Sprint", "it_123").unwrap();
        assert_eq!(sprint.value, "it_123");
        assert_eq!(sprint.data_type, FieldDataType::Iteration);
    }
}
