//! Positional access into a provider's `Supl` array.
//!
//! `Supl` is a list of `{ "Label": ..., "Value": ... }` objects with no
//! declared schema. Columns such as the hospital type or the nursing-home
//! star ratings are read by position. Each position is described by a
//! [`SuplField`] so that the indices live in one place and the label carried
//! by the entry can be checked before its value is trusted.

use crate::common::error::{FacilityError, Result};
use crate::pipeline::processing::normalize::render_cell;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const SUPL_KEY: &str = "Supl";
pub const LABEL_KEY: &str = "Label";
pub const VALUE_KEY: &str = "Value";

/// How far an entry's `Label` is checked before its `Value` is used
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuplCheck {
    /// Position only
    Off,
    /// Check the label when the entry has one
    #[default]
    Lenient,
    /// Every entry read must carry a matching label
    Strict,
}

/// A column sourced from a fixed `Supl` position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuplField {
    pub column: &'static str,
    pub position: usize,
    /// Lower-case keyword the entry's label must contain
    pub label_keyword: &'static str,
}

pub const HOSPITAL_TYPE: SuplField = SuplField {
    column: "Type",
    position: 0,
    label_keyword: "type",
};

pub const NURSING_HOME_OVERALL_RATING: SuplField = SuplField {
    column: "Overall_Rtg",
    position: 0,
    label_keyword: "overall",
};

pub const NURSING_HOME_HEALTH_RATING: SuplField = SuplField {
    column: "Health_Rtg",
    position: 1,
    label_keyword: "health",
};

pub const NURSING_HOME_STAFFING_RATING: SuplField = SuplField {
    column: "staffing_Rtg",
    position: 2,
    label_keyword: "staffing",
};

pub const NURSING_HOME_CARE_RATING: SuplField = SuplField {
    column: "Care_Rtg",
    position: 3,
    label_keyword: "quality",
};

pub const NURSING_HOME_TYPE: SuplField = SuplField {
    column: "Type",
    position: 6,
    label_keyword: "type",
};

/// Borrowed view over one record's `Supl` array
pub struct SuplAccessor<'a> {
    entries: &'a [Value],
    check: SuplCheck,
    state: &'a str,
    index: usize,
}

impl<'a> SuplAccessor<'a> {
    pub fn from_record(
        record: &'a Value,
        check: SuplCheck,
        state: &'a str,
        index: usize,
    ) -> Result<Self> {
        let entries = record
            .get(SUPL_KEY)
            .ok_or_else(|| FacilityError::malformed(state, index, "missing key 'Supl'"))?
            .as_array()
            .ok_or_else(|| FacilityError::malformed(state, index, "'Supl' is not an array"))?;
        Ok(Self {
            entries,
            check,
            state,
            index,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cell text for `field`
    pub fn value(&self, field: &SuplField) -> Result<String> {
        let entry = self.entries.get(field.position).ok_or_else(|| {
            FacilityError::malformed(
                self.state,
                self.index,
                format!(
                    "'Supl' has {} entries, {} needs position {}",
                    self.entries.len(),
                    field.column,
                    field.position
                ),
            )
        })?;
        if !entry.is_object() {
            return Err(FacilityError::malformed(
                self.state,
                self.index,
                format!("'Supl'[{}] is not an object", field.position),
            ));
        }

        self.check_label(entry, field)?;

        let value = entry.get(VALUE_KEY).ok_or_else(|| {
            FacilityError::malformed(
                self.state,
                self.index,
                format!("'Supl'[{}] has no 'Value'", field.position),
            )
        })?;
        Ok(render_cell(value))
    }

    fn check_label(&self, entry: &Value, field: &SuplField) -> Result<()> {
        if self.check == SuplCheck::Off {
            return Ok(());
        }
        let label = entry.get(LABEL_KEY).and_then(Value::as_str);
        match (label, self.check) {
            (Some(label), _) if label.to_lowercase().contains(field.label_keyword) => Ok(()),
            (None, SuplCheck::Lenient) => Ok(()),
            (found, _) => Err(FacilityError::SuplLabelMismatch {
                state: self.state.to_string(),
                index: self.index,
                position: field.position,
                expected: field.label_keyword.to_string(),
                found: found.unwrap_or("<no label>").to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn nursing_record() -> Value {
        json!({
            "Supl": [
                {"Label": "Overall Rating", "Value": 4},
                {"Label": "Health Inspection Rating", "Value": 3},
                {"Label": "Staffing Rating", "Value": "5"},
                {"Label": "Quality Measures Rating", "Value": 2},
                {"Label": "Beds", "Value": 120},
                {"Label": "Residents", "Value": 98},
                {"Label": "Ownership Type", "Value": "For profit - Corporation"}
            ]
        })
    }

    #[test]
    fn test_pinned_positions() {
        assert_eq!(HOSPITAL_TYPE.position, 0);
        assert_eq!(NURSING_HOME_OVERALL_RATING.position, 0);
        assert_eq!(NURSING_HOME_HEALTH_RATING.position, 1);
        assert_eq!(NURSING_HOME_STAFFING_RATING.position, 2);
        assert_eq!(NURSING_HOME_CARE_RATING.position, 3);
        assert_eq!(NURSING_HOME_TYPE.position, 6);
    }

    #[test]
    fn test_reads_values_by_position() {
        let record = nursing_record();
        let supl = SuplAccessor::from_record(&record, SuplCheck::Strict, "VA", 0).unwrap();
        assert_eq!(supl.value(&NURSING_HOME_OVERALL_RATING).unwrap(), "4");
        assert_eq!(supl.value(&NURSING_HOME_STAFFING_RATING).unwrap(), "5");
        assert_eq!(
            supl.value(&NURSING_HOME_TYPE).unwrap(),
            "For profit - Corporation"
        );
    }

    #[test]
    fn test_short_supl_is_malformed() {
        let record = json!({"Supl": [{"Value": "Acute Care Hospitals"}]});
        let supl = SuplAccessor::from_record(&record, SuplCheck::Lenient, "TX", 7).unwrap();
        match supl.value(&NURSING_HOME_TYPE) {
            Err(FacilityError::MalformedRecord { state, index, reason }) => {
                assert_eq!(state, "TX");
                assert_eq!(index, 7);
                assert!(reason.contains("position 6"));
            }
            other => panic!("expected MalformedRecord, got {other:?}"),
        }
    }

    #[test]
    fn test_drifted_label_is_reported() {
        let record = json!({
            "Supl": [
                {"Label": "Health Inspection Rating", "Value": 3},
                {"Label": "Overall Rating", "Value": 4}
            ]
        });
        let supl = SuplAccessor::from_record(&record, SuplCheck::Lenient, "OH", 2).unwrap();
        match supl.value(&NURSING_HOME_OVERALL_RATING) {
            Err(FacilityError::SuplLabelMismatch {
                position,
                expected,
                found,
                ..
            }) => {
                assert_eq!(position, 0);
                assert_eq!(expected, "overall");
                assert_eq!(found, "Health Inspection Rating");
            }
            other => panic!("expected SuplLabelMismatch, got {other:?}"),
        }

        // Position-only mode reads whatever sits at the index.
        let supl = SuplAccessor::from_record(&record, SuplCheck::Off, "OH", 2).unwrap();
        assert_eq!(supl.value(&NURSING_HOME_OVERALL_RATING).unwrap(), "3");
    }

    #[test]
    fn test_unlabelled_entries_depend_on_mode() {
        let record = json!({"Supl": [{"Value": "Critical Access Hospitals"}]});

        let lenient = SuplAccessor::from_record(&record, SuplCheck::Lenient, "AK", 0).unwrap();
        assert_eq!(
            lenient.value(&HOSPITAL_TYPE).unwrap(),
            "Critical Access Hospitals"
        );

        let strict = SuplAccessor::from_record(&record, SuplCheck::Strict, "AK", 0).unwrap();
        assert!(matches!(
            strict.value(&HOSPITAL_TYPE),
            Err(FacilityError::SuplLabelMismatch { .. })
        ));
    }

    #[test]
    fn test_missing_supl_or_value() {
        let record = json!({"ID": "1"});
        assert!(matches!(
            SuplAccessor::from_record(&record, SuplCheck::Off, "AL", 0),
            Err(FacilityError::MalformedRecord { .. })
        ));

        let record = json!({"Supl": [{"Label": "Hospital Type"}]});
        let supl = SuplAccessor::from_record(&record, SuplCheck::Off, "AL", 0).unwrap();
        assert!(matches!(
            supl.value(&HOSPITAL_TYPE),
            Err(FacilityError::MalformedRecord { .. })
        ));
    }
}
