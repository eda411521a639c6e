use crate::common::error::{FacilityError, Result};
use crate::common::types::{
    FacilityCommon, FacilityKind, FacilityRecord, NursingHomeRatings, RawProviderRecord,
};
use crate::pipeline::processing::supl::{
    SuplAccessor, SuplCheck, HOSPITAL_TYPE, NURSING_HOME_CARE_RATING, NURSING_HOME_HEALTH_RATING,
    NURSING_HOME_OVERALL_RATING, NURSING_HOME_STAFFING_RATING, NURSING_HOME_TYPE,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static PHONE_NOISE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ ()\-]").expect("phone noise pattern is valid"));

/// Strips spaces, parentheses and dashes: `(123) 456-7890` -> `1234567890`.
/// Length and content are not otherwise checked.
pub fn normalize_phone(raw: &str) -> String {
    PHONE_NOISE.replace_all(raw, "").into_owned()
}

/// Text written to a CSV cell for a JSON scalar. Strings are used verbatim,
/// numbers keep their JSON spelling and `null` becomes an empty cell.
pub fn render_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Flattens provider objects of one facility kind into [`FacilityRecord`]s.
#[derive(Debug, Clone, Copy)]
pub struct RecordNormalizer {
    kind: FacilityKind,
    supl_check: SuplCheck,
}

impl RecordNormalizer {
    pub fn new(kind: FacilityKind, supl_check: SuplCheck) -> Self {
        Self { kind, supl_check }
    }

    pub fn kind(&self) -> FacilityKind {
        self.kind
    }

    /// `index` is the record's position in the state's result array and is
    /// only used for error reporting.
    pub fn normalize(
        &self,
        state: &str,
        index: usize,
        record: &RawProviderRecord,
    ) -> Result<FacilityRecord> {
        if !record.is_object() {
            return Err(FacilityError::malformed(state, index, "record is not an object"));
        }
        let field = |key: &str| -> Result<String> {
            record
                .get(key)
                .map(render_cell)
                .ok_or_else(|| FacilityError::malformed(state, index, format!("missing key '{key}'")))
        };
        let supl = SuplAccessor::from_record(record, self.supl_check, state, index)?;

        let facility_type = match self.kind {
            FacilityKind::Hospital => supl.value(&HOSPITAL_TYPE)?,
            FacilityKind::NursingHome => supl.value(&NURSING_HOME_TYPE)?,
        };

        let common = FacilityCommon {
            id: field("ID")?,
            name: field("Name")?,
            address: field("Adr1")?,
            city: field("City")?,
            state: field("State")?,
            zipcode: field("Zip")?,
            facility_type,
            phone: normalize_phone(&field("Phone")?),
            latitude: field("Lat")?,
            longitude: field("Long")?,
        };

        Ok(match self.kind {
            FacilityKind::Hospital => FacilityRecord::Hospital(common),
            FacilityKind::NursingHome => FacilityRecord::NursingHome {
                common,
                ratings: NursingHomeRatings {
                    overall: supl.value(&NURSING_HOME_OVERALL_RATING)?,
                    health: supl.value(&NURSING_HOME_HEALTH_RATING)?,
                    staffing: supl.value(&NURSING_HOME_STAFFING_RATING)?,
                    care: supl.value(&NURSING_HOME_CARE_RATING)?,
                },
            },
        })
    }
}
