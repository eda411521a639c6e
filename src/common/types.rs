use crate::common::constants::{HOSPITALS, NURSING_HOMES};
use crate::common::error::{FacilityError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Raw provider object as returned in `ProviderFinderResult`
pub type RawProviderRecord = serde_json::Value;

/// Which provider-finder service a pipeline talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FacilityKind {
    #[serde(rename = "hospitals")]
    Hospital,
    #[serde(rename = "nursing-homes")]
    NursingHome,
}

const HOSPITAL_HEADER: [&str; 10] = [
    "ID", "Name", "Address", "City", "State", "Zipcode", "Type", "Phone", "Latitude",
    "Longitude",
];

const NURSING_HOME_HEADER: [&str; 14] = [
    "ID",
    "Name",
    "Address",
    "City",
    "State",
    "Zipcode",
    "Type",
    "Phone",
    "Overall_Rtg",
    "Health_Rtg",
    "staffing_Rtg",
    "Care_Rtg",
    "Latitude",
    "Longitude",
];

pub const LATITUDE_COLUMN: &str = "Latitude";
pub const LONGITUDE_COLUMN: &str = "Longitude";

impl FacilityKind {
    pub const ALL: [FacilityKind; 2] = [FacilityKind::Hospital, FacilityKind::NursingHome];

    pub fn as_str(&self) -> &'static str {
        match self {
            FacilityKind::Hospital => HOSPITALS,
            FacilityKind::NursingHome => NURSING_HOMES,
        }
    }

    /// CSV header, in column order
    pub fn header(&self) -> &'static [&'static str] {
        match self {
            FacilityKind::Hospital => &HOSPITAL_HEADER,
            FacilityKind::NursingHome => &NURSING_HOME_HEADER,
        }
    }

    pub fn arity(&self) -> usize {
        self.header().len()
    }
}

impl fmt::Display for FacilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FacilityKind {
    type Err = FacilityError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "hospital" | "hospitals" => Ok(FacilityKind::Hospital),
            "nursing-home" | "nursing-homes" => Ok(FacilityKind::NursingHome),
            other => Err(FacilityError::Config(format!(
                "unknown facility kind '{other}' (expected '{HOSPITALS}' or '{NURSING_HOMES}')"
            ))),
        }
    }
}

/// Fields shared by both variants. All values are kept as the text that
/// lands in the CSV cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacilityCommon {
    pub id: String,
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zipcode: String,
    pub facility_type: String,
    pub phone: String,
    pub latitude: String,
    pub longitude: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NursingHomeRatings {
    pub overall: String,
    pub health: String,
    pub staffing: String,
    pub care: String,
}

/// One flattened provider row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FacilityRecord {
    Hospital(FacilityCommon),
    NursingHome {
        common: FacilityCommon,
        ratings: NursingHomeRatings,
    },
}

impl FacilityRecord {
    pub fn kind(&self) -> FacilityKind {
        match self {
            FacilityRecord::Hospital(_) => FacilityKind::Hospital,
            FacilityRecord::NursingHome { .. } => FacilityKind::NursingHome,
        }
    }

    pub fn common(&self) -> &FacilityCommon {
        match self {
            FacilityRecord::Hospital(common) => common,
            FacilityRecord::NursingHome { common, .. } => common,
        }
    }

    /// Cells in header order
    pub fn to_row(&self) -> Vec<&str> {
        let c = self.common();
        let mut row = vec![
            c.id.as_str(),
            c.name.as_str(),
            c.address.as_str(),
            c.city.as_str(),
            c.state.as_str(),
            c.zipcode.as_str(),
            c.facility_type.as_str(),
            c.phone.as_str(),
        ];
        if let FacilityRecord::NursingHome { ratings, .. } = self {
            row.extend([
                ratings.overall.as_str(),
                ratings.health.as_str(),
                ratings.staffing.as_str(),
                ratings.care.as_str(),
            ]);
        }
        row.push(c.latitude.as_str());
        row.push(c.longitude.as_str());
        row
    }
}

/// One provider-finder response for a single state
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderDocument {
    #[serde(rename = "recordcount", deserialize_with = "deserialize_record_count")]
    pub record_count: usize,
    #[serde(rename = "ProviderFinderResult", default)]
    pub results: Vec<RawProviderRecord>,
}

/// `recordcount` arrives either as a JSON number or as a numeric string.
fn deserialize_record_count<'de, D>(deserializer: D) -> std::result::Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value = serde_json::Value::deserialize(deserializer)?;
    match &value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .map(|n| n as usize)
            .ok_or_else(|| D::Error::custom(format!("recordcount is not a count: {n}"))),
        serde_json::Value::String(s) => s
            .trim()
            .parse::<usize>()
            .map_err(|e| D::Error::custom(format!("recordcount '{s}' is not numeric: {e}"))),
        other => Err(D::Error::custom(format!(
            "recordcount has unexpected type: {other}"
        ))),
    }
}
