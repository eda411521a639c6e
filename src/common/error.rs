use thiserror::Error;

#[derive(Error, Debug)]
pub enum FacilityError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Fetch failed for state {state}: {message}")]
    Fetch { state: String, message: String },

    #[error("Unexpected HTTP status {status} for state {state}")]
    HttpStatus { state: String, status: u16 },

    #[error("Malformed record in state {state} at index {index}: {reason}")]
    MalformedRecord {
        state: String,
        index: usize,
        reason: String,
    },

    #[error(
        "Supl label mismatch in state {state} at index {index}: position {position} expected '{expected}', found '{found}'"
    )]
    SuplLabelMismatch {
        state: String,
        index: usize,
        position: usize,
        expected: String,
        found: String,
    },

    #[error("State {state} reported {reported} records but returned {actual}")]
    RecordCountMismatch {
        state: String,
        reported: usize,
        actual: usize,
    },

    #[error(
        "{kind} export stopped at state {state} ({position}) after {states_completed} states and {records_so_far} records: {source}"
    )]
    StateFailed {
        kind: String,
        state: String,
        position: String,
        states_completed: usize,
        records_so_far: usize,
        #[source]
        source: Box<FacilityError>,
    },

    #[error("{kind} CSV write to {} failed: {source}", path.display())]
    CsvWrite {
        kind: String,
        path: std::path::PathBuf,
        #[source]
        source: Box<FacilityError>,
    },

    #[error("Spatial import failed: {0}")]
    Import(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl FacilityError {
    pub fn malformed(state: &str, index: usize, reason: impl Into<String>) -> Self {
        FacilityError::MalformedRecord {
            state: state.to_string(),
            index,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FacilityError>;
