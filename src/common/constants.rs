/// Facility kind names used on the command line and in configuration
pub const HOSPITALS: &str = "hospitals";
pub const NURSING_HOMES: &str = "nursing-homes";

// Provider-finder endpoints (query string is appended per state)
pub const HOSPITAL_ENDPOINT: &str =
    "https://www.medicare.gov/hospitalservices/Provider.svc/ProviderFinder";
pub const NURSING_HOME_ENDPOINT: &str =
    "https://www.medicare.gov/nursinghomeservices/provider.svc/ProviderFinder";

// Page sizes large enough to return a whole state in one page
pub const HOSPITAL_PAGE_SIZE: u32 = 9999;
pub const NURSING_HOME_PAGE_SIZE: u32 = 99999;

// Output naming
pub const DEFAULT_OUTPUT_DIR: &str = "output";
pub const DEFAULT_DATABASE_NAME: &str = "Medicare_Facilities";
pub const HOSPITAL_CSV_NAME: &str = "Medicare_Hospitals";
pub const NURSING_HOME_CSV_NAME: &str = "Medicare_NursingHomes";
pub const HOSPITAL_LAYER_NAME: &str = "Hospitals";
pub const NURSING_HOME_LAYER_NAME: &str = "NursingHomes";

// HTTP defaults
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 120;
pub const DEFAULT_RETRIES: u32 = 0;
pub const USER_AGENT: &str = concat!("medicare_facilities/", env!("CARGO_PKG_VERSION"));

/// WGS 84
pub const WGS84_SRS_ID: i32 = 4326;

/// The 50 U.S. state postal codes, in the order the export walks them.
pub const STATE_CODES: [&str; 50] = [
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "FL", "GA", "HI", "ID", "IL", "IN", "IA",
    "KS", "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH", "NJ",
    "NM", "NY", "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT", "VT",
    "VA", "WA", "WV", "WI", "WY",
];

/// Timestamp format for run start/end lines
pub const RUN_TIMESTAMP_FORMAT: &str = "%A, %B %d, %Y %I:%M:%S %p";
