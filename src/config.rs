use crate::common::constants::{
    DEFAULT_DATABASE_NAME, DEFAULT_OUTPUT_DIR, DEFAULT_RETRIES, DEFAULT_TIMEOUT_SECONDS,
    HOSPITAL_CSV_NAME, HOSPITAL_ENDPOINT, HOSPITAL_LAYER_NAME, HOSPITAL_PAGE_SIZE,
    NURSING_HOME_CSV_NAME, NURSING_HOME_ENDPOINT, NURSING_HOME_LAYER_NAME,
    NURSING_HOME_PAGE_SIZE,
};
use crate::common::error::{FacilityError, Result};
use crate::common::types::FacilityKind;
use crate::pipeline::ingestion::states::StateList;
use crate::pipeline::processing::supl::SuplCheck;
use crate::pipeline::storage::csv_writer::CsvEncoding;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
pub const OUTPUT_DIR_ENV: &str = "FACILITIES_OUTPUT_DIR";
pub const STATES_ENV: &str = "FACILITIES_STATES";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub output: OutputConfig,
    pub http: HttpConfig,
    pub normalize: NormalizeConfig,
    /// State codes to walk; all 50 when absent
    pub states: Option<Vec<String>>,
    pub hospitals: PipelineOverrides,
    pub nursing_homes: PipelineOverrides,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub database_name: String,
    pub encoding: CsvEncoding,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(DEFAULT_OUTPUT_DIR),
            database_name: DEFAULT_DATABASE_NAME.to_string(),
            encoding: CsvEncoding::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpConfig {
    pub timeout_seconds: u64,
    pub retries: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            retries: DEFAULT_RETRIES,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NormalizeConfig {
    pub supl_check: SuplCheck,
}

/// Per-pipeline settings as written in the file; unset keys fall back to the
/// defaults of the facility kind.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineOverrides {
    pub endpoint: Option<String>,
    pub page_size: Option<u32>,
    pub csv_name: Option<String>,
    pub layer_name: Option<String>,
}

/// Resolved settings for one pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub kind: FacilityKind,
    pub endpoint: String,
    pub page_size: u32,
    pub csv_name: String,
    pub layer_name: String,
}

impl PipelineConfig {
    pub fn defaults(kind: FacilityKind) -> Self {
        match kind {
            FacilityKind::Hospital => Self {
                kind,
                endpoint: HOSPITAL_ENDPOINT.to_string(),
                page_size: HOSPITAL_PAGE_SIZE,
                csv_name: HOSPITAL_CSV_NAME.to_string(),
                layer_name: HOSPITAL_LAYER_NAME.to_string(),
            },
            FacilityKind::NursingHome => Self {
                kind,
                endpoint: NURSING_HOME_ENDPOINT.to_string(),
                page_size: NURSING_HOME_PAGE_SIZE,
                csv_name: NURSING_HOME_CSV_NAME.to_string(),
                layer_name: NURSING_HOME_LAYER_NAME.to_string(),
            },
        }
    }

    pub fn csv_path(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(format!("{}.csv", self.csv_name))
    }
}

impl Config {
    /// Loads configuration. An explicit path must exist; otherwise
    /// `config.toml` is read when present and defaults are used when not.
    /// Environment overrides are applied last. The result is not validated;
    /// see [`Config::resolve`].
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?
            }
            None => Self::default(),
        };

        config.apply_overrides(
            std::env::var(OUTPUT_DIR_ENV).ok(),
            std::env::var(STATES_ENV).ok(),
        );
        Ok(config)
    }

    /// File, then environment, then command-line overrides; validated once
    /// every layer is applied.
    pub fn resolve(
        path: Option<&Path>,
        output_dir: Option<String>,
        states: Option<String>,
    ) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_overrides(output_dir, states);
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            FacilityError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Output directory and comma-separated state list overrides
    pub fn apply_overrides(&mut self, output_dir: Option<String>, states: Option<String>) {
        if let Some(dir) = output_dir.filter(|d| !d.trim().is_empty()) {
            self.output.directory = PathBuf::from(dir.trim());
        }
        if let Some(list) = states.filter(|s| !s.trim().is_empty()) {
            self.states = Some(list.split(',').map(|s| s.trim().to_string()).collect());
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.state_list()?;
        if self.output.database_name.trim().is_empty() {
            return Err(FacilityError::Config("output.database_name is empty".into()));
        }
        for kind in FacilityKind::ALL {
            let pipeline = self.pipeline(kind);
            if pipeline.page_size == 0 {
                return Err(FacilityError::Config(format!("{kind}: page_size must be > 0")));
            }
            if !(pipeline.endpoint.starts_with("http://")
                || pipeline.endpoint.starts_with("https://"))
            {
                return Err(FacilityError::Config(format!(
                    "{kind}: endpoint '{}' is not an http(s) URL",
                    pipeline.endpoint
                )));
            }
            if pipeline.csv_name.trim().is_empty() || pipeline.layer_name.trim().is_empty() {
                return Err(FacilityError::Config(format!(
                    "{kind}: csv_name and layer_name must be set"
                )));
            }
        }
        Ok(())
    }

    pub fn state_list(&self) -> Result<StateList> {
        match &self.states {
            Some(codes) => StateList::from_codes(codes),
            None => Ok(StateList::all()),
        }
    }

    pub fn pipeline(&self, kind: FacilityKind) -> PipelineConfig {
        let overrides = match kind {
            FacilityKind::Hospital => &self.hospitals,
            FacilityKind::NursingHome => &self.nursing_homes,
        };
        let defaults = PipelineConfig::defaults(kind);
        PipelineConfig {
            kind,
            endpoint: overrides.endpoint.clone().unwrap_or(defaults.endpoint),
            page_size: overrides.page_size.unwrap_or(defaults.page_size),
            csv_name: overrides.csv_name.clone().unwrap_or(defaults.csv_name),
            layer_name: overrides.layer_name.clone().unwrap_or(defaults.layer_name),
        }
    }
}
