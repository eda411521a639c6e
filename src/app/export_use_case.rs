use crate::app::ports::{
    PointImportReport, PointImportRequest, ProviderSourcePort, SpatialImporterPort,
};
use crate::common::constants::RUN_TIMESTAMP_FORMAT;
use crate::common::error::{FacilityError, Result};
use crate::common::types::{FacilityKind, LATITUDE_COLUMN, LONGITUDE_COLUMN};
use crate::config::Config;
use crate::observability::PipelineMetrics;
use crate::pipeline::{FacilityPipeline, PipelineResult};
use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::{info, instrument};

/// Wall-clock bookends for a run
#[derive(Debug, Clone, Copy)]
pub struct RunClock {
    started_at: DateTime<Local>,
}

impl RunClock {
    pub fn start() -> Self {
        let started_at = Local::now();
        info!("Started: {}", started_at.format(RUN_TIMESTAMP_FORMAT));
        Self { started_at }
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    pub fn finish(&self) -> (DateTime<Local>, String) {
        let finished_at = Local::now();
        let elapsed = format_elapsed(finished_at - self.started_at);
        info!("Ended: {}", finished_at.format(RUN_TIMESTAMP_FORMAT));
        info!("Elapsed time: {}", elapsed);
        (finished_at, elapsed)
    }
}

/// `H:MM:SS`, fractional seconds dropped
pub fn format_elapsed(elapsed: chrono::Duration) -> String {
    let total = elapsed.num_seconds().max(0);
    format!("{}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

#[derive(Debug, Serialize)]
pub struct ExportSummary {
    pub pipelines: Vec<PipelineResult>,
    pub imports: Vec<PointImportReport>,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub elapsed: String,
}

/// Runs the export pipelines and, when an importer is attached, loads each
/// CSV into a freshly created spatial database.
pub struct ExportUseCase {
    source: Box<dyn ProviderSourcePort>,
    importer: Option<Box<dyn SpatialImporterPort>>,
    config: Config,
}

impl ExportUseCase {
    pub fn new(source: Box<dyn ProviderSourcePort>, config: Config) -> Self {
        Self {
            source,
            importer: None,
            config,
        }
    }

    pub fn with_importer(mut self, importer: Box<dyn SpatialImporterPort>) -> Self {
        self.importer = Some(importer);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    #[instrument(skip(self))]
    pub async fn run(&self, kinds: &[FacilityKind]) -> Result<ExportSummary> {
        let clock = RunClock::start();
        let states = self.config.state_list()?;

        let mut pipelines = Vec::with_capacity(kinds.len());
        for &kind in kinds {
            let pipeline = FacilityPipeline::new(
                self.source.as_ref(),
                self.config.pipeline(kind),
                states.clone(),
                &self.config.output.directory,
            )
            .with_supl_check(self.config.normalize.supl_check)
            .with_encoding(self.config.output.encoding);

            let result = pipeline.run().await?;
            info!(
                kind = %kind,
                records = result.total_records,
                written = result.csv.rows_written,
                dropped = result.csv.rows_dropped,
                "{} created",
                result.csv.path.display()
            );
            pipelines.push(result);
        }

        let imports = match &self.importer {
            Some(importer) => import_layers(importer.as_ref(), &self.config, kinds)?,
            None => Vec::new(),
        };

        let (finished_at, elapsed) = clock.finish();
        Ok(ExportSummary {
            pipelines,
            imports,
            started_at: clock.started_at(),
            finished_at,
            elapsed,
        })
    }

    /// Imports CSVs left by an earlier export without fetching again.
    pub fn import_existing(&self, kinds: &[FacilityKind]) -> Result<Vec<PointImportReport>> {
        let importer = self
            .importer
            .as_ref()
            .ok_or_else(|| FacilityError::Config("no spatial importer configured".into()))?;
        import_layers(importer.as_ref(), &self.config, kinds)
    }
}

/// Resets the database once, then imports one point layer per kind.
pub fn import_layers(
    importer: &dyn SpatialImporterPort,
    config: &Config,
    kinds: &[FacilityKind],
) -> Result<Vec<PointImportReport>> {
    importer.reset().map_err(as_import_error)?;

    let mut reports = Vec::with_capacity(kinds.len());
    for &kind in kinds {
        let pipeline = config.pipeline(kind);
        let request = PointImportRequest {
            csv_path: pipeline.csv_path(&config.output.directory),
            layer_name: pipeline.layer_name.clone(),
            latitude_field: LATITUDE_COLUMN.to_string(),
            longitude_field: LONGITUDE_COLUMN.to_string(),
        };
        let report = importer.import_points(&request).map_err(as_import_error)?;
        PipelineMetrics::record_import(kind, report.features);
        reports.push(report);
    }
    Ok(reports)
}

fn as_import_error(err: FacilityError) -> FacilityError {
    match err {
        FacilityError::Import(_) => err,
        other => FacilityError::Import(other.to_string()),
    }
}
