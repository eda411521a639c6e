use crate::app::ports::ProviderSourcePort;
use crate::common::error::{FacilityError, Result};
use crate::common::types::FacilityKind;
use crate::config::PipelineConfig;
use crate::observability::PipelineMetrics;
use crate::pipeline::ingestion::{ProviderEndpoint, StateList};
use crate::pipeline::processing::supl::SuplCheck;
use crate::pipeline::processing::{FacilityTable, RecordNormalizer, StateSummary};
use crate::pipeline::storage::{write_table, CsvEncoding, CsvWriteReport};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info, info_span, Instrument};

/// Result of one pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub kind: FacilityKind,
    pub states: Vec<StateSummary>,
    pub total_records: usize,
    pub csv: CsvWriteReport,
}

/// Fetch, normalize and write one facility kind for a list of states.
pub struct FacilityPipeline<'a> {
    source: &'a dyn ProviderSourcePort,
    config: PipelineConfig,
    states: StateList,
    supl_check: SuplCheck,
    encoding: CsvEncoding,
    output_dir: PathBuf,
}

impl<'a> FacilityPipeline<'a> {
    pub fn new(
        source: &'a dyn ProviderSourcePort,
        config: PipelineConfig,
        states: StateList,
        output_dir: &Path,
    ) -> Self {
        Self {
            source,
            config,
            states,
            supl_check: SuplCheck::default(),
            encoding: CsvEncoding::default(),
            output_dir: output_dir.to_path_buf(),
        }
    }

    pub fn with_supl_check(mut self, check: SuplCheck) -> Self {
        self.supl_check = check;
        self
    }

    pub fn with_encoding(mut self, encoding: CsvEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn kind(&self) -> FacilityKind {
        self.config.kind
    }

    pub fn csv_path(&self) -> PathBuf {
        self.config.csv_path(&self.output_dir)
    }

    /// Walks every state in order and aggregates their records. Stops at
    /// the first state that fails, reporting how far the walk got.
    pub async fn collect(&self) -> Result<FacilityTable> {
        let kind = self.kind();
        let endpoint = ProviderEndpoint::from_config(&self.config);
        let normalizer = RecordNormalizer::new(kind, self.supl_check);
        let mut table = FacilityTable::new(kind);

        for position in self.states.iter() {
            let span = info_span!("state", kind = %kind, state = position.code);
            let started = Instant::now();
            let outcome: Result<usize> = async {
                let document = self.source.fetch_state(&endpoint, position.code).await?;
                table.ingest_document(&normalizer, position.code, &document)
            }
            .instrument(span)
            .await;

            match outcome {
                Ok(count) => {
                    PipelineMetrics::record_state_fetched(
                        kind,
                        started.elapsed().as_secs_f64(),
                        count,
                    );
                    info!(
                        "Performing analysis: {} - {} - {}",
                        position.code,
                        position.progress(),
                        count
                    );
                }
                Err(e) => {
                    PipelineMetrics::record_pipeline_failed(kind);
                    error!(
                        kind = %kind,
                        state = position.code,
                        "Export stopped: {}",
                        e
                    );
                    return Err(FacilityError::StateFailed {
                        kind: kind.to_string(),
                        state: position.code.to_string(),
                        position: position.progress(),
                        states_completed: table.states().len(),
                        records_so_far: table.len(),
                        source: Box::new(e),
                    });
                }
            }
        }

        info!(kind = %kind, total = table.len(), "Total {}: {}", kind, table.len());
        Ok(table)
    }

    /// Collects every state and writes the CSV.
    pub async fn run(&self) -> Result<PipelineResult> {
        let kind = self.kind();
        let started = Instant::now();

        let table = self.collect().await?;
        let path = self.csv_path();
        let csv = write_table(&table, &path, self.encoding).map_err(|e| {
            PipelineMetrics::record_pipeline_failed(kind);
            error!(kind = %kind, path = %path.display(), "CSV write failed: {}", e);
            FacilityError::CsvWrite {
                kind: kind.to_string(),
                path: path.clone(),
                source: Box::new(e),
            }
        })?;
        PipelineMetrics::record_csv_written(kind, csv.rows_written, csv.rows_dropped);
        PipelineMetrics::record_pipeline_finished(kind, started.elapsed().as_secs_f64());

        Ok(PipelineResult {
            kind,
            states: table.states().to_vec(),
            total_records: table.len(),
            csv,
        })
    }
}
