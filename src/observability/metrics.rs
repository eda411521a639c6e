//! Metrics for the export pipelines.
//!
//! Recorded through the `metrics` facade; nothing is exported unless the
//! embedding process installs a recorder.

use crate::common::types::FacilityKind;
use std::fmt;

/// Every metric name the exporter records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    StatesFetched,
    FetchDuration,
    RecordsNormalized,
    RowsWritten,
    RowsDropped,
    FeaturesImported,
    PipelineDuration,
    PipelineFailures,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::StatesFetched => "facilities_states_fetched_total",
            MetricName::FetchDuration => "facilities_fetch_duration_seconds",
            MetricName::RecordsNormalized => "facilities_records_normalized_total",
            MetricName::RowsWritten => "facilities_csv_rows_written_total",
            MetricName::RowsDropped => "facilities_csv_rows_dropped_total",
            MetricName::FeaturesImported => "facilities_features_imported_total",
            MetricName::PipelineDuration => "facilities_pipeline_duration_seconds",
            MetricName::PipelineFailures => "facilities_pipeline_failures_total",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recording helpers, labelled by facility kind
pub struct PipelineMetrics;

impl PipelineMetrics {
    pub fn record_state_fetched(kind: FacilityKind, duration_secs: f64, records: usize) {
        let kind = kind.as_str();
        ::metrics::counter!(MetricName::StatesFetched.as_str(), "kind" => kind).increment(1);
        ::metrics::histogram!(MetricName::FetchDuration.as_str(), "kind" => kind)
            .record(duration_secs);
        ::metrics::counter!(MetricName::RecordsNormalized.as_str(), "kind" => kind)
            .increment(records as u64);
    }

    pub fn record_csv_written(kind: FacilityKind, written: usize, dropped: usize) {
        let kind = kind.as_str();
        ::metrics::counter!(MetricName::RowsWritten.as_str(), "kind" => kind)
            .increment(written as u64);
        ::metrics::counter!(MetricName::RowsDropped.as_str(), "kind" => kind)
            .increment(dropped as u64);
    }

    pub fn record_import(kind: FacilityKind, features: usize) {
        ::metrics::counter!(MetricName::FeaturesImported.as_str(), "kind" => kind.as_str())
            .increment(features as u64);
    }

    pub fn record_pipeline_finished(kind: FacilityKind, duration_secs: f64) {
        ::metrics::histogram!(MetricName::PipelineDuration.as_str(), "kind" => kind.as_str())
            .record(duration_secs);
    }

    pub fn record_pipeline_failed(kind: FacilityKind) {
        ::metrics::counter!(MetricName::PipelineFailures.as_str(), "kind" => kind.as_str())
            .increment(1);
    }
}
