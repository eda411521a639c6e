use async_trait::async_trait;
use medicare_facilities::app::export_use_case::ExportUseCase;
use medicare_facilities::app::ports::ProviderSourcePort;
use medicare_facilities::config::{Config, PipelineConfig};
use medicare_facilities::infra::GeoPackageImporter;
use medicare_facilities::pipeline::ingestion::{ProviderEndpoint, StateList};
use medicare_facilities::pipeline::FacilityPipeline;
use medicare_facilities::{FacilityError, FacilityKind, ProviderDocument, Result};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

/// Serves canned documents per service and state, and records every URL
/// requested.
#[derive(Clone, Default)]
struct FixtureSource {
    hospitals: Arc<HashMap<String, Value>>,
    nursing_homes: Arc<HashMap<String, Value>>,
    requested: Arc<Mutex<Vec<String>>>,
}

fn by_state(documents: Vec<(&str, Value)>) -> Arc<HashMap<String, Value>> {
    Arc::new(
        documents
            .into_iter()
            .map(|(s, d)| (s.to_string(), d))
            .collect(),
    )
}

impl FixtureSource {
    fn new(hospitals: Vec<(&str, Value)>) -> Self {
        Self {
            hospitals: by_state(hospitals),
            ..Self::default()
        }
    }

    fn with_nursing_homes(mut self, documents: Vec<(&str, Value)>) -> Self {
        self.nursing_homes = by_state(documents);
        self
    }

    fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProviderSourcePort for FixtureSource {
    async fn fetch_state(
        &self,
        endpoint: &ProviderEndpoint,
        state: &str,
    ) -> Result<ProviderDocument> {
        self.requested.lock().unwrap().push(endpoint.url_for(state));
        let documents = if endpoint.base().contains("nursinghome") {
            &self.nursing_homes
        } else {
            &self.hospitals
        };
        let doc = documents
            .get(state)
            .cloned()
            .ok_or_else(|| FacilityError::Fetch {
                state: state.to_string(),
                message: "connection refused".to_string(),
            })?;
        Ok(serde_json::from_value(doc)?)
    }
}

fn hospital(id: &str, state: &str, phone: &str, lat: Value, lon: Value) -> Value {
    json!({
        "ID": id,
        "Name": format!("{state} Hospital {id}"),
        "Adr1": format!("{id} Main Street"),
        "City": "Springfield",
        "State": state,
        "Zip": "22000",
        "Phone": phone,
        "Lat": lat,
        "Long": lon,
        "Supl": [{"Label": "Hospital Type", "Value": "Acute Care Hospitals"}]
    })
}

fn nursing_home(id: &str, state: &str) -> Value {
    json!({
        "ID": id,
        "Name": format!("{state} Care Center {id}"),
        "Adr1": "5 Elm Rd",
        "City": "Fairview",
        "State": state,
        "Zip": "24000",
        "Phone": "(540) 555-0101",
        "Lat": "37.1",
        "Long": "-80.2",
        "Supl": [
            {"Value": 5}, {"Value": 4}, {"Value": 3}, {"Value": 2},
            {"Value": 100}, {"Value": 90}, {"Value": "Government - County"}
        ]
    })
}

fn read_csv(path: &Path) -> Vec<Vec<String>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .unwrap();
    rdr.records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect()
}

fn test_config(dir: &Path, states: &[&str]) -> Config {
    let mut config = Config::default();
    config.output.directory = dir.to_path_buf();
    config.states = Some(states.iter().map(|s| s.to_string()).collect());
    config
}

#[tokio::test]
async fn test_virginia_end_to_end() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let source = FixtureSource::new(vec![(
        "VA",
        json!({
            "recordcount": 2,
            "ProviderFinderResult": [
                hospital("490001", "VA", "(804) 555-0100", json!(37.5407), json!(-77.4360)),
                hospital("490002", "VA", "757 555 0199", json!("36.8508"), json!("-76.2859"))
            ]
        }),
    )]);

    let config = test_config(dir.path(), &["VA"]);
    let importer = GeoPackageImporter::new(dir.path(), &config.output.database_name);
    let use_case = ExportUseCase::new(Box::new(source.clone()), config).with_importer(Box::new(importer));

    let summary = use_case.run(&[FacilityKind::Hospital]).await?;
    let result = &summary.pipelines[0];
    assert_eq!(result.total_records, 2);
    assert_eq!(result.csv.rows_written, 2);
    assert_eq!(result.csv.rows_dropped, 0);

    let rows = read_csv(&dir.path().join("Medicare_Hospitals.csv"));
    assert_eq!(rows.len(), 3);
    assert_eq!(
        rows[0],
        vec!["ID", "Name", "Address", "City", "State", "Zipcode", "Type", "Phone", "Latitude", "Longitude"]
    );
    assert_eq!(
        rows[1],
        vec![
            "490001",
            "VA Hospital 490001",
            "490001 Main Street",
            "Springfield",
            "VA",
            "22000",
            "Acute Care Hospitals",
            "8045550100",
            "37.5407",
            "-77.436"
        ]
    );
    assert_eq!(rows[2][7], "7575550199");
    assert_eq!(&rows[2][8..], &["36.8508", "-76.2859"]);

    assert_eq!(summary.imports.len(), 1);
    assert_eq!(summary.imports[0].layer_name, "Hospitals");
    assert_eq!(summary.imports[0].features, 2);

    assert_eq!(
        source.requested(),
        vec![
            "https://www.medicare.gov/hospitalservices/Provider.svc/ProviderFinder?loc=ST|VA&sort=1|ASC&paging=1|9999"
                .to_string()
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_rows_per_state_match_recordcount() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let source = FixtureSource::new(vec![
        (
            "AL",
            json!({"recordcount": "3", "ProviderFinderResult": [
                hospital("1", "AL", "1", json!(32.0), json!(-86.0)),
                hospital("2", "AL", "2", json!(32.1), json!(-86.1)),
                hospital("3", "AL", "3", json!(32.2), json!(-86.2))
            ]}),
        ),
        ("AK", json!({"recordcount": 0, "ProviderFinderResult": []})),
        (
            "AZ",
            json!({"recordcount": 1, "ProviderFinderResult": [
                hospital("4", "AZ", "4", json!(33.4), json!(-112.0))
            ]}),
        ),
    ]);

    let pipeline = FacilityPipeline::new(
        &source,
        PipelineConfig::defaults(FacilityKind::Hospital),
        StateList::from_codes(&["AL", "AK", "AZ"])?,
        dir.path(),
    );
    let result = pipeline.run().await?;

    let per_state: Vec<_> = result
        .states
        .iter()
        .map(|s| (s.state.as_str(), s.reported, s.appended))
        .collect();
    assert_eq!(per_state, vec![("AL", 3, 3), ("AK", 0, 0), ("AZ", 1, 1)]);
    assert_eq!(result.total_records, 4);

    let rows = read_csv(&pipeline.csv_path());
    assert_eq!(rows.len(), 5);
    assert!(rows.iter().all(|r| r.len() == rows[0].len()));
    Ok(())
}

#[tokio::test]
async fn test_nursing_homes_use_their_own_endpoint() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let source = FixtureSource::default().with_nursing_homes(vec![(
        "WY",
        json!({"recordcount": 1, "ProviderFinderResult": [nursing_home("535001", "WY")]}),
    )]);

    let pipeline = FacilityPipeline::new(
        &source,
        PipelineConfig::defaults(FacilityKind::NursingHome),
        StateList::from_codes(&["WY"])?,
        dir.path(),
    );
    pipeline.run().await?;

    let requested = source.requested();
    assert!(requested[0].starts_with("https://www.medicare.gov/nursinghomeservices/"));
    assert!(requested[0].ends_with("paging=1|99999"));

    let rows = read_csv(&dir.path().join("Medicare_NursingHomes.csv"));
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].len(), 14);
    assert_eq!(&rows[0][8..12], &["Overall_Rtg", "Health_Rtg", "staffing_Rtg", "Care_Rtg"]);
    assert_eq!(rows[1][6], "Government - County");
    assert_eq!(&rows[1][8..12], &["5", "4", "3", "2"]);
    Ok(())
}

#[tokio::test]
async fn test_fetch_failure_stops_and_reports_progress() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let source = FixtureSource::new(vec![(
        "VA",
        json!({"recordcount": 2, "ProviderFinderResult": [
            hospital("1", "VA", "1", json!(37.0), json!(-77.0)),
            hospital("2", "VA", "2", json!(37.1), json!(-77.1))
        ]}),
    )]);

    let pipeline = FacilityPipeline::new(
        &source,
        PipelineConfig::defaults(FacilityKind::Hospital),
        StateList::from_codes(&["VA", "WA", "WV"])?,
        dir.path(),
    );
    let err = pipeline.run().await.unwrap_err();
    match err {
        FacilityError::StateFailed {
            state,
            position,
            states_completed,
            records_so_far,
            source,
            ..
        } => {
            assert_eq!(state, "WA");
            assert_eq!(position, "2/3");
            assert_eq!(states_completed, 1);
            assert_eq!(records_so_far, 2);
            assert!(matches!(*source, FacilityError::Fetch { .. }));
        }
        other => panic!("expected StateFailed, got {other:?}"),
    }

    // Nothing after the failing state is requested and no CSV is written.
    assert_eq!(source.requested().len(), 2);
    assert!(!pipeline.csv_path().exists());
    Ok(())
}

#[tokio::test]
async fn test_malformed_record_names_state_and_index() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let mut broken = hospital("2", "TX", "1", json!(30.0), json!(-97.0));
    broken["Supl"] = json!([]);
    let source = FixtureSource::new(vec![(
        "TX",
        json!({"recordcount": 2, "ProviderFinderResult": [
            hospital("1", "TX", "1", json!(30.0), json!(-97.0)),
            broken
        ]}),
    )]);

    let pipeline = FacilityPipeline::new(
        &source,
        PipelineConfig::defaults(FacilityKind::Hospital),
        StateList::from_codes(&["TX"])?,
        dir.path(),
    );
    let err = pipeline.run().await.unwrap_err();
    let FacilityError::StateFailed { source, .. } = err else {
        panic!("expected StateFailed");
    };
    match *source {
        FacilityError::MalformedRecord { state, index, .. } => {
            assert_eq!(state, "TX");
            assert_eq!(index, 1);
        }
        other => panic!("expected MalformedRecord, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_rerun_replaces_database() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let source = FixtureSource::new(vec![(
        "VA",
        json!({"recordcount": 1, "ProviderFinderResult": [
            hospital("1", "VA", "1", json!(37.0), json!(-77.0))
        ]}),
    )])
    .with_nursing_homes(vec![(
        "VA",
        json!({"recordcount": 2, "ProviderFinderResult": [
            nursing_home("2", "VA"),
            nursing_home("3", "VA")
        ]}),
    )]);

    for _ in 0..2 {
        let config = test_config(dir.path(), &["VA"]);
        let importer = GeoPackageImporter::new(dir.path(), &config.output.database_name);
        let use_case =
            ExportUseCase::new(Box::new(source.clone()), config).with_importer(Box::new(importer));
        let summary = use_case.run(&FacilityKind::ALL).await?;
        let features: Vec<_> = summary.imports.iter().map(|r| r.features).collect();
        assert_eq!(features, vec![1, 2]);
    }

    let importer = GeoPackageImporter::new(dir.path(), "Medicare_Facilities");
    assert_eq!(importer.layers()?, vec!["Hospitals", "NursingHomes"]);

    let conn = rusqlite::Connection::open(importer.path())?;
    let hospitals: i64 = conn.query_row("SELECT COUNT(*) FROM \"Hospitals\"", [], |r| r.get(0))?;
    let homes: i64 = conn.query_row("SELECT COUNT(*) FROM \"NursingHomes\"", [], |r| r.get(0))?;
    assert_eq!((hospitals, homes), (1, 2));
    Ok(())
}

#[tokio::test]
async fn test_import_existing_without_importer_is_config_error() {
    let dir = tempdir().unwrap();
    let use_case = ExportUseCase::new(
        Box::new(FixtureSource::default()),
        test_config(dir.path(), &["VA"]),
    );
    assert!(matches!(
        use_case.import_existing(&[FacilityKind::Hospital]),
        Err(FacilityError::Config(_))
    ));
}

#[tokio::test]
async fn test_blocked_output_dir_names_write_stage() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let blocked = dir.path().join("not_a_dir");
    std::fs::write(&blocked, "occupied")?;
    let source = FixtureSource::new(vec![(
        "VA",
        json!({"recordcount": 1, "ProviderFinderResult": [
            hospital("1", "VA", "1", json!(37.0), json!(-77.0))
        ]}),
    )]);

    let pipeline = FacilityPipeline::new(
        &source,
        PipelineConfig::defaults(FacilityKind::Hospital),
        StateList::from_codes(&["VA"])?,
        &blocked,
    );
    let err = pipeline.run().await.unwrap_err();
    let message = err.to_string();
    match err {
        FacilityError::CsvWrite { kind, path, source } => {
            assert_eq!(kind, "hospitals");
            assert_eq!(path, blocked.join("Medicare_Hospitals.csv"));
            assert!(matches!(*source, FacilityError::Io(_)));
        }
        other => panic!("expected CsvWrite, got {other:?}"),
    }
    assert!(message.contains("hospitals CSV write"));
    assert!(message.contains("Medicare_Hospitals.csv"));
    Ok(())
}

/// Collects formatted log output for assertions.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

#[tokio::test]
async fn test_progress_lines_and_total_are_logged() -> anyhow::Result<()> {
    let logs = LogBuffer::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let dir = tempdir()?;
    let source = FixtureSource::new(vec![
        (
            "VT",
            json!({"recordcount": 2, "ProviderFinderResult": [
                hospital("1", "VT", "1", json!(44.0), json!(-72.0)),
                hospital("2", "VT", "2", json!(44.1), json!(-72.1))
            ]}),
        ),
        (
            "VA",
            json!({"recordcount": 1, "ProviderFinderResult": [
                hospital("3", "VA", "3", json!(37.0), json!(-77.0))
            ]}),
        ),
    ]);

    let pipeline = FacilityPipeline::new(
        &source,
        PipelineConfig::defaults(FacilityKind::Hospital),
        StateList::from_codes(&["VT", "VA"])?,
        dir.path(),
    );
    pipeline.run().await?;

    let output = logs.contents();
    let vt = output
        .find("Performing analysis: VT - 1/2 - 2")
        .expect("VT progress line");
    let va = output
        .find("Performing analysis: VA - 2/2 - 1")
        .expect("VA progress line");
    assert!(vt < va);
    assert!(output.contains("Total hospitals: 3"));
    Ok(())
}
