use crate::common::error::{FacilityError, Result};
use crate::common::types::{FacilityKind, FacilityRecord, ProviderDocument};
use crate::pipeline::processing::normalize::RecordNormalizer;
use serde::Serialize;
use tracing::{debug, warn};

/// Rows contributed by one state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateSummary {
    pub state: String,
    pub reported: usize,
    pub appended: usize,
}

/// Append-only table of every normalized record for one facility kind,
/// across all states walked so far.
#[derive(Debug, Clone)]
pub struct FacilityTable {
    kind: FacilityKind,
    records: Vec<FacilityRecord>,
    states: Vec<StateSummary>,
}

impl FacilityTable {
    pub fn new(kind: FacilityKind) -> Self {
        Self {
            kind,
            records: Vec::new(),
            states: Vec::new(),
        }
    }

    pub fn kind(&self) -> FacilityKind {
        self.kind
    }

    pub fn header(&self) -> &'static [&'static str] {
        self.kind.header()
    }

    pub fn records(&self) -> &[FacilityRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn states(&self) -> &[StateSummary] {
        &self.states
    }

    /// Header row followed by every record, in append order
    pub fn rows(&self) -> impl Iterator<Item = Vec<&str>> + '_ {
        std::iter::once(self.header().to_vec()).chain(self.records.iter().map(|r| r.to_row()))
    }

    /// Normalizes every provider in `document` and appends them. Nothing is
    /// appended unless the whole state normalizes cleanly.
    pub fn ingest_document(
        &mut self,
        normalizer: &RecordNormalizer,
        state: &str,
        document: &ProviderDocument,
    ) -> Result<usize> {
        let reported = document.record_count;
        let available = document.results.len();
        if available < reported {
            return Err(FacilityError::RecordCountMismatch {
                state: state.to_string(),
                reported,
                actual: available,
            });
        }
        if available > reported {
            warn!(
                state,
                reported, available, "Result array longer than recordcount; extra entries ignored"
            );
        }

        let records = document
            .results
            .iter()
            .take(reported)
            .enumerate()
            .map(|(i, raw)| normalizer.normalize(state, i, raw))
            .collect::<Result<Vec<_>>>()?;

        self.append_state(state, reported, records)
    }

    /// Appends already-normalized records for `state`.
    pub fn append_state(
        &mut self,
        state: &str,
        reported: usize,
        records: Vec<FacilityRecord>,
    ) -> Result<usize> {
        if let Some((index, other)) = records
            .iter()
            .enumerate()
            .find(|(_, r)| r.kind() != self.kind)
        {
            return Err(FacilityError::malformed(
                state,
                index,
                format!("{} record in a {} table", other.kind(), self.kind),
            ));
        }
        let appended = records.len();
        self.records.extend(records);
        self.states.push(StateSummary {
            state: state.to_string(),
            reported,
            appended,
        });
        debug!(state, appended, total = self.records.len(), "Appended state");
        Ok(appended)
    }
}
