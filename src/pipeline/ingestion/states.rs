use crate::common::constants::STATE_CODES;
use crate::common::error::{FacilityError, Result};
use std::collections::HashSet;

/// Ordered list of state postal codes a pipeline walks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateList {
    codes: Vec<String>,
}

impl StateList {
    /// All 50 states, AL through WY
    pub fn all() -> Self {
        Self {
            codes: STATE_CODES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Builds a list from user input. Codes are upper-cased and must be one of
    /// the 50 states; duplicates and empty lists are rejected.
    pub fn from_codes<S: AsRef<str>>(codes: &[S]) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut out = Vec::with_capacity(codes.len());
        for raw in codes {
            let code = raw.as_ref().trim().to_uppercase();
            if !STATE_CODES.contains(&code.as_str()) {
                return Err(FacilityError::Config(format!(
                    "unknown state code '{}'",
                    raw.as_ref()
                )));
            }
            if !seen.insert(code.clone()) {
                return Err(FacilityError::Config(format!("duplicate state code '{code}'")));
            }
            out.push(code);
        }
        if out.is_empty() {
            return Err(FacilityError::Config("state list is empty".into()));
        }
        Ok(Self { codes: out })
    }

    pub fn codes(&self) -> &[String] {
        &self.codes
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Walks the list, yielding each code with its 1-based position.
    pub fn iter(&self) -> impl Iterator<Item = StatePosition<'_>> {
        let total = self.codes.len();
        self.codes
            .iter()
            .enumerate()
            .map(move |(i, code)| StatePosition {
                code: code.as_str(),
                number: i + 1,
                total,
            })
    }
}

/// A state code plus where it sits in the walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatePosition<'a> {
    pub code: &'a str,
    pub number: usize,
    pub total: usize,
}

impl StatePosition<'_> {
    /// Progress label such as `46/50`
    pub fn progress(&self) -> String {
        format!("{}/{}", self.number, self.total)
    }
}
