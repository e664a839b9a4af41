//! Sample-to-group assignments

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{DgeError, Result};

/// Sample sheet mapping each sample to exactly one experimental group
///
/// Encounter order is kept: group members are always reported in the order
/// they appear in the sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleSheet {
    /// Sample identifiers
    sample_ids: Vec<String>,
    /// Group identifier for each sample
    group_ids: Vec<String>,
}

impl SampleSheet {
    /// Create a new sample sheet from parallel sample and group columns
    pub fn new(sample_ids: Vec<String>, group_ids: Vec<String>) -> Result<Self> {
        if sample_ids.len() != group_ids.len() {
            return Err(DgeError::DimensionMismatch {
                expected: format!("{} group IDs", sample_ids.len()),
                got: format!("{} group IDs", group_ids.len()),
            });
        }

        let mut seen = HashSet::with_capacity(sample_ids.len());
        for id in &sample_ids {
            if !seen.insert(id.as_str()) {
                return Err(DgeError::InvalidSampleSheet {
                    reason: format!("Sample '{}' is listed more than once", id),
                });
            }
        }

        Ok(Self {
            sample_ids,
            group_ids,
        })
    }

    /// Build from (sample, group) pairs
    pub fn from_pairs<I, S, G>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, G)>,
        S: Into<String>,
        G: Into<String>,
    {
        let (sample_ids, group_ids): (Vec<String>, Vec<String>) = pairs
            .into_iter()
            .map(|(s, g)| (s.into(), g.into()))
            .unzip();
        Self::new(sample_ids, group_ids)
    }

    /// Get sample IDs
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Samples belonging to a group, in sheet order
    pub fn samples_in_group(&self, group_id: &str) -> Vec<String> {
        self.sample_ids
            .iter()
            .zip(self.group_ids.iter())
            .filter(|(_, g)| g.as_str() == group_id)
            .map(|(s, _)| s.clone())
            .collect()
    }
}
