//! Gene identifier to symbol resolution

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::io::DeTable;

/// Annotation database and the identifier type of the count matrix rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationConfig {
    /// Annotation package, e.g. `org.Hs.eg.db`
    pub database: String,
    /// Key type of the gene identifiers, e.g. `ENSEMBL`
    pub keytype: String,
}

/// A bulk identifier-to-symbol lookup service
///
/// Returns every (identifier, symbol) pair found, in service order. An
/// identifier may appear several times or not at all.
pub trait AnnotationBackend: Send + Sync {
    fn lookup(&self, config: &AnnotationConfig, keys: &[String]) -> Result<Vec<(String, String)>>;
}

/// Attaches `gene_annotation` to result tables
#[derive(Clone)]
pub struct GeneAnnotator {
    lookup: Option<(AnnotationConfig, Arc<dyn AnnotationBackend>)>,
}

impl GeneAnnotator {
    /// Annotation equals the gene identifier
    pub fn passthrough() -> Self {
        Self { lookup: None }
    }

    pub fn new(config: AnnotationConfig, backend: Arc<dyn AnnotationBackend>) -> Self {
        Self {
            lookup: Some((config, backend)),
        }
    }

    /// Resolve one symbol per identifier, in input order
    ///
    /// Multi-mapping identifiers take the first symbol reported. Unmatched
    /// identifiers resolve to `None`. A failed lookup is logged and resolves
    /// every identifier to `None`.
    pub fn resolve(&self, gene_ids: &[String]) -> Vec<Option<String>> {
        let (config, backend) = match &self.lookup {
            None => return gene_ids.iter().cloned().map(Some).collect(),
            Some(lookup) => lookup,
        };

        let pairs = match backend.lookup(config, gene_ids) {
            Ok(pairs) => pairs,
            Err(e) => {
                warn!(
                    "Gene annotation via {} ({}) failed, leaving annotation empty: {}",
                    config.database, config.keytype, e
                );
                return vec![None; gene_ids.len()];
            }
        };

        let mut first_match: HashMap<String, String> = HashMap::with_capacity(pairs.len());
        for (key, symbol) in pairs {
            first_match.entry(key).or_insert(symbol);
        }

        let resolved: Vec<Option<String>> = gene_ids
            .iter()
            .map(|id| first_match.get(id).cloned())
            .collect();
        let unmatched = resolved.iter().filter(|s| s.is_none()).count();
        if unmatched > 0 {
            debug!("{} of {} genes have no symbol", unmatched, gene_ids.len());
        }
        resolved
    }

    /// Fill `gene_annotation` of every row
    pub fn annotate(&self, table: &mut DeTable) {
        let ids: Vec<String> = table.records.iter().map(|r| r.gene_id.clone()).collect();
        for (record, symbol) in table.records.iter_mut().zip(self.resolve(&ids)) {
            record.gene_annotation = symbol;
        }
    }
}

impl std::fmt::Debug for GeneAnnotator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.lookup {
            None => f.write_str("GeneAnnotator(passthrough)"),
            Some((config, _)) => write!(f, "GeneAnnotator({:?})", config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DgeError;

    struct FixedMapping;

    impl AnnotationBackend for FixedMapping {
        fn lookup(&self, _config: &AnnotationConfig, _keys: &[String]) -> Result<Vec<(String, String)>> {
            Ok(vec![
                ("ENSG1".to_string(), "TP53".to_string()),
                ("ENSG2".to_string(), "BRCA1".to_string()),
                ("ENSG1".to_string(), "TP53-AS".to_string()),
            ])
        }
    }

    struct Unreachable;

    impl AnnotationBackend for Unreachable {
        fn lookup(&self, config: &AnnotationConfig, _keys: &[String]) -> Result<Vec<(String, String)>> {
            Err(DgeError::AnnotationLookup {
                reason: format!("{} is not installed", config.database),
            })
        }
    }

    fn config() -> AnnotationConfig {
        AnnotationConfig {
            database: "org.Hs.eg.db".to_string(),
            keytype: "ENSEMBL".to_string(),
        }
    }

    fn ids() -> Vec<String> {
        vec!["ENSG1".to_string(), "ENSG2".to_string(), "ENSG3".to_string()]
    }

    #[test]
    fn test_passthrough() {
        let resolved = GeneAnnotator::passthrough().resolve(&ids());
        assert_eq!(
            resolved,
            vec![
                Some("ENSG1".to_string()),
                Some("ENSG2".to_string()),
                Some("ENSG3".to_string())
            ]
        );
    }

    #[test]
    fn test_first_match_and_unmatched() {
        let annotator = GeneAnnotator::new(config(), Arc::new(FixedMapping));
        assert_eq!(
            annotator.resolve(&ids()),
            vec![Some("TP53".to_string()), Some("BRCA1".to_string()), None]
        );
    }

    #[test]
    fn test_lookup_failure_degrades_to_empty() {
        let annotator = GeneAnnotator::new(config(), Arc::new(Unreachable));
        assert_eq!(annotator.resolve(&ids()), vec![None, None, None]);
    }
}
