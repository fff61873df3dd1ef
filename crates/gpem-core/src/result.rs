use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::classify::{Classification, Entry};
use crate::error::MatchError;
use crate::inventory::Inventory;

/// A media file and the sidecar that carries its metadata
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MatchRecord {
    pub media: String,
    pub sidecar: String,
}

/// A media file with more than one plausible sidecar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmbiguousMatch {
    pub media: String,
    /// Sorted
    pub candidates: Vec<String>,
}

/// The three disjoint outcomes of one matching run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub matched: Vec<MatchRecord>,
    pub missing: Vec<String>,
    pub ambiguous: Vec<AmbiguousMatch>,
}

/// List lengths, in the field names used by saved fixtures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub matched_files_length: usize,
    pub missing_files_length: usize,
    pub ambiguous_files_length: usize,
}

impl ClassificationResult {
    pub fn summary(&self) -> Summary {
        Summary {
            matched_files_length: self.matched.len(),
            missing_files_length: self.missing.len(),
            ambiguous_files_length: self.ambiguous.len(),
        }
    }

    pub fn total(&self) -> usize {
        self.matched.len() + self.missing.len() + self.ambiguous.len()
    }
}

/// Final pass: flatten entries into sorted lists and check that every media
/// file landed in exactly one of them.
pub fn aggregate(entries: Vec<Entry>, inventory: &Inventory) -> Result<ClassificationResult, MatchError> {
    let mut result = ClassificationResult::default();

    for entry in entries {
        let media = entry.media.filename;
        match entry.state {
            Classification::Matched { sidecar, .. } => {
                result.matched.push(MatchRecord { media, sidecar })
            }
            Classification::Missing => result.missing.push(media),
            Classification::Ambiguous(candidates) => result.ambiguous.push(AmbiguousMatch {
                media,
                candidates: candidates.into_iter().collect(),
            }),
        }
    }

    result.matched.sort_by(|a, b| a.media.cmp(&b.media));
    result.ambiguous.sort_by(|a, b| a.media.cmp(&b.media));
    result.missing.sort();

    check_invariants(&result, inventory)?;

    let total = inventory.media.len();
    info!("Matched {}/{} files", result.matched.len(), total);
    if !result.missing.is_empty() {
        warn!("Missing {}/{} files: {:?}", result.missing.len(), total, result.missing);
    }
    if !result.ambiguous.is_empty() {
        warn!("Ambiguous {}/{} files", result.ambiguous.len(), total);
        for a in &result.ambiguous {
            warn!("  {} -> {:?}", a.media, a.candidates);
        }
    }

    Ok(result)
}

/// Conservation of mass, one list per media file, and no invented sidecars.
pub fn check_invariants(result: &ClassificationResult, inventory: &Inventory) -> Result<(), MatchError> {
    let total = inventory.media.len();
    let accounted = result.total();
    if accounted != total {
        return Err(MatchError::ConservationViolated { accounted, total });
    }

    let mut seen: HashSet<&str> = HashSet::with_capacity(total);
    let names = result
        .matched
        .iter()
        .map(|r| r.media.as_str())
        .chain(result.missing.iter().map(String::as_str))
        .chain(result.ambiguous.iter().map(|a| a.media.as_str()));
    for name in names {
        if !seen.insert(name) {
            return Err(MatchError::DuplicateMedia(name.to_string()));
        }
    }

    if let Some(r) = result
        .matched
        .iter()
        .find(|r| !inventory.contains_sidecar(&r.sidecar))
    {
        return Err(MatchError::UnknownSidecar {
            media: r.media.clone(),
            sidecar: r.sidecar.clone(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::partition;

    fn record(media: &str, sidecar: &str) -> MatchRecord {
        MatchRecord {
            media: media.to_string(),
            sidecar: sidecar.to_string(),
        }
    }

    #[test]
    fn test_conservation_violation() {
        let inv = partition(&["a.jpg", "b.jpg", "a.jpg.json"]);
        let result = ClassificationResult {
            matched: vec![record("a.jpg", "a.jpg.json")],
            ..Default::default()
        };
        let err = check_invariants(&result, &inv).unwrap_err();
        assert!(matches!(err, MatchError::ConservationViolated { accounted: 1, total: 2 }));
        assert!(err.is_invariant_violation());
    }

    #[test]
    fn test_duplicate_media() {
        let inv = partition(&["a.jpg", "b.jpg", "a.jpg.json"]);
        let result = ClassificationResult {
            matched: vec![record("a.jpg", "a.jpg.json")],
            missing: vec!["a.jpg".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            check_invariants(&result, &inv),
            Err(MatchError::DuplicateMedia(name)) if name == "a.jpg"
        ));
    }

    #[test]
    fn test_unknown_sidecar() {
        let inv = partition(&["a.jpg"]);
        let result = ClassificationResult {
            matched: vec![record("a.jpg", "a.json")],
            ..Default::default()
        };
        assert!(matches!(
            check_invariants(&result, &inv),
            Err(MatchError::UnknownSidecar { .. })
        ));
    }
}
