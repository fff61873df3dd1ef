use tracing::debug;

use crate::candidates::{self, CandidateSet};
use crate::inventory::Inventory;
use crate::media::MediaFile;

/// Which rule produced a match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchSource {
    /// Exactly one candidate
    Candidate,
    /// Sidecar name cut off by the exporter
    Truncation,
    /// Reused from another media file containing this basename
    SharedSidecar,
    /// Same as `SharedSidecar`, with the `(n)` counter removed first
    CounterStripped,
    /// Live photo video, first of several equivalent candidates
    LivePhoto,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Matched { sidecar: String, source: MatchSource },
    Missing,
    Ambiguous(CandidateSet),
}

impl Classification {
    /// 0 candidates -> Missing, 1 -> Matched, more -> Ambiguous
    pub fn from_candidates(candidates: CandidateSet) -> Self {
        if candidates.len() > 1 {
            return Classification::Ambiguous(candidates);
        }
        match candidates.into_iter().next() {
            Some(sidecar) => Classification::Matched {
                sidecar,
                source: MatchSource::Candidate,
            },
            None => Classification::Missing,
        }
    }
}

/// A media file and where it currently stands.
#[derive(Debug, Clone)]
pub struct Entry {
    pub media: MediaFile,
    pub state: Classification,
}

impl Entry {
    pub fn matched_sidecar(&self) -> Option<&str> {
        match &self.state {
            Classification::Matched { sidecar, .. } => Some(sidecar),
            _ => None,
        }
    }
}

/// First pass: generate candidates for every media file and classify by count.
pub fn classify_all(inventory: &Inventory) -> Vec<Entry> {
    inventory
        .media
        .iter()
        .map(|media| {
            let candidates = candidates::generate(media, &inventory.sidecars);
            let state = Classification::from_candidates(candidates);
            match &state {
                Classification::Matched { sidecar, .. } => {
                    debug!("Checking '{}'... match found at '{}'", media.filename, sidecar)
                }
                Classification::Missing => {
                    debug!("Checking '{}'... no match found", media.filename)
                }
                Classification::Ambiguous(c) => debug!(
                    "Checking '{}'... {} potential matches found",
                    media.filename,
                    c.len()
                ),
            }
            Entry {
                media: media.clone(),
                state,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::partition;

    #[test]
    fn test_from_candidates() {
        assert_eq!(Classification::from_candidates(CandidateSet::new()), Classification::Missing);

        let one: CandidateSet = ["a.jpg.json".to_string()].into();
        assert_eq!(
            Classification::from_candidates(one),
            Classification::Matched {
                sidecar: "a.jpg.json".to_string(),
                source: MatchSource::Candidate
            }
        );

        let two: CandidateSet = ["a.jpg.json".to_string(), "a.jpg.s.json".to_string()].into();
        assert!(matches!(
            Classification::from_candidates(two),
            Classification::Ambiguous(c) if c.len() == 2
        ));
    }

    #[test]
    fn test_classify_all_keeps_media_order() {
        let inv = partition(&["b.jpg", "a.jpg", "a.jpg.json"]);
        let entries = classify_all(&inv);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].media.filename, "a.jpg");
        assert_eq!(entries[0].matched_sidecar(), Some("a.jpg.json"));
        assert_eq!(entries[1].state, Classification::Missing);
    }
}
