use tracing::info;

use crate::candidates::CandidateSet;
use crate::classify::{Classification, Entry, MatchSource};
use crate::media::MediaFile;
use crate::MatchOptions;

/// Third pass: settle ambiguous live photo videos.
///
/// Every other ambiguous entry is left as is. Two differently suffixed
/// sidecars for a still image carry no rule that picks one over the other.
pub fn resolve_ambiguous(entries: Vec<Entry>, options: &MatchOptions) -> Vec<Entry> {
    let ambiguous = entries
        .iter()
        .filter(|e| matches!(e.state, Classification::Ambiguous(_)))
        .count();
    if ambiguous == 0 {
        return entries;
    }
    info!("Attempting to fix {} ambiguous metadata files...", ambiguous);

    let mut recovered = 0usize;
    let entries: Vec<Entry> = entries
        .into_iter()
        .map(|entry| {
            let Classification::Ambiguous(candidates) = &entry.state else {
                return entry;
            };
            match resolve(&entry.media, candidates, options) {
                Some(sidecar) => {
                    recovered += 1;
                    Entry {
                        media: entry.media,
                        state: Classification::Matched {
                            sidecar,
                            source: MatchSource::LivePhoto,
                        },
                    }
                }
                None => entry,
            }
        })
        .collect();

    info!("Recovered {} ambiguous metadata files.", recovered);
    entries
}

/// The sidecars of a live photo video are equivalent copies, so the
/// lexicographically first one is taken.
pub fn resolve(media: &MediaFile, candidates: &CandidateSet, options: &MatchOptions) -> Option<String> {
    if !media.has_extension(&options.live_photo_extension) {
        return None;
    }
    candidates.iter().next().cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify_all;
    use crate::inventory::partition;

    #[test]
    fn test_live_photo_takes_first_candidate() {
        let inv = partition(&[
            "IMG_0005.MP4",
            "IMG_0005.MP4.supplemental-metadata.json",
            "IMG_0005.MP4.json",
        ]);
        let entries = classify_all(&inv);
        assert!(matches!(&entries[0].state, Classification::Ambiguous(c) if c.len() == 2));

        let entries = resolve_ambiguous(entries, &MatchOptions::default());
        assert_eq!(
            entries[0].state,
            Classification::Matched {
                sidecar: "IMG_0005.MP4.json".to_string(),
                source: MatchSource::LivePhoto
            }
        );
    }

    #[test]
    fn test_still_image_stays_ambiguous() {
        let inv = partition(&["IMG_0003.jpg", "IMG_0003.jpg.a.json", "IMG_0003.jpg.b.json"]);
        let entries = resolve_ambiguous(classify_all(&inv), &MatchOptions::default());
        assert!(matches!(entries[0].state, Classification::Ambiguous(_)));
    }
}
