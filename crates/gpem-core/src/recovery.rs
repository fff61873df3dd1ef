use tracing::{debug, info};

use crate::classify::{Classification, Entry, MatchSource};
use crate::inventory::Inventory;
use crate::media::{MediaFile, SIDECAR_EXTENSION};
use crate::MatchOptions;

/// Takeout cuts generated sidecar basenames at this many characters.
/// Observed empirically in exported archives.
pub const TRUNCATION_CUTOFF: usize = 46;

/// Second pass: try to find a sidecar for every Missing entry.
///
/// Only matches from the first pass are searched for shared sidecars, so an
/// entry recovered here never feeds another recovery.
pub fn recover_missing(entries: Vec<Entry>, inventory: &Inventory, options: &MatchOptions) -> Vec<Entry> {
    let matched: Vec<(String, String)> = entries
        .iter()
        .filter_map(|e| {
            e.matched_sidecar()
                .map(|sidecar| (e.media.filename.clone(), sidecar.to_string()))
        })
        .collect();

    let missing = entries
        .iter()
        .filter(|e| e.state == Classification::Missing)
        .count();
    if missing == 0 {
        return entries;
    }
    info!("Attempting to fix {} missing metadata files...", missing);

    let mut recovered = 0usize;
    let entries: Vec<Entry> = entries
        .into_iter()
        .map(|entry| {
            if entry.state != Classification::Missing {
                return entry;
            }
            match recover(&entry.media, &matched, inventory, options) {
                Some((sidecar, source)) => {
                    debug!("Recovered '{}' -> '{}' ({:?})", entry.media.filename, sidecar, source);
                    recovered += 1;
                    Entry {
                        media: entry.media,
                        state: Classification::Matched { sidecar, source },
                    }
                }
                None => entry,
            }
        })
        .collect();

    info!("Recovered {} missing metadata files.", recovered);
    entries
}

/// Try truncation, then a shared sidecar, then a shared sidecar without the counter.
pub fn recover(
    media: &MediaFile,
    matched: &[(String, String)],
    inventory: &Inventory,
    options: &MatchOptions,
) -> Option<(String, MatchSource)> {
    if let Some(name) = truncated_sidecar(&media.basename, options.truncation_cutoff) {
        if inventory.contains_sidecar(&name) {
            return Some((name, MatchSource::Truncation));
        }
    }

    if let Some(sidecar) = find_in_matched(matched, &media.basename) {
        return Some((sidecar.to_string(), MatchSource::SharedSidecar));
    }

    if media.counter.is_some() {
        if let Some(sidecar) = find_in_matched(matched, &media.name_without_counter) {
            return Some((sidecar.to_string(), MatchSource::CounterStripped));
        }
    }

    None
}

/// `<first cutoff chars>.json`, only for basenames longer than the cutoff
pub fn truncated_sidecar(basename: &str, cutoff: usize) -> Option<String> {
    if basename.chars().count() <= cutoff {
        return None;
    }
    let head: String = basename.chars().take(cutoff).collect();
    Some(format!("{}{}", head, SIDECAR_EXTENSION))
}

/// Sidecar of the first matched media file whose name contains `needle`
fn find_in_matched<'a>(matched: &'a [(String, String)], needle: &str) -> Option<&'a str> {
    if needle.is_empty() {
        return None;
    }
    matched
        .iter()
        .find(|(media, _)| media.contains(needle))
        .map(|(_, sidecar)| sidecar.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify_all;
    use crate::inventory::partition;

    fn run(files: &[&str]) -> Vec<Entry> {
        let inv = partition(files);
        recover_missing(classify_all(&inv), &inv, &MatchOptions::default())
    }

    fn state_of<'a>(entries: &'a [Entry], filename: &str) -> &'a Classification {
        &entries
            .iter()
            .find(|e| e.media.filename == filename)
            .unwrap()
            .state
    }

    #[test]
    fn test_truncated_sidecar() {
        let long = "A".repeat(50);
        assert_eq!(truncated_sidecar(&long, 46), Some(format!("{}.json", "A".repeat(46))));
        assert_eq!(truncated_sidecar(&"A".repeat(46), 46), None);
        assert_eq!(truncated_sidecar(&"A".repeat(47), 46), Some(format!("{}.json", "A".repeat(46))));
        // counts characters, not bytes
        let wide = "é".repeat(47);
        assert_eq!(truncated_sidecar(&wide, 46), Some(format!("{}.json", "é".repeat(46))));
    }

    #[test]
    fn test_truncation_recovery() {
        let media = format!("{}.jpg", "A".repeat(50));
        let sidecar = format!("{}.json", "A".repeat(46));
        let entries = run(&[media.as_str(), sidecar.as_str()]);
        assert_eq!(
            state_of(&entries, &media),
            &Classification::Matched {
                sidecar,
                source: MatchSource::Truncation
            }
        );
    }

    #[test]
    fn test_truncation_cutoff_is_configurable() {
        let media = format!("{}.jpg", "B".repeat(40));
        let sidecar = format!("{}.json", "B".repeat(30));
        let inv = partition(&[media.as_str(), sidecar.as_str()]);
        let options = MatchOptions {
            truncation_cutoff: 30,
            ..MatchOptions::default()
        };
        let entries = recover_missing(classify_all(&inv), &inv, &options);
        assert!(entries[0].matched_sidecar().is_some());
    }

    #[test]
    fn test_shared_sidecar_for_live_photo_pair() {
        // the counter rule has no fallback, so the video misses in the first pass
        let entries = run(&["IMG_0100(1).HEIC", "IMG_0100.HEIC(1).json", "IMG_0100(1).MOV"]);
        assert_eq!(
            state_of(&entries, "IMG_0100(1).MOV"),
            &Classification::Matched {
                sidecar: "IMG_0100.HEIC(1).json".to_string(),
                source: MatchSource::SharedSidecar
            }
        );
    }

    #[test]
    fn test_counter_stripped_fallback() {
        let entries = run(&["IMG_0200.HEIC", "IMG_0200.HEIC.json", "IMG_0200(1).MP4"]);
        assert_eq!(
            state_of(&entries, "IMG_0200(1).MP4"),
            &Classification::Matched {
                sidecar: "IMG_0200.HEIC.json".to_string(),
                source: MatchSource::CounterStripped
            }
        );
    }

    #[test]
    fn test_unrecoverable_stays_missing() {
        let entries = run(&["IMG_0006.jpg", "other.jpg", "other.jpg.json"]);
        assert_eq!(state_of(&entries, "IMG_0006.jpg"), &Classification::Missing);
    }
}
