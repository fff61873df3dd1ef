use std::collections::BTreeSet;

use regex::Regex;
use tracing::warn;

use crate::media::{MediaFile, SIDECAR_EXTENSION};

/// Sidecar names that could belong to one media file. Ordered, so the
/// lexicographic first candidate is always `iter().next()`.
pub type CandidateSet = BTreeSet<String>;

/// Regex tail matching the sidecar extension in any case
const JSON_TAIL: &str = r"(?i:\.json)$";

/// Trailing artifacts Takeout leaves on truncated basenames
const TRAILING_ARTIFACTS: &[&str] = &["_n-", "_n", "_"];

/// Collect every sidecar plausibly belonging to `media`.
pub fn generate(media: &MediaFile, sidecars: &BTreeSet<String>) -> CandidateSet {
    let mut found = CandidateSet::new();
    let ext = regex::escape(&media.extension);

    match &media.counter {
        // foo(1).jpg -> foo.jpg<anything>(1).json, no fallback
        Some(counter) => {
            let pattern = format!(
                "(?s)^{}{}.*{}{}",
                regex::escape(&media.name_without_counter),
                ext,
                regex::escape(counter),
                JSON_TAIL
            );
            collect(&pattern, sidecars, &mut found, |_| true);
        }
        None => {
            let basename = regex::escape(&media.basename);
            // a parenthesis in the suffix belongs to another counter variant
            let pattern = format!(r"^{basename}{ext}(?:\.[^()]+)?{JSON_TAIL}");
            collect(&pattern, sidecars, &mut found, |_| true);

            // an empty basename (`-edited.jpg`) would make the loose pattern match anything
            if found.is_empty() && !media.basename.is_empty() {
                let loose = format!("(?s)^{basename}.*{JSON_TAIL}");
                collect(&loose, sidecars, &mut found, |name| {
                    !name.contains(['(', ')'])
                });
            }
        }
    }

    if let Some(name) = trailing_artifact_candidate(&media.basename) {
        if sidecars.contains(&name) {
            found.insert(name);
        }
    }

    found
}

fn collect(
    pattern: &str,
    sidecars: &BTreeSet<String>,
    found: &mut CandidateSet,
    accept: impl Fn(&str) -> bool,
) {
    let re = match Regex::new(pattern) {
        Ok(re) => re,
        Err(e) => {
            warn!("Unusable sidecar pattern {:?}: {}", pattern, e);
            return;
        }
    };
    found.extend(
        sidecars
            .iter()
            .filter(|name| re.is_match(name) && accept(name))
            .cloned(),
    );
}

/// `foo_n.jpg` -> `foo_.json`, `foo_.jpg` -> `foo.json`
fn trailing_artifact_candidate(basename: &str) -> Option<String> {
    if !TRAILING_ARTIFACTS.iter().any(|t| basename.ends_with(t)) {
        return None;
    }
    let mut name = basename.to_string();
    name.pop();
    name.push_str(SIDECAR_EXTENSION);
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sidecars(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn candidates_for(media: &str, names: &[&str]) -> Vec<String> {
        let m = MediaFile::parse(media).unwrap();
        generate(&m, &sidecars(names)).into_iter().collect()
    }

    #[test]
    fn test_exact_sidecar() {
        assert_eq!(candidates_for("IMG_0001.jpg", &["IMG_0001.jpg.json"]), vec!["IMG_0001.jpg.json"]);
    }

    #[test]
    fn test_counter_after_extension() {
        let found = candidates_for(
            "IMG_0002(1).jpg",
            &["IMG_0002.jpg(1).json", "IMG_0002.jpg.json", "IMG_0002.jpg(2).json"],
        );
        assert_eq!(found, vec!["IMG_0002.jpg(1).json"]);
    }

    #[test]
    fn test_counter_has_no_fallback() {
        assert!(candidates_for("IMG_0002(1).jpg", &["IMG_0002.jpg.json"]).is_empty());
    }

    #[test]
    fn test_suffix_rejects_other_counter_variant() {
        let found = candidates_for(
            "IMG_0003.jpg",
            &[
                "IMG_0003.jpg.supplemental-metadata.json",
                "IMG_0003.jpg.supplemental-metadata(1).json",
            ],
        );
        assert_eq!(found, vec!["IMG_0003.jpg.supplemental-metadata.json"]);
    }

    #[test]
    fn test_loose_fallback() {
        // truncated suffix without the media extension
        assert_eq!(candidates_for("IMG_0004.jpg", &["IMG_0004.json"]), vec!["IMG_0004.json"]);
        assert!(candidates_for("IMG_0004.jpg", &["IMG_0004(1).json"]).is_empty());
    }

    #[test]
    fn test_empty_basename_has_no_loose_fallback() {
        assert!(candidates_for("-edited.jpg", &["unrelated.png.json", "notes.json"]).is_empty());
        assert_eq!(candidates_for("-edited.jpg", &[".jpg.json"]), vec![".jpg.json"]);
    }

    #[test]
    fn test_edited_shares_original() {
        assert_eq!(
            candidates_for("IMG_0007-edited.jpg", &["IMG_0007.jpg.json"]),
            vec!["IMG_0007.jpg.json"]
        );
    }

    #[test]
    fn test_trailing_artifacts() {
        assert_eq!(trailing_artifact_candidate("photo_n-").as_deref(), Some("photo_n.json"));
        assert_eq!(trailing_artifact_candidate("photo_n").as_deref(), Some("photo_.json"));
        assert_eq!(trailing_artifact_candidate("photo_").as_deref(), Some("photo.json"));
        assert_eq!(trailing_artifact_candidate("photo"), None);

        assert_eq!(candidates_for("12345_n.jpg", &["12345_.json"]), vec!["12345_.json"]);
        // only real sidecars become candidates
        assert!(candidates_for("12345_n.jpg", &[]).is_empty());
    }

    #[test]
    fn test_regex_metacharacters_in_name() {
        assert_eq!(
            candidates_for("a+b [x].jpg", &["a+b [x].jpg.json", "aab [x].jpg.json"]),
            vec!["a+b [x].jpg.json"]
        );
    }
}
