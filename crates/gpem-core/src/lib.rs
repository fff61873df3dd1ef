pub mod cancel;
pub mod candidates;
pub mod classify;
pub mod error;
pub mod exiftool;
pub mod fixture;
pub mod inventory;
pub mod media;
pub mod merge;
pub mod metadata;
pub mod recovery;
pub mod resolve;
pub mod result;
pub mod validate;

use std::path::Path;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::info;

pub use cancel::{CancellationToken, CancelledError};
pub use error::MatchError;
pub use fixture::Fixture;
pub use merge::{merge_metadata, MergeOptions, MergeResult};
pub use result::{AmbiguousMatch, ClassificationResult, MatchRecord, Summary};

fn default_truncation_cutoff() -> usize {
    recovery::TRUNCATION_CUTOFF
}

fn default_live_photo_extension() -> String {
    media::LIVE_PHOTO_EXTENSION.to_string()
}

/// Tunables of the sidecar matcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOptions {
    /// Sidecar basenames longer than this were cut by the exporter
    #[serde(default = "default_truncation_cutoff")]
    pub truncation_cutoff: usize,
    /// Extension whose ambiguous sidecars are interchangeable
    #[serde(default = "default_live_photo_extension")]
    pub live_photo_extension: String,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            truncation_cutoff: default_truncation_cutoff(),
            live_photo_extension: default_live_photo_extension(),
        }
    }
}

/// Control options for a merge run.
#[derive(Debug, Clone, Default)]
pub struct ProcessControl {
    /// Cancellation token checked between files.
    pub cancel_token: Option<CancellationToken>,
}

impl ProcessControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = Some(token);
        self
    }

    /// Ok unless cancelled.
    pub fn check(&self) -> Result<(), CancelledError> {
        match &self.cancel_token {
            Some(token) => token.check(),
            None => Ok(()),
        }
    }
}

/// Type alias for progress callback: stage, current, total, message.
/// The callback may borrow from the caller's stack.
pub type ProgressCallback<'a> = dyn Fn(&str, u64, u64, &str) + Send + Sync + 'a;

/// Throttled progress reporter, emits at most every 200ms or on completion.
pub struct ThrottledProgress<'a> {
    inner: &'a ProgressCallback<'a>,
    last_emit: std::sync::Mutex<Instant>,
}

impl<'a> ThrottledProgress<'a> {
    pub fn new(inner: &'a ProgressCallback<'a>) -> Self {
        let start = Instant::now()
            .checked_sub(std::time::Duration::from_secs(1))
            .unwrap_or_else(Instant::now);
        Self {
            inner,
            last_emit: std::sync::Mutex::new(start),
        }
    }

    pub fn report(&self, stage: &str, current: u64, total: u64, message: &str) {
        let is_done = current + 1 >= total;
        if !is_done {
            let Ok(mut last) = self.last_emit.lock() else {
                return;
            };
            if last.elapsed().as_millis() < 200 {
                return;
            }
            *last = Instant::now();
        }
        (self.inner)(stage, current, total, message);
    }
}

/// Pair every media file in a flat filename list with its sidecar.
///
/// Runs candidate classification, missing-file recovery and live photo
/// resolution, then checks that each media file ended up in exactly one
/// list. An `Err` here is a matcher defect, never a property of the input.
pub fn match_sidecars<S: AsRef<str>>(
    filenames: &[S],
    options: &MatchOptions,
) -> Result<ClassificationResult, MatchError> {
    let inventory = inventory::partition(filenames);

    let entries = classify::classify_all(&inventory);
    let entries = recovery::recover_missing(entries, &inventory, options);
    let entries = resolve::resolve_ambiguous(entries, options);

    result::aggregate(entries, &inventory)
}

/// List `dir`, match its files and confirm every matched pair is on disk.
/// With `fixture_dir`, the run is also saved as a regression fixture.
pub fn find_sidecar_files(
    dir: &Path,
    options: &MatchOptions,
    fixture_dir: Option<&Path>,
) -> anyhow::Result<ClassificationResult> {
    let files = inventory::list_directory(dir);
    let result = match_sidecars(&files, options)?;
    validate::validate_matches(dir, &result)?;

    if let Some(fixture_dir) = fixture_dir {
        info!("Saving test case to {}...", fixture_dir.display());
        Fixture::from_run(&files, &result).save(fixture_dir)?;
    }

    Ok(result)
}
