//! Copy a Takeout folder to an output folder, writing each matched
//! sidecar's dates and location into the copied media file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::exiftool::ExifTool;
use crate::metadata::{self, SidecarMetadata};
use crate::{
    inventory, match_sidecars, validate, CancelledError, MatchOptions, ProcessControl,
    ProgressCallback, ThrottledProgress,
};

fn default_exiftool() -> PathBuf {
    PathBuf::from("exiftool")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeOptions {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Report what would happen without writing anything
    #[serde(default)]
    pub dry_run: bool,
    /// Replace files already present in the output folder
    #[serde(default)]
    pub overwrite: bool,
    #[serde(default = "default_exiftool")]
    pub exiftool: PathBuf,
    #[serde(default)]
    pub matching: MatchOptions,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MergeResult {
    pub total_media: u64,
    pub matched: u64,
    pub missing: u64,
    pub ambiguous: u64,
    /// Media files copied (or that would be, in a dry run)
    pub files_written: u64,
    /// Copies that received sidecar metadata
    pub files_tagged: u64,
    /// Skipped because the output already had them
    pub files_skipped: u64,
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// Run matching on `input_dir` and merge sidecar metadata into copies in `output_dir`.
///
/// Cancellation is honoured between files only.
pub fn merge_metadata(
    options: &MergeOptions,
    control: &ProcessControl,
    progress_callback: &ProgressCallback<'_>,
) -> anyhow::Result<MergeResult> {
    let tp = ThrottledProgress::new(progress_callback);

    if options.input_dir == options.output_dir {
        bail!("Input and output directories must be different");
    }
    control.check()?;

    let files = inventory::list_directory(&options.input_dir);
    let matching = match_sidecars(&files, &options.matching)?;
    validate::validate_matches(&options.input_dir, &matching)?;

    let summary = matching.summary();
    let mut result = MergeResult {
        total_media: matching.total() as u64,
        matched: summary.matched_files_length as u64,
        missing: summary.missing_files_length as u64,
        ambiguous: summary.ambiguous_files_length as u64,
        ..MergeResult::default()
    };
    for name in &matching.missing {
        result.warnings.push(format!("{}: no sidecar found", name));
    }
    for a in &matching.ambiguous {
        result
            .warnings
            .push(format!("{}: {} possible sidecars", a.media, a.candidates.len()));
    }

    let exiftool = ExifTool::new(&options.exiftool);
    if !options.dry_run {
        let version = exiftool
            .version()
            .context("exiftool is required to write metadata")?;
        info!("Using exiftool {}", version);
        fs::create_dir_all(&options.output_dir)?;
    }

    // matched files carry a sidecar, the rest are copied as they are
    let mut work: Vec<(&str, Option<&str>)> = matching
        .matched
        .iter()
        .map(|r| (r.media.as_str(), Some(r.sidecar.as_str())))
        .chain(matching.missing.iter().map(|m| (m.as_str(), None)))
        .chain(matching.ambiguous.iter().map(|a| (a.media.as_str(), None)))
        .collect();
    work.sort_by(|a, b| a.0.cmp(b.0));

    let total = work.len() as u64;
    for (i, (media, sidecar)) in work.into_iter().enumerate() {
        if control.check().is_err() {
            warn!("Cancelled after {} of {} files", i, total);
            return Err(CancelledError.into());
        }
        tp.report("merge", i as u64, total, media);

        let source = options.input_dir.join(media);
        let dest = options.output_dir.join(media);
        if dest.exists() && !options.overwrite {
            result.files_skipped += 1;
            continue;
        }

        if !options.dry_run {
            fs::copy(&source, &dest)
                .with_context(|| format!("Failed to copy {} to {}", source.display(), dest.display()))?;
        }
        result.files_written += 1;

        let Some(sidecar) = sidecar else {
            continue;
        };
        let meta = match metadata::read_sidecar(&options.input_dir.join(sidecar)) {
            Ok(meta) => meta,
            Err(e) => {
                warn!("{}: {}", sidecar, e);
                result.warnings.push(format!("{}: {}", sidecar, e));
                continue;
            }
        };
        if !meta.title_matches(media) {
            warn!("Filename does not match sidecar title ({} != {})", meta.title, media);
        }

        if !options.dry_run {
            if let Err(e) = apply_metadata(&exiftool, &dest, &meta) {
                warn!("{}: {:#}", media, e);
                result.warnings.push(format!("{}: {:#}", media, e));
                continue;
            }
        }
        result.files_tagged += 1;
    }

    info!(
        "Merged {} of {} files ({} copied, {} skipped)",
        result.files_tagged, result.total_media, result.files_written, result.files_skipped
    );
    Ok(result)
}

/// Write tags, then stamp the file's mtime with the capture time.
fn apply_metadata(exiftool: &ExifTool, dest: &Path, meta: &SidecarMetadata) -> anyhow::Result<()> {
    exiftool.write_tags(dest, &meta.exif_tags())?;
    let ft = filetime::FileTime::from_unix_time(meta.photo_taken_time.timestamp(), 0);
    filetime::set_file_mtime(dest, ft)?;
    Ok(())
}
