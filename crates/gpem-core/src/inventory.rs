use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::media::{self, MediaFile};

/// One directory level split by extension
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    /// Media files, sorted by filename
    pub media: Vec<MediaFile>,
    /// Every `.json` filename
    pub sidecars: BTreeSet<String>,
    /// Everything else, sorted
    pub ignored: Vec<String>,
}

impl Inventory {
    pub fn contains_sidecar(&self, name: &str) -> bool {
        self.sidecars.contains(name)
    }
}

/// Partition a flat filename list into media, sidecars and ignored files.
/// Duplicate names are collapsed so the result only depends on the set of names.
pub fn partition<S: AsRef<str>>(filenames: &[S]) -> Inventory {
    let unique: BTreeSet<&str> = filenames.iter().map(|f| f.as_ref()).collect();
    let mut inventory = Inventory::default();

    for filename in unique {
        if media::is_sidecar(filename) {
            inventory.sidecars.insert(filename.to_string());
        } else if let Some(m) = MediaFile::parse(filename) {
            inventory.media.push(m);
        } else {
            inventory.ignored.push(filename.to_string());
        }
    }

    if !inventory.ignored.is_empty() {
        info!(count = inventory.ignored.len(), files = ?inventory.ignored, "Skipping non-media files");
    }
    info!(
        "Found {} media files and {} json files",
        inventory.media.len(),
        inventory.sidecars.len()
    );

    inventory
}

/// List the regular files directly inside `dir` (no recursion), sorted.
/// Symlinks to regular files are listed under the link's name.
/// A missing or unreadable directory is reported and treated as empty.
pub fn list_directory(dir: &Path) -> Vec<String> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Cannot read directory {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Cannot read an entry of {}: {}", dir.display(), e);
                continue;
            }
        };
        // follows symlinks, so a linked photo counts as a file
        match fs::metadata(entry.path()) {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => continue,
            Err(e) => {
                warn!("Cannot stat {}: {}", entry.path().display(), e);
                continue;
            }
        }
        match entry.file_name().into_string() {
            Ok(name) => files.push(name),
            Err(raw) => warn!("Skipping non UTF-8 filename {:?}", raw),
        }
    }
    files.sort();
    files
}
