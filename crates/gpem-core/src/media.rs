use regex::Regex;
use std::sync::LazyLock;

/// Media extensions found next to Takeout sidecars (lowercase, with leading dot)
pub const MEDIA_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".heic", ".heif", // stills
    ".mp4", ".m4v", ".mov", ".avi", ".mkv",    // video
    ".wmv", ".flv", ".f4v", ".f4p", ".f4a",
    ".f4b", ".webp", ".gif",
];

/// Extension of the JSON metadata files written by Takeout
pub const SIDECAR_EXTENSION: &str = ".json";

/// Video half of a live photo / motion photo
pub const LIVE_PHOTO_EXTENSION: &str = ".mp4";

/// In-place edited copies share the original's sidecar
const EDITED_SUFFIX: &str = "-edited";

static COUNTER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^(?P<name>.+)(?P<counter>\([0-9]+\))$").unwrap());

/// Split `name.ext` into `("name", ".ext")`. Leading dots never start an
/// extension, so `.jpg` has none.
pub fn split_extension(filename: &str) -> (&str, &str) {
    match filename.rfind('.') {
        Some(pos) if filename[..pos].chars().any(|c| c != '.') => {
            (&filename[..pos], &filename[pos..])
        }
        _ => (filename, ""),
    }
}

fn lowercase_extension(filename: &str) -> String {
    split_extension(filename).1.to_lowercase()
}

pub fn is_media(filename: &str) -> bool {
    let ext = lowercase_extension(filename);
    MEDIA_EXTENSIONS.contains(&ext.as_str())
}

pub fn is_sidecar(filename: &str) -> bool {
    lowercase_extension(filename) == SIDECAR_EXTENSION
}

/// Remove a trailing `-edited` (any case) from a stem
pub fn strip_edited(stem: &str) -> &str {
    let cut = stem.len().saturating_sub(EDITED_SUFFIX.len());
    if stem.len() >= EDITED_SUFFIX.len()
        && stem.is_char_boundary(cut)
        && stem[cut..].eq_ignore_ascii_case(EDITED_SUFFIX)
    {
        &stem[..cut]
    } else {
        stem
    }
}

/// Split a trailing `(n)` counter off a basename: `foo(2)` -> `("foo", "(2)")`
pub fn split_counter(basename: &str) -> Option<(&str, &str)> {
    let caps = COUNTER_RE.captures(basename)?;
    let name = caps.name("name")?.as_str();
    let counter = caps.name("counter")?.as_str();
    Some((name, counter))
}

/// A media filename together with the name parts sidecar matching works on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    /// Filename as listed in the directory
    pub filename: String,
    /// Stem with any `-edited` suffix removed
    pub basename: String,
    /// Extension with its leading dot, original case
    pub extension: String,
    /// Trailing `(n)` of the basename, if any
    pub counter: Option<String>,
    /// Basename minus the counter (equal to `basename` without one)
    pub name_without_counter: String,
}

impl MediaFile {
    /// Returns None when the extension is not a media extension.
    pub fn parse(filename: &str) -> Option<Self> {
        if !is_media(filename) {
            return None;
        }
        let (stem, extension) = split_extension(filename);
        let basename = strip_edited(stem);
        let (name_without_counter, counter) = match split_counter(basename) {
            Some((name, counter)) => (name.to_string(), Some(counter.to_string())),
            None => (basename.to_string(), None),
        };

        Some(Self {
            filename: filename.to_string(),
            basename: basename.to_string(),
            extension: extension.to_string(),
            counter,
            name_without_counter,
        })
    }

    pub fn has_extension(&self, ext: &str) -> bool {
        self.extension.eq_ignore_ascii_case(ext)
    }
}
