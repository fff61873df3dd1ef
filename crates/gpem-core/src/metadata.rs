//! Google Takeout sidecar contents and the EXIF tags derived from them.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

/// EXIF date format used by exiftool
const EXIF_DATE_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Timestamps are written as UTC
const UTC_OFFSET: &str = "+00:00";

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Failed to read sidecar {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed sidecar JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Sidecar has no {0} field")]
    MissingField(&'static str),

    #[error("Unusable timestamp {0:?}")]
    BadTimestamp(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct GeoData {
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    #[serde(default)]
    pub altitude: f64,
}

impl GeoData {
    /// Takeout writes all zeros when a photo has no location
    pub fn is_unset(&self) -> bool {
        self.latitude == 0.0 && self.longitude == 0.0
    }
}

/// The fields of a sidecar this tool uses
#[derive(Debug, Clone, PartialEq)]
pub struct SidecarMetadata {
    pub title: String,
    pub description: String,
    /// Upload time
    pub creation_time: DateTime<Utc>,
    /// Capture time
    pub photo_taken_time: DateTime<Utc>,
    pub geo: Option<GeoData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSidecar {
    title: Option<String>,
    #[serde(default)]
    description: String,
    creation_time: Option<RawTime>,
    photo_taken_time: Option<RawTime>,
    geo_data: Option<GeoData>,
}

#[derive(Deserialize)]
struct RawTime {
    timestamp: RawTimestamp,
}

/// Takeout quotes epoch seconds, older exports do not
#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Text(String),
    Number(i64),
}

impl RawTimestamp {
    fn to_utc(&self) -> Result<DateTime<Utc>, MetadataError> {
        let secs = match self {
            RawTimestamp::Text(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| MetadataError::BadTimestamp(s.clone()))?,
            RawTimestamp::Number(n) => *n,
        };
        DateTime::from_timestamp(secs, 0).ok_or_else(|| MetadataError::BadTimestamp(secs.to_string()))
    }
}

/// Parse the bytes of a Takeout sidecar.
pub fn parse_sidecar(bytes: &[u8]) -> Result<SidecarMetadata, MetadataError> {
    let raw: RawSidecar = serde_json::from_slice(bytes)?;

    let photo_taken_time = raw
        .photo_taken_time
        .ok_or(MetadataError::MissingField("photoTakenTime"))?
        .timestamp
        .to_utc()?;
    // some exports drop creationTime; the capture time is the closest stand-in
    let creation_time = match raw.creation_time {
        Some(t) => t.timestamp.to_utc()?,
        None => photo_taken_time,
    };

    Ok(SidecarMetadata {
        title: raw.title.ok_or(MetadataError::MissingField("title"))?,
        description: raw.description,
        creation_time,
        photo_taken_time,
        geo: raw.geo_data.filter(|g| !g.is_unset()),
    })
}

pub fn read_sidecar(path: &Path) -> Result<SidecarMetadata, MetadataError> {
    let bytes = fs::read(path).map_err(|source| MetadataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_sidecar(&bytes)
}

impl SidecarMetadata {
    /// The sidecar title is the media filename as uploaded.
    pub fn title_matches(&self, media_filename: &str) -> bool {
        self.title == media_filename
    }

    /// Tag assignments for exiftool, in write order.
    pub fn exif_tags(&self) -> Vec<(String, String)> {
        let mut tags = vec![
            tag("DateTimeOriginal", self.photo_taken_time.format(EXIF_DATE_FORMAT)),
            tag("CreateDate", self.creation_time.format(EXIF_DATE_FORMAT)),
            tag("OffsetTime", UTC_OFFSET),
            tag("OffsetTimeOriginal", UTC_OFFSET),
            tag("OffsetTimeDigitized", UTC_OFFSET),
        ];

        if let Some(geo) = &self.geo {
            let lat_ref = if geo.latitude < 0.0 { "S" } else { "N" };
            let lon_ref = if geo.longitude < 0.0 { "W" } else { "E" };
            let alt_ref = if geo.altitude < 0.0 { "Below Sea Level" } else { "Above Sea Level" };
            tags.extend([
                tag("GPSLatitude", geo.latitude.abs()),
                tag("GPSLatitudeRef", lat_ref),
                tag("GPSLongitude", geo.longitude.abs()),
                tag("GPSLongitudeRef", lon_ref),
                tag("GPSAltitude", geo.altitude.abs()),
                tag("GPSAltitudeRef", alt_ref),
            ]);
        }

        if !self.description.is_empty() {
            tags.push(tag("ImageDescription", &self.description));
        }

        tags
    }
}

fn tag(name: &str, value: impl std::fmt::Display) -> (String, String) {
    (name.to_string(), value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIDECAR: &str = r#"{
      "title": "IMG_0169.HEIC",
      "description": "",
      "imageViews": "2",
      "creationTime": { "timestamp": "1677943954", "formatted": "Mar 4, 2023, 3:32:34 PM UTC" },
      "photoTakenTime": { "timestamp": "1649699171", "formatted": "Apr 11, 2022, 5:46:11 PM UTC" },
      "geoData": {
        "latitude": 39.127155599999995,
        "longitude": -84.50772219999999,
        "altitude": 265.4019434628975,
        "latitudeSpan": 0.0,
        "longitudeSpan": 0.0
      }
    }"#;

    fn value<'a>(tags: &'a [(String, String)], name: &str) -> Option<&'a str> {
        tags.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_parse_sidecar() {
        let meta = parse_sidecar(SIDECAR.as_bytes()).unwrap();
        assert_eq!(meta.title, "IMG_0169.HEIC");
        assert!(meta.title_matches("IMG_0169.HEIC"));
        assert_eq!(meta.photo_taken_time.timestamp(), 1649699171);
        assert_eq!(meta.creation_time.timestamp(), 1677943954);
        assert!(meta.geo.is_some());
    }

    #[test]
    fn test_exif_tags() {
        let tags = parse_sidecar(SIDECAR.as_bytes()).unwrap().exif_tags();
        assert_eq!(value(&tags, "DateTimeOriginal"), Some("2022:04:11 17:46:11"));
        assert_eq!(value(&tags, "CreateDate"), Some("2023:03:04 15:32:34"));
        assert_eq!(value(&tags, "OffsetTimeOriginal"), Some("+00:00"));
        assert_eq!(value(&tags, "GPSLongitudeRef"), Some("W"));
        assert_eq!(value(&tags, "GPSLatitudeRef"), Some("N"));
        assert_eq!(value(&tags, "ImageDescription"), None);
    }

    #[test]
    fn test_numeric_timestamp_and_no_geo() {
        let json = r#"{"title": "a.jpg", "photoTakenTime": {"timestamp": 0},
                       "geoData": {"latitude": 0.0, "longitude": 0.0, "altitude": 0.0}}"#;
        let meta = parse_sidecar(json.as_bytes()).unwrap();
        assert_eq!(meta.photo_taken_time.timestamp(), 0);
        assert_eq!(meta.creation_time, meta.photo_taken_time);
        assert!(meta.geo.is_none());
        assert!(value(&meta.exif_tags(), "GPSLatitude").is_none());
    }

    #[test]
    fn test_bad_sidecars() {
        assert!(matches!(parse_sidecar(b"not json"), Err(MetadataError::Json(_))));
        assert!(matches!(
            parse_sidecar(br#"{"title": "a.jpg"}"#),
            Err(MetadataError::MissingField("photoTakenTime"))
        ));
        assert!(matches!(
            parse_sidecar(br#"{"title": "a.jpg", "photoTakenTime": {"timestamp": "soon"}}"#),
            Err(MetadataError::BadTimestamp(_))
        ));
    }
}
