use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by sidecar matching and its validation.
#[derive(Debug, Error)]
pub enum MatchError {
    /// matched + missing + ambiguous != media files
    #[error("conservation of mass violated: {accounted} of {total} media files accounted for")]
    ConservationViolated { accounted: usize, total: usize },

    #[error("{0} appears in more than one result list")]
    DuplicateMedia(String),

    #[error("{media} matched to {sidecar}, which is not in the sidecar inventory")]
    UnknownSidecar { media: String, sidecar: String },

    #[error("{} doesn't exist", .0.display())]
    NotOnDisk(PathBuf),
}

impl MatchError {
    /// True for engine defects, as opposed to problems with the files on disk.
    pub fn is_invariant_violation(&self) -> bool {
        !matches!(self, MatchError::NotOnDisk(_))
    }
}
