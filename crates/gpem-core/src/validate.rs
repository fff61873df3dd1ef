use std::path::Path;

use crate::error::MatchError;
use crate::result::ClassificationResult;

/// Confirm that both files of every matched pair exist in `dir`.
pub fn validate_matches(dir: &Path, result: &ClassificationResult) -> Result<(), MatchError> {
    for record in &result.matched {
        for name in [&record.media, &record.sidecar] {
            let path = dir.join(name);
            if !path.is_file() {
                return Err(MatchError::NotOnDisk(path));
            }
        }
    }
    Ok(())
}
