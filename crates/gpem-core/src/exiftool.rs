use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ExifToolError {
    #[error("Failed to run {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("exiftool exited with {status} on {}: {stderr}", file.display())]
    Failed {
        file: PathBuf,
        status: String,
        stderr: String,
    },
}

/// Writes EXIF tags by running the `exiftool` executable.
#[derive(Debug, Clone)]
pub struct ExifTool {
    program: PathBuf,
}

impl Default for ExifTool {
    fn default() -> Self {
        Self::new("exiftool")
    }
}

impl ExifTool {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Arguments for one in-place write of `tags` into `file`.
    pub fn write_args(file: &Path, tags: &[(String, String)]) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::with_capacity(tags.len() + 3);
        args.push("-overwrite_original".into());
        args.push("-q".into());
        for (name, value) in tags {
            args.push(format!("-{}={}", name, value).into());
        }
        args.push(file.as_os_str().to_owned());
        args
    }

    /// Version string of the installed exiftool, as a presence check.
    pub fn version(&self) -> Result<String, ExifToolError> {
        let output = self.run(&["-ver".into()])?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    pub fn write_tags(&self, file: &Path, tags: &[(String, String)]) -> Result<(), ExifToolError> {
        let output = self.run(&Self::write_args(file, tags))?;
        if !output.status.success() {
            return Err(ExifToolError::Failed {
                file: file.to_path_buf(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        debug!("Wrote {} tags to {}", tags.len(), file.display());
        Ok(())
    }

    fn run(&self, args: &[OsString]) -> Result<Output, ExifToolError> {
        Command::new(&self.program)
            .args(args)
            .output()
            .map_err(|source| ExifToolError::Spawn {
                program: self.program.clone(),
                source,
            })
    }
}
