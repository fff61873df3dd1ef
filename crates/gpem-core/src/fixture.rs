use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::result::{ClassificationResult, MatchRecord, Summary};
use crate::MatchOptions;

/// Directory listing the scenario was captured from
pub const INPUT_FILENAME: &str = "input.json";
/// Expected matched pairs, sorted by media name
pub const MATCHED_FILENAME: &str = "matched.json";
/// Expected list lengths
pub const SUMMARY_FILENAME: &str = "summary.json";

/// A saved matching scenario: the input listing and what matching produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fixture {
    pub input: Vec<String>,
    pub matched: Vec<MatchRecord>,
    pub summary: Summary,
}

/// Outcome of running a fixture's input through the matcher again.
#[derive(Debug, Clone)]
pub struct ReplayReport {
    pub expected: Summary,
    pub actual: Summary,
    /// True when the matched list is identical, order included
    pub matched_identical: bool,
    /// Expected pairs the replay did not produce
    pub lost: Vec<MatchRecord>,
    /// Pairs the replay produced that were not expected
    pub gained: Vec<MatchRecord>,
}

impl ReplayReport {
    pub fn passed(&self) -> bool {
        self.expected == self.actual && self.matched_identical
    }
}

impl Fixture {
    pub fn from_run(input: &[String], result: &ClassificationResult) -> Self {
        Self {
            input: input.to_vec(),
            matched: result.matched.clone(),
            summary: result.summary(),
        }
    }

    /// Write the three fixture files into `dir`, replacing earlier ones.
    pub fn save(&self, dir: &Path) -> anyhow::Result<()> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create fixture directory {}", dir.display()))?;
        write_json(&dir.join(INPUT_FILENAME), &self.input)?;
        write_json(&dir.join(MATCHED_FILENAME), &self.matched)?;
        write_json(&dir.join(SUMMARY_FILENAME), &self.summary)?;
        Ok(())
    }

    pub fn load(dir: &Path) -> anyhow::Result<Self> {
        Ok(Self {
            input: read_json(&dir.join(INPUT_FILENAME))?,
            matched: read_json(&dir.join(MATCHED_FILENAME))?,
            summary: read_json(&dir.join(SUMMARY_FILENAME))?,
        })
    }

    /// Match the saved input again and compare against the saved output.
    pub fn replay(&self, options: &MatchOptions) -> anyhow::Result<ReplayReport> {
        let result = crate::match_sidecars(&self.input, options)?;

        let expected: BTreeSet<&MatchRecord> = self.matched.iter().collect();
        let actual: BTreeSet<&MatchRecord> = result.matched.iter().collect();

        Ok(ReplayReport {
            expected: self.summary,
            actual: result.summary(),
            matched_identical: result.matched == self.matched,
            lost: expected.difference(&actual).map(|r| (*r).clone()).collect(),
            gained: actual.difference(&expected).map(|r| (*r).clone()).collect(),
        })
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> anyhow::Result<()> {
    // write to a temp file first, then rename
    let temp_path = path.with_extension("json.tmp");
    let file = File::create(&temp_path)
        .with_context(|| format!("Failed to create {}", temp_path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse {}", path.display()))
}
