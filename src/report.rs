//! CSV reports.
//!
//! Any `Serialize` row type can be written with [`write_report`]. The
//! simulation's own reports are the step-function series (`series`), the
//! transition log (`transitions`) and one summary row per run (`summary`).

use std::ffi::OsStr;
use std::fs::create_dir_all;
use std::path::{Path, PathBuf};

use csv::Writer;
use serde::Serialize;

use crate::context::SimulationOutput;
use crate::error::SirError;
use crate::log::debug;
use crate::parameters::Parameters;
use crate::replicates::ReplicateSummary;

/// Where reports go and what they are called
#[derive(Debug, Clone, PartialEq)]
pub struct ReportOptions {
    pub file_prefix: String,
    pub directory: PathBuf,
    pub overwrite: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        ReportOptions {
            file_prefix: String::new(),
            directory: PathBuf::from("."),
            overwrite: false,
        }
    }
}

impl ReportOptions {
    #[must_use]
    pub fn new() -> Self {
        ReportOptions::default()
    }

    /// Sets the file prefix option (e.g., "`scenario_1`_")
    pub fn file_prefix(&mut self, file_prefix: String) -> &mut ReportOptions {
        self.file_prefix = file_prefix;
        self
    }

    /// Sets the directory where reports will be output
    pub fn directory(&mut self, directory: PathBuf) -> &mut ReportOptions {
        self.directory = directory;
        self
    }

    /// Sets whether to overwrite existing reports of the same name if they exist
    pub fn overwrite(&mut self, overwrite: bool) -> &mut ReportOptions {
        self.overwrite = overwrite;
        self
    }

    /// The file a report called `name` is written to
    #[must_use]
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.directory.join(format!("{}{}.csv", self.file_prefix, name))
    }
}

// Checks that the path is a CSV and may be written. Creates all parent
// directories if they do not exist.
fn validate_filepath(path: &Path, overwrite: bool) -> Result<(), SirError> {
    if path.extension().and_then(OsStr::to_str) != Some("csv") {
        return Err(SirError::ReportError(
            "Report output files must be CSVs at this time".to_string(),
        ));
    }
    if !overwrite && path.exists() {
        return Err(SirError::ReportError(format!(
            "File already exists: {}. Please set `overwrite` to true in the file configuration and rerun.",
            path.display()
        )));
    }
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    Ok(())
}

/// Writes `rows` to `<directory>/<file_prefix><name>.csv`, one row per item,
/// with a header taken from the row type's field names.
///
/// Returns the path written.
///
/// # Errors
///
/// Returns a `SirError::ReportError` if the file exists and `overwrite` is
/// not set, or an I/O or CSV error if writing fails.
pub fn write_report<R: Serialize>(
    options: &ReportOptions,
    name: &str,
    rows: impl IntoIterator<Item = R>,
) -> Result<PathBuf, SirError> {
    let path = options.path_for(name);
    validate_filepath(&path, options.overwrite)?;
    let mut writer = Writer::from_path(&path)?;
    let mut count = 0usize;
    for row in rows {
        writer.serialize(row)?;
        count += 1;
    }
    writer.flush()?;
    debug!("wrote {} rows to {}", count, path.display());
    Ok(path)
}

/// Writes the series and transition reports of one run. `suffix` is
/// appended to each report name, e.g. `_seed7`.
///
/// # Errors
///
/// See [`write_report`].
pub fn write_output(
    options: &ReportOptions,
    output: &SimulationOutput,
    suffix: &str,
) -> Result<(), SirError> {
    write_report(options, &format!("series{suffix}"), &output.series)?;
    write_report(options, &format!("transitions{suffix}"), &output.transitions)?;
    Ok(())
}

/// Writes one summary row per run to the `summary` report.
///
/// # Errors
///
/// See [`write_report`].
pub fn write_summary<'a>(
    options: &ReportOptions,
    parameters: &Parameters,
    runs: impl IntoIterator<Item = (u64, &'a SimulationOutput)>,
) -> Result<(), SirError> {
    let rows = runs
        .into_iter()
        .map(|(seed, output)| ReplicateSummary::new(parameters, seed, output));
    write_report(options, "summary", rows)?;
    Ok(())
}
