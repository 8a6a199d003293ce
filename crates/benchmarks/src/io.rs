//! I/O operations for benchmark results.
//!
//! This module writes benchmark results to the filesystem as JSON and
//! markdown, and reads JSON results back.

use crate::markdown;
use crate::result::BenchmarkResult;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Combined JSON results file name.
pub const RESULTS_FILE: &str = "all_results.json";

/// Markdown summary file name.
pub const SUMMARY_FILE: &str = "summary.md";

/// Write benchmark results to a JSON file.
pub fn write_results_json(results: &[BenchmarkResult], path: impl AsRef<Path>) -> io::Result<()> {
    let json = serde_json::to_string_pretty(results)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    fs::write(path, json)
}

/// Write the markdown summary file.
pub fn write_summary(results: &[BenchmarkResult], path: impl AsRef<Path>) -> io::Result<()> {
    fs::write(path, markdown::generate_summary(results))
}

/// Write JSON results and the markdown summary under `dir`, creating it
/// if needed. Returns the paths written.
pub fn write_all_outputs(
    results: &[BenchmarkResult],
    dir: impl AsRef<Path>,
) -> io::Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let json_path = dir.join(RESULTS_FILE);
    write_results_json(results, &json_path)?;

    let summary_path = dir.join(SUMMARY_FILE);
    write_summary(results, &summary_path)?;

    Ok(vec![json_path, summary_path])
}

/// Read results from a JSON file.
pub fn read_results_json(path: impl AsRef<Path>) -> io::Result<Vec<BenchmarkResult>> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}
