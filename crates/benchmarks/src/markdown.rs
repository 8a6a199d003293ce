//! Markdown output generation for benchmark results.
//!
//! This module provides functionality to generate markdown-formatted
//! benchmark reports alongside the plain-text console report.

use crate::result::BenchmarkResult;
use std::fmt::Write;

/// Generate a markdown summary table from benchmark results.
pub fn generate_summary(results: &[BenchmarkResult]) -> String {
    let mut output = String::new();

    writeln!(output, "# MongoDB Benchmark Summary").unwrap();
    writeln!(output).unwrap();
    writeln!(output, "Generated: {}", chrono::Utc::now().to_rfc3339()).unwrap();
    writeln!(output).unwrap();
    writeln!(output, "## Results").unwrap();
    writeln!(output).unwrap();
    writeln!(
        output,
        "| Query | Collection | Iterations | Succeeded | Total | Average | Min | Max |"
    )
    .unwrap();
    writeln!(
        output,
        "|-------|------------|------------|-----------|-------|---------|-----|-----|"
    )
    .unwrap();

    for result in results {
        writeln!(
            output,
            "| {} | {} | {} | {} | {:?} | {:?} | {:?} | {:?} |",
            escape_cell(&result.name),
            escape_cell(&result.collection),
            result.iterations,
            result.successful_iterations,
            result.total_time,
            result.average_time,
            result.min_time,
            result.max_time,
        )
        .unwrap();
    }

    writeln!(output).unwrap();
    writeln!(output, "---").unwrap();
    writeln!(output, "Total queries: {}", results.len()).unwrap();

    let failed: u32 = results.iter().map(BenchmarkResult::failed_iterations).sum();
    if failed > 0 {
        writeln!(output, "Failed iterations: {}", failed).unwrap();
    }

    output
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}
