//! Plain-text benchmark report.

use crate::result::BenchmarkResult;
use std::fmt::Write;

/// Render results in input order as the console report.
pub fn render(results: &[BenchmarkResult]) -> String {
    let mut output = String::new();

    writeln!(output).unwrap();
    writeln!(output, "MongoDB Benchmark Results").unwrap();
    writeln!(output, "=======================").unwrap();

    for result in results {
        writeln!(output).unwrap();
        writeln!(output, "- Query: {}", result.name).unwrap();
        writeln!(output, "  Description: {}", result.description).unwrap();
        writeln!(output, "  Collection: {}", result.collection).unwrap();
        writeln!(output, "  Iterations: {}", result.iterations).unwrap();
        writeln!(output, "  Total Time: {:?}", result.total_time).unwrap();
        writeln!(output, "  Average Time: {:?}", result.average_time).unwrap();
        writeln!(output, "  Min Time: {:?}", result.min_time).unwrap();
        writeln!(output, "  Max Time: {:?}", result.max_time).unwrap();
    }

    output
}
