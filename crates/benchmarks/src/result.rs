//! Benchmark result types.
//!
//! This module provides the [`BenchmarkResult`] produced for each query
//! definition, and the [`TimingStats`] accumulator that builds it.

use crate::query::QueryDefinition;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Divisor used when computing the average iteration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AverageBasis {
    /// Divide by the configured iteration count, including failed
    /// iterations. Failures pull the average down.
    #[default]
    Configured,
    /// Divide by the number of iterations that succeeded.
    Successful,
}

/// Timing results for one query definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    /// Query name.
    pub name: String,
    /// Query description.
    pub description: String,
    /// Collection the query ran against.
    pub collection: String,
    /// Configured iteration count.
    pub iterations: u32,
    /// Iterations that completed and were timed.
    pub successful_iterations: u32,
    /// Sum of all timed iterations.
    #[serde(rename = "total_time_ns", with = "nanos")]
    pub total_time: Duration,
    /// Average per iteration, see [`AverageBasis`].
    #[serde(rename = "average_time_ns", with = "nanos")]
    pub average_time: Duration,
    /// Fastest timed iteration.
    #[serde(rename = "min_time_ns", with = "nanos")]
    pub min_time: Duration,
    /// Slowest timed iteration.
    #[serde(rename = "max_time_ns", with = "nanos")]
    pub max_time: Duration,
    /// When the result was finalized.
    pub timestamp: DateTime<Utc>,
}

impl BenchmarkResult {
    /// Iterations that failed and were skipped.
    pub fn failed_iterations(&self) -> u32 {
        self.iterations.saturating_sub(self.successful_iterations)
    }
}

/// Running min/max/total over timed iterations.
#[derive(Debug, Clone, Default)]
pub struct TimingStats {
    total: Duration,
    min: Option<Duration>,
    max: Duration,
    count: u32,
}

impl TimingStats {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one successful iteration.
    pub fn record(&mut self, elapsed: Duration) {
        self.total += elapsed;
        self.min = Some(self.min.map_or(elapsed, |min| min.min(elapsed)));
        self.max = self.max.max(elapsed);
        self.count += 1;
    }

    /// Number of recorded iterations.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Finalize into a result for `query`.
    ///
    /// With no recorded iterations, or a zero divisor, every duration is
    /// zero.
    pub fn finish(
        self,
        query: &QueryDefinition,
        iterations: u32,
        basis: AverageBasis,
    ) -> BenchmarkResult {
        let divisor = match basis {
            AverageBasis::Configured => iterations,
            AverageBasis::Successful => self.count,
        };
        let average_time = if divisor == 0 {
            Duration::ZERO
        } else {
            self.total / divisor
        };

        BenchmarkResult {
            name: query.name.clone(),
            description: query.description.clone(),
            collection: query.collection.clone(),
            iterations,
            successful_iterations: self.count,
            total_time: self.total,
            average_time,
            min_time: self.min.unwrap_or_default(),
            max_time: self.max,
            timestamp: Utc::now(),
        }
    }
}

mod nanos {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let nanos = u64::try_from(value.as_nanos()).unwrap_or(u64::MAX);
        serializer.serialize_u64(nanos)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_nanos)
    }
}
