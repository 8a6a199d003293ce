//! Query latency benchmarks for MongoDB.
//!
//! This crate runs a list of named queries against a MongoDB database a
//! fixed number of times each, sequentially, and reports min/max/total/
//! average wall-clock latency per query.
//!
//! # Quick Start
//!
//! ```no_run
//! use mongobench_benchmarks::{load_definitions, report, Runner, RunnerConfig};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let queries = load_definitions("queries.json")?;
//! let runner = Runner::open(RunnerConfig::new("mongodb://localhost:27017", "test", 10)).await?;
//! let results = runner.run_benchmarks(&queries).await;
//! runner.close().await?;
//!
//! print!("{}", report::render(&results));
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`query`] - Query definitions, shape classification, BSON conversion
//! - [`store`] - The database capability seam and its MongoDB implementation
//! - [`runner`] - Session lifecycle and the timed benchmark loop
//! - [`result`] - The `BenchmarkResult` struct and timing aggregation
//! - [`report`] - Plain-text console report
//! - [`markdown`] - Markdown report generation
//! - [`io`] - I/O operations for reading/writing results

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod error;
pub mod io;
pub mod markdown;
pub mod query;
pub mod report;
pub mod result;
pub mod runner;
pub mod store;

pub use error::{
    ConnectionError, ConversionError, ExecError, IterationError, LoadError, LoadErrorKind,
};
pub use query::{classify, load_definitions, QueryDefinition, QueryShape};
pub use result::{AverageBasis, BenchmarkResult, TimingStats};
pub use runner::{Runner, RunnerConfig};
pub use store::{DocumentStore, MongoStore, ResultCursor};
