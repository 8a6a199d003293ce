// Copyright 2025 mongobench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error types for the benchmark runner.
//!
//! Connection and load errors are fatal to a session. Conversion and
//! execution errors only ever affect a single iteration; the runner logs
//! them and moves on.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while connecting to, probing, or disconnecting from the
/// database.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The connection string could not be parsed or the client could not
    /// be constructed.
    #[error("failed to connect to MongoDB: {0}")]
    Connect(#[source] mongodb::error::Error),

    /// The liveness probe returned an error.
    #[error("failed to ping MongoDB: {0}")]
    Ping(String),

    /// The disconnect call returned an error.
    #[error("failed to disconnect from MongoDB: {0}")]
    Disconnect(String),

    /// A connect, ping or disconnect step did not finish in time.
    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },
}

/// Broad classification of a [`LoadError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadErrorKind {
    /// The definitions file could not be read.
    IoFailure,
    /// The file content is not a JSON array of query definitions.
    ParseFailure,
}

/// Errors raised while loading query definitions.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Reading the file failed
    #[error("failed to read file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Parsing the file failed
    #[error("failed to parse JSON in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl LoadError {
    /// Returns the kind of failure.
    pub fn kind(&self) -> LoadErrorKind {
        match self {
            LoadError::Io { .. } => LoadErrorKind::IoFailure,
            LoadError::Parse { .. } => LoadErrorKind::ParseFailure,
        }
    }
}

/// Errors raised while turning a query body into its native BSON form.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// The query body could not be written out as JSON text.
    #[error("failed to serialize query: {0}")]
    Serialize(#[source] serde_json::Error),

    /// The serialized text could not be read back.
    #[error("failed to reparse query: {0}")]
    Reparse(#[source] serde_json::Error),

    /// The text is not valid MongoDB Extended JSON.
    #[error("invalid extended JSON: {0}")]
    ExtendedJson(#[from] bson::extjson::de::Error),

    /// A filter was not a document
    #[error("filter must be a document, got {0}")]
    NotADocument(&'static str),

    /// A pipeline stage was not a document
    #[error("pipeline stage {index} must be a document, got {found}")]
    StageNotADocument { index: usize, found: &'static str },
}

/// Errors raised by the database while executing a query or advancing its
/// cursor.
#[derive(Debug, Error)]
pub enum ExecError {
    /// Error reported by the MongoDB driver.
    #[error("driver error: {0}")]
    Driver(#[from] mongodb::error::Error),

    /// Error reported by any other store implementation.
    #[error("{0}")]
    Backend(String),
}

/// The reason a single benchmark iteration was skipped.
#[derive(Debug, Error)]
pub enum IterationError {
    /// Conversion to BSON failed
    #[error("error converting query: {0}")]
    Conversion(#[from] ConversionError),

    /// Execution or draining failed
    #[error("error executing query: {0}")]
    Exec(#[from] ExecError),
}
