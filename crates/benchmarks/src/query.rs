// Copyright 2025 mongobench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Query definitions and their conversion to BSON.
//!
//! Definitions are read from a JSON array:
//!
//! ```json
//! [
//!   { "name": "byId", "description": "lookup", "query": {"_id": 1}, "collection": "users" },
//!   { "name": "agg", "query": [{"$match": {}}], "collection": "orders" }
//! ]
//! ```
//!
//! A `query` that is a non-empty array runs as an aggregation pipeline;
//! anything else runs as a find filter.

use crate::error::{ConversionError, LoadError};
use bson::{Bson, Document};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::Path;

/// A named query to benchmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryDefinition {
    /// Identifier shown in the report.
    pub name: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Filter document or pipeline stages, in Extended JSON.
    pub query: Value,
    /// Collection the query runs against.
    pub collection: String,
}

impl QueryDefinition {
    /// Create a definition with an empty description.
    pub fn new(name: impl Into<String>, collection: impl Into<String>, query: Value) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            query,
            collection: collection.into(),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Execution path this definition takes.
    pub fn shape(&self) -> QueryShape {
        classify(&self.query)
    }
}

/// Execution path for a query body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryShape {
    /// A `find` with a single filter document.
    Filter,
    /// An `aggregate` with an ordered list of stages.
    Pipeline,
}

impl fmt::Display for QueryShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryShape::Filter => f.write_str("filter"),
            QueryShape::Pipeline => f.write_str("pipeline"),
        }
    }
}

/// Classify a query body by its shape.
///
/// Only a non-empty array is a pipeline. Objects, empty arrays and scalars
/// are all treated as filters; scalars then fail conversion.
pub fn classify(query: &Value) -> QueryShape {
    match query {
        Value::Array(stages) if !stages.is_empty() => QueryShape::Pipeline,
        _ => QueryShape::Filter,
    }
}

/// Load all query definitions from a JSON file.
///
/// Either the whole list loads or an error is returned.
pub fn load_definitions(path: impl AsRef<Path>) -> Result<Vec<QueryDefinition>, LoadError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_definitions(&content).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse query definitions from a JSON string.
pub fn parse_definitions(content: &str) -> Result<Vec<QueryDefinition>, serde_json::Error> {
    serde_json::from_str(content)
}

/// Convert a filter body into a BSON document.
///
/// An empty array converts to an empty filter, matching every document.
pub fn to_filter_document(query: &Value) -> Result<Document, ConversionError> {
    match reparse_extended(query)? {
        Bson::Document(doc) => Ok(doc),
        Bson::Array(items) if items.is_empty() => Ok(Document::new()),
        other => Err(ConversionError::NotADocument(bson_kind(&other))),
    }
}

/// Convert a pipeline body into an ordered list of stage documents.
pub fn to_pipeline(query: &Value) -> Result<Vec<Document>, ConversionError> {
    match reparse_extended(query)? {
        Bson::Array(stages) => stages
            .into_iter()
            .enumerate()
            .map(|(index, stage)| match stage {
                Bson::Document(doc) => Ok(doc),
                other => Err(ConversionError::StageNotADocument {
                    index,
                    found: bson_kind(&other),
                }),
            })
            .collect(),
        other => Err(ConversionError::NotADocument(bson_kind(&other))),
    }
}

// Goes through JSON text so extended type markers such as `$oid` and
// `$date` are interpreted by the BSON parser rather than copied as plain
// nested documents.
fn reparse_extended(query: &Value) -> Result<Bson, ConversionError> {
    let text = serde_json::to_string(query).map_err(ConversionError::Serialize)?;
    let value: Value = serde_json::from_str(&text).map_err(ConversionError::Reparse)?;
    Ok(Bson::try_from(value)?)
}

fn bson_kind(value: &Bson) -> &'static str {
    match value {
        Bson::Document(_) => "document",
        Bson::Array(_) => "array",
        Bson::String(_) => "string",
        Bson::Boolean(_) => "boolean",
        Bson::Null => "null",
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_) => "number",
        _ => "scalar",
    }
}
