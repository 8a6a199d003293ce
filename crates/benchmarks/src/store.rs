// Copyright 2025 mongobench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Document store abstraction.
//!
//! The runner only needs a handful of capabilities from the database: a
//! liveness probe, find and aggregate returning cursors, and shutdown.
//! [`MongoStore`] provides them over the official driver; tests plug in
//! their own implementations.

use crate::error::{ConnectionError, ExecError};
use async_trait::async_trait;
use bson::{doc, Document};
use mongodb::options::ClientOptions;
use mongodb::{Client, Cursor, Database};
use std::time::Duration;
use tracing::debug;

/// Lazily consumed handle over query results.
#[async_trait]
pub trait ResultCursor: Send {
    /// Move to the next document. Returns `false` once exhausted.
    async fn advance(&mut self) -> Result<bool, ExecError>;
}

/// Advance a cursor until exhausted, returning how many documents it
/// produced. Documents are not inspected.
pub async fn drain(cursor: &mut dyn ResultCursor) -> Result<u64, ExecError> {
    let mut count = 0;
    while cursor.advance().await? {
        count += 1;
    }
    Ok(count)
}

/// Database capabilities used by the benchmark runner.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Lightweight round trip to verify the server is reachable.
    async fn ping(&self) -> Result<(), ConnectionError>;

    /// Run a find query against `collection`.
    async fn find(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<Box<dyn ResultCursor>, ExecError>;

    /// Run an aggregation pipeline against `collection`.
    async fn aggregate(
        &self,
        collection: &str,
        pipeline: Vec<Document>,
    ) -> Result<Box<dyn ResultCursor>, ExecError>;

    /// Release the connection.
    async fn shutdown(&self) -> Result<(), ConnectionError>;
}

/// [`DocumentStore`] backed by a MongoDB client.
#[derive(Debug, Clone)]
pub struct MongoStore {
    client: Client,
    database: Database,
}

impl MongoStore {
    /// Build a client for `uri` targeting `database`.
    ///
    /// `timeout` bounds both the TCP connect and server selection, so a
    /// following [`DocumentStore::ping`] fails fast against an unreachable
    /// server.
    pub async fn connect(
        uri: &str,
        database: &str,
        timeout: Duration,
    ) -> Result<Self, ConnectionError> {
        let mut options = ClientOptions::parse(uri)
            .await
            .map_err(ConnectionError::Connect)?;
        options.connect_timeout = Some(timeout);
        options.server_selection_timeout = Some(timeout);
        if options.app_name.is_none() {
            options.app_name = Some("mongobench".to_string());
        }

        let client = Client::with_options(options).map_err(ConnectionError::Connect)?;
        let database = client.database(database);
        debug!(database = database.name(), "MongoDB client created");

        Ok(Self { client, database })
    }

    /// Name of the target database.
    pub fn database_name(&self) -> &str {
        self.database.name()
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn ping(&self) -> Result<(), ConnectionError> {
        self.database
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map(|_| ())
            .map_err(|e| ConnectionError::Ping(e.to_string()))
    }

    async fn find(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<Box<dyn ResultCursor>, ExecError> {
        let cursor = self
            .database
            .collection::<Document>(collection)
            .find(filter, None)
            .await?;
        Ok(Box::new(MongoCursor(cursor)))
    }

    async fn aggregate(
        &self,
        collection: &str,
        pipeline: Vec<Document>,
    ) -> Result<Box<dyn ResultCursor>, ExecError> {
        let cursor = self
            .database
            .collection::<Document>(collection)
            .aggregate(pipeline, None)
            .await?;
        Ok(Box::new(MongoCursor(cursor)))
    }

    async fn shutdown(&self) -> Result<(), ConnectionError> {
        self.client.clone().shutdown().await;
        Ok(())
    }
}

struct MongoCursor(Cursor<Document>);

#[async_trait]
impl ResultCursor for MongoCursor {
    async fn advance(&mut self) -> Result<bool, ExecError> {
        Ok(self.0.advance().await?)
    }
}

/// Cursor over a fixed number of placeholder documents.
#[cfg(test)]
pub(crate) struct CountingCursor {
    remaining: u64,
    fail_at_end: bool,
}

#[cfg(test)]
impl CountingCursor {
    pub(crate) fn new(documents: u64) -> Self {
        Self {
            remaining: documents,
            fail_at_end: false,
        }
    }

    /// Yield `documents` then fail instead of reporting exhaustion.
    pub(crate) fn failing_after(documents: u64) -> Self {
        Self {
            remaining: documents,
            fail_at_end: true,
        }
    }
}

#[cfg(test)]
#[async_trait]
impl ResultCursor for CountingCursor {
    async fn advance(&mut self) -> Result<bool, ExecError> {
        if self.remaining == 0 {
            return if self.fail_at_end {
                Err(ExecError::Backend("cursor killed".into()))
            } else {
                Ok(false)
            };
        }
        self.remaining -= 1;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_drain_counts_all_documents() {
        let mut cursor = CountingCursor::new(5);
        assert_eq!(drain(&mut cursor).await.unwrap(), 5);
        assert!(!cursor.advance().await.unwrap());
    }

    #[tokio::test]
    async fn test_drain_empty_cursor() {
        let mut cursor = CountingCursor::new(0);
        assert_eq!(drain(&mut cursor).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_drain_propagates_cursor_error() {
        let mut cursor = CountingCursor::failing_after(2);
        let err = drain(&mut cursor).await.unwrap_err();
        assert_eq!(err.to_string(), "cursor killed");
    }

    #[tokio::test]
    async fn test_connect_rejects_malformed_uri() {
        let err = MongoStore::connect("not-a-uri", "db", Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectionError::Connect(_)));
    }

    #[tokio::test]
    async fn test_connect_does_not_contact_server() {
        let store = MongoStore::connect("mongodb://127.0.0.1:1", "bench", Duration::from_millis(50))
            .await
            .unwrap();
        assert_eq!(store.database_name(), "bench");
    }
}
