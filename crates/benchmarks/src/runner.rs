// Copyright 2025 mongobench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Benchmark session runner.
//!
//! A [`Runner`] owns one database connection for the lifetime of a
//! session. Queries run strictly one at a time and iterations run strictly
//! in order; each iteration is timed from just before the query body is
//! classified until its cursor has been fully drained.

use crate::error::{ConnectionError, IterationError};
use crate::query::{classify, to_filter_document, to_pipeline, QueryDefinition, QueryShape};
use crate::result::{AverageBasis, BenchmarkResult, TimingStats};
use crate::store::{drain, DocumentStore, MongoStore};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Default bound on connect, ping and disconnect.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Session configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerConfig {
    /// MongoDB connection string.
    pub uri: String,
    /// Database the queries run against.
    pub database: String,
    /// Timed iterations per query.
    pub iterations: u32,
    /// Bound on connecting and on the liveness probe.
    pub connect_timeout: Duration,
    /// Bound on disconnecting.
    pub disconnect_timeout: Duration,
    /// Divisor for the reported average.
    pub average_basis: AverageBasis,
}

impl RunnerConfig {
    /// Create a config with default timeouts and the configured-count
    /// average.
    pub fn new(uri: impl Into<String>, database: impl Into<String>, iterations: u32) -> Self {
        Self {
            uri: uri.into(),
            database: database.into(),
            iterations,
            connect_timeout: DEFAULT_TIMEOUT,
            disconnect_timeout: DEFAULT_TIMEOUT,
            average_basis: AverageBasis::default(),
        }
    }

    /// Set the connect and ping timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the disconnect timeout.
    pub fn with_disconnect_timeout(mut self, timeout: Duration) -> Self {
        self.disconnect_timeout = timeout;
        self
    }

    /// Set the average divisor.
    pub fn with_average_basis(mut self, basis: AverageBasis) -> Self {
        self.average_basis = basis;
        self
    }
}

/// Runs query definitions against a connected store.
pub struct Runner<S = MongoStore> {
    store: S,
    config: RunnerConfig,
}

impl Runner<MongoStore> {
    /// Connect to MongoDB and verify the server responds.
    pub async fn open(config: RunnerConfig) -> Result<Self, ConnectionError> {
        let store = within(
            "connect",
            config.connect_timeout,
            MongoStore::connect(&config.uri, &config.database, config.connect_timeout),
        )
        .await?;
        Self::start(store, config).await
    }
}

impl<S: DocumentStore> Runner<S> {
    /// Wrap an already constructed store, pinging it first.
    pub async fn start(store: S, config: RunnerConfig) -> Result<Self, ConnectionError> {
        within("ping", config.connect_timeout, store.ping()).await?;
        info!(
            database = %config.database,
            iterations = config.iterations,
            "connected"
        );
        Ok(Self { store, config })
    }

    /// Session configuration.
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Release the connection. Errors are returned, not retried.
    pub async fn close(self) -> Result<(), ConnectionError> {
        within(
            "disconnect",
            self.config.disconnect_timeout,
            self.store.shutdown(),
        )
        .await?;
        debug!("disconnected");
        Ok(())
    }

    /// Benchmark every definition in order.
    pub async fn run_benchmarks(&self, queries: &[QueryDefinition]) -> Vec<BenchmarkResult> {
        let mut results = Vec::with_capacity(queries.len());
        for query in queries {
            info!(query = %query.name, "running query");
            results.push(self.run_benchmark(query).await);
        }
        results
    }

    /// Benchmark one definition for the configured number of iterations.
    ///
    /// Failed iterations are logged and excluded from the timings; they
    /// never abort the run.
    pub async fn run_benchmark(&self, query: &QueryDefinition) -> BenchmarkResult {
        let mut stats = TimingStats::new();

        for iteration in 1..=self.config.iterations {
            match self.run_iteration(query).await {
                Ok(elapsed) => stats.record(elapsed),
                Err(e) => warn!(
                    query = %query.name,
                    iteration,
                    error = %e,
                    "iteration failed"
                ),
            }
        }

        let result = stats.finish(query, self.config.iterations, self.config.average_basis);
        debug!(
            query = %result.name,
            successful = result.successful_iterations,
            average = ?result.average_time,
            "query finished"
        );
        result
    }

    async fn run_iteration(&self, query: &QueryDefinition) -> Result<Duration, IterationError> {
        let start = Instant::now();

        let mut cursor = match classify(&query.query) {
            QueryShape::Pipeline => {
                let stages = to_pipeline(&query.query)?;
                self.store.aggregate(&query.collection, stages).await?
            }
            QueryShape::Filter => {
                let filter = to_filter_document(&query.query)?;
                self.store.find(&query.collection, filter).await?
            }
        };
        let documents = drain(cursor.as_mut()).await?;
        drop(cursor);

        let elapsed = start.elapsed();
        debug!(query = %query.name, documents, ?elapsed, "iteration complete");
        Ok(elapsed)
    }
}

async fn within<T, F>(
    operation: &'static str,
    timeout: Duration,
    future: F,
) -> Result<T, ConnectionError>
where
    F: Future<Output = Result<T, ConnectionError>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(ConnectionError::Timeout { operation, timeout }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExecError;
    use crate::store::{CountingCursor, MockDocumentStore, ResultCursor};
    use async_trait::async_trait;
    use bson::Document;
    use mockall::predicate::{always, eq};
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    fn config(iterations: u32) -> RunnerConfig {
        RunnerConfig::new("mongodb://localhost:27017", "bench", iterations)
    }

    fn pinging_store() -> MockDocumentStore {
        let mut store = MockDocumentStore::new();
        store.expect_ping().times(1).returning(|| Ok(()));
        store
    }

    /// Store whose queries take scripted amounts of (paused) time.
    struct ScriptedStore {
        script: Mutex<VecDeque<Result<Duration, String>>>,
    }

    impl ScriptedStore {
        fn new(script: Vec<Result<Duration, String>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
            }
        }

        async fn next(&self) -> Result<Box<dyn ResultCursor>, ExecError> {
            let step = self.script.lock().unwrap().pop_front();
            match step {
                Some(Ok(delay)) => {
                    tokio::time::sleep(delay).await;
                    Ok(Box::new(CountingCursor::new(3)))
                }
                Some(Err(message)) => Err(ExecError::Backend(message)),
                None => Err(ExecError::Backend("script exhausted".into())),
            }
        }
    }

    #[async_trait]
    impl DocumentStore for ScriptedStore {
        async fn ping(&self) -> Result<(), ConnectionError> {
            Ok(())
        }

        async fn find(
            &self,
            _collection: &str,
            _filter: Document,
        ) -> Result<Box<dyn ResultCursor>, ExecError> {
            self.next().await
        }

        async fn aggregate(
            &self,
            _collection: &str,
            _pipeline: Vec<Document>,
        ) -> Result<Box<dyn ResultCursor>, ExecError> {
            self.next().await
        }

        async fn shutdown(&self) -> Result<(), ConnectionError> {
            Ok(())
        }
    }

    fn assert_close(actual: Duration, expected: Duration) {
        assert!(
            actual >= expected && actual < expected + Duration::from_millis(1),
            "expected about {expected:?}, got {actual:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_each_iteration() {
        let store = ScriptedStore::new(vec![
            Ok(Duration::from_millis(10)),
            Ok(Duration::from_millis(12)),
            Ok(Duration::from_millis(11)),
        ]);
        let runner = Runner::start(store, config(3)).await.unwrap();
        let query = QueryDefinition::new("byId", "users", json!({"_id": 1}));

        let result = runner.run_benchmark(&query).await;
        assert_eq!(result.iterations, 3);
        assert_eq!(result.successful_iterations, 3);
        assert_close(result.total_time, Duration::from_millis(33));
        assert_close(result.min_time, Duration::from_millis(10));
        assert_close(result.max_time, Duration::from_millis(12));
        assert_close(result.average_time, Duration::from_millis(11));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_iterations_are_skipped() {
        let store = ScriptedStore::new(vec![
            Ok(Duration::from_millis(10)),
            Err("timeout".into()),
            Ok(Duration::from_millis(20)),
            Err("timeout".into()),
            Ok(Duration::from_millis(30)),
        ]);
        let runner = Runner::start(store, config(5)).await.unwrap();
        let query = QueryDefinition::new("agg", "orders", json!([{"$match": {}}]));

        let result = runner.run_benchmark(&query).await;
        assert_eq!(result.successful_iterations, 3);
        assert_close(result.total_time, Duration::from_millis(60));
        assert_close(result.min_time, Duration::from_millis(10));
        assert_close(result.max_time, Duration::from_millis(30));
        // divided by the 5 configured iterations
        assert_close(result.average_time, Duration::from_millis(12));
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_basis_average() {
        let store = ScriptedStore::new(vec![
            Err("boom".into()),
            Ok(Duration::from_millis(8)),
        ]);
        let cfg = config(2).with_average_basis(AverageBasis::Successful);
        let runner = Runner::start(store, cfg).await.unwrap();
        let query = QueryDefinition::new("byId", "users", json!({}));

        let result = runner.run_benchmark(&query).await;
        assert_close(result.average_time, Duration::from_millis(8));
    }

    #[tokio::test]
    async fn test_pipeline_uses_aggregate_path() {
        let mut store = pinging_store();
        store.expect_find().never();
        store
            .expect_aggregate()
            .with(eq("orders"), always())
            .times(2)
            .returning(|_, stages| {
                assert_eq!(stages.len(), 1);
                Ok(Box::new(CountingCursor::new(1)))
            });

        let runner = Runner::start(store, config(2)).await.unwrap();
        let query = QueryDefinition::new("agg", "orders", json!([{"$match": {}}]));

        let result = runner.run_benchmark(&query).await;
        assert_eq!(result.successful_iterations, 2);
    }

    #[tokio::test]
    async fn test_filter_uses_find_path() {
        let mut store = pinging_store();
        store.expect_aggregate().never();
        store
            .expect_find()
            .with(eq("users"), always())
            .times(1)
            .returning(|_, filter| {
                assert_eq!(filter.get_i32("_id").unwrap(), 1);
                Ok(Box::new(CountingCursor::new(1)))
            });

        let runner = Runner::start(store, config(1)).await.unwrap();
        let query = QueryDefinition::new("byId", "users", json!({"_id": 1}));

        assert_eq!(runner.run_benchmark(&query).await.successful_iterations, 1);
    }

    #[tokio::test]
    async fn test_conversion_failure_skips_execution() {
        let mut store = pinging_store();
        store.expect_find().never();
        store.expect_aggregate().never();

        let runner = Runner::start(store, config(3)).await.unwrap();
        let query = QueryDefinition::new("bad", "users", json!({"_id": {"$oid": "zz"}}));

        let result = runner.run_benchmark(&query).await;
        assert_eq!(result.iterations, 3);
        assert_eq!(result.successful_iterations, 0);
        assert_eq!(result.total_time, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_cursor_failure_skips_iteration() {
        let mut store = pinging_store();
        store
            .expect_find()
            .times(1)
            .returning(|_, _| Ok(Box::new(CountingCursor::failing_after(2))));

        let runner = Runner::start(store, config(1)).await.unwrap();
        let query = QueryDefinition::new("byId", "users", json!({}));

        assert_eq!(runner.run_benchmark(&query).await.successful_iterations, 0);
    }

    #[tokio::test]
    async fn test_zero_iterations_never_executes() {
        let mut store = pinging_store();
        store.expect_find().never();

        let runner = Runner::start(store, config(0)).await.unwrap();
        let query = QueryDefinition::new("byId", "users", json!({}));

        let result = runner.run_benchmark(&query).await;
        assert_eq!(result.average_time, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_run_benchmarks_preserves_order_after_failures() {
        let mut store = pinging_store();
        store
            .expect_find()
            .returning(|_, _| Err(ExecError::Backend("unauthorized".into())));
        store
            .expect_aggregate()
            .returning(|_, _| Ok(Box::new(CountingCursor::new(0))));

        let runner = Runner::start(store, config(2)).await.unwrap();
        let queries = vec![
            QueryDefinition::new("first", "users", json!({})),
            QueryDefinition::new("second", "orders", json!([{"$count": "n"}])),
        ];

        let results = runner.run_benchmarks(&queries).await;
        let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["first", "second"]);
        assert_eq!(results[0].successful_iterations, 0);
        assert_eq!(results[1].successful_iterations, 2);
    }

    #[tokio::test]
    async fn test_start_fails_when_ping_fails() {
        let mut store = MockDocumentStore::new();
        store
            .expect_ping()
            .returning(|| Err(ConnectionError::Ping("not primary".into())));

        let err = Runner::start(store, config(1)).await.err().unwrap();
        assert!(matches!(err, ConnectionError::Ping(_)));
    }

    struct HangingStore;

    #[async_trait]
    impl DocumentStore for HangingStore {
        async fn ping(&self) -> Result<(), ConnectionError> {
            std::future::pending().await
        }

        async fn find(
            &self,
            _collection: &str,
            _filter: Document,
        ) -> Result<Box<dyn ResultCursor>, ExecError> {
            std::future::pending().await
        }

        async fn aggregate(
            &self,
            _collection: &str,
            _pipeline: Vec<Document>,
        ) -> Result<Box<dyn ResultCursor>, ExecError> {
            std::future::pending().await
        }

        async fn shutdown(&self) -> Result<(), ConnectionError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_ping_is_bounded_by_connect_timeout() {
        let cfg = config(1).with_connect_timeout(Duration::from_millis(50));
        let err = Runner::start(HangingStore, cfg).await.err().unwrap();
        assert!(matches!(
            err,
            ConnectionError::Timeout { operation: "ping", .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_is_bounded_by_disconnect_timeout() {
        let runner = Runner {
            store: HangingStore,
            config: config(1).with_disconnect_timeout(Duration::from_millis(50)),
        };
        let err = runner.close().await.unwrap_err();
        assert!(matches!(
            err,
            ConnectionError::Timeout { operation: "disconnect", .. }
        ));
    }

    #[tokio::test]
    async fn test_close_calls_shutdown_once() {
        let mut store = pinging_store();
        store.expect_shutdown().times(1).returning(|| Ok(()));

        let runner = Runner::start(store, config(1)).await.unwrap();
        assert_eq!(runner.config().database, "bench");
        runner.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_close_reports_disconnect_error() {
        let mut store = pinging_store();
        store
            .expect_shutdown()
            .times(1)
            .returning(|| Err(ConnectionError::Disconnect("connection reset".into())));

        let runner = Runner::start(store, config(1)).await.unwrap();
        let err = runner.close().await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "failed to disconnect from MongoDB: connection reset"
        );
    }
}
