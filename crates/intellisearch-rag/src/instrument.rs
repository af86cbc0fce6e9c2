use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::Instrument;

use intellisearch_core::config::{RetrievalSettings, SettingsUpdate};
use intellisearch_core::{Result, RetrievalOutcome};

use crate::orchestrator::{OrchestratorStats, RetrievalOrchestrator};

/// Public query surface.
#[async_trait]
pub trait QueryService: Send + Sync {
    async fn query(&self, text: &str) -> Result<RetrievalOutcome>;
    fn configure(&self, update: &SettingsUpdate) -> Result<RetrievalSettings>;
    async fn stats(&self) -> OrchestratorStats;
}

#[async_trait]
impl QueryService for RetrievalOrchestrator {
    async fn query(&self, text: &str) -> Result<RetrievalOutcome> {
        RetrievalOrchestrator::query(self, text).await
    }

    fn configure(&self, update: &SettingsUpdate) -> Result<RetrievalSettings> {
        RetrievalOrchestrator::configure(self, update)
    }

    async fn stats(&self) -> OrchestratorStats {
        self.get_stats().await
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryMetrics {
    pub queries: u64,
    pub failures: u64,
    pub total_latency: Duration,
    pub max_latency: Duration,
}

impl QueryMetrics {
    pub fn mean_latency(&self) -> Duration {
        if self.queries == 0 {
            return Duration::ZERO;
        }
        self.total_latency / u32::try_from(self.queries).unwrap_or(u32::MAX)
    }
}

/// Wraps a [`QueryService`] with a span per query and latency counters.
pub struct Instrumented<S> {
    inner: S,
    queries: AtomicU64,
    failures: AtomicU64,
    total_latency_us: AtomicU64,
    max_latency_us: AtomicU64,
}

impl<S: QueryService> Instrumented<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            queries: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            total_latency_us: AtomicU64::new(0),
            max_latency_us: AtomicU64::new(0),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn metrics(&self) -> QueryMetrics {
        QueryMetrics {
            queries: self.queries.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            total_latency: Duration::from_micros(self.total_latency_us.load(Ordering::Relaxed)),
            max_latency: Duration::from_micros(self.max_latency_us.load(Ordering::Relaxed)),
        }
    }

    fn record(&self, latency: Duration, failed: bool) {
        let us = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        self.queries.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
        self.total_latency_us.fetch_add(us, Ordering::Relaxed);
        self.max_latency_us.fetch_max(us, Ordering::Relaxed);
    }
}

#[async_trait]
impl<S: QueryService> QueryService for Instrumented<S> {
    async fn query(&self, text: &str) -> Result<RetrievalOutcome> {
        let span = tracing::info_span!("query", query = %text);
        async {
            let started = Instant::now();
            let result = self.inner.query(text).await;
            let latency = started.elapsed();
            self.record(latency, result.is_err());
            match &result {
                Ok(outcome) => tracing::info!(
                    strategy = %outcome.strategy,
                    confidence = outcome.confidence,
                    latency_ms = latency.as_millis(),
                    "query ok"
                ),
                Err(e) => tracing::error!(error = %e, latency_ms = latency.as_millis(), "query failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    fn configure(&self, update: &SettingsUpdate) -> Result<RetrievalSettings> {
        let result = self.inner.configure(update);
        if let Err(e) = &result {
            tracing::warn!(error = %e, "configure rejected");
        }
        result
    }

    async fn stats(&self) -> OrchestratorStats {
        self.inner.stats().await
    }
}
