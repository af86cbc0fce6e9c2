use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Instant;

use serde::{Deserialize, Serialize};

use intellisearch_core::config::{RetrievalSettings, SettingsUpdate};
use intellisearch_core::traits::VectorIndex;
use intellisearch_core::{Error, QueryStage, Result, RetrievalOutcome, Strategy};
use intellisearch_web::{WebFallbackOutcome, WebFallbackRetriever};

use crate::capabilities::{Capabilities, CapabilitySet};
use crate::compose::ContextComposer;
use crate::local::{LocalRetrieval, LocalRetriever};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyDistribution {
    pub local_only: u64,
    pub web_fallback: u64,
    pub none: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorStats {
    pub document_count: usize,
    pub has_embedding_model: bool,
    pub has_index: bool,
    pub has_web_search: bool,
    pub has_content_fetcher: bool,
    pub strategy_distribution: StrategyDistribution,
    pub last_strategy: Option<Strategy>,
    pub settings: RetrievalSettings,
}

#[derive(Default)]
struct StrategyCounters {
    local_only: AtomicU64,
    web_fallback: AtomicU64,
    none: AtomicU64,
}

impl StrategyCounters {
    fn record(&self, strategy: Strategy) {
        let counter = match strategy {
            Strategy::LocalOnly => &self.local_only,
            Strategy::WebFallback => &self.web_fallback,
            Strategy::None => &self.none,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> StrategyDistribution {
        StrategyDistribution {
            local_only: self.local_only.load(Ordering::Relaxed),
            web_fallback: self.web_fallback.load(Ordering::Relaxed),
            none: self.none.load(Ordering::Relaxed),
        }
    }
}

/// Decides per query between local results, web fallback, or nothing.
///
/// Each query runs `LOCAL_SEARCH`, then escalates to the web only when no
/// local document passed the threshold (or the local path is unavailable)
/// and web fallback is enabled and configured. Settings are snapshotted at
/// query start, so `configure` never affects a query already in flight.
pub struct RetrievalOrchestrator {
    local: Option<LocalRetriever>,
    index: Option<Arc<dyn VectorIndex>>,
    web: Option<WebFallbackRetriever>,
    composer: ContextComposer,
    capabilities: CapabilitySet,
    settings: RwLock<RetrievalSettings>,
    counters: StrategyCounters,
    last_strategy: Mutex<Option<Strategy>>,
}

impl RetrievalOrchestrator {
    pub fn new(capabilities: &Capabilities, settings: RetrievalSettings) -> Result<Self> {
        settings.validate()?;
        let local = match (&capabilities.embedder, &capabilities.index) {
            (Some(embedder), Some(index)) => Some(LocalRetriever::new(Arc::clone(embedder), Arc::clone(index))),
            _ => None,
        };
        let web = capabilities.web_search.as_ref().map(|provider| {
            WebFallbackRetriever::new(Arc::clone(provider), settings.web_timeout())
                .with_fetcher(capabilities.content_fetcher.clone())
        });
        let summary = capabilities.summary();
        tracing::info!(
            embedding_model = summary.embedding_model,
            vector_index = summary.vector_index,
            web_search = summary.web_search,
            content_fetcher = summary.content_fetcher,
            "orchestrator ready"
        );
        Ok(Self {
            local,
            index: capabilities.index.clone(),
            web,
            composer: ContextComposer::default(),
            capabilities: summary,
            settings: RwLock::new(settings),
            counters: StrategyCounters::default(),
            last_strategy: Mutex::new(None),
        })
    }

    pub fn with_composer(mut self, composer: ContextComposer) -> Self {
        self.composer = composer;
        self
    }

    pub fn composer(&self) -> &ContextComposer {
        &self.composer
    }

    pub fn settings(&self) -> RetrievalSettings {
        self.settings.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Apply a partial update. Every provided field is validated first; on
    /// failure nothing changes.
    pub fn configure(&self, update: &SettingsUpdate) -> Result<RetrievalSettings> {
        let mut current = self.settings.write().unwrap_or_else(PoisonError::into_inner);
        let next = update.apply_to(&current)?;
        *current = next.clone();
        tracing::info!(settings = ?next, "retrieval settings updated");
        Ok(next)
    }

    /// Every outcome carries the elapsed time, failures included. A blank
    /// query is the exception: it returns [`Error::InvalidInput`] with no
    /// timing and leaves the statistics untouched.
    pub async fn query(&self, text: &str) -> Result<RetrievalOutcome> {
        let started = Instant::now();
        let query = text.trim();
        if query.is_empty() {
            return Err(Error::InvalidInput("query is empty".into()));
        }
        let settings = self.settings();

        let local = match &self.local {
            Some(retriever) => {
                match retriever
                    .retrieve(query, settings.max_local_results, settings.similarity_threshold)
                    .await
                {
                    Ok(found) => found,
                    Err(e) if e.is_unavailable() => {
                        tracing::warn!(error = %e, "local search unavailable, skipping");
                        LocalRetrieval::empty()
                    }
                    Err(e) => return Err(e.in_stage(QueryStage::LocalSearch, query, started.elapsed())),
                }
            }
            None => {
                tracing::debug!("no local search capability");
                LocalRetrieval::empty()
            }
        };

        let (strategy, web_results, confidence, context_text) = if local.sufficient {
            let context = self.composer.compose(query, &local.matches, &[]);
            (Strategy::LocalOnly, Vec::new(), local.max_score(), context)
        } else {
            let web = match &self.web {
                Some(web) if settings.enable_web_fallback => {
                    web.retrieve(query, settings.max_web_results, settings.extract_web_content).await
                }
                _ => WebFallbackOutcome::empty(),
            };
            if web.has_results {
                let context = self.composer.compose(query, &local.matches, &web.results);
                (Strategy::WebFallback, web.results, settings.web_confidence, context)
            } else {
                let context = self.composer.compose_no_information(query);
                (Strategy::None, Vec::new(), settings.no_information_confidence, context)
            }
        };

        self.counters.record(strategy);
        *self.last_strategy.lock().unwrap_or_else(PoisonError::into_inner) = Some(strategy);

        let outcome = RetrievalOutcome {
            query: query.to_string(),
            strategy,
            local_matches: local.matches,
            web_results,
            context_text,
            confidence: confidence.clamp(0.0, 1.0),
            elapsed: started.elapsed(),
        };
        tracing::info!(
            strategy = %outcome.strategy,
            local = outcome.local_matches.len(),
            web = outcome.web_results.len(),
            confidence = outcome.confidence,
            ms = outcome.elapsed.as_millis(),
            "query answered"
        );
        Ok(outcome)
    }

    pub async fn get_stats(&self) -> OrchestratorStats {
        let document_count = match &self.index {
            Some(index) => index.len().await.unwrap_or_else(|e| {
                tracing::warn!(error = %e, "could not count indexed documents");
                0
            }),
            None => 0,
        };
        OrchestratorStats {
            document_count,
            has_embedding_model: self.capabilities.embedding_model,
            has_index: self.capabilities.vector_index,
            has_web_search: self.capabilities.web_search,
            has_content_fetcher: self.capabilities.content_fetcher,
            strategy_distribution: self.counters.snapshot(),
            last_strategy: *self.last_strategy.lock().unwrap_or_else(PoisonError::into_inner),
            settings: self.settings(),
        }
    }
}
