mod common;

use std::sync::Arc;

use common::{index_with, space_corpus, BrokenEmbedder, TopicEmbedder};
use intellisearch_core::{EmbeddingError, Error, QueryStage, Strategy, WebSearchHit};
use intellisearch_rag::{
    Capabilities, Instrumented, QueryService, RetrievalOrchestrator, RetrievalSettings, SettingsUpdate,
    StrategyDistribution,
};
use intellisearch_vector::MemoryVectorIndex;
use intellisearch_web::testing::{FailingSearchProvider, StaticFetcher, StaticSearchProvider};

fn quantum_hits() -> Vec<WebSearchHit> {
    vec![
        WebSearchHit::new(
            "Quantum computing - Wikipedia",
            "https://en.wikipedia.org/wiki/Quantum_computing",
            "A quantum computer exploits quantum mechanical phenomena.",
        ),
        WebSearchHit::new(
            "What is quantum computing? | IBM",
            "https://www.ibm.com/topics/quantum-computing",
            "Quantum computing uses qubits.",
        ),
    ]
}

async fn space_capabilities() -> Capabilities {
    let embedder = Arc::new(TopicEmbedder::new());
    let index = index_with(embedder.as_ref(), space_corpus()).await;
    Capabilities::new().with_embedder(embedder).with_index(index)
}

fn orchestrator(capabilities: &Capabilities) -> RetrievalOrchestrator {
    RetrievalOrchestrator::new(capabilities, RetrievalSettings::default()).unwrap()
}

#[tokio::test]
async fn confident_local_match_skips_the_web() {
    let provider = Arc::new(StaticSearchProvider::new(quantum_hits()));
    let caps = space_capabilities().await.with_web_search(provider.clone());
    let orch = orchestrator(&caps);

    let outcome = orch.query("What rovers are exploring Mars?").await.unwrap();
    assert_eq!(outcome.strategy, Strategy::LocalOnly);
    assert_eq!(outcome.local_matches.len(), 1);
    assert_eq!(outcome.local_matches[0].document.id, "mars");
    assert!(outcome.web_results.is_empty());
    assert!((outcome.confidence - outcome.local_matches[0].score).abs() < 1e-6);
    assert!(outcome.confidence > 0.99);
    assert_eq!(provider.calls(), 0);

    assert!(outcome.context_text.contains("Document 1:"));
    assert!(!outcome.context_text.contains("ADDITIONAL INFORMATION FROM WEB SEARCH"));
    let sources = outcome.sources();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].label, "Document 1");
}

#[tokio::test]
async fn unmatched_query_falls_back_to_the_web() {
    let provider = Arc::new(StaticSearchProvider::new(quantum_hits()));
    let caps = space_capabilities().await.with_web_search(provider.clone());
    let orch = orchestrator(&caps);

    let outcome = orch.query("Explain quantum computing").await.unwrap();
    assert_eq!(outcome.strategy, Strategy::WebFallback);
    assert!(outcome.local_matches.is_empty());
    assert_eq!(outcome.web_results.len(), 2);
    assert!((outcome.confidence - 0.7).abs() < f32::EPSILON);
    assert_eq!(provider.calls(), 1);
    assert_eq!(provider.last_limit(), 10);
    assert!(outcome.web_results.iter().all(|r| r.source_engine == "static"));
    assert!(outcome.context_text.contains("Web Result 2:"));
    assert!(outcome.context_text.contains("No matching local documents."));
}

#[tokio::test]
async fn empty_corpus_without_fallback_reports_no_information() {
    let provider = Arc::new(StaticSearchProvider::new(quantum_hits()));
    let embedder = Arc::new(TopicEmbedder::new());
    let caps = Capabilities::new()
        .with_embedder(embedder.clone())
        .with_index(Arc::new(MemoryVectorIndex::new()))
        .with_web_search(provider.clone());
    let settings = RetrievalSettings { enable_web_fallback: false, ..RetrievalSettings::default() };
    let orch = RetrievalOrchestrator::new(&caps, settings).unwrap();

    let outcome = orch.query("Tell me about Mars").await.unwrap();
    assert_eq!(outcome.strategy, Strategy::None);
    assert!((outcome.confidence - 0.3).abs() < f32::EPSILON);
    assert!(outcome.local_matches.is_empty() && outcome.web_results.is_empty());
    assert!(outcome.context_text.contains("No relevant information was found"));
    assert_eq!(provider.calls(), 0);
    assert_eq!(embedder.calls(), 0);
}

#[tokio::test]
async fn duplicate_urls_are_dropped_before_the_cap() {
    let hits = vec![
        WebSearchHit::new("A", "https://a.example/page", "first"),
        WebSearchHit::new("A again", " https://a.example/page ", "dup"),
        WebSearchHit::new("B", "https://b.example", "b"),
        WebSearchHit::new("C", "https://c.example", "c"),
        WebSearchHit::new("D", "https://d.example", "d"),
    ];
    let provider = Arc::new(StaticSearchProvider::new(hits));
    let caps = space_capabilities().await.with_web_search(provider.clone());
    let orch = orchestrator(&caps);
    orch.configure(&SettingsUpdate { max_web_results: Some(4), ..SettingsUpdate::default() }).unwrap();

    let outcome = orch.query("Explain quantum computing").await.unwrap();
    assert_eq!(provider.last_limit(), 8);
    let titles: Vec<_> = outcome.web_results.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, ["A", "B", "C", "D"]);
    assert_eq!(outcome.web_results[0].snippet, "first");
}

#[tokio::test]
async fn web_failure_degrades_to_no_information() {
    let provider = Arc::new(FailingSearchProvider::new());
    let caps = space_capabilities().await.with_web_search(provider.clone());
    let orch = orchestrator(&caps);

    let outcome = orch.query("Explain quantum computing").await.unwrap();
    assert_eq!(outcome.strategy, Strategy::None);
    assert!((outcome.confidence - 0.3).abs() < f32::EPSILON);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn unavailable_embedder_goes_straight_to_the_web() {
    let index = index_with(&TopicEmbedder::new(), space_corpus()).await;
    let caps = Capabilities::new()
        .with_embedder(Arc::new(BrokenEmbedder { unavailable: true }))
        .with_index(index)
        .with_web_search(Arc::new(StaticSearchProvider::new(quantum_hits())));
    let orch = orchestrator(&caps);

    let outcome = orch.query("What rovers are exploring Mars?").await.unwrap();
    assert_eq!(outcome.strategy, Strategy::WebFallback);
    assert!(outcome.local_matches.is_empty());
}

#[tokio::test]
async fn broken_embedder_fails_the_query_with_its_stage() {
    let index = index_with(&TopicEmbedder::new(), space_corpus()).await;
    let caps = Capabilities::new()
        .with_embedder(Arc::new(BrokenEmbedder { unavailable: false }))
        .with_index(index)
        .with_web_search(Arc::new(StaticSearchProvider::new(quantum_hits())));
    let orch = orchestrator(&caps);

    let err = orch.query("What rovers are exploring Mars?").await.unwrap_err();
    match err {
        Error::Pipeline { stage, query, source, .. } => {
            assert_eq!(stage, QueryStage::LocalSearch);
            assert_eq!(query, "What rovers are exploring Mars?");
            assert!(matches!(*source, Error::Embedding(EmbeddingError::Failed(_))));
        }
        other => panic!("expected a pipeline error, got {other}"),
    }
    assert_eq!(orch.get_stats().await.strategy_distribution, StrategyDistribution::default());
}

#[tokio::test]
async fn no_capabilities_still_answers() {
    let orch = orchestrator(&Capabilities::new());
    let outcome = orch.query("Anything at all?").await.unwrap();
    assert_eq!(outcome.strategy, Strategy::None);
    assert!(outcome.context_text.starts_with("USER QUESTION: Anything at all?"));

    let stats = orch.get_stats().await;
    assert_eq!(stats.document_count, 0);
    assert!(!stats.has_embedding_model && !stats.has_index && !stats.has_web_search);
}

#[tokio::test]
async fn empty_query_is_rejected() {
    let orch = orchestrator(&space_capabilities().await);
    let err = orch.query("   ").await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
    assert!(orch.get_stats().await.last_strategy.is_none());
}

#[tokio::test]
async fn configure_is_all_or_nothing() {
    let provider = Arc::new(StaticSearchProvider::new(quantum_hits()));
    let caps = space_capabilities().await.with_web_search(provider.clone());
    let orch = orchestrator(&caps);
    let before = orch.settings();

    let bad = SettingsUpdate {
        max_web_results: Some(2),
        similarity_threshold: Some(1.2),
        ..SettingsUpdate::default()
    };
    assert!(matches!(orch.configure(&bad), Err(Error::InvalidConfig(_))));
    assert_eq!(orch.settings(), before);

    let next = orch
        .configure(&SettingsUpdate { enable_web_fallback: Some(false), ..SettingsUpdate::default() })
        .unwrap();
    assert!(!next.enable_web_fallback);
    assert_eq!(next.max_web_results, before.max_web_results);

    let outcome = orch.query("Explain quantum computing").await.unwrap();
    assert_eq!(outcome.strategy, Strategy::None);
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn raising_the_threshold_pushes_queries_to_the_web() {
    let caps = space_capabilities()
        .await
        .with_web_search(Arc::new(StaticSearchProvider::new(quantum_hits())));
    let orch = orchestrator(&caps);

    // "telescope images of Mars" scores ~0.89 against the JWST entry
    let outcome = orch.query("telescope images of Mars").await.unwrap();
    assert_eq!(outcome.strategy, Strategy::LocalOnly);
    assert_eq!(outcome.local_matches[0].document.id, "jwst");

    orch.configure(&SettingsUpdate { similarity_threshold: Some(0.95), ..SettingsUpdate::default() })
        .unwrap();
    let outcome = orch.query("telescope images of Mars").await.unwrap();
    assert_eq!(outcome.strategy, Strategy::WebFallback);
}

#[tokio::test]
async fn stats_track_strategies() {
    let caps = space_capabilities()
        .await
        .with_web_search(Arc::new(StaticSearchProvider::new(quantum_hits())))
        .with_content_fetcher(Arc::new(StaticFetcher::new()));
    let orch = orchestrator(&caps);

    orch.query("What rovers are exploring Mars?").await.unwrap();
    orch.query("Explain quantum computing").await.unwrap();
    orch.configure(&SettingsUpdate { enable_web_fallback: Some(false), ..SettingsUpdate::default() })
        .unwrap();
    orch.query("Explain quantum computing").await.unwrap();

    let stats = orch.get_stats().await;
    assert_eq!(stats.document_count, 4);
    assert!(stats.has_embedding_model && stats.has_index && stats.has_web_search && stats.has_content_fetcher);
    assert_eq!(stats.strategy_distribution, StrategyDistribution { local_only: 1, web_fallback: 1, none: 1 });
    assert_eq!(stats.last_strategy, Some(Strategy::None));
    assert!(!stats.settings.enable_web_fallback);
}

#[tokio::test]
async fn extracted_page_text_reaches_the_context() {
    let fetcher = Arc::new(
        StaticFetcher::new()
            .page("https://en.wikipedia.org/wiki/Quantum_computing", "Qubits can exist in superposition.")
            .failing("https://www.ibm.com/topics/quantum-computing"),
    );
    let caps = space_capabilities()
        .await
        .with_web_search(Arc::new(StaticSearchProvider::new(quantum_hits())))
        .with_content_fetcher(fetcher.clone());
    let orch = orchestrator(&caps);

    let outcome = orch.query("Explain quantum computing").await.unwrap();
    assert_eq!(outcome.strategy, Strategy::WebFallback);
    assert_eq!(
        outcome.web_results[0].extracted_content.as_deref(),
        Some("Qubits can exist in superposition.")
    );
    assert!(outcome.web_results[1].extracted_content.is_none());
    assert!(outcome.context_text.contains("Content: Qubits can exist in superposition."));
    assert!(outcome.context_text.contains("Content: Quantum computing uses qubits."));
    assert_eq!(fetcher.fetched().len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_queries_are_isolated() {
    let caps = space_capabilities()
        .await
        .with_web_search(Arc::new(StaticSearchProvider::new(quantum_hits())));
    let orch = Arc::new(orchestrator(&caps));

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let orch = Arc::clone(&orch);
            tokio::spawn(async move {
                let query = if i % 2 == 0 { "What rovers are exploring Mars?" } else { "Explain quantum computing" };
                (i, orch.query(query).await.unwrap())
            })
        })
        .collect();

    for task in tasks {
        let (i, outcome) = task.await.unwrap();
        let expected = if i % 2 == 0 { Strategy::LocalOnly } else { Strategy::WebFallback };
        assert_eq!(outcome.strategy, expected, "query {i}");
        if expected == Strategy::LocalOnly {
            assert_eq!(outcome.local_matches[0].document.id, "mars");
        } else {
            assert_eq!(outcome.web_results.len(), 2);
        }
    }
    let stats = orch.get_stats().await;
    assert_eq!(stats.strategy_distribution, StrategyDistribution { local_only: 8, web_fallback: 8, none: 0 });
}

#[tokio::test]
async fn instrumented_service_counts_queries_and_failures() {
    let service = Instrumented::new(orchestrator(&space_capabilities().await));

    let outcome = service.query("What rovers are exploring Mars?").await.unwrap();
    assert_eq!(outcome.strategy, Strategy::LocalOnly);
    assert!(service.query("").await.is_err());
    assert!(service
        .configure(&SettingsUpdate { max_local_results: Some(0), ..SettingsUpdate::default() })
        .is_err());

    let metrics = service.metrics();
    assert_eq!(metrics.queries, 2);
    assert_eq!(metrics.failures, 1);
    assert!(metrics.max_latency >= metrics.mean_latency());
    assert_eq!(service.stats().await.strategy_distribution.local_only, 1);
    assert_eq!(service.inner().settings().max_local_results, 5);
}

#[tokio::test]
async fn outcome_serializes_for_json_output() {
    let orch = orchestrator(&space_capabilities().await);
    let outcome = orch.query("What rovers are exploring Mars?").await.unwrap();

    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["strategy"], "LOCAL_ONLY");
    assert_eq!(json["local_matches"][0]["document"]["id"], "mars");
    assert_eq!(json["local_matches"][0]["rank"], 1);
    assert!(json["web_results"].as_array().unwrap().is_empty());
}
