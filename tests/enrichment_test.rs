use async_trait::async_trait;
use curation_worker::enrichment::ClassificationStage;
use curation_worker::llm_adapter::{LlmAdapter, MockLlmAdapter};
use curation_worker::types::{ClassificationIntent, CurationError, ItemCandidate, Result};
use std::sync::Arc;
use uuid::Uuid;

fn item(id: u128, title: &str) -> ItemCandidate {
    ItemCandidate {
        id: Uuid::from_u128(id),
        feed_id: Uuid::from_u128(10),
        folder_id: None,
        title: title.to_string(),
        summary: None,
        author: None,
        url: format!("https://news.example.com/{}", id),
    }
}

#[tokio::test]
async fn fenced_completion_round_trips_to_classified_items() {
    let completion = "```json\n[\
        {\"index\": 0, \"intent\": \"NEWS\", \"confidence\": 0.92},\
        {\"index\": 1, \"intent\": \"tutorial\", \"confidence\": 0.61}\
    ]\n```";
    let adapter = Arc::new(MockLlmAdapter::new(
        "canned".to_string(),
        completion.to_string(),
    ));
    let stage = ClassificationStage::new(adapter);

    let items = vec![
        item(1, "Storm closes mountain pass"),
        item(2, "Getting started with embedded Rust"),
    ];
    let mut classified = stage.classify_batch(&items).await;
    classified.sort_by_key(|c| c.item_id);

    assert_eq!(classified.len(), 2);
    assert_eq!(classified[0].item_id, Uuid::from_u128(1));
    assert_eq!(classified[0].intent, ClassificationIntent::News);
    assert_eq!(classified[1].item_id, Uuid::from_u128(2));
    assert_eq!(classified[1].intent, ClassificationIntent::Tutorial);
}

#[tokio::test]
async fn invalid_entries_are_dropped_but_siblings_survive() {
    let completion = r#"[
        {"index": 0, "intent": "spam"},
        {"index": 99, "intent": "news"},
        {"index": 1, "intent": "opinion", "confidence": 2.0}
    ]"#;
    let adapter = Arc::new(MockLlmAdapter::new(
        "canned".to_string(),
        completion.to_string(),
    ));
    let stage = ClassificationStage::new(adapter);

    let items = vec![item(1, "First"), item(2, "Second")];
    let classified = stage.classify_batch(&items).await;

    assert_eq!(classified.len(), 1);
    assert_eq!(classified[0].item_id, Uuid::from_u128(2));
    assert_eq!(classified[0].intent, ClassificationIntent::Opinion);
    assert_eq!(classified[0].confidence, 1.0);
}

struct FailingAdapter;

#[async_trait]
impl LlmAdapter for FailingAdapter {
    fn adapter_name(&self) -> String {
        "Failing Adapter".to_string()
    }

    async fn complete(&self, _prompt: &str) -> Result<String> {
        Err(CurationError::General("provider is down".to_string()))
    }
}

#[tokio::test]
async fn adapter_failure_degrades_to_empty_batch() {
    let stage = ClassificationStage::new(Arc::new(FailingAdapter));

    let classified = stage.classify_batch(&[item(1, "Anything")]).await;

    assert!(classified.is_empty());
}

#[tokio::test]
async fn empty_batch_skips_the_adapter_entirely() {
    // FailingAdapter would error if called; an empty batch never calls it.
    let stage = ClassificationStage::new(Arc::new(FailingAdapter));

    let classified = stage.classify_batch(&[]).await;

    assert!(classified.is_empty());
}

#[tokio::test]
async fn unusable_completion_leaves_items_pending() {
    let adapter = Arc::new(MockLlmAdapter::new(
        "freeform".to_string(),
        "Sure! Here are my thoughts on these items...".to_string(),
    ));
    let stage = ClassificationStage::new(adapter);

    let classified = stage.classify_batch(&[item(1, "Anything")]).await;

    assert!(classified.is_empty());
}
