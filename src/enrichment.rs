use crate::classifier::parse_classification_response;
use crate::llm_adapter::LlmAdapter;
use crate::types::{ClassificationIntent, ClassifiedItem, ItemCandidate};
use std::sync::Arc;
use tracing::{debug, warn};

/// Enrichment stage that classifies item batches through the AI provider
/// adapter and validates whatever comes back.
///
/// Classification is best-effort: an adapter failure or an unusable
/// completion yields an empty batch and the items stay pending. Nothing
/// here is allowed to fail the pipeline.
pub struct ClassificationStage {
    adapter: Arc<dyn LlmAdapter>,
}

impl ClassificationStage {
    pub fn new(adapter: Arc<dyn LlmAdapter>) -> Self {
        Self { adapter }
    }

    /// Classifies one batch of items. Entries that survive validation are
    /// paired back to their item ids; everything else is simply absent.
    pub async fn classify_batch(&self, items: &[ItemCandidate]) -> Vec<ClassifiedItem> {
        if items.is_empty() {
            return Vec::new();
        }

        let prompt = build_classification_prompt(items);

        let raw = match self.adapter.complete(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(
                    "Classification call failed for batch of {}: {}",
                    items.len(),
                    e
                );
                return Vec::new();
            }
        };

        let entries = parse_classification_response(&raw, items.len());
        debug!(
            "Classified {}/{} items in batch",
            entries.len(),
            items.len()
        );

        entries
            .into_values()
            .map(|entry| ClassifiedItem {
                item_id: items[entry.index].id,
                intent: entry.intent,
                confidence: entry.confidence,
            })
            .collect()
    }
}

/// Builds the numbered classification prompt for a batch. The model is
/// asked for a bare JSON array so the parser has the simplest possible
/// shape to validate; fenced output is tolerated anyway.
fn build_classification_prompt(items: &[ItemCandidate]) -> String {
    let vocabulary = ClassificationIntent::ALL
        .iter()
        .map(|intent| intent.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let mut prompt = format!(
        "Classify each numbered feed item below into exactly one intent \
         from this list: {}.\n\
         Respond with a JSON array only, one object per item: \
         {{\"index\": <item number>, \"intent\": \"<intent>\", \
         \"confidence\": <0.0-1.0>}}.\n\n",
        vocabulary
    );

    for (index, item) in items.iter().enumerate() {
        prompt.push_str(&format!("{}. {}", index, item.title));
        if let Some(summary) = &item.summary {
            prompt.push_str(" — ");
            prompt.push_str(summary);
        }
        prompt.push('\n');
    }

    prompt
}
