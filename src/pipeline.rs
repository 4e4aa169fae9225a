use crate::enrichment::ClassificationStage;
use crate::filter_engine::{post_cluster_filter, pre_filter_soft_gate};
use crate::llm_adapter::LlmAdapter;
use crate::traits::{CurationBackend, ItemStore};
use crate::types::{FilterEvent, PipelineConfig, Result};
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{error, info};
use uuid::Uuid;

/// The worker's curation loop: per account, run the soft gate over newly
/// ingested items, re-evaluate muted clusters for breakout, and classify
/// pending items through the AI provider.
///
/// Each pass reads its rule snapshot once and treats it as immutable for
/// the duration of the pass; concurrent rule edits become visible on the
/// next pass.
pub struct CurationPipeline<S> {
    store: Arc<S>,
    classifier: ClassificationStage,
    config: PipelineConfig,
}

impl<S> CurationPipeline<S>
where
    S: CurationBackend + ItemStore,
{
    pub fn new(store: Arc<S>, adapter: Arc<dyn LlmAdapter>, config: PipelineConfig) -> Self {
        Self {
            store,
            classifier: ClassificationStage::new(adapter),
            config,
        }
    }

    /// Soft-gates newly ingested items so clustering only sees survivors.
    /// Returns the number of items evaluated.
    pub async fn run_soft_gate_pass(&self, account_id: Uuid) -> Result<usize> {
        let items = self
            .store
            .unfiltered_items(account_id, self.config.soft_gate_batch_size)
            .await?;
        if items.is_empty() {
            return Ok(0);
        }

        let rules = self.store.load_rules(account_id).await?;
        let decisions = pre_filter_soft_gate(rules, &items);
        self.store.apply_decisions(account_id, &decisions).await?;

        Ok(items.len())
    }

    /// Re-evaluates the account's muted clusters, writing audit events and
    /// surfacing breakouts. Returns the events written.
    pub async fn run_post_cluster_pass(&self, account_id: Uuid) -> Result<Vec<FilterEvent>> {
        let cluster_ids = self.store.muted_cluster_ids(account_id).await?;
        post_cluster_filter(
            &*self.store,
            account_id,
            &cluster_ids,
            self.config.max_concurrent_clusters,
        )
        .await
    }

    /// Classifies a batch of pending items. Returns how many were
    /// classified; the remainder stay pending for a later sweep.
    pub async fn run_enrichment_pass(&self, account_id: Uuid) -> Result<usize> {
        let items = self
            .store
            .pending_classification_items(account_id, self.config.classification_batch_size)
            .await?;
        if items.is_empty() {
            return Ok(0);
        }

        let classified = self.classifier.classify_batch(&items).await;
        if !classified.is_empty() {
            self.store
                .store_classifications(account_id, &classified)
                .await?;
        }

        Ok(classified.len())
    }

    async fn run_account(&self, account_id: Uuid) -> Result<()> {
        let gated = self.run_soft_gate_pass(account_id).await?;
        let events = self.run_post_cluster_pass(account_id).await?;
        let classified = self.run_enrichment_pass(account_id).await?;

        info!(
            "Account {}: {} items gated, {} cluster events, {} classified",
            account_id,
            gated,
            events.len(),
            classified
        );
        Ok(())
    }

    /// One sweep over every active account. A failing account is logged
    /// and skipped; it does not stop the sweep.
    pub async fn run_once(&self) -> Result<()> {
        let accounts = self.store.active_account_ids().await?;
        info!("Starting curation sweep over {} accounts", accounts.len());

        for account_id in accounts {
            if let Err(e) = self.run_account(account_id).await {
                error!("Curation failed for account {}: {}", account_id, e);
            }
        }

        Ok(())
    }

    /// Runs sweeps forever at the configured interval.
    pub async fn run(&self) -> Result<()> {
        let mut ticker = interval(Duration::from_secs(self.config.poll_interval_seconds));

        loop {
            ticker.tick().await;
            if let Err(e) = self.run_once().await {
                error!("Curation sweep failed: {}", e);
            }
        }
    }
}
