use crate::types::{
    ClassifiedItem, ClusterSnapshot, FilterDecision, FilterEvent, FilterRule, ItemCandidate,
    Result,
};
use async_trait::async_trait;
use std::collections::HashMap;
use uuid::Uuid;

/// Read access to the tenant-scoped filter rule table. Rules are authored
/// via CRUD outside this worker; we only ever read a snapshot.
#[async_trait]
pub trait RuleSource: Send + Sync {
    /// All rules for the account in stable `(created_at, id)` order.
    async fn load_rules(&self, account_id: Uuid) -> Result<Vec<FilterRule>>;
}

/// Read access to item and cluster metadata produced upstream.
#[async_trait]
pub trait ClusterMetadataSource: Send + Sync {
    /// The representative item of a cluster plus feed weight and size.
    /// Returns None when the cluster vanished since the id was collected.
    async fn load_cluster_snapshot(
        &self,
        account_id: Uuid,
        cluster_id: Uuid,
    ) -> Result<Option<ClusterSnapshot>>;
}

/// Append-only sink for filter audit events.
#[async_trait]
pub trait FilterEventSink: Send + Sync {
    async fn record_event(&self, event: &FilterEvent) -> Result<()>;
}

/// Item reads and writes the pipeline passes need around the engines.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Newly ingested items that have not been through the soft gate yet.
    async fn unfiltered_items(&self, account_id: Uuid, limit: usize) -> Result<Vec<ItemCandidate>>;

    /// Persist soft-gate outcomes so clustering only sees surviving items.
    async fn apply_decisions(
        &self,
        account_id: Uuid,
        decisions: &HashMap<Uuid, FilterDecision>,
    ) -> Result<()>;

    /// Clusters currently suppressed by a mute rule, candidates for
    /// breakout re-evaluation.
    async fn muted_cluster_ids(&self, account_id: Uuid) -> Result<Vec<Uuid>>;

    /// Items still awaiting classification.
    async fn pending_classification_items(
        &self,
        account_id: Uuid,
        limit: usize,
    ) -> Result<Vec<ItemCandidate>>;

    /// Persist validated classifications. Items not mentioned stay pending.
    async fn store_classifications(
        &self,
        account_id: Uuid,
        classified: &[ClassifiedItem],
    ) -> Result<()>;

    /// Accounts with curation enabled.
    async fn active_account_ids(&self) -> Result<Vec<Uuid>>;
}

/// Everything the post-cluster filter needs from its backend.
pub trait CurationBackend: RuleSource + ClusterMetadataSource + FilterEventSink {}

impl<T: RuleSource + ClusterMetadataSource + FilterEventSink> CurationBackend for T {}
