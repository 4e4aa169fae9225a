use crate::traits::{ClusterMetadataSource, FilterEventSink, ItemStore, RuleSource};
use crate::types::{
    ClassifiedItem, ClusterSnapshot, CurationError, FeedWeight, FilterAction, FilterDecision,
    FilterEvent, FilterRule, ItemCandidate, PatternType, Result, RuleMode, RuleTarget,
};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Pool, Postgres, Row};
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

/// Postgres-backed implementation of the curation seams.
///
/// The schema is owned by the application's migration layer, not this
/// worker; the queries here assume the `filter_rules`, `feed_items`,
/// `clusters`, `feeds`, `filter_events`, and `accounts` tables exist.
pub struct PgCurationStore {
    db: Pool<Postgres>,
}

impl PgCurationStore {
    pub async fn new(database_url: &str) -> Result<Self> {
        let db = PgPool::connect(database_url).await?;
        Ok(Self { db })
    }

    pub fn from_pool(db: Pool<Postgres>) -> Self {
        Self { db }
    }

    pub fn pool(&self) -> &Pool<Postgres> {
        &self.db
    }
}

fn rule_from_row(row: &PgRow) -> Result<FilterRule> {
    let pattern_type: String = row.try_get("pattern_type")?;
    let target: String = row.try_get("target")?;
    let mode: String = row.try_get("mode")?;

    Ok(FilterRule {
        id: row.try_get("id")?,
        account_id: row.try_get("account_id")?,
        pattern: row.try_get("pattern")?,
        pattern_type: PatternType::parse(&pattern_type)
            .ok_or_else(|| CurationError::MalformedRow(format!("pattern_type '{}'", pattern_type)))?,
        target: RuleTarget::parse(&target)
            .ok_or_else(|| CurationError::MalformedRow(format!("target '{}'", target)))?,
        mode: RuleMode::parse(&mode)
            .ok_or_else(|| CurationError::MalformedRow(format!("mode '{}'", mode)))?,
        breakout_enabled: row.try_get("breakout_enabled")?,
        feed_id: row.try_get("feed_id")?,
        folder_id: row.try_get("folder_id")?,
        created_at: row.try_get("created_at")?,
    })
}

fn item_from_row(row: &PgRow) -> Result<ItemCandidate> {
    Ok(ItemCandidate {
        id: row.try_get("id")?,
        feed_id: row.try_get("feed_id")?,
        folder_id: row.try_get("folder_id")?,
        title: row.try_get("title")?,
        summary: row.try_get("summary")?,
        author: row.try_get("author")?,
        url: row.try_get("url")?,
    })
}

#[async_trait]
impl RuleSource for PgCurationStore {
    async fn load_rules(&self, account_id: Uuid) -> Result<Vec<FilterRule>> {
        let rows = sqlx::query(
            r#"
            SELECT id, account_id, pattern, pattern_type, target, mode,
                   breakout_enabled, feed_id, folder_id, created_at
            FROM filter_rules
            WHERE account_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.db)
        .await?;

        let mut rules = Vec::with_capacity(rows.len());
        for row in &rows {
            rules.push(rule_from_row(row)?);
        }

        debug!("Loaded {} filter rules for account {}", rules.len(), account_id);
        Ok(rules)
    }
}

#[async_trait]
impl ClusterMetadataSource for PgCurationStore {
    async fn load_cluster_snapshot(
        &self,
        account_id: Uuid,
        cluster_id: Uuid,
    ) -> Result<Option<ClusterSnapshot>> {
        let row = sqlx::query(
            r#"
            SELECT c.id AS cluster_id, c.size,
                   i.id, i.feed_id, i.folder_id, i.title, i.summary, i.author, i.url,
                   f.weight
            FROM clusters c
            JOIN feed_items i ON i.id = c.representative_item_id
            JOIN feeds f ON f.id = i.feed_id
            WHERE c.account_id = $1 AND c.id = $2
            "#,
        )
        .bind(account_id)
        .bind(cluster_id)
        .fetch_optional(&self.db)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let weight: String = row.try_get("weight")?;
        let size: i32 = row.try_get("size")?;

        Ok(Some(ClusterSnapshot {
            cluster_id: row.try_get("cluster_id")?,
            representative: item_from_row(&row)?,
            feed_weight: FeedWeight::parse(&weight)
                .ok_or_else(|| CurationError::MalformedRow(format!("feed weight '{}'", weight)))?,
            size: size.max(0) as u32,
        }))
    }
}

#[async_trait]
impl FilterEventSink for PgCurationStore {
    async fn record_event(&self, event: &FilterEvent) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO filter_events
                (id, account_id, rule_id, cluster_id, event_type, breakout_reason, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(event.account_id)
        .bind(event.rule_id)
        .bind(event.cluster_id)
        .bind(event.event_type.as_str())
        .bind(&event.breakout_reason)
        .bind(event.created_at)
        .execute(&self.db)
        .await?;

        debug!(
            "Recorded {} event for cluster {} (rule {})",
            event.event_type.as_str(),
            event.cluster_id,
            event.rule_id
        );
        Ok(())
    }
}

#[async_trait]
impl ItemStore for PgCurationStore {
    async fn unfiltered_items(&self, account_id: Uuid, limit: usize) -> Result<Vec<ItemCandidate>> {
        let rows = sqlx::query(
            r#"
            SELECT id, feed_id, folder_id, title, summary, author, url
            FROM feed_items
            WHERE account_id = $1 AND filter_state = 'pending'
            ORDER BY created_at
            LIMIT $2
            "#,
        )
        .bind(account_id)
        .bind(limit as i64)
        .fetch_all(&self.db)
        .await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            items.push(item_from_row(row)?);
        }
        Ok(items)
    }

    async fn apply_decisions(
        &self,
        account_id: Uuid,
        decisions: &HashMap<Uuid, FilterDecision>,
    ) -> Result<()> {
        let mut hidden_count = 0;

        for (item_id, decision) in decisions {
            let state = match decision.action {
                FilterAction::Pass => "pass",
                FilterAction::Hidden => "hidden",
            };
            if decision.action == FilterAction::Hidden {
                hidden_count += 1;
            }

            sqlx::query(
                r#"
                UPDATE feed_items
                SET filter_state = $1, hidden_by_rule = $2
                WHERE id = $3 AND account_id = $4
                "#,
            )
            .bind(state)
            .bind(decision.matched_rule_id)
            .bind(item_id)
            .bind(account_id)
            .execute(&self.db)
            .await?;
        }

        info!(
            "Applied {} soft-gate decisions for account {} ({} hidden)",
            decisions.len(),
            account_id,
            hidden_count
        );
        Ok(())
    }

    async fn muted_cluster_ids(&self, account_id: Uuid) -> Result<Vec<Uuid>> {
        let rows = sqlx::query(
            r#"
            SELECT c.id
            FROM clusters c
            JOIN feed_items i ON i.id = c.representative_item_id
            JOIN filter_rules r ON r.id = i.hidden_by_rule
            WHERE c.account_id = $1 AND r.mode = 'mute'
            ORDER BY c.created_at
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.db)
        .await?;

        let mut ids = Vec::with_capacity(rows.len());
        for row in &rows {
            ids.push(row.try_get("id")?);
        }
        Ok(ids)
    }

    async fn pending_classification_items(
        &self,
        account_id: Uuid,
        limit: usize,
    ) -> Result<Vec<ItemCandidate>> {
        let rows = sqlx::query(
            r#"
            SELECT id, feed_id, folder_id, title, summary, author, url
            FROM feed_items
            WHERE account_id = $1 AND filter_state = 'pass' AND intent IS NULL
            ORDER BY created_at
            LIMIT $2
            "#,
        )
        .bind(account_id)
        .bind(limit as i64)
        .fetch_all(&self.db)
        .await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            items.push(item_from_row(row)?);
        }
        Ok(items)
    }

    async fn store_classifications(
        &self,
        account_id: Uuid,
        classified: &[ClassifiedItem],
    ) -> Result<()> {
        let now = Utc::now();

        for item in classified {
            sqlx::query(
                r#"
                UPDATE feed_items
                SET intent = $1, intent_confidence = $2, classified_at = $3
                WHERE id = $4 AND account_id = $5
                "#,
            )
            .bind(item.intent.as_str())
            .bind(item.confidence)
            .bind(now)
            .bind(item.item_id)
            .bind(account_id)
            .execute(&self.db)
            .await?;
        }

        info!(
            "Stored {} classifications for account {}",
            classified.len(),
            account_id
        );
        Ok(())
    }

    async fn active_account_ids(&self) -> Result<Vec<Uuid>> {
        let rows = sqlx::query(
            "SELECT id FROM accounts WHERE curation_enabled = true ORDER BY created_at",
        )
        .fetch_all(&self.db)
        .await?;

        let mut ids = Vec::with_capacity(rows.len());
        for row in &rows {
            ids.push(row.try_get("id")?);
        }
        Ok(ids)
    }
}
