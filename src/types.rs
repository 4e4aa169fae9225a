use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a filter rule's pattern is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    Phrase,
    Regex,
}

impl PatternType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternType::Phrase => "phrase",
            PatternType::Regex => "regex",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "phrase" => Some(PatternType::Phrase),
            "regex" => Some(PatternType::Regex),
            _ => None,
        }
    }
}

/// Which field of an item the rule is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleTarget {
    Keyword,
    Author,
    Domain,
    UrlPattern,
}

impl RuleTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleTarget::Keyword => "keyword",
            RuleTarget::Author => "author",
            RuleTarget::Domain => "domain",
            RuleTarget::UrlPattern => "url_pattern",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "keyword" => Some(RuleTarget::Keyword),
            "author" => Some(RuleTarget::Author),
            "domain" => Some(RuleTarget::Domain),
            "url_pattern" => Some(RuleTarget::UrlPattern),
            _ => None,
        }
    }
}

/// What a matching rule does to an item or cluster.
///
/// Mute is reversible via breakout; block is absolute; keep rules form an
/// allow-list within their scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleMode {
    Block,
    Mute,
    Keep,
}

impl RuleMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleMode::Block => "block",
            RuleMode::Mute => "mute",
            RuleMode::Keep => "keep",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "block" => Some(RuleMode::Block),
            "mute" => Some(RuleMode::Mute),
            "keep" => Some(RuleMode::Keep),
            _ => None,
        }
    }
}

/// Per-feed weight set by the tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedWeight {
    Prefer,
    Neutral,
    Deprioritize,
}

impl FeedWeight {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedWeight::Prefer => "prefer",
            FeedWeight::Neutral => "neutral",
            FeedWeight::Deprioritize => "deprioritize",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "prefer" => Some(FeedWeight::Prefer),
            "neutral" => Some(FeedWeight::Neutral),
            "deprioritize" => Some(FeedWeight::Deprioritize),
            _ => None,
        }
    }
}

/// A tenant-scoped filter rule, authored via CRUD outside this worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterRule {
    pub id: Uuid,
    pub account_id: Uuid,
    pub pattern: String,
    pub pattern_type: PatternType,
    pub target: RuleTarget,
    pub mode: RuleMode,
    pub breakout_enabled: bool,
    /// When set, the rule applies only to items in this feed.
    pub feed_id: Option<Uuid>,
    /// When set, the rule applies only to items in this folder.
    pub folder_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterAction {
    Pass,
    Hidden,
}

/// Outcome of evaluating one item or cluster against a rule snapshot.
/// Ephemeral; computed per call and never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterDecision {
    pub action: FilterAction,
    pub matched_rule_id: Option<Uuid>,
    pub breakout_reason: Option<String>,
}

impl FilterDecision {
    pub fn pass() -> Self {
        Self {
            action: FilterAction::Pass,
            matched_rule_id: None,
            breakout_reason: None,
        }
    }

    pub fn hidden(matched_rule_id: Option<Uuid>) -> Self {
        Self {
            action: FilterAction::Hidden,
            matched_rule_id,
            breakout_reason: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterEventType {
    Hidden,
    BreakoutShown,
}

impl FilterEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterEventType::Hidden => "hidden",
            FilterEventType::BreakoutShown => "breakout_shown",
        }
    }
}

/// Append-only audit row written by the post-cluster filter. The serving API
/// reads these to populate `muted_breakout_reason` on cluster cards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterEvent {
    pub account_id: Uuid,
    pub rule_id: Uuid,
    pub cluster_id: Uuid,
    pub event_type: FilterEventType,
    /// Set only for breakout_shown events.
    pub breakout_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Read-only view of an item as the filter engine sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemCandidate {
    pub id: Uuid,
    pub feed_id: Uuid,
    pub folder_id: Option<Uuid>,
    pub title: String,
    pub summary: Option<String>,
    pub author: Option<String>,
    pub url: String,
}

/// Read-only view of a cluster's representative item plus the cluster-level
/// signals the post-cluster filter needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterSnapshot {
    pub cluster_id: Uuid,
    pub representative: ItemCandidate,
    pub feed_weight: FeedWeight,
    pub size: u32,
}

/// Per-candidate signals assembled by the serving layer at list-rendering
/// time. How these are learned or stored is not this crate's concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingSignals {
    pub age_hours: f64,
    pub is_saved: bool,
    pub cluster_size: u32,
    pub feed_weight: FeedWeight,
    pub dwell_seconds: f64,
    pub clicked: bool,
    pub not_interested: bool,
    pub topic_affinity_score: f64,
    pub folder_affinity_score: f64,
    pub topic_unread_count: u32,
    pub exploration_eligible: bool,
}

impl Default for RankingSignals {
    fn default() -> Self {
        Self {
            age_hours: 0.0,
            is_saved: false,
            cluster_size: 0,
            feed_weight: FeedWeight::Neutral,
            dwell_seconds: 0.0,
            clicked: false,
            not_interested: false,
            topic_affinity_score: 0.0,
            folder_affinity_score: 0.0,
            topic_unread_count: 0,
            exploration_eligible: false,
        }
    }
}

/// The nine named contributions plus their sum. `final_score` has no
/// normalization and only orders candidates within one ranking pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingFactors {
    pub recency: f64,
    pub saved: f64,
    pub cluster_size: f64,
    pub source_weight: f64,
    pub engagement: f64,
    pub topic_affinity: f64,
    pub folder_affinity: f64,
    pub diversity_penalty: f64,
    pub exploration_boost: f64,
    pub final_score: f64,
}

/// The closed intent vocabulary the classification prompt requests. Adding a
/// variant is a compile-time-checked change across all consuming code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationIntent {
    News,
    Analysis,
    Tutorial,
    Release,
    Opinion,
    Promotion,
}

impl ClassificationIntent {
    pub const ALL: [ClassificationIntent; 6] = [
        ClassificationIntent::News,
        ClassificationIntent::Analysis,
        ClassificationIntent::Tutorial,
        ClassificationIntent::Release,
        ClassificationIntent::Opinion,
        ClassificationIntent::Promotion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClassificationIntent::News => "news",
            ClassificationIntent::Analysis => "analysis",
            ClassificationIntent::Tutorial => "tutorial",
            ClassificationIntent::Release => "release",
            ClassificationIntent::Opinion => "opinion",
            ClassificationIntent::Promotion => "promotion",
        }
    }

    /// Parses the already-normalized (trimmed, lowercased) wire form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "news" => Some(ClassificationIntent::News),
            "analysis" => Some(ClassificationIntent::Analysis),
            "tutorial" => Some(ClassificationIntent::Tutorial),
            "release" => Some(ClassificationIntent::Release),
            "opinion" => Some(ClassificationIntent::Opinion),
            "promotion" => Some(ClassificationIntent::Promotion),
            _ => None,
        }
    }
}

/// One validated classification entry. Indices absent from the result map
/// mean "unclassified", not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationEntry {
    pub index: usize,
    pub intent: ClassificationIntent,
    pub confidence: f64,
}

/// A classification paired back to the item it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedItem {
    pub item_id: Uuid,
    pub intent: ClassificationIntent,
    pub confidence: f64,
}

/// Worker tunables. Defaults are safe for a small deployment; override via
/// the binary's flags.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Items examined per soft-gate pass.
    pub soft_gate_batch_size: usize,
    /// Items sent to the model per classification call.
    pub classification_batch_size: usize,
    /// Bound on concurrent per-cluster reads; the shared resource is the
    /// connection pool.
    pub max_concurrent_clusters: usize,
    /// Seconds between sweeps when running as a daemon.
    pub poll_interval_seconds: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            soft_gate_batch_size: 500,
            classification_batch_size: 20,
            max_concurrent_clusters: 8,
            poll_interval_seconds: 300,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CurationError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Malformed row: {0}")]
    MalformedRow(String),

    #[error("Provider response missing completion text")]
    EmptyCompletion,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("General error: {0}")]
    General(String),
}

pub type Result<T> = std::result::Result<T, CurationError>;
