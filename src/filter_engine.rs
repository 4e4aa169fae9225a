use crate::traits::CurationBackend;
use crate::types::{
    FeedWeight, FilterDecision, FilterEvent, FilterEventType, FilterRule, ItemCandidate,
    PatternType, Result, RuleMode, RuleTarget,
};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use std::collections::HashMap;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

/// Terms that justify overriding a mute regardless of source or cluster
/// size: security incidents, outages, and legal action. Matched with word
/// boundaries so "breach" does not fire on "breaching whale".
static SEVERITY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(
        r"\b(zero-day|vulnerability|exploit|breach|ransomware|malware|cve|compromised|outage|downtime|data leak|recall|lawsuit|subpoena|injunction|indictment|class action)\b",
    )
    .case_insensitive(true)
    .build()
    .expect("severity vocabulary is a valid pattern")
});

/// A tenant's rule snapshot in stable evaluation order, with compiled
/// patterns memoized per rule.
///
/// The snapshot is immutable for the duration of one evaluation call;
/// concurrent rule edits become visible on the next snapshot, never
/// mid-batch.
pub struct RuleMatcher {
    rules: Vec<FilterRule>,
    /// Compiled regexes keyed by rule id + pattern text. `None` marks a
    /// pattern that failed to compile: the rule is inert, which is a
    /// different state from "not a regex rule" or "no cache entry".
    compiled: HashMap<Uuid, (String, Option<Regex>)>,
}

impl RuleMatcher {
    /// Builds a matcher over the given rules. Regex rules are compiled
    /// up front; a compile failure makes that single rule inert (logged)
    /// without affecting any other rule.
    pub fn new(mut rules: Vec<FilterRule>) -> Self {
        // Own the evaluation order instead of trusting the caller's.
        rules.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        let mut compiled = HashMap::new();
        for rule in &rules {
            if rule.pattern_type != PatternType::Regex {
                continue;
            }
            let regex = match RegexBuilder::new(&rule.pattern)
                .case_insensitive(true)
                .build()
            {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!("Skipping rule {} with invalid pattern: {}", rule.id, e);
                    None
                }
            };
            compiled.insert(rule.id, (rule.pattern.clone(), regex));
        }

        Self { rules, compiled }
    }

    /// Whether the rule's scope covers this item. Unscoped rules are
    /// tenant-wide; a feed/folder scope restricts the rule to that feed or
    /// folder.
    fn applies_to(rule: &FilterRule, item: &ItemCandidate) -> bool {
        if let Some(feed_id) = rule.feed_id {
            if feed_id != item.feed_id {
                return false;
            }
        }
        if let Some(folder_id) = rule.folder_id {
            if item.folder_id != Some(folder_id) {
                return false;
            }
        }
        true
    }

    /// The text a rule is compared against, chosen by the rule's target.
    /// Items without the targeted field cannot match.
    fn comparison_text(rule: &FilterRule, item: &ItemCandidate) -> Option<String> {
        match rule.target {
            RuleTarget::Keyword => {
                let mut text = item.title.clone();
                if let Some(summary) = &item.summary {
                    text.push(' ');
                    text.push_str(summary);
                }
                Some(text)
            }
            RuleTarget::Author => item.author.clone(),
            RuleTarget::Domain => Url::parse(&item.url)
                .ok()
                .and_then(|u| u.host_str().map(|h| h.to_string())),
            RuleTarget::UrlPattern => Some(item.url.clone()),
        }
    }

    fn rule_matches(&self, rule: &FilterRule, item: &ItemCandidate) -> bool {
        let Some(text) = Self::comparison_text(rule, item) else {
            return false;
        };

        match rule.pattern_type {
            PatternType::Phrase => text.to_lowercase().contains(&rule.pattern.to_lowercase()),
            PatternType::Regex => match self.compiled.get(&rule.id) {
                Some((pattern, Some(regex))) if *pattern == rule.pattern => regex.is_match(&text),
                // Invalid pattern, or a stale cache entry for an edited rule:
                // the rule is inert either way.
                _ => false,
            },
        }
    }

    /// Evaluates one item against the full snapshot: an ordered fold with
    /// early-exit on the first matching block or mute rule, and full
    /// accumulation for keep rules (any applicable keep rule matching ORs
    /// the item back to visibility).
    pub fn evaluate_item(&self, item: &ItemCandidate) -> FilterDecision {
        let mut keep_applicable = false;
        let mut keep_matched = false;

        for rule in &self.rules {
            if !Self::applies_to(rule, item) {
                continue;
            }
            match rule.mode {
                RuleMode::Block | RuleMode::Mute => {
                    if self.rule_matches(rule, item) {
                        return FilterDecision::hidden(Some(rule.id));
                    }
                }
                RuleMode::Keep => {
                    keep_applicable = true;
                    if !keep_matched && self.rule_matches(rule, item) {
                        keep_matched = true;
                    }
                }
            }
        }

        if keep_applicable && !keep_matched {
            // Allow-list miss. No rule matched, so there is no rule id to
            // attribute; the soft gate is not audited.
            FilterDecision::hidden(None)
        } else {
            FilterDecision::pass()
        }
    }

    /// First block-or-mute rule matching the item, in stable order. Keep
    /// rules play no part at cluster granularity.
    pub fn first_suppressing_match(&self, item: &ItemCandidate) -> Option<&FilterRule> {
        self.rules
            .iter()
            .filter(|r| matches!(r.mode, RuleMode::Block | RuleMode::Mute))
            .find(|r| Self::applies_to(r, item) && self.rule_matches(r, item))
    }
}

/// Pre-clustering soft gate. Evaluates each newly ingested item against the
/// tenant's rule snapshot and returns a decision per item id.
///
/// Breakout is resolved only at cluster granularity, so every decision here
/// carries `breakout_reason = None`; a mute-rule hide at this stage is
/// provisional until `post_cluster_filter` re-evaluates the cluster.
pub fn pre_filter_soft_gate(
    rules: Vec<FilterRule>,
    items: &[ItemCandidate],
) -> HashMap<Uuid, FilterDecision> {
    let matcher = RuleMatcher::new(rules);

    let mut decisions = HashMap::with_capacity(items.len());
    for item in items {
        decisions.insert(item.id, matcher.evaluate_item(item));
    }

    let hidden = decisions
        .values()
        .filter(|d| d.action == crate::types::FilterAction::Hidden)
        .count();
    debug!(
        "Soft gate evaluated {} items, {} hidden",
        items.len(),
        hidden
    );

    decisions
}

/// Breakout check for a muted cluster, strict priority order:
///
/// 1. severity keyword in the representative text
/// 2. preferred source
/// 3. cluster size >= 4
///
/// The priority is independent of which other conditions also hold: a
/// severity keyword wins even when the source is preferred and the cluster
/// is large.
pub fn check_breakout(text: &str, feed_weight: FeedWeight, cluster_size: u32) -> Option<String> {
    if let Some(m) = SEVERITY_PATTERN.find(text) {
        return Some(format!(
            "severity_keyword:{}",
            m.as_str().to_lowercase()
        ));
    }
    if feed_weight == FeedWeight::Prefer {
        return Some("high_reputation_source".to_string());
    }
    if cluster_size >= 4 {
        return Some(format!("cluster_size:{}", cluster_size));
    }
    None
}

/// Post-clustering re-evaluation of suppressed clusters, with audit-event
/// emission.
///
/// Query contract: zero queries when `cluster_ids` is empty; exactly one
/// query (the rules read) when the tenant has no rules. Otherwise one
/// representative-row read per cluster plus one audit write per suppressed
/// cluster, fanned out unordered up to `max_concurrent` — evaluations are
/// independent and share only the connection pool.
///
/// Returns the events written, in no particular order.
pub async fn post_cluster_filter<S>(
    store: &S,
    account_id: Uuid,
    cluster_ids: &[Uuid],
    max_concurrent: usize,
) -> Result<Vec<FilterEvent>>
where
    S: CurationBackend + ?Sized,
{
    if cluster_ids.is_empty() {
        return Ok(Vec::new());
    }

    let rules = store.load_rules(account_id).await?;
    if rules.is_empty() {
        debug!("No filter rules for account {}, nothing to re-evaluate", account_id);
        return Ok(Vec::new());
    }
    let matcher = RuleMatcher::new(rules);

    let results: Vec<Result<Option<FilterEvent>>> = stream::iter(cluster_ids.iter().copied())
        .map(|cluster_id| evaluate_cluster(store, &matcher, account_id, cluster_id))
        .buffer_unordered(max_concurrent.max(1))
        .collect()
        .await;

    let mut events = Vec::new();
    for result in results {
        if let Some(event) = result? {
            events.push(event);
        }
    }

    debug!(
        "Post-cluster filter wrote {} events for {} clusters (account {})",
        events.len(),
        cluster_ids.len(),
        account_id
    );

    Ok(events)
}

async fn evaluate_cluster<S>(
    store: &S,
    matcher: &RuleMatcher,
    account_id: Uuid,
    cluster_id: Uuid,
) -> Result<Option<FilterEvent>>
where
    S: CurationBackend + ?Sized,
{
    let Some(snapshot) = store.load_cluster_snapshot(account_id, cluster_id).await? else {
        warn!("Cluster {} vanished before re-evaluation, skipping", cluster_id);
        return Ok(None);
    };

    // The first matching rule determines both the outcome and the recorded
    // rule id, even if a later rule would differ.
    let Some(rule) = matcher.first_suppressing_match(&snapshot.representative) else {
        return Ok(None);
    };

    let event = match rule.mode {
        RuleMode::Block => FilterEvent {
            account_id,
            rule_id: rule.id,
            cluster_id,
            event_type: FilterEventType::Hidden,
            breakout_reason: None,
            created_at: Utc::now(),
        },
        RuleMode::Mute => {
            let rep = &snapshot.representative;
            let mut text = rep.title.clone();
            if let Some(summary) = &rep.summary {
                text.push(' ');
                text.push_str(summary);
            }

            let reason = check_breakout(&text, snapshot.feed_weight, snapshot.size);
            match reason {
                Some(reason) if rule.breakout_enabled => FilterEvent {
                    account_id,
                    rule_id: rule.id,
                    cluster_id,
                    event_type: FilterEventType::BreakoutShown,
                    breakout_reason: Some(reason),
                    created_at: Utc::now(),
                },
                _ => FilterEvent {
                    account_id,
                    rule_id: rule.id,
                    cluster_id,
                    event_type: FilterEventType::Hidden,
                    breakout_reason: None,
                    created_at: Utc::now(),
                },
            }
        }
        // first_suppressing_match never yields keep rules.
        RuleMode::Keep => return Ok(None),
    };

    store.record_event(&event).await?;
    Ok(Some(event))
}
