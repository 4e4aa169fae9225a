use crate::types::{FeedWeight, RankingFactors, RankingSignals};
use tracing::debug;
use uuid::Uuid;

/// Computes the composite ranking score for one candidate.
///
/// Pure and deterministic: no I/O, no hidden state, no randomness —
/// structurally identical input always produces bit-identical output. The
/// nine terms are independently bounded and summed; `final_score` is not
/// normalized and only orders candidates within a single ranking pass.
pub fn compute_ranking(signals: &RankingSignals) -> RankingFactors {
    // Floors at 1.0 for anything an hour old or fresher, decays toward 0.
    let recency = 1.0 / signals.age_hours.max(1.0);

    let saved = if signals.is_saved { 0.5 } else { 0.0 };

    // Linear ramp, capped once a cluster reaches ten sources.
    let cluster_size = (signals.cluster_size as f64 / 10.0).min(1.0);

    let source_weight = match signals.feed_weight {
        FeedWeight::Prefer => 0.3,
        FeedWeight::Neutral => 0.0,
        FeedWeight::Deprioritize => -0.3,
    };

    // Dwell and click caps are independent; not_interested is a large
    // negative override, not a hard exclusion.
    let engagement = (signals.dwell_seconds / 120.0).min(0.25)
        + if signals.clicked { 0.15 } else { 0.0 }
        + if signals.not_interested { -2.5 } else { 0.0 };

    // Affinities are supplied externally; out-of-domain values degrade via
    // clamping rather than failing.
    let topic_affinity = signals.topic_affinity_score.clamp(-0.35, 0.35);
    let folder_affinity = signals.folder_affinity_score.clamp(-0.25, 0.25);

    // Zero at three or fewer unread in the topic, escalates, capped.
    let diversity_penalty =
        -((signals.topic_unread_count.saturating_sub(3) as f64) * 0.05).min(0.35);

    let exploration_boost = if signals.exploration_eligible { 0.22 } else { 0.0 };

    let final_score = recency
        + saved
        + cluster_size
        + source_weight
        + engagement
        + topic_affinity
        + folder_affinity
        + diversity_penalty
        + exploration_boost;

    RankingFactors {
        recency,
        saved,
        cluster_size,
        source_weight,
        engagement,
        topic_affinity,
        folder_affinity,
        diversity_penalty,
        exploration_boost,
        final_score,
    }
}

/// A candidate with its computed factors, ready for display order.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedCluster {
    pub cluster_id: Uuid,
    pub factors: RankingFactors,
}

/// Scores and sorts candidates for one list render.
///
/// Order is descending by `final_score`; ties break on ascending cluster id
/// so the result never depends on the incoming collection order.
pub fn rank_clusters(candidates: Vec<(Uuid, RankingSignals)>) -> Vec<RankedCluster> {
    let mut ranked: Vec<RankedCluster> = candidates
        .into_iter()
        .map(|(cluster_id, signals)| RankedCluster {
            cluster_id,
            factors: compute_ranking(&signals),
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.factors
            .final_score
            .partial_cmp(&a.factors.final_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.cluster_id.cmp(&b.cluster_id))
    });

    debug!("Ranked {} candidates", ranked.len());

    ranked
}
