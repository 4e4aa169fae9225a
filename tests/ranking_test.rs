use curation_worker::ranking::{compute_ranking, rank_clusters};
use curation_worker::types::{FeedWeight, RankingSignals};
use uuid::Uuid;

fn baseline() -> RankingSignals {
    RankingSignals {
        age_hours: 1.0,
        cluster_size: 1,
        ..RankingSignals::default()
    }
}

#[test]
fn baseline_signals_score_exactly_one_point_one() {
    let factors = compute_ranking(&baseline());

    assert_eq!(factors.recency, 1.0);
    assert_eq!(factors.cluster_size, 0.1);
    assert_eq!(factors.final_score, 1.1);
}

#[test]
fn recency_floors_below_one_hour_and_decays_after() {
    let fresh = compute_ranking(&RankingSignals {
        age_hours: 0.25,
        ..baseline()
    });
    assert_eq!(fresh.recency, 1.0);

    let old = compute_ranking(&RankingSignals {
        age_hours: 4.0,
        ..baseline()
    });
    assert_eq!(old.recency, 0.25);
}

#[test]
fn cluster_size_ramps_linearly_and_caps_at_ten() {
    let medium = compute_ranking(&RankingSignals {
        cluster_size: 5,
        ..baseline()
    });
    assert_eq!(medium.cluster_size, 0.5);

    let huge = compute_ranking(&RankingSignals {
        cluster_size: 40,
        ..baseline()
    });
    assert_eq!(huge.cluster_size, 1.0);
}

#[test]
fn source_weight_is_fixed_per_feed_weight() {
    for (weight, expected) in [
        (FeedWeight::Prefer, 0.3),
        (FeedWeight::Neutral, 0.0),
        (FeedWeight::Deprioritize, -0.3),
    ] {
        let factors = compute_ranking(&RankingSignals {
            feed_weight: weight,
            ..baseline()
        });
        assert_eq!(factors.source_weight, expected);
    }
}

#[test]
fn engagement_caps_dwell_and_click_independently() {
    let factors = compute_ranking(&RankingSignals {
        dwell_seconds: 3600.0,
        clicked: true,
        ..baseline()
    });
    assert_eq!(factors.engagement, 0.25 + 0.15);
}

#[test]
fn not_interested_is_a_large_negative_override_not_an_exclusion() {
    let factors = compute_ranking(&RankingSignals {
        not_interested: true,
        ..baseline()
    });

    assert_eq!(factors.engagement, -2.5);
    // The candidate still gets a score; it just sinks.
    assert!(factors.final_score < 0.0);
}

#[test]
fn affinities_clamp_instead_of_failing() {
    let factors = compute_ranking(&RankingSignals {
        topic_affinity_score: 999.0,
        folder_affinity_score: -999.0,
        ..baseline()
    });

    assert_eq!(factors.topic_affinity, 0.35);
    assert_eq!(factors.folder_affinity, -0.25);
}

#[test]
fn diversity_penalty_is_zero_then_escalates_then_caps() {
    let none = compute_ranking(&RankingSignals {
        topic_unread_count: 3,
        ..baseline()
    });
    assert_eq!(none.diversity_penalty, 0.0);

    let some = compute_ranking(&RankingSignals {
        topic_unread_count: 5,
        ..baseline()
    });
    assert_eq!(some.diversity_penalty, -0.1);

    let capped = compute_ranking(&RankingSignals {
        topic_unread_count: 50,
        ..baseline()
    });
    assert_eq!(capped.diversity_penalty, -0.35);
}

#[test]
fn saved_and_exploration_are_flat_boosts() {
    let factors = compute_ranking(&RankingSignals {
        is_saved: true,
        exploration_eligible: true,
        ..baseline()
    });

    assert_eq!(factors.saved, 0.5);
    assert_eq!(factors.exploration_boost, 0.22);
}

#[test]
fn compute_ranking_is_referentially_transparent() {
    let signals = RankingSignals {
        age_hours: 7.3,
        is_saved: true,
        cluster_size: 6,
        feed_weight: FeedWeight::Prefer,
        dwell_seconds: 44.0,
        clicked: true,
        not_interested: false,
        topic_affinity_score: 0.21,
        folder_affinity_score: -0.08,
        topic_unread_count: 9,
        exploration_eligible: true,
    };

    let first = compute_ranking(&signals);
    let second = compute_ranking(&signals);

    assert_eq!(first, second);
    assert_eq!(
        first.final_score.to_bits(),
        second.final_score.to_bits()
    );
}

#[test]
fn rank_clusters_sorts_descending_by_score() {
    let slow = (
        Uuid::from_u128(1),
        RankingSignals {
            age_hours: 48.0,
            ..baseline()
        },
    );
    let fast = (Uuid::from_u128(2), baseline());

    let ranked = rank_clusters(vec![slow, fast]);

    assert_eq!(ranked[0].cluster_id, Uuid::from_u128(2));
    assert_eq!(ranked[1].cluster_id, Uuid::from_u128(1));
}

#[test]
fn equal_scores_break_ties_on_cluster_id_not_input_order() {
    let a = Uuid::from_u128(1);
    let b = Uuid::from_u128(2);

    // Same signals, so identical scores; hand them over b-first.
    let ranked = rank_clusters(vec![(b, baseline()), (a, baseline())]);

    assert_eq!(ranked[0].cluster_id, a);
    assert_eq!(ranked[1].cluster_id, b);
}
