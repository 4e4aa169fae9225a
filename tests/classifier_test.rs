use curation_worker::classifier::parse_classification_response;
use curation_worker::types::ClassificationIntent;

#[test]
fn empty_input_yields_empty_map() {
    assert!(parse_classification_response("", 3).is_empty());
    assert!(parse_classification_response("   \n\t", 3).is_empty());
}

#[test]
fn invalid_json_yields_empty_map() {
    assert!(parse_classification_response("not json at all", 3).is_empty());
    assert!(parse_classification_response("{\"index\": ", 3).is_empty());
}

#[test]
fn bare_array_is_accepted() {
    let raw = r#"[{"index": 0, "intent": "news", "confidence": 0.9}]"#;
    let entries = parse_classification_response(raw, 3);

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[&0].intent, ClassificationIntent::News);
    assert_eq!(entries[&0].confidence, 0.9);
}

#[test]
fn classifications_property_is_accepted() {
    let raw = r#"{"classifications": [{"index": 1, "intent": "tutorial", "confidence": 0.7}]}"#;
    let entries = parse_classification_response(raw, 3);

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[&1].intent, ClassificationIntent::Tutorial);
}

#[test]
fn wrong_top_level_shapes_yield_empty_map() {
    // classifications is a string, not an array.
    let raw = r#"{"classifications": "news, tutorial"}"#;
    assert!(parse_classification_response(raw, 3).is_empty());

    // Missing key entirely.
    assert!(parse_classification_response(r#"{"results": []}"#, 3).is_empty());

    // Bare scalar.
    assert!(parse_classification_response("42", 3).is_empty());
    assert!(parse_classification_response("\"news\"", 3).is_empty());
}

#[test]
fn code_fences_are_stripped_with_and_without_language_tag() {
    let tagged = "```json\n[{\"index\": 0, \"intent\": \"news\"}]\n```";
    assert_eq!(parse_classification_response(tagged, 1).len(), 1);

    let untagged = "```\n[{\"index\": 0, \"intent\": \"news\"}]\n```";
    assert_eq!(parse_classification_response(untagged, 1).len(), 1);
}

#[test]
fn unstrippable_fence_degrades_to_empty_map() {
    assert!(parse_classification_response("```json", 1).is_empty());
    assert!(parse_classification_response("```", 1).is_empty());
}

#[test]
fn intent_is_trimmed_and_lowercased() {
    let raw = r#"[{"index": 0, "intent": "NEWS"}, {"index": 1, "intent": "  Analysis  "}]"#;
    let entries = parse_classification_response(raw, 2);

    assert_eq!(entries[&0].intent, ClassificationIntent::News);
    assert_eq!(entries[&1].intent, ClassificationIntent::Analysis);
}

#[test]
fn unknown_intent_skips_only_that_entry() {
    let raw = r#"[
        {"index": 0, "intent": "clickbait", "confidence": 0.9},
        {"index": 1, "intent": "release", "confidence": 0.8}
    ]"#;
    let entries = parse_classification_response(raw, 2);

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[&1].intent, ClassificationIntent::Release);
}

#[test]
fn out_of_range_indices_are_skipped_while_siblings_survive() {
    let raw = r#"[
        {"index": -1, "intent": "news"},
        {"index": 3, "intent": "news"},
        {"index": 2, "intent": "opinion"}
    ]"#;
    let entries = parse_classification_response(raw, 3);

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[&2].intent, ClassificationIntent::Opinion);
}

#[test]
fn non_integer_and_missing_indices_are_skipped() {
    let raw = r#"[
        {"index": 0.5, "intent": "news"},
        {"index": "1", "intent": "news"},
        {"intent": "news"},
        {"index": 0, "intent": "news"}
    ]"#;
    let entries = parse_classification_response(raw, 2);

    assert_eq!(entries.len(), 1);
    assert!(entries.contains_key(&0));
}

#[test]
fn non_object_entries_are_skipped() {
    let raw = r#"[42, "news", null, {"index": 0, "intent": "promotion"}]"#;
    let entries = parse_classification_response(raw, 1);

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[&0].intent, ClassificationIntent::Promotion);
}

#[test]
fn confidence_defaults_to_zero_and_clamps_both_ends() {
    let raw = r#"[
        {"index": 0, "intent": "news"},
        {"index": 1, "intent": "news", "confidence": 1.5},
        {"index": 2, "intent": "news", "confidence": -0.3}
    ]"#;
    let entries = parse_classification_response(raw, 3);

    assert_eq!(entries[&0].confidence, 0.0);
    assert_eq!(entries[&1].confidence, 1.0);
    assert_eq!(entries[&2].confidence, 0.0);
}

#[test]
fn duplicate_indices_follow_last_write_wins() {
    let raw = r#"[
        {"index": 0, "intent": "news", "confidence": 0.2},
        {"index": 0, "intent": "opinion", "confidence": 0.8}
    ]"#;
    let entries = parse_classification_response(raw, 1);

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[&0].intent, ClassificationIntent::Opinion);
    assert_eq!(entries[&0].confidence, 0.8);
}
