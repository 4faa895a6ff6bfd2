//! Cloth and strength assessment over realistic session data

use paramot_rigging::cloth::{
    default_test_points, evaluate_tear_resistance, summarize_cloth_tests, ClothResult, ClothTestRecord,
    PorosityMethod, Surface,
};
use paramot_rigging::strength::{
    calculate_strength_thresholds, evaluate_destructive_test, missing_mandatory_tests, non_destructive_breakdown,
    summarize_strength_tests, LineMaterialFamily, LineMaterialSpec, StrengthResult, StrengthTestRecord,
};
use paramot_rigging::Side;
use serde_json::json;

#[test]
fn test_tear_boundary() {
    assert_eq!(evaluate_tear_resistance(800.0).result, ClothResult::Warning);
    assert_eq!(evaluate_tear_resistance(801.0).result, ClothResult::Pass);
}

#[test]
fn test_cloth_session_worst_wins() {
    let grades = [ClothResult::Pass, ClothResult::Warning, ClothResult::Fail];
    let tests: Vec<ClothTestRecord> = default_test_points()
        .into_iter()
        .zip(grades)
        .map(|(mut t, grade)| {
            t.result = Some(grade);
            t
        })
        .collect();

    let summary = summarize_cloth_tests(&tests);
    assert_eq!(summary.pass_count, 1);
    assert_eq!(summary.warning_count, 1);
    assert_eq!(summary.fail_count, 1);
    assert_eq!(summary.overall_result, ClothResult::Fail);
}

#[test]
fn test_cloth_records_from_json() {
    let tests: Vec<ClothTestRecord> = serde_json::from_value(json!([
        { "surface": "top", "cellId": "4", "porosityValue": 12.0, "porosityMethod": "jdc", "tearResistance": 950 },
        { "surface": "bottom", "cellId": "6", "porosityValue": 400.0, "porosityMethod": "porosimeter" }
    ]))
    .unwrap();

    assert_eq!(tests[0].surface, Some(Surface::Top));
    assert_eq!(tests[0].porosity_method, Some(PorosityMethod::Jdc));
    assert_eq!(tests[0].effective_result(), Some(ClothResult::Warning));
    assert_eq!(tests[1].effective_result(), Some(ClothResult::Warning));

    let summary = summarize_cloth_tests(&tests);
    assert_eq!(summary.overall_result, ClothResult::Warning);
    assert_eq!(summary.tear_avg, Some(950.0));
}

fn catalogue() -> Vec<LineMaterialSpec> {
    serde_json::from_value(json!([
        { "lineId": "A1", "row": "A", "cascadeLevel": 1, "brand": "Edelrid", "materialRef": "8000U-190", "strengthNewDaN": 190.0 },
        { "lineId": "B1", "lineRow": "B", "cascadeLevel": 1, "brand": "Liros", "materialRef": "DSL 140 Dyneema", "strengthNew": 140.0 },
        { "lineId": "C3", "row": "C", "cascadeLevel": 3, "brand": "Liros", "materialRef": "PPSL 120" }
    ]))
    .unwrap()
}

#[test]
fn test_catalogue_thresholds_and_mandatory_tests() {
    let materials = catalogue();
    assert_eq!(materials[0].family(), LineMaterialFamily::Aramid);
    assert_eq!(materials[1].family(), LineMaterialFamily::DyneemaVectran);

    let thresholds = calculate_strength_thresholds(&materials);
    assert_eq!(thresholds.len(), 2);
    assert!((thresholds[1].warning_threshold_dan - 28.0).abs() < 1e-9);
    assert!((thresholds[1].reject_threshold_dan - 14.0).abs() < 1e-9);

    let tested: Vec<StrengthTestRecord> = serde_json::from_value(json!([
        { "lineId": "B1", "row": "B", "cascadeLevel": 1, "side": "left", "testType": "non_destructive",
          "loadAppliedDaN": 150.0, "result": "pass" }
    ]))
    .unwrap();

    let missing = missing_mandatory_tests(&materials, &tested);
    assert!(missing.iter().any(|m| m.line_id == "B1" && m.side == Side::Right));
    assert!(!missing.iter().any(|m| m.line_id == "B1" && m.side == Side::Left));
    assert!(!missing.iter().any(|m| m.line_id == "C3"));

    // The Edelrid 8000U A line is aramid: mandatory on both sides
    let a1: Vec<Side> = missing.iter().filter(|m| m.line_id == "A1").map(|m| m.side).collect();
    assert_eq!(a1, vec![Side::Left, Side::Right]);
}

#[test]
fn test_destructive_verdicts_and_summary() {
    let warning = evaluate_destructive_test(30.0, 190.0).unwrap();
    assert_eq!(warning.result, StrengthResult::Warning);
    assert!(evaluate_destructive_test(30.0, 0.0).is_err());

    let tests: Vec<StrengthTestRecord> = serde_json::from_value(json!([
        { "lineId": "A1", "row": "A", "cascadeLevel": 1, "side": "left", "testType": "destructive",
          "measuredStrengthDaN": 30.0, "percentRemaining": 15.8, "result": "warning" },
        { "lineId": "A1", "row": "A", "cascadeLevel": 1, "side": "right", "testType": "destructive",
          "measuredStrengthDaN": 15.0, "percentRemaining": 7.9, "result": "fail" }
    ]))
    .unwrap();

    let summary = summarize_strength_tests(&tests);
    assert_eq!(summary.destructive_count, 2);
    assert_eq!(summary.reject_count, 1);
    assert_eq!(summary.overall_result, Some(StrengthResult::Reject));
    assert_eq!(summary.min_percent_remaining, Some(7.9));
}

#[test]
fn test_non_destructive_breakdown_unsupported_rows() {
    let b = non_destructive_breakdown(100.0, 5, 190.0, 4, "A", Side::Left);
    assert_eq!(b.load_dan, 0.0);
    assert_eq!(b.breakdown, "No load table");
}
