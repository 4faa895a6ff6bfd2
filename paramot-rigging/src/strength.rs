//! Line strength assessment
//!
//! Covers the three strength concerns of a line check:
//! - how much of the suspended weight each row carries (load distribution)
//! - which material family a line belongs to, which decides how it ages and
//!   whether testing it is mandatory
//! - grading destructive break tests and sizing non-destructive load tests
//!
//! Load shares are a fixed, auditable table per row count rather than a
//! flight-shape simulation.

use crate::types::Side;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Below this share of new strength a line needs a recheck
pub const WARNING_FRACTION: f64 = 0.20;

/// Below this share of new strength a line is rejected
pub const REJECT_FRACTION: f64 = 0.10;

/// Load factor applied in non-destructive testing
pub const NON_DESTRUCTIVE_G_FACTOR: f64 = 8.0;

/// Highest cascade level whose aramid / dyneema-vectran lines must be tested
pub const MANDATORY_MAX_CASCADE: u32 = 2;

/// Percentage of suspended weight per row, keyed by number of rows
const LOAD_TABLES: &[(u32, &[(&str, f64)])] = &[
    (2, &[("A", 65.0), ("B", 35.0)]),
    (3, &[("A", 50.0), ("B", 40.0), ("C", 10.0)]),
    (4, &[("A", 40.0), ("B", 35.0), ("C", 20.0), ("D", 5.0)]),
];

fn load_table(num_rows: u32) -> Option<&'static [(&'static str, f64)]> {
    LOAD_TABLES
        .iter()
        .find(|(rows, _)| *rows == num_rows)
        .map(|(_, table)| *table)
}

/// Share of the suspended weight carried by one row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadDistribution {
    pub row: String,
    pub percentage: f64,
    pub load_kg: f64,
}

/// Load per row for a wing with `num_rows` load-bearing rows
///
/// Supports 2 to 4 rows; any other count yields an empty list. Stabilo and
/// brake lines are not part of the distribution.
pub fn calculate_load_distribution(num_rows: u32, max_weight_kg: f64) -> Vec<LoadDistribution> {
    let Some(table) = load_table(num_rows) else {
        return Vec::new();
    };

    table
        .iter()
        .map(|(row, pct)| LoadDistribution {
            row: row.to_string(),
            percentage: *pct,
            load_kg: max_weight_kg * pct / 100.0,
        })
        .collect()
}

/// Coarse line material family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineMaterialFamily {
    /// Aramid core (Kevlar, Technora, Twaron)
    Aramid,
    /// HMPE / LCP core (Dyneema, Vectran)
    DyneemaVectran,
    Polyester,
    Unknown,
}

impl LineMaterialFamily {
    pub fn display_name(&self) -> &'static str {
        match self {
            LineMaterialFamily::Aramid => "Aramid",
            LineMaterialFamily::DyneemaVectran => "Dyneema / Vectran",
            LineMaterialFamily::Polyester => "Polyester",
            LineMaterialFamily::Unknown => "Unknown",
        }
    }

    /// Families whose low-cascade lines must be tested on both sides
    pub fn requires_mandatory_testing(&self) -> bool {
        matches!(
            self,
            LineMaterialFamily::Aramid | LineMaterialFamily::DyneemaVectran
        )
    }
}

// Numeric entries are Edelrid product series: 8000 has a Technora core,
// 7850/7950/7343 are Dyneema
const DYNEEMA_VECTRAN_NAMES: &[&str] = &[
    "vectran", "dyneema", "sk99", "sk78", "sk75", "hmpe", "ppsl", "7850", "7950", "7343",
];
const ARAMID_NAMES: &[&str] = &["aramid", "kevlar", "technora", "twaron", "tsl", "8000"];
const POLYESTER_NAMES: &[&str] = &["polyester", "dacron", "pes"];

fn prefix_matches(name: &str) -> bool {
    name.len() > 4 || name.bytes().all(|b| b.is_ascii_digit())
}

/// Classify a line from its manufacturer brand and material reference
///
/// Matches whole words of `"<brand> <material_ref>"` against known fibre
/// and product names. Long names and numeric product series also match as
/// a word prefix (`8000U` is the 8000 series). Anything unrecognized is
/// `Unknown`.
pub fn classify_line_material(brand: &str, material_ref: &str) -> LineMaterialFamily {
    let combined = format!("{} {}", brand, material_ref).to_lowercase();
    let words: Vec<&str> = combined
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    let matches = |names: &[&str]| {
        words
            .iter()
            .any(|w| names.iter().any(|n| *w == *n || (prefix_matches(n) && w.starts_with(*n))))
    };

    if matches(DYNEEMA_VECTRAN_NAMES) {
        LineMaterialFamily::DyneemaVectran
    } else if matches(ARAMID_NAMES) {
        LineMaterialFamily::Aramid
    } else if matches(POLYESTER_NAMES) {
        LineMaterialFamily::Polyester
    } else {
        LineMaterialFamily::Unknown
    }
}

/// Advisory testing text for a material family
pub fn get_test_guidance(family: LineMaterialFamily) -> &'static str {
    match family {
        LineMaterialFamily::Aramid => {
            "Full-length test recommended. Aramid loses strength invisibly through internal \
             abrasion and UV exposure; a line can look intact and still fail."
        }
        LineMaterialFamily::DyneemaVectran => {
            "Recheck every 50h or 100 flights. Dyneema and Vectran keep their strength well but \
             creep under sustained load, so trim drifts before strength drops."
        }
        LineMaterialFamily::Polyester => {
            "Robust and slow to age. Test when visibly worn or after a major incident."
        }
        LineMaterialFamily::Unknown => {
            "Unknown material: test as per manufacturer recommendations."
        }
    }
}

/// Manufacturer line catalogue entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineMaterialSpec {
    pub line_id: String,
    #[serde(alias = "lineRow")]
    pub row: String,
    pub cascade_level: u32,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub material_ref: String,
    #[serde(default, rename = "strengthNewDaN", alias = "strengthNew")]
    pub strength_new_dan: Option<f64>,
}

impl LineMaterialSpec {
    pub fn family(&self) -> LineMaterialFamily {
        classify_line_material(&self.brand, &self.material_ref)
    }
}

/// Warning and reject limits of one line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrengthThreshold {
    pub line_id: String,
    pub row: String,
    pub cascade_level: u32,
    #[serde(rename = "strengthNewDaN")]
    pub strength_new_dan: f64,
    #[serde(rename = "warningThresholdDaN")]
    pub warning_threshold_dan: f64,
    #[serde(rename = "rejectThresholdDaN")]
    pub reject_threshold_dan: f64,
}

/// Thresholds for every catalogue entry with a known new strength
pub fn calculate_strength_thresholds(materials: &[LineMaterialSpec]) -> Vec<StrengthThreshold> {
    materials
        .iter()
        .filter_map(|m| {
            let strength_new = m.strength_new_dan?;
            Some(StrengthThreshold {
                line_id: m.line_id.clone(),
                row: m.row.clone(),
                cascade_level: m.cascade_level,
                strength_new_dan: strength_new,
                warning_threshold_dan: strength_new * WARNING_FRACTION,
                reject_threshold_dan: strength_new * REJECT_FRACTION,
            })
        })
        .collect()
}

/// Grade of a strength test, ordered by severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrengthResult {
    Pass,
    Warning,
    #[serde(alias = "fail")]
    Reject,
}

/// Graded destructive test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestructiveEvaluation {
    pub result: StrengthResult,
    pub percent_remaining: f64,
    pub detail: String,
}

/// Grade a break test against the line's new strength
///
/// `>= 20%` remaining passes, `10% ..< 20%` warns (recheck in 50h or
/// 100 flights), `< 10%` rejects. A non-positive or non-finite new
/// strength is a caller error.
pub fn evaluate_destructive_test(measured_dan: f64, new_dan: f64) -> Result<DestructiveEvaluation> {
    if !new_dan.is_finite() || new_dan <= 0.0 {
        return Err(Error::InvalidInput(format!(
            "new strength must be a positive number, got {}",
            new_dan
        )));
    }
    if !measured_dan.is_finite() {
        return Err(Error::InvalidInput(format!(
            "measured strength must be finite, got {}",
            measured_dan
        )));
    }

    let pct = measured_dan / new_dan * 100.0;
    let evaluation = if pct < REJECT_FRACTION * 100.0 {
        DestructiveEvaluation {
            result: StrengthResult::Reject,
            percent_remaining: pct,
            detail: format!("{:.0}% remaining, below 10% reject threshold", pct),
        }
    } else if pct < WARNING_FRACTION * 100.0 {
        DestructiveEvaluation {
            result: StrengthResult::Warning,
            percent_remaining: pct,
            detail: format!("{:.0}% remaining, recheck in 50h or 100 flights", pct),
        }
    } else {
        DestructiveEvaluation {
            result: StrengthResult::Pass,
            percent_remaining: pct,
            detail: format!("{:.0}% remaining, above 20% threshold", pct),
        }
    };
    Ok(evaluation)
}

/// Per-line proof load for a non-destructive test (daN)
///
/// `8 G × max weight × row share / lines in row + 20% of new strength`.
/// Rows missing from the load table fall back to an even share; an
/// unsupported row count or an empty row yields zero.
pub fn calculate_non_destructive_load(
    max_weight_kg: f64,
    num_rows: u32,
    strength_new_dan: f64,
    lines_in_row: u32,
    row: &str,
) -> f64 {
    let Some(table) = load_table(num_rows) else {
        return 0.0;
    };
    if lines_in_row == 0 {
        return 0.0;
    }

    let row_share = table
        .iter()
        .find(|(r, _)| *r == row)
        .map(|(_, pct)| pct / 100.0)
        .unwrap_or(1.0 / num_rows as f64);

    let per_line_load = max_weight_kg * NON_DESTRUCTIVE_G_FACTOR * row_share / lines_in_row as f64;
    per_line_load + strength_new_dan * WARNING_FRACTION
}

/// Proof load with a human-readable derivation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NonDestructiveBreakdown {
    /// Rounded to 0.1 daN
    #[serde(rename = "loadDaN")]
    pub load_dan: f64,
    pub breakdown: String,
}

pub fn non_destructive_breakdown(
    max_weight_kg: f64,
    num_rows: u32,
    strength_new_dan: f64,
    lines_in_row: u32,
    row: &str,
    side: Side,
) -> NonDestructiveBreakdown {
    if load_table(num_rows).is_none() {
        return NonDestructiveBreakdown {
            load_dan: 0.0,
            breakdown: "No load table".to_string(),
        };
    }

    let total = calculate_non_destructive_load(max_weight_kg, num_rows, strength_new_dan, lines_in_row, row);
    let margin = strength_new_dan * WARNING_FRACTION;
    NonDestructiveBreakdown {
        load_dan: (total * 10.0).round() / 10.0,
        breakdown: format!(
            "{} {}: test at {:.0} daN (8G × {:.1} daN per-line + 20% of {} daN)",
            row,
            side,
            total,
            total - margin,
            strength_new_dan
        ),
    }
}

/// Kind of strength test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrengthTestType {
    NonDestructive,
    Destructive,
}

/// Recorded strength test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrengthTestRecord {
    pub line_id: String,
    #[serde(alias = "lineRow")]
    pub row: String,
    pub cascade_level: u32,
    pub side: Side,
    pub test_type: StrengthTestType,
    #[serde(default, rename = "loadAppliedDaN")]
    pub load_applied_dan: Option<f64>,
    #[serde(default, rename = "measuredStrengthDaN")]
    pub measured_strength_dan: Option<f64>,
    #[serde(default)]
    pub percent_remaining: Option<f64>,
    pub result: StrengthResult,
}

/// Whether a catalogue line must be tested on both sides
pub fn is_mandatory(material: &LineMaterialSpec) -> bool {
    material.cascade_level <= MANDATORY_MAX_CASCADE && material.family().requires_mandatory_testing()
}

/// A mandatory line/side combination without a recorded test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingTest {
    pub line_id: String,
    pub row: String,
    pub cascade_level: u32,
    pub side: Side,
}

/// Mandatory line/side pairs not yet covered by any test
///
/// The strength step of a session is complete only when this is empty.
pub fn missing_mandatory_tests(
    materials: &[LineMaterialSpec],
    tests: &[StrengthTestRecord],
) -> Vec<MissingTest> {
    let tested: HashSet<(&str, Side)> = tests.iter().map(|t| (t.line_id.as_str(), t.side)).collect();

    materials
        .iter()
        .filter(|m| is_mandatory(m))
        .flat_map(|m| [Side::Left, Side::Right].into_iter().map(move |side| (m, side)))
        .filter(|(m, side)| !tested.contains(&(m.line_id.as_str(), *side)))
        .map(|(m, side)| MissingTest {
            line_id: m.line_id.clone(),
            row: m.row.clone(),
            cascade_level: m.cascade_level,
            side,
        })
        .collect()
}

/// Aggregate of all strength tests of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrengthSummary {
    pub total_tests: usize,
    pub pass_count: usize,
    pub warning_count: usize,
    pub reject_count: usize,
    pub destructive_count: usize,
    /// Worst result, `None` when nothing was tested
    pub overall_result: Option<StrengthResult>,
    /// Lowest recorded remaining strength across destructive tests
    pub min_percent_remaining: Option<f64>,
}

pub fn summarize_strength_tests(tests: &[StrengthTestRecord]) -> StrengthSummary {
    let count = |r: StrengthResult| tests.iter().filter(|t| t.result == r).count();

    StrengthSummary {
        total_tests: tests.len(),
        pass_count: count(StrengthResult::Pass),
        warning_count: count(StrengthResult::Warning),
        reject_count: count(StrengthResult::Reject),
        destructive_count: tests
            .iter()
            .filter(|t| t.test_type == StrengthTestType::Destructive)
            .count(),
        overall_result: tests.iter().map(|t| t.result).max(),
        min_percent_remaining: tests
            .iter()
            .filter_map(|t| t.percent_remaining)
            .fold(None, |min: Option<f64>, p| Some(min.map_or(p, |m| m.min(p)))),
    }
}
