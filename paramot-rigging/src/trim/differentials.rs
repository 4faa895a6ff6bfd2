//! Group differentials and per-group tolerance summaries

use super::round_tenth;
use crate::reference::{GroupMapping, LineLengthTable, RowPair};
use crate::types::MeasuredLine;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Differential between row A and one other row of a group
///
/// `deviation = measured_diff - ref_diff`. Positive means row A is
/// relatively longer than specified (the compared row relatively shorter).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDifferential {
    pub group: String,
    pub row_a: String,
    pub row_b: String,
    pub ref_diff: f64,
    pub measured_diff: f64,
    pub deviation: f64,
    /// Line positions that contributed on the sparser of the two rows
    pub positions_used: usize,
}

/// Differentials of one group with its tolerance verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    pub group: String,
    pub differentials: Vec<GroupDifferential>,
    /// Largest absolute deviation in the group
    pub max_deviation: f64,
    pub in_tolerance: bool,
}

/// Mean reference and mean measured length over the positions of a row
struct RowAverage {
    reference: f64,
    measured: f64,
    positions: usize,
}

/// Average a row over `positions` (0-based), counting only positions that
/// have both a cascade-1 reference length and at least one measurement
///
/// Several measurements at one position (e.g. both sides in one batch) are
/// averaged first so every position weighs the same.
fn row_average(
    ref_lengths: &LineLengthTable,
    measured: &BTreeMap<(&str, u32), (f64, usize)>,
    row: &str,
    positions: &[usize],
) -> Option<RowAverage> {
    let mut ref_sum = 0.0;
    let mut meas_sum = 0.0;
    let mut count = 0;

    for idx in positions {
        let position = *idx as u32 + 1;
        let Some(reference) = ref_lengths.length(row, position) else {
            continue;
        };
        let Some((sum, n)) = measured.get(&(row, position)) else {
            continue;
        };
        ref_sum += reference;
        meas_sum += sum / *n as f64;
        count += 1;
    }

    if count == 0 {
        return None;
    }
    Some(RowAverage {
        reference: ref_sum / count as f64,
        measured: meas_sum / count as f64,
        positions: count,
    })
}

/// Differentials for every row pair of every group
///
/// Pairs where either row lacks a usable reference/measurement position
/// are skipped. Measurements without a cascade-1 reference at the same
/// row and position never contribute, nor do NaN or infinite lengths.
pub fn calculate_group_differentials(
    ref_lengths: &LineLengthTable,
    measurements: &[MeasuredLine],
    mappings: &GroupMapping,
) -> Vec<GroupDifferential> {
    let mut measured: BTreeMap<(&str, u32), (f64, usize)> = BTreeMap::new();
    for m in measurements {
        if !m.measured_length_mm.is_finite() {
            debug!(row = %m.row, position = m.position, "Skipping non-finite measurement");
            continue;
        }
        let slot = measured.entry((m.row.as_str(), m.position)).or_insert((0.0, 0));
        slot.0 += m.measured_length_mm;
        slot.1 += 1;
    }

    let mut results = Vec::new();
    for group in mappings.groups() {
        for RowPair { row_a, row_b } in mappings.pairs(&group) {
            let a_positions = mappings.positions(&group, &row_a);
            let b_positions = mappings.positions(&group, &row_b);

            let a = row_average(ref_lengths, &measured, &row_a, &a_positions);
            let b = row_average(ref_lengths, &measured, &row_b, &b_positions);
            let (Some(a), Some(b)) = (a, b) else {
                debug!(group = %group, row_a = %row_a, row_b = %row_b, "Skipping pair without usable data");
                continue;
            };

            let ref_diff = a.reference - b.reference;
            let measured_diff = a.measured - b.measured;
            results.push(GroupDifferential {
                group: group.clone(),
                row_a,
                row_b,
                ref_diff: round_tenth(ref_diff),
                measured_diff: round_tenth(measured_diff),
                deviation: round_tenth(measured_diff - ref_diff),
                positions_used: a.positions.min(b.positions),
            });
        }
    }
    results
}

/// Group differentials by label and flag each group against `tolerance_mm`
///
/// A group is in tolerance when its largest absolute deviation is at most
/// the tolerance (boundary inclusive). Groups keep their first-seen order.
pub fn summarize_groups(differentials: &[GroupDifferential], tolerance_mm: f64) -> Vec<GroupSummary> {
    let mut grouped: Vec<(String, Vec<GroupDifferential>)> = Vec::new();
    for diff in differentials {
        match grouped.iter_mut().find(|(g, _)| *g == diff.group) {
            Some((_, diffs)) => diffs.push(diff.clone()),
            None => grouped.push((diff.group.clone(), vec![diff.clone()])),
        }
    }

    grouped
        .into_iter()
        .map(|(group, differentials)| {
            let max_deviation = differentials
                .iter()
                .map(|d| d.deviation.abs())
                .fold(0.0, f64::max);
            GroupSummary {
                group,
                differentials,
                max_deviation,
                in_tolerance: max_deviation <= tolerance_mm,
            }
        })
        .collect()
}

/// Before/after view of one group across the initial and corrected phases
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupComparison {
    pub group: String,
    pub initial_max: Option<f64>,
    pub corrected_max: Option<f64>,
    pub initial_in_tolerance: Option<bool>,
    pub corrected_in_tolerance: Option<bool>,
    /// `initial_max - corrected_max`; positive means the correction helped
    pub improvement: Option<f64>,
}

/// Pair initial and corrected summaries by group
///
/// Groups measured in only one phase keep `None` on the other side.
pub fn compare_phases(initial: &[GroupSummary], corrected: &[GroupSummary]) -> Vec<GroupComparison> {
    let mut rows: Vec<GroupComparison> = initial
        .iter()
        .map(|s| GroupComparison {
            group: s.group.clone(),
            initial_max: Some(s.max_deviation),
            corrected_max: None,
            initial_in_tolerance: Some(s.in_tolerance),
            corrected_in_tolerance: None,
            improvement: None,
        })
        .collect();

    for s in corrected {
        match rows.iter_mut().find(|r| r.group == s.group) {
            Some(row) => {
                row.corrected_max = Some(s.max_deviation);
                row.corrected_in_tolerance = Some(s.in_tolerance);
                row.improvement = row.initial_max.map(|i| round_tenth(i - s.max_deviation));
            }
            None => rows.push(GroupComparison {
                group: s.group.clone(),
                initial_max: None,
                corrected_max: Some(s.max_deviation),
                initial_in_tolerance: None,
                corrected_in_tolerance: Some(s.in_tolerance),
                improvement: None,
            }),
        }
    }
    rows
}
