//! Loop correction suggestions
//!
//! A deviation beyond tolerance is corrected by adding shortening loops at
//! the maillon of the relatively long row. Loop types 1 and 2 are simple
//! loops with a predictable shortening. Types 3 to 5 are soft-link
//! configurations (lark's foot plus maillon) whose real shortening varies,
//! so suggestions using them are marked approximate.

use super::differentials::GroupDifferential;
use crate::reference::GroupMapping;
use serde::{Deserialize, Serialize};

/// Loop types at or above this are soft-link configurations
pub const APPROXIMATE_FROM_TYPE: u8 = 3;

/// Approximate shortening per loop for loop types 1..=5, in millimetres
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoopShortening(pub [f64; 5]);

impl Default for LoopShortening {
    fn default() -> Self {
        LoopShortening([10.0, 15.0, 25.0, 35.0, 45.0])
    }
}

impl LoopShortening {
    /// Shortening of one loop of `loop_type` (1-based); out-of-range types
    /// are clamped to 1..=5
    pub fn per_loop(&self, loop_type: u8) -> f64 {
        let idx = loop_type.clamp(1, 5) as usize - 1;
        self.0[idx]
    }

    fn largest(&self) -> f64 {
        self.0[4]
    }

    /// Pick the loop type for an absolute deviation
    ///
    /// The smallest type whose single loop covers the deviation without
    /// overshooting it by more than `tolerance_mm`. Deviations beyond the
    /// largest type use type 5 repeatedly. When every covering type
    /// overshoots, the smallest covering type is used anyway.
    pub fn select(&self, deviation_mm: f64, tolerance_mm: f64) -> u8 {
        if deviation_mm > self.largest() {
            return 5;
        }
        let covering = (1..=5u8).filter(|t| self.per_loop(*t) >= deviation_mm);
        let mut fallback = None;
        for t in covering {
            if self.per_loop(t) - deviation_mm <= tolerance_mm {
                return t;
            }
            fallback.get_or_insert(t);
        }
        fallback.unwrap_or(5)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Row A is relatively too long
    Shorten,
    /// Row A is relatively too short; shorten the compared row instead
    Lengthen,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionSuggestion {
    pub group: String,
    pub row: String,
    pub compared_row: String,
    pub direction: Direction,
    /// Absolute deviation being corrected
    pub deviation_mm: f64,
    pub suggested_loops: u32,
    pub loop_type: u8,
    pub estimated_shortening_mm: f64,
    pub approximate: bool,
    /// 1-indexed positions of the row receiving the loops: `row` when
    /// shortening, `compared_row` when lengthening
    pub positions: Vec<u32>,
}

/// Suggestions using the default per-loop shortening
pub fn suggest_corrections(
    diffs: &[GroupDifferential],
    mappings: &GroupMapping,
    tolerance_mm: f64,
) -> Vec<CorrectionSuggestion> {
    suggest_corrections_with(diffs, mappings, tolerance_mm, &LoopShortening::default())
}

/// One suggestion per differential whose |deviation| exceeds tolerance
pub fn suggest_corrections_with(
    diffs: &[GroupDifferential],
    mappings: &GroupMapping,
    tolerance_mm: f64,
    shortening: &LoopShortening,
) -> Vec<CorrectionSuggestion> {
    diffs
        .iter()
        .filter(|d| d.deviation.abs() > tolerance_mm)
        .map(|d| {
            let deviation_mm = d.deviation.abs();
            let loop_type = shortening.select(deviation_mm, tolerance_mm);
            let per_loop = shortening.per_loop(loop_type);
            let suggested_loops = (deviation_mm / per_loop).ceil() as u32;
            let (direction, target_row) = if d.deviation > 0.0 {
                (Direction::Shorten, &d.row_a)
            } else {
                (Direction::Lengthen, &d.row_b)
            };

            CorrectionSuggestion {
                group: d.group.clone(),
                row: d.row_a.clone(),
                compared_row: d.row_b.clone(),
                direction,
                deviation_mm,
                suggested_loops,
                loop_type,
                estimated_shortening_mm: suggested_loops as f64 * per_loop,
                approximate: loop_type >= APPROXIMATE_FROM_TYPE,
                positions: mappings
                    .positions(&d.group, target_row)
                    .into_iter()
                    .map(|i| i as u32 + 1)
                    .collect(),
            }
        })
        .collect()
}
