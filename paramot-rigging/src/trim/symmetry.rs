//! Left/right symmetry
//!
//! Compares the same line on both sides of the wing directly, independent
//! of the reference plan and of the aspect-ratio tolerance.

use crate::reference::compare_rows;
use crate::types::{MeasuredLine, Side};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Side-to-side difference above which a line is reported asymmetric
pub const SYMMETRY_LIMIT_MM: f64 = 15.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymmetryEntry {
    pub row: String,
    pub position: u32,
    pub left_mm: f64,
    pub right_mm: f64,
    /// `left - right`
    pub diff_mm: f64,
}

impl SymmetryEntry {
    pub fn is_asymmetric(&self, limit_mm: f64) -> bool {
        self.diff_mm.abs() > limit_mm
    }
}

fn index(lines: &[MeasuredLine]) -> BTreeMap<(&str, u32), f64> {
    // Last entry at a position wins
    lines
        .iter()
        .map(|m| ((m.row.as_str(), m.position), m.measured_length_mm))
        .collect()
}

/// Pair measurements of both sides by (row, position)
///
/// `first_side` names the side of `first`; `second` is the opposite side.
/// Positions measured on only one side are left out. Entries come back
/// leading row first, then by position.
pub fn compute_symmetry(first: &[MeasuredLine], first_side: Side, second: &[MeasuredLine]) -> Vec<SymmetryEntry> {
    let (left, right) = match first_side {
        Side::Left => (index(first), index(second)),
        Side::Right => (index(second), index(first)),
    };

    let mut entries: Vec<SymmetryEntry> = left
        .iter()
        .filter_map(|(&(row, position), &left_mm)| {
            let right_mm = *right.get(&(row, position))?;
            Some(SymmetryEntry {
                row: row.to_string(),
                position,
                left_mm,
                right_mm,
                diff_mm: super::round_tenth(left_mm - right_mm),
            })
        })
        .collect();

    entries.sort_by(|a, b| compare_rows(&a.row, &b.row).then(a.position.cmp(&b.position)));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Phase;

    fn line(row: &str, position: u32, side: Side, length: f64) -> MeasuredLine {
        MeasuredLine::new(row, position, side, Phase::Initial, length)
    }

    #[test]
    fn test_pairs_matching_positions() {
        let left = [line("A", 1, Side::Left, 2500.0), line("B", 1, Side::Left, 2480.0)];
        let right = [line("A", 1, Side::Right, 2490.0), line("C", 1, Side::Right, 2530.0)];

        let entries = compute_symmetry(&left, Side::Left, &right);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].row, "A");
        assert_eq!(entries[0].diff_mm, 10.0);
        assert!(!entries[0].is_asymmetric(SYMMETRY_LIMIT_MM));
    }

    #[test]
    fn test_first_side_right_keeps_left_minus_right() {
        let right = [line("A", 1, Side::Right, 2520.0)];
        let left = [line("A", 1, Side::Left, 2500.0)];

        let entries = compute_symmetry(&right, Side::Right, &left);

        assert_eq!(entries[0].left_mm, 2500.0);
        assert_eq!(entries[0].right_mm, 2520.0);
        assert_eq!(entries[0].diff_mm, -20.0);
        assert!(entries[0].is_asymmetric(SYMMETRY_LIMIT_MM));
    }

    #[test]
    fn test_limit_is_exclusive() {
        let entries = compute_symmetry(
            &[line("B", 2, Side::Left, 2515.0)],
            Side::Left,
            &[line("B", 2, Side::Right, 2500.0)],
        );
        assert!(!entries[0].is_asymmetric(15.0));
    }

    #[test]
    fn test_sorted_by_row_then_position() {
        let left = [
            line("C", 1, Side::Left, 1.0),
            line("A", 2, Side::Left, 1.0),
            line("A", 1, Side::Left, 1.0),
        ];
        let right = left.clone().map(|mut m| {
            m.side = Side::Right;
            m
        });

        let order: Vec<(String, u32)> = compute_symmetry(&left, Side::Left, &right)
            .into_iter()
            .map(|e| (e.row, e.position))
            .collect();
        assert_eq!(
            order,
            vec![("A".to_string(), 1), ("A".to_string(), 2), ("C".to_string(), 1)]
        );
    }

    #[test]
    fn test_empty_side_yields_nothing() {
        assert!(compute_symmetry(&[line("A", 1, Side::Left, 2500.0)], Side::Left, &[]).is_empty());
    }
}
