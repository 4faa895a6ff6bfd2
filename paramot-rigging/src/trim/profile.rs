//! Profile shape classification
//!
//! Looks at how deviation develops from the leading edge towards the
//! trailing edge. Each trailing row is reduced to the median deviation of
//! its main-group differentials, then the sequence `[A = 0, B, C, D, E]` is
//! checked for sign and monotonicity.

use super::differentials::GroupDifferential;
use crate::reference::{compare_rows, is_stabilo_group};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Overall trim shape of the canopy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileShape {
    Stable,
    /// Trailing rows shorter than specified
    Reflex,
    /// Trailing rows longer than specified
    Accelerated,
    Unstable,
    Unknown,
}

impl ProfileShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileShape::Stable => "stable",
            ProfileShape::Reflex => "reflex",
            ProfileShape::Accelerated => "accelerated",
            ProfileShape::Unstable => "unstable",
            ProfileShape::Unknown => "unknown",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            ProfileShape::Stable => "Trim within tolerance across all rows",
            ProfileShape::Reflex => {
                "Trailing rows shorter than specified: more pitch stability, narrower speed range"
            }
            ProfileShape::Accelerated => {
                "Trailing rows longer than specified: faster trim speed, reduced pitch stability"
            }
            ProfileShape::Unstable => {
                "Deviations do not follow a leading-to-trailing trend: correct groups individually"
            }
            ProfileShape::Unknown => "Insufficient data",
        }
    }
}

impl fmt::Display for ProfileShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileClassification {
    pub shape: ProfileShape,
    pub description: String,
    pub details: String,
}

impl ProfileClassification {
    fn new(shape: ProfileShape, details: impl Into<String>) -> Self {
        Self {
            shape,
            description: shape.description().to_string(),
            details: details.into(),
        }
    }
}

fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

fn signed(v: f64) -> String {
    format!("{:+.1}", v)
}

/// Classify the deviation pattern of a set of differentials
///
/// Stabilo groups and the brake row (`K`) are left out. With nothing left
/// the shape is `Unknown`, never an error.
pub fn detect_profile_shape(diffs: &[GroupDifferential], tolerance_mm: f64) -> ProfileClassification {
    let mut by_row: Vec<(String, Vec<f64>)> = Vec::new();
    for d in diffs {
        if is_stabilo_group(&d.group) || d.row_b == "K" {
            continue;
        }
        match by_row.iter_mut().find(|(row, _)| *row == d.row_b) {
            Some((_, values)) => values.push(d.deviation),
            None => by_row.push((d.row_b.clone(), vec![d.deviation])),
        }
    }

    if by_row.is_empty() {
        return ProfileClassification::new(
            ProfileShape::Unknown,
            "No main-group differentials measured",
        );
    }

    let main_deviations: Vec<f64> = by_row.iter().flat_map(|(_, values)| values.iter().copied()).collect();
    by_row.sort_by(|(a, _), (b, _)| compare_rows(a, b));
    let medians: Vec<(String, f64)> = by_row
        .into_iter()
        .map(|(row, mut values)| (row, median(&mut values)))
        .collect();

    let trend = medians
        .iter()
        .map(|(row, m)| format!("A-{} {}", row, signed(*m)))
        .collect::<Vec<_>>()
        .join(", ");

    let significant: Vec<f64> = medians
        .iter()
        .map(|(_, m)| *m)
        .filter(|m| m.abs() > tolerance_mm)
        .collect();

    if significant.is_empty() {
        let outliers = main_deviations.iter().filter(|d| d.abs() > tolerance_mm).count();
        if outliers == 0 {
            return ProfileClassification::new(
                ProfileShape::Stable,
                format!("{} (tolerance {:.0} mm)", trend, tolerance_mm),
            );
        }
        return ProfileClassification::new(
            ProfileShape::Unstable,
            format!("{}: {} isolated differential(s) beyond tolerance", trend, outliers),
        );
    }

    let positive = significant.iter().any(|m| *m > 0.0);
    let negative = significant.iter().any(|m| *m < 0.0);
    if positive && negative {
        return ProfileClassification::new(
            ProfileShape::Unstable,
            format!("{}: significant deviations of both signs", trend),
        );
    }

    let direction = if positive { 1.0 } else { -1.0 };

    // The deviation may grow towards the trailing edge or stay flat, but a
    // step back by more than one tolerance band breaks the trend
    let mut prev = 0.0;
    for (row, m) in &medians {
        if direction * (m - prev) < -tolerance_mm {
            return ProfileClassification::new(
                ProfileShape::Unstable,
                format!("{}: trend reverses at row {}", trend, row),
            );
        }
        prev = *m;
    }

    let shape = if positive {
        ProfileShape::Reflex
    } else {
        ProfileShape::Accelerated
    };
    ProfileClassification::new(shape, trend)
}
