//! Trim analysis
//!
//! Turns measured line lengths into a trim verdict against the
//! manufacturer line plan. The pipeline is a chain of pure steps:
//!
//! ```text
//! reference payloads ──parse──▶ LineLengthTable + GroupMapping
//!                                        │
//! measurements ──────────────▶ calculate_group_differentials
//!                                        │
//!            ┌───────────────┬───────────┴──────────┬────────────────────┐
//!            ▼               ▼                      ▼                    ▼
//!     summarize_groups  detect_profile_shape  suggest_corrections  compare_phases
//! ```
//!
//! Symmetry and the loop matrix sit beside the pipeline: symmetry compares
//! the two sides directly, the loop matrix folds the correction log.
//!
//! Rows are compared by differential (row A against each other row of the
//! same group) rather than by absolute length, which cancels systematic
//! measurement error such as tape stretch or tension differences.

pub mod corrections;
pub mod differentials;
pub mod loops;
pub mod profile;
pub mod symmetry;

pub use corrections::{suggest_corrections, suggest_corrections_with, CorrectionSuggestion, Direction, LoopShortening};
pub use differentials::{
    calculate_group_differentials, compare_phases, summarize_groups, GroupComparison, GroupDifferential,
    GroupSummary,
};
pub use loops::{build_loop_matrix, CorrectionLog, CorrectionRecord, CorrectionType, LoopAnomaly, LoopFold, LoopMatrix};
pub use profile::{detect_profile_shape, ProfileClassification, ProfileShape};
pub use symmetry::{compute_symmetry, SymmetryEntry, SYMMETRY_LIMIT_MM};

use crate::reference::{GroupMapping, LineLengthTable};
use crate::types::{MeasurementSet, Phase};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Tolerance used when the aspect ratio is unknown
pub const DEFAULT_TOLERANCE_MM: f64 = 20.0;

/// Trim tolerance for a wing's flat aspect ratio
///
/// | Aspect ratio | Tolerance |
/// |--------------|-----------|
/// | unknown, ≤ 5 | 20 mm     |
/// | ≤ 6          | 15 mm     |
/// | > 6          | 10 mm     |
///
/// Higher aspect ratios are more trim-sensitive; 10 mm is the floor set
/// by measurement repeatability. A zero ratio counts as unknown. NaN,
/// infinite or negative ratios are caller errors.
///
/// # Examples
///
/// ```
/// use paramot_rigging::trim::get_tolerance_mm;
///
/// assert_eq!(get_tolerance_mm(Some(5.0)).unwrap(), 20.0);
/// assert_eq!(get_tolerance_mm(Some(5.5)).unwrap(), 15.0);
/// assert_eq!(get_tolerance_mm(Some(7.2)).unwrap(), 10.0);
/// assert_eq!(get_tolerance_mm(None).unwrap(), 20.0);
/// assert!(get_tolerance_mm(Some(f64::NAN)).is_err());
/// ```
pub fn get_tolerance_mm(aspect_ratio: Option<f64>) -> Result<f64> {
    let Some(ar) = aspect_ratio else {
        return Ok(DEFAULT_TOLERANCE_MM);
    };
    if !ar.is_finite() || ar < 0.0 {
        return Err(Error::InvalidInput(format!(
            "aspect ratio must be a non-negative finite number, got {}",
            ar
        )));
    }

    let tolerance = if ar <= 5.0 {
        20.0
    } else if ar <= 6.0 {
        15.0
    } else {
        // (6.0, 6.5] and above share the 10 mm floor
        10.0
    };
    Ok(tolerance)
}

/// Everything the service report shows about trim for one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrimReport {
    pub tolerance_mm: f64,
    pub differentials: Vec<GroupDifferential>,
    pub summaries: Vec<GroupSummary>,
    pub profile: ProfileClassification,
    pub suggestions: Vec<CorrectionSuggestion>,
    /// Present once corrected measurements exist
    pub corrected_summaries: Option<Vec<GroupSummary>>,
    pub comparison: Option<Vec<GroupComparison>>,
}

impl TrimReport {
    /// Run the full trim pipeline over a session's measurements
    ///
    /// Returns `Ok(None)` when there are no initial measurements to analyze.
    pub fn build(
        ref_lengths: &LineLengthTable,
        mappings: &GroupMapping,
        aspect_ratio: Option<f64>,
        measurements: &MeasurementSet,
        shortening: &LoopShortening,
    ) -> Result<Option<Self>> {
        let tolerance_mm = get_tolerance_mm(aspect_ratio)?;

        let initial = measurements.phase(Phase::Initial);
        if initial.is_empty() {
            return Ok(None);
        }

        let differentials = calculate_group_differentials(ref_lengths, &initial, mappings);
        let summaries = summarize_groups(&differentials, tolerance_mm);
        let profile = detect_profile_shape(&differentials, tolerance_mm);
        let suggestions = suggest_corrections_with(&differentials, mappings, tolerance_mm, shortening);

        let corrected = measurements.phase(Phase::Corrected);
        let corrected_summaries = if corrected.is_empty() {
            None
        } else {
            let diffs = calculate_group_differentials(ref_lengths, &corrected, mappings);
            Some(summarize_groups(&diffs, tolerance_mm))
        };
        let comparison = corrected_summaries
            .as_ref()
            .map(|corrected| compare_phases(&summaries, corrected));

        Ok(Some(TrimReport {
            tolerance_mm,
            differentials,
            summaries,
            profile,
            suggestions,
            corrected_summaries,
            comparison,
        }))
    }

    /// True when every group of the latest phase is within tolerance
    ///
    /// A phase that produced no group summaries was not checked and is
    /// never in tolerance.
    pub fn in_tolerance(&self) -> bool {
        let latest = self.corrected_summaries.as_ref().unwrap_or(&self.summaries);
        !latest.is_empty() && latest.iter().all(|s| s.in_tolerance)
    }
}

/// Round to 0.1 mm, the resolution reported to technicians
///
/// Halves round towards positive infinity (`-7.25` -> `-7.2`), not away
/// from zero as `f64::round` does.
pub(crate) fn round_tenth(v: f64) -> f64 {
    let scaled = v * 10.0;
    let floor = scaled.floor();
    let rounded = if scaled - floor >= 0.5 { floor + 1.0 } else { floor };
    rounded / 10.0
}
