//! Canopy cloth assessment
//!
//! Porosity (air permeability) and tear resistance are the two degradation
//! proxies recorded per test point. Each is graded pass / warning / fail
//! against fixed thresholds; a test point takes the worse of its two
//! grades and a session takes the worst of its test points.
//!
//! # Thresholds
//!
//! | Measurement                     | Pass   | Warning      | Fail  |
//! |---------------------------------|--------|--------------|-------|
//! | Porosimeter (L/m²/min, lower ok)| < 360  | 360 ..= 540  | > 540 |
//! | JDC (seconds, higher ok)        | > 15   | 10 ..= 15    | < 10  |
//! | Tear resistance (grams)         | > 800  | 600 ..= 800  | < 600 |
//!
//! A non-finite reading never grades better than fail.

use serde::{Deserialize, Deserializer, Serialize};

/// Mechanical permeability limits (L/m²/min)
const POROSIMETER_PASS_BELOW: f64 = 360.0;
const POROSIMETER_WARN_MAX: f64 = 540.0;

/// Timed permeability limits (seconds)
const JDC_PASS_ABOVE: f64 = 15.0;
const JDC_WARN_MIN: f64 = 10.0;

/// Tear resistance limits (grams)
const TEAR_PASS_ABOVE: f64 = 800.0;
const TEAR_WARN_MIN: f64 = 600.0;

/// Grade of a cloth test, ordered by severity (`Pass < Warning < Fail`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClothResult {
    Pass,
    Warning,
    Fail,
}

impl ClothResult {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pass" => Some(ClothResult::Pass),
            "warning" => Some(ClothResult::Warning),
            "fail" => Some(ClothResult::Fail),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ClothResult::Pass => "pass",
            ClothResult::Warning => "warning",
            ClothResult::Fail => "fail",
        }
    }
}

/// Porosity measuring instrument
///
/// The instrument decides the direction of the scale: mechanical
/// porosimeters report a flow (lower is better), the JDC reports the time
/// a fixed air volume takes to pass (higher is better).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum PorosityMethod {
    Bettsometer,
    Porotest,
    Porosimeter,
    Jdc,
}

impl PorosityMethod {
    /// Parse a stored method name; unknown names fall back to the
    /// mechanical (lower is better) family
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "jdc" => PorosityMethod::Jdc,
            "porotest" => PorosityMethod::Porotest,
            "bettsometer" => PorosityMethod::Bettsometer,
            _ => PorosityMethod::Porosimeter,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PorosityMethod::Bettsometer => "bettsometer",
            PorosityMethod::Porotest => "porotest",
            PorosityMethod::Porosimeter => "porosimeter",
            PorosityMethod::Jdc => "jdc",
        }
    }

    /// True for timed methods where a higher reading is better
    pub fn higher_is_better(&self) -> bool {
        matches!(self, PorosityMethod::Jdc)
    }

    pub fn unit(&self) -> &'static str {
        if self.higher_is_better() {
            "s"
        } else {
            "L/m²/min"
        }
    }
}

impl From<String> for PorosityMethod {
    fn from(s: String) -> Self {
        PorosityMethod::from_str(&s)
    }
}

/// Graded single measurement
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub result: ClothResult,
    pub label: &'static str,
    pub detail: String,
}

/// Grade a porosity reading for the given instrument
pub fn evaluate_porosity(value: f64, method: PorosityMethod) -> Evaluation {
    if method.higher_is_better() {
        if value > JDC_PASS_ABOVE {
            return Evaluation {
                result: ClothResult::Pass,
                label: "Pass",
                detail: format!("{}s > 15s threshold", value),
            };
        }
        if value >= JDC_WARN_MIN {
            return Evaluation {
                result: ClothResult::Warning,
                label: "Warning",
                detail: format!(
                    "{}s in 10-15s warning range, fabric stiffness may be degrading",
                    value
                ),
            };
        }
        return Evaluation {
            result: ClothResult::Fail,
            label: "Investigation",
            detail: format!(
                "{}s < 10s, high permeability, airworthiness investigation required",
                value
            ),
        };
    }

    if value < POROSIMETER_PASS_BELOW {
        return Evaluation {
            result: ClothResult::Pass,
            label: "Pass",
            detail: format!("{} L/m²/min < 360 threshold", value),
        };
    }
    if value <= POROSIMETER_WARN_MAX {
        return Evaluation {
            result: ClothResult::Warning,
            label: "Warning",
            detail: format!(
                "{} L/m²/min in 360-540 warning range, fabric stiffness may be degrading",
                value
            ),
        };
    }
    Evaluation {
        result: ClothResult::Fail,
        label: "Investigation",
        detail: format!(
            "{} L/m²/min > 540, high permeability, airworthiness investigation required",
            value
        ),
    }
}

/// Grade a tear resistance reading in grams
pub fn evaluate_tear_resistance(grams: f64) -> Evaluation {
    if grams > TEAR_PASS_ABOVE {
        return Evaluation {
            result: ClothResult::Pass,
            label: "Good",
            detail: format!("{}g > 800g, cloth in good condition", grams),
        };
    }
    if grams >= TEAR_WARN_MIN {
        return Evaluation {
            result: ClothResult::Warning,
            label: "Used",
            detail: format!("{}g in 600-800g range, cloth showing wear", grams),
        };
    }
    Evaluation {
        result: ClothResult::Fail,
        label: "Not Airworthy",
        detail: format!("{}g < 600g, structural integrity compromised", grams),
    }
}

/// Worst grade of the readings present at one test point
///
/// Porosity only counts when both the value and its method are known.
/// Returns `None` when nothing was measured.
pub fn auto_cloth_result(
    porosity_value: Option<f64>,
    porosity_method: Option<PorosityMethod>,
    tear_grams: Option<f64>,
) -> Option<ClothResult> {
    let porosity = porosity_value
        .zip(porosity_method)
        .map(|(value, method)| evaluate_porosity(value, method).result);
    let tear = tear_grams.map(|g| evaluate_tear_resistance(g).result);

    porosity.into_iter().chain(tear).max()
}

/// Canopy surface a sample was taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Surface {
    Top,
    Bottom,
    Internal,
}

impl Surface {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "top" => Some(Surface::Top),
            "bottom" => Some(Surface::Bottom),
            "internal" => Some(Surface::Internal),
            _ => None,
        }
    }
}

/// Surface names are matched case-insensitively; unknown names read as absent
fn lenient_surface<'de, D>(deserializer: D) -> std::result::Result<Option<Surface>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(Surface::from_str))
}

/// One cloth test point as recorded by the technician
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClothTestRecord {
    #[serde(default, deserialize_with = "lenient_surface")]
    pub surface: Option<Surface>,
    #[serde(default)]
    pub panel_zone: Option<String>,
    #[serde(default)]
    pub cell_id: Option<String>,
    #[serde(default)]
    pub porosity_value: Option<f64>,
    #[serde(default)]
    pub porosity_method: Option<PorosityMethod>,
    #[serde(default, rename = "tearResistanceG", alias = "tearResistance")]
    pub tear_resistance_g: Option<f64>,
    /// Stored grade; takes precedence over recomputation
    #[serde(default)]
    pub result: Option<ClothResult>,
}

impl ClothTestRecord {
    /// Empty test point on a given surface cell
    pub fn skeleton(surface: Surface, cell_id: impl Into<String>) -> Self {
        Self {
            surface: Some(surface),
            panel_zone: None,
            cell_id: Some(cell_id.into()),
            porosity_value: None,
            porosity_method: None,
            tear_resistance_g: None,
            result: None,
        }
    }

    /// Stored result, or the grade computed from the readings
    pub fn effective_result(&self) -> Option<ClothResult> {
        self.result.or_else(|| {
            auto_cloth_result(self.porosity_value, self.porosity_method, self.tear_resistance_g)
        })
    }
}

/// Standard starting set: top-surface cells 2, 4, 6 and 8
pub fn default_test_points() -> Vec<ClothTestRecord> {
    ["2", "4", "6", "8"]
        .into_iter()
        .map(|cell| ClothTestRecord::skeleton(Surface::Top, cell))
        .collect()
}

/// Aggregate of all cloth tests of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClothSummary {
    pub total_tests: usize,
    pub pass_count: usize,
    pub warning_count: usize,
    pub fail_count: usize,
    pub overall_result: ClothResult,
    pub porosity_avg: Option<f64>,
    pub tear_avg: Option<f64>,
}

/// Count grades and average the readings of a set of cloth tests
///
/// Tests without any grade are counted in `total_tests` only. An empty
/// set summarizes as `pass`.
pub fn summarize_cloth_tests(tests: &[ClothTestRecord]) -> ClothSummary {
    let mut pass_count = 0;
    let mut warning_count = 0;
    let mut fail_count = 0;

    for test in tests {
        match test.effective_result() {
            Some(ClothResult::Pass) => pass_count += 1,
            Some(ClothResult::Warning) => warning_count += 1,
            Some(ClothResult::Fail) => fail_count += 1,
            None => {}
        }
    }

    let overall_result = if fail_count > 0 {
        ClothResult::Fail
    } else if warning_count > 0 {
        ClothResult::Warning
    } else {
        ClothResult::Pass
    };

    ClothSummary {
        total_tests: tests.len(),
        pass_count,
        warning_count,
        fail_count,
        overall_result,
        porosity_avg: mean(tests.iter().filter_map(|t| t.porosity_value)),
        tear_avg: mean(tests.iter().filter_map(|t| t.tear_resistance_g)),
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BETTS: PorosityMethod = PorosityMethod::Bettsometer;

    fn record(porosity: Option<f64>, tear: Option<f64>, result: Option<ClothResult>) -> ClothTestRecord {
        ClothTestRecord {
            surface: Some(Surface::Top),
            panel_zone: None,
            cell_id: None,
            porosity_value: porosity,
            porosity_method: porosity.map(|_| BETTS),
            tear_resistance_g: tear,
            result,
        }
    }

    #[test]
    fn test_porosimeter_boundaries() {
        assert_eq!(evaluate_porosity(200.0, BETTS).result, ClothResult::Pass);
        assert_eq!(evaluate_porosity(359.0, BETTS).result, ClothResult::Pass);
        assert_eq!(evaluate_porosity(360.0, BETTS).result, ClothResult::Warning);
        assert_eq!(evaluate_porosity(540.0, BETTS).result, ClothResult::Warning);
        assert_eq!(evaluate_porosity(541.0, BETTS).result, ClothResult::Fail);
        assert_eq!(evaluate_porosity(541.0, BETTS).label, "Investigation");
    }

    #[test]
    fn test_jdc_boundaries() {
        let jdc = PorosityMethod::Jdc;
        assert_eq!(evaluate_porosity(16.0, jdc).result, ClothResult::Pass);
        assert_eq!(evaluate_porosity(15.0, jdc).result, ClothResult::Warning);
        assert_eq!(evaluate_porosity(10.0, jdc).result, ClothResult::Warning);
        assert_eq!(evaluate_porosity(9.9, jdc).result, ClothResult::Fail);
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!(PorosityMethod::from_str("JDC"), PorosityMethod::Jdc);
        assert_eq!(PorosityMethod::from_str("porotest"), PorosityMethod::Porotest);
        assert_eq!(PorosityMethod::from_str("unheard-of"), PorosityMethod::Porosimeter);
        assert!(!PorosityMethod::from_str("bettsometer").higher_is_better());
        assert_eq!(PorosityMethod::Jdc.unit(), "s");
    }

    #[test]
    fn test_tear_boundaries() {
        assert_eq!(evaluate_tear_resistance(801.0).result, ClothResult::Pass);
        assert_eq!(evaluate_tear_resistance(800.0).result, ClothResult::Warning);
        assert_eq!(evaluate_tear_resistance(600.0).result, ClothResult::Warning);
        assert_eq!(evaluate_tear_resistance(599.0).result, ClothResult::Fail);
        assert_eq!(evaluate_tear_resistance(599.0).label, "Not Airworthy");
    }

    #[test]
    fn test_non_finite_reading_fails() {
        assert_eq!(evaluate_porosity(f64::NAN, BETTS).result, ClothResult::Fail);
        assert_eq!(evaluate_porosity(f64::NAN, PorosityMethod::Jdc).result, ClothResult::Fail);
        assert_eq!(evaluate_tear_resistance(f64::NAN).result, ClothResult::Fail);
    }

    #[test]
    fn test_auto_result() {
        assert_eq!(auto_cloth_result(None, None, None), None);
        assert_eq!(auto_cloth_result(Some(200.0), Some(BETTS), None), Some(ClothResult::Pass));
        assert_eq!(auto_cloth_result(None, None, Some(500.0)), Some(ClothResult::Fail));
        assert_eq!(auto_cloth_result(Some(200.0), Some(BETTS), Some(500.0)), Some(ClothResult::Fail));
        assert_eq!(auto_cloth_result(Some(400.0), Some(BETTS), Some(900.0)), Some(ClothResult::Warning));
        // Porosity without a method is ignored
        assert_eq!(auto_cloth_result(Some(900.0), None, Some(900.0)), Some(ClothResult::Pass));
        assert_eq!(auto_cloth_result(Some(900.0), None, None), None);
    }

    #[test]
    fn test_summary_mixed() {
        let summary = summarize_cloth_tests(&[
            record(Some(200.0), Some(900.0), None),
            record(Some(400.0), Some(700.0), None),
            record(Some(600.0), Some(500.0), None),
        ]);

        assert_eq!(summary.total_tests, 3);
        assert_eq!(summary.pass_count, 1);
        assert_eq!(summary.warning_count, 1);
        assert_eq!(summary.fail_count, 1);
        assert_eq!(summary.overall_result, ClothResult::Fail);
        assert_eq!(summary.porosity_avg, Some(400.0));
        assert_eq!(summary.tear_avg, Some(700.0));
    }

    #[test]
    fn test_summary_stored_result_wins() {
        let summary = summarize_cloth_tests(&[record(Some(200.0), Some(900.0), Some(ClothResult::Warning))]);
        assert_eq!(summary.warning_count, 1);
        assert_eq!(summary.pass_count, 0);
        assert_eq!(summary.overall_result, ClothResult::Warning);
    }

    #[test]
    fn test_summary_of_skeletons() {
        let points = default_test_points();
        assert_eq!(points.len(), 4);
        assert_eq!(points[3].cell_id.as_deref(), Some("8"));

        let summary = summarize_cloth_tests(&points);
        assert_eq!(summary.total_tests, 4);
        assert_eq!(summary.pass_count + summary.warning_count + summary.fail_count, 0);
        assert_eq!(summary.overall_result, ClothResult::Pass);
        assert_eq!(summary.porosity_avg, None);
        assert_eq!(summary.tear_avg, None);
    }

    #[test]
    fn test_record_deserializes_from_stored_shape() {
        let record: ClothTestRecord = serde_json::from_str(
            r#"{"surface":"top","cellId":"4","porosityValue":12,"porosityMethod":"jdc","tearResistance":750,"result":null}"#,
        )
        .unwrap();
        assert_eq!(record.tear_resistance_g, Some(750.0));
        assert_eq!(record.effective_result(), Some(ClothResult::Warning));
    }

    #[test]
    fn test_record_fields_parse_leniently() {
        let records: Vec<ClothTestRecord> = serde_json::from_str(
            r#"[
                {"surface":"TOP","porosityValue":12,"porosityMethod":"JDC"},
                {"surface":"Bottom","porosityValue":400,"porosityMethod":"Porosimeter"},
                {"surface":"leading edge","porosityValue":400,"porosityMethod":"airflow-x"},
                {"porosityValue":100}
            ]"#,
        )
        .unwrap();

        assert_eq!(records.len(), 4);
        assert_eq!(records[0].surface, Some(Surface::Top));
        assert_eq!(records[0].porosity_method, Some(PorosityMethod::Jdc));
        assert_eq!(records[1].surface, Some(Surface::Bottom));
        assert_eq!(records[1].porosity_method, Some(PorosityMethod::Porosimeter));
        assert_eq!(records[2].surface, None);
        assert_eq!(records[2].porosity_method, Some(PorosityMethod::Porosimeter));
        assert_eq!(records[2].effective_result(), Some(ClothResult::Warning));
        assert_eq!(records[3].surface, None);
        assert_eq!(records[3].porosity_method, None);
    }

    #[test]
    fn test_porosity_method_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&PorosityMethod::Jdc).unwrap(), r#""jdc""#);
        assert_eq!(PorosityMethod::from_str(PorosityMethod::Porotest.as_str()), PorosityMethod::Porotest);
    }
}
