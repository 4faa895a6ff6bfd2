//! Shared measurement types
//!
//! Sides, phases and technician-entered line measurements used by both the
//! trim and the symmetry analysis.

use serde::{Deserialize, Serialize};

/// Wing side a line or correction belongs to (pilot's view)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Parse side from its stored string ("left" / "right", case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "left" | "l" => Some(Side::Left),
            "right" | "r" => Some(Side::Right),
            _ => None,
        }
    }

    /// Canonical stored string
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }

    /// The other side of the wing
    pub fn opposite(&self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Measurement phase within a service session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// As received, before any correction
    Initial,
    /// After trim corrections were applied
    Corrected,
}

impl Phase {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "initial" => Some(Phase::Initial),
            "corrected" => Some(Phase::Corrected),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Initial => "initial",
            Phase::Corrected => "corrected",
        }
    }
}

/// A single measured line length entered by the technician
///
/// Position is 1-indexed, matching the manufacturer line plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasuredLine {
    pub row: String,
    pub position: u32,
    pub side: Side,
    pub phase: Phase,
    pub measured_length_mm: f64,
}

impl MeasuredLine {
    pub fn new(
        row: impl Into<String>,
        position: u32,
        side: Side,
        phase: Phase,
        measured_length_mm: f64,
    ) -> Self {
        Self {
            row: row.into(),
            position,
            side,
            phase,
            measured_length_mm,
        }
    }
}

/// All measurements of one session, keyed by phase and side
///
/// Saving a batch for a (phase, side) replaces whatever was stored for that
/// pair. Batches are never merged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeasurementSet {
    lines: Vec<MeasuredLine>,
}

impl MeasurementSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored batch for `phase` + `side`
    ///
    /// Entries in `batch` whose phase or side differ from the target are
    /// rewritten to the target pair.
    pub fn replace(&mut self, phase: Phase, side: Side, batch: Vec<MeasuredLine>) {
        self.lines.retain(|m| !(m.phase == phase && m.side == side));
        self.lines.extend(batch.into_iter().map(|mut m| {
            m.phase = phase;
            m.side = side;
            m
        }));
    }

    /// Measurements of one phase and side, in entry order
    pub fn batch(&self, phase: Phase, side: Side) -> Vec<MeasuredLine> {
        self.lines
            .iter()
            .filter(|m| m.phase == phase && m.side == side)
            .cloned()
            .collect()
    }

    /// Measurements of one phase across both sides
    pub fn phase(&self, phase: Phase) -> Vec<MeasuredLine> {
        self.lines.iter().filter(|m| m.phase == phase).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
