//! Loop matrix and correction log
//!
//! The current number of shortening loops per (row, group) is never stored
//! and patched. It is derived by folding the append-only correction log, in
//! creation order, over the snapshot captured at intake. Deleting a
//! correction means folding the remaining log again.
//!
//! The fold is prefix-composable: folding `a ++ b` from `m0` gives the same
//! matrix as folding `b` from the result of folding `a` from `m0`.

use crate::reference::GroupMapping;
use crate::types::Side;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionType {
    LoopAdd,
    LoopRemove,
    LineReplace,
    Other,
}

impl CorrectionType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "loop_add" => Some(CorrectionType::LoopAdd),
            "loop_remove" => Some(CorrectionType::LoopRemove),
            "line_replace" => Some(CorrectionType::LineReplace),
            "other" => Some(CorrectionType::Other),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CorrectionType::LoopAdd => "loop_add",
            CorrectionType::LoopRemove => "loop_remove",
            CorrectionType::LineReplace => "line_replace",
            CorrectionType::Other => "other",
        }
    }

    /// Sign of the loop change this type implies, 0 for non-loop work
    fn expected_sign(&self) -> i64 {
        match self {
            CorrectionType::LoopAdd => 1,
            CorrectionType::LoopRemove => -1,
            CorrectionType::LineReplace | CorrectionType::Other => 0,
        }
    }
}

/// One physical correction made by the technician
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionRecord {
    pub id: Uuid,
    pub row: String,
    /// 1-indexed line position
    pub position: u32,
    pub side: Side,
    /// Explicit group label; resolved from the mapping when absent
    #[serde(default)]
    pub group_label: Option<String>,
    pub correction_type: CorrectionType,
    #[serde(default)]
    pub loops_before: Option<u32>,
    #[serde(default)]
    pub loops_after: Option<u32>,
    /// 1..=5
    #[serde(default)]
    pub loop_type: Option<u8>,
    #[serde(default)]
    pub shortening_mm: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CorrectionRecord {
    pub fn new(row: impl Into<String>, position: u32, side: Side, correction_type: CorrectionType) -> Self {
        Self {
            id: Uuid::new_v4(),
            row: row.into(),
            position,
            side,
            group_label: None,
            correction_type,
            loops_before: None,
            loops_after: None,
            loop_type: None,
            shortening_mm: None,
            notes: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_loops(mut self, before: u32, after: u32) -> Self {
        self.loops_before = Some(before);
        self.loops_after = Some(after);
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group_label = Some(group.into());
        self
    }

    pub fn with_loop_type(mut self, loop_type: u8, shortening_mm: f64) -> Self {
        self.loop_type = Some(loop_type);
        self.shortening_mm = Some(shortening_mm);
        self
    }

    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = at;
        self
    }

    /// Loop change carried by the record itself
    ///
    /// `after - before` when both are recorded, otherwise one loop in the
    /// direction of the correction type.
    pub fn delta(&self) -> i64 {
        match (self.loops_before, self.loops_after) {
            (Some(before), Some(after)) => after as i64 - before as i64,
            _ => self.correction_type.expected_sign(),
        }
    }
}

/// Loop counts of one wing side, row -> group -> count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopMatrix {
    pub side: Side,
    pub cells: BTreeMap<String, BTreeMap<String, u32>>,
}

impl LoopMatrix {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            cells: BTreeMap::new(),
        }
    }

    /// Read an intake snapshot shaped `{ row: { group: count } }`
    ///
    /// Non-numeric and negative counts are dropped.
    pub fn from_snapshot(side: Side, raw: &Value) -> Self {
        let mut matrix = Self::new(side);
        let Some(rows) = raw.as_object() else {
            debug!(side = %side, "Loop snapshot is not an object, starting empty");
            return matrix;
        };
        for (row, groups) in rows {
            let Some(groups) = groups.as_object() else {
                continue;
            };
            for (group, count) in groups {
                if let Some(count) = count.as_u64().and_then(|c| u32::try_from(c).ok()) {
                    matrix.set(row, group, count);
                }
            }
        }
        matrix
    }

    /// Count at a cell; missing cells hold zero loops
    pub fn get(&self, row: &str, group: &str) -> u32 {
        self.cells
            .get(row)
            .and_then(|groups| groups.get(group))
            .copied()
            .unwrap_or(0)
    }

    pub fn set(&mut self, row: &str, group: &str, count: u32) {
        self.cells
            .entry(row.to_string())
            .or_default()
            .insert(group.to_string(), count);
    }

    /// Sum of all loops on this side
    pub fn total(&self) -> u64 {
        self.cells.values().flat_map(|g| g.values()).map(|c| *c as u64).sum()
    }
}

/// Inconsistency found while folding; the fold still completes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LoopAnomaly {
    /// Neither a group label nor the mapping identifies the cell
    UnresolvedGroup { record_id: Uuid, row: String, position: u32 },
    /// Recorded `loops_before` differs from the folded count
    CountMismatch {
        record_id: Uuid,
        row: String,
        group: String,
        recorded: u32,
        folded: u32,
    },
    /// Recorded change contradicts the correction type
    DirectionMismatch {
        record_id: Uuid,
        correction_type: CorrectionType,
        delta: i64,
    },
    /// Fold went below zero and was clamped
    ClampedAtZero {
        record_id: Uuid,
        row: String,
        group: String,
        unclamped: i64,
    },
}

/// Result of a fold: the matrix plus anomalies met on the way
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopFold {
    pub matrix: LoopMatrix,
    pub anomalies: Vec<LoopAnomaly>,
}

impl LoopFold {
    pub fn new(initial: LoopMatrix) -> Self {
        Self {
            matrix: initial,
            anomalies: Vec::new(),
        }
    }

    /// Continue the fold with more records
    pub fn then(mut self, corrections: &[CorrectionRecord], mappings: &GroupMapping) -> Self {
        for record in corrections {
            self.apply(record, mappings);
        }
        self
    }

    fn apply(&mut self, record: &CorrectionRecord, mappings: &GroupMapping) {
        if record.side != self.matrix.side {
            return;
        }
        if !matches!(
            record.correction_type,
            CorrectionType::LoopAdd | CorrectionType::LoopRemove
        ) {
            return;
        }

        let group = match record
            .group_label
            .clone()
            .or_else(|| mappings.group_at(&record.row, record.position))
        {
            Some(group) => group,
            None => {
                self.flag(LoopAnomaly::UnresolvedGroup {
                    record_id: record.id,
                    row: record.row.clone(),
                    position: record.position,
                });
                return;
            }
        };

        let current = self.matrix.get(&record.row, &group);
        if let Some(recorded) = record.loops_before {
            if recorded != current {
                self.flag(LoopAnomaly::CountMismatch {
                    record_id: record.id,
                    row: record.row.clone(),
                    group: group.clone(),
                    recorded,
                    folded: current,
                });
            }
        }

        let delta = record.delta();
        if delta.signum() != record.correction_type.expected_sign() {
            self.flag(LoopAnomaly::DirectionMismatch {
                record_id: record.id,
                correction_type: record.correction_type,
                delta,
            });
        }

        let unclamped = current as i64 + delta;
        let next = if unclamped < 0 {
            self.flag(LoopAnomaly::ClampedAtZero {
                record_id: record.id,
                row: record.row.clone(),
                group: group.clone(),
                unclamped,
            });
            0
        } else {
            u32::try_from(unclamped).unwrap_or(u32::MAX)
        };
        self.matrix.set(&record.row, &group, next);
    }

    fn flag(&mut self, anomaly: LoopAnomaly) {
        warn!(side = %self.matrix.side, ?anomaly, "Loop fold anomaly");
        self.anomalies.push(anomaly);
    }
}

/// Fold `corrections` in the given order over `initial`
///
/// Only loop additions and removals for the matrix's side change counts.
pub fn build_loop_matrix(
    initial: &LoopMatrix,
    corrections: &[CorrectionRecord],
    mappings: &GroupMapping,
) -> LoopFold {
    LoopFold::new(initial.clone()).then(corrections, mappings)
}

/// Append-only log of corrections in creation order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorrectionLog {
    records: Vec<CorrectionRecord>,
}

impl CorrectionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a log from records fetched in any order
    ///
    /// Records are ordered by `created_at`; ties keep their input order.
    pub fn from_unordered(mut records: Vec<CorrectionRecord>) -> Self {
        records.sort_by_key(|r| r.created_at);
        Self { records }
    }

    pub fn push(&mut self, record: CorrectionRecord) {
        self.records.push(record);
    }

    /// Drop a record; the matrix is recovered by folding again
    pub fn remove(&mut self, id: Uuid) -> Option<CorrectionRecord> {
        let idx = self.records.iter().position(|r| r.id == id)?;
        Some(self.records.remove(idx))
    }

    pub fn records(&self) -> &[CorrectionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn fold_onto(&self, initial: &LoopMatrix, mappings: &GroupMapping) -> LoopFold {
        build_loop_matrix(initial, &self.records, mappings)
    }
}
