//! Manufacturer reference data parsing
//!
//! Reference geometry arrives as loosely-shaped JSON produced by the line
//! plan extraction tooling: a flat array of line length entries and a
//! per-row group label document. Both are normalized here into typed
//! tables. Malformed or absent structure degrades to an empty table, never
//! to an error.
//!
//! # Payload shapes
//!
//! ```text
//! line lengths (flat):    [{ "row": "A", "position": 1, "cascade": 1, "lengthMm": 6425 }, ...]
//! line lengths (compact): { "A": [6425, 6395, null, ...], "B": [...] }
//! group mappings:         { "A": ["G1A", "G1A", null, "STA"], "B": [...] }
//! ```
//!
//! Group labels carry the row letter as their last character, so `"G1A"`
//! and `"G1B"` belong to the same group `"G1"`. A row may map onto another
//! row's label (e.g. D positions labelled `"G1C"`), which keeps that row out
//! of the group's own row list.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::debug;

/// Leading-to-trailing order of line rows (K = brake lines)
pub const ROW_ORDER: &[&str] = &["A", "B", "C", "D", "E", "K"];

/// Only cascade-1 lengths (nearest the risers) take part in trim analysis
pub const PRIMARY_CASCADE: u32 = 1;

/// Outcome of parsing an external payload
///
/// `Absent` means the payload had no usable structure at all; callers that
/// only need the data can use [`Parsed::unwrap_or_default`].
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed<T> {
    Present(T),
    Absent,
}

impl<T: Default> Parsed<T> {
    pub fn unwrap_or_default(self) -> T {
        match self {
            Parsed::Present(value) => value,
            Parsed::Absent => T::default(),
        }
    }
}

impl<T> Parsed<T> {
    pub fn is_present(&self) -> bool {
        matches!(self, Parsed::Present(_))
    }
}

/// One manufacturer line length entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceLineLength {
    pub row: String,
    /// 1-indexed position within the row
    pub position: u32,
    pub cascade: u32,
    pub length_mm: f64,
}

/// Entry as it may appear in the payload: every field optional
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawLineLengthEntry {
    #[serde(alias = "lineRow")]
    row: Option<String>,
    position: Option<f64>,
    cascade: Option<f64>,
    length_mm: Option<f64>,
}

impl RawLineLengthEntry {
    fn into_typed(self) -> Option<ReferenceLineLength> {
        let row = self.row.filter(|r| !r.trim().is_empty())?;
        let position = as_index(self.position?)?;
        let cascade = as_index(self.cascade?)?;
        let length_mm = self.length_mm.filter(|l| l.is_finite())?;
        Some(ReferenceLineLength {
            row: row.trim().to_string(),
            position,
            cascade,
            length_mm,
        })
    }
}

/// Accept only whole numbers >= 1
fn as_index(v: f64) -> Option<u32> {
    if v.is_finite() && v >= 1.0 && v.fract() == 0.0 && v <= u32::MAX as f64 {
        Some(v as u32)
    } else {
        None
    }
}

/// Cascade-1 reference lengths, row -> per-position length (index = position - 1)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineLengthTable {
    rows: BTreeMap<String, Vec<Option<f64>>>,
}

impl LineLengthTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from typed entries, keeping cascade 1 only
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a ReferenceLineLength>) -> Self {
        let mut table = Self::new();
        for e in entries {
            if e.cascade == PRIMARY_CASCADE {
                table.insert(&e.row, e.position, e.length_mm);
            }
        }
        table
    }

    /// Set the length of `row` at 1-indexed `position`
    pub fn insert(&mut self, row: &str, position: u32, length_mm: f64) {
        if position == 0 {
            return;
        }
        let slots = self.rows.entry(row.to_string()).or_default();
        let idx = (position - 1) as usize;
        if slots.len() <= idx {
            slots.resize(idx + 1, None);
        }
        slots[idx] = Some(length_mm);
    }

    /// Length at 1-indexed `position`
    pub fn length(&self, row: &str, position: u32) -> Option<f64> {
        if position == 0 {
            return None;
        }
        self.rows
            .get(row)
            .and_then(|slots| slots.get((position - 1) as usize))
            .copied()
            .flatten()
    }

    /// Per-position slots of one row
    pub fn row(&self, row: &str) -> Option<&[Option<f64>]> {
        self.rows.get(row).map(|v| v.as_slice())
    }

    pub fn rows(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(|k| k.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.rows.values().all(|slots| slots.iter().all(Option::is_none))
    }
}

/// Manufacturer group labels, row -> per-position label (index = position - 1)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupMapping {
    rows: BTreeMap<String, Vec<Option<String>>>,
}

/// A pair of rows compared by differential measurement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowPair {
    pub row_a: String,
    pub row_b: String,
}

impl GroupMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the labels of one row
    pub fn set_row(&mut self, row: &str, labels: Vec<Option<String>>) {
        self.rows.insert(row.to_string(), labels);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.values().all(|labels| labels.iter().all(Option::is_none))
    }

    /// Unique group base names, numeric-aware, stabilo (`ST*`) groups last
    ///
    /// `{"A": ["G1A", "G2A", "STA"], "B": ["G10B"]}` -> `["G1", "G2", "G10", "ST"]`
    pub fn groups(&self) -> Vec<String> {
        let mut groups: Vec<String> = self
            .rows
            .values()
            .flatten()
            .flatten()
            .filter_map(|label| group_base(label))
            .map(str::to_string)
            .collect();
        groups.sort_by(|a, b| compare_groups(a, b));
        groups.dedup();
        groups
    }

    /// 0-based positions of `row` labelled `<group><row>`
    pub fn positions(&self, group: &str, row: &str) -> Vec<usize> {
        let target = format!("{}{}", group, row);
        self.rows
            .get(row)
            .map(|labels| {
                labels
                    .iter()
                    .enumerate()
                    .filter(|(_, l)| l.as_deref() == Some(target.as_str()))
                    .map(|(i, _)| i)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Rows that carry their own label for `group`, leading to trailing
    pub fn rows_of(&self, group: &str) -> Vec<String> {
        let mut rows: Vec<String> = self
            .rows
            .iter()
            .filter(|(row, labels)| {
                let target = format!("{}{}", group, row);
                labels.iter().any(|l| l.as_deref() == Some(target.as_str()))
            })
            .map(|(row, _)| row.clone())
            .collect();
        rows.sort_by(|a, b| compare_rows(a, b));
        rows
    }

    /// Differential pairs of a group: row A against every other member row
    ///
    /// A group without an A row has no pairs.
    pub fn pairs(&self, group: &str) -> Vec<RowPair> {
        let rows = self.rows_of(group);
        if !rows.iter().any(|r| r == "A") {
            return Vec::new();
        }
        rows.into_iter()
            .filter(|r| r != "A")
            .map(|row_b| RowPair {
                row_a: "A".to_string(),
                row_b,
            })
            .collect()
    }

    /// Group base name at 1-indexed `position` of `row`
    pub fn group_at(&self, row: &str, position: u32) -> Option<String> {
        if position == 0 {
            return None;
        }
        self.rows
            .get(row)?
            .get((position - 1) as usize)?
            .as_deref()
            .and_then(group_base)
            .map(str::to_string)
    }
}

/// `"G1A"` -> `"G1"`; labels shorter than two characters have no base
fn group_base(label: &str) -> Option<&str> {
    let (idx, _) = label.char_indices().last()?;
    if idx == 0 {
        None
    } else {
        Some(&label[..idx])
    }
}

/// Whether a group is a stabilo group (excluded from profile shape)
pub fn is_stabilo_group(group: &str) -> bool {
    group.starts_with("ST")
}

/// Order rows leading to trailing; unknown rows sort after, alphabetically
pub fn compare_rows(a: &str, b: &str) -> Ordering {
    let rank = |r: &str| ROW_ORDER.iter().position(|o| *o == r).unwrap_or(ROW_ORDER.len());
    rank(a).cmp(&rank(b)).then_with(|| a.cmp(b))
}

fn compare_groups(a: &str, b: &str) -> Ordering {
    match (is_stabilo_group(a), is_stabilo_group(b)) {
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        _ => natural_cmp(a, b),
    }
}

/// Compare strings with embedded numbers numerically ("G2" < "G10")
fn natural_cmp(a: &str, b: &str) -> Ordering {
    let chunks_a = chunks(a);
    let chunks_b = chunks(b);
    for (x, y) in chunks_a.iter().zip(chunks_b.iter()) {
        let ord = match (x.parse::<u64>(), y.parse::<u64>()) {
            (Ok(nx), Ok(ny)) => nx.cmp(&ny),
            _ => x.cmp(y),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    chunks_a.len().cmp(&chunks_b.len())
}

fn chunks(s: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut prev_digit: Option<bool> = None;
    for (i, c) in s.char_indices() {
        let digit = c.is_ascii_digit();
        if let Some(p) = prev_digit {
            if p != digit {
                out.push(&s[start..i]);
                start = i;
            }
        }
        prev_digit = Some(digit);
    }
    if start < s.len() {
        out.push(&s[start..]);
    }
    out
}

/// Read the flat line length array, keeping cascade-1 entries
pub fn read_line_length_entries(raw: &Value) -> Parsed<LineLengthTable> {
    let Some(items) = raw.as_array() else {
        debug!("Line length payload is not an array, ignoring");
        return Parsed::Absent;
    };

    let entries: Vec<ReferenceLineLength> = items
        .iter()
        .filter_map(|item| {
            serde_json::from_value::<RawLineLengthEntry>(item.clone())
                .ok()
                .and_then(RawLineLengthEntry::into_typed)
        })
        .collect();

    let dropped = items.len() - entries.len();
    if dropped > 0 {
        debug!(dropped, "Dropped malformed line length entries");
    }

    let table = LineLengthTable::from_entries(&entries);
    if table.is_empty() {
        Parsed::Absent
    } else {
        Parsed::Present(table)
    }
}

/// Parse the flat line length array; malformed input yields an empty table
pub fn parse_line_length_entries(raw: &Value) -> LineLengthTable {
    read_line_length_entries(raw).unwrap_or_default()
}

/// Read the compact `{ row: [length | null, ...] }` shape
pub fn read_ref_lengths(raw: &Value) -> Parsed<LineLengthTable> {
    let Some(obj) = raw.as_object() else {
        return Parsed::Absent;
    };

    let mut table = LineLengthTable::new();
    for (row, lengths) in obj {
        let Some(lengths) = lengths.as_array() else {
            continue;
        };
        for (i, v) in lengths.iter().enumerate() {
            if let Some(len) = v.as_f64().filter(|l| l.is_finite()) {
                table.insert(row, i as u32 + 1, len);
            }
        }
    }

    if table.is_empty() {
        Parsed::Absent
    } else {
        Parsed::Present(table)
    }
}

pub fn parse_ref_lengths(raw: &Value) -> LineLengthTable {
    read_ref_lengths(raw).unwrap_or_default()
}

/// Read the `{ row: [label | null, ...] }` group mapping document
pub fn read_group_mappings(raw: &Value) -> Parsed<GroupMapping> {
    let Some(obj) = raw.as_object() else {
        debug!("Group mapping payload is not an object, ignoring");
        return Parsed::Absent;
    };

    let mut mapping = GroupMapping::new();
    for (row, labels) in obj {
        if let Some(labels) = labels.as_array() {
            let labels = labels
                .iter()
                .map(|v| v.as_str().map(str::to_string))
                .collect();
            mapping.set_row(row, labels);
        }
    }

    if mapping.is_empty() {
        Parsed::Absent
    } else {
        Parsed::Present(mapping)
    }
}

/// Parse the group mapping document; malformed input yields an empty mapping
pub fn parse_group_mappings(raw: &Value) -> GroupMapping {
    read_group_mappings(raw).unwrap_or_default()
}
