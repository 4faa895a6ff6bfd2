//! # Paramot Rigging Engine
//!
//! Airworthiness calculations for paraglider servicing:
//! - Reference data parsing (manufacturer line lengths, group mappings)
//! - Cloth assessment (porosity, tear resistance)
//! - Line strength analysis (load distribution, thresholds, test verdicts)
//! - Trim analysis (differentials, profile shape, symmetry, loop matrix,
//!   correction suggestions)
//!
//! All engines are pure functions over in-memory data. Persistence and
//! presentation belong to the caller.

pub mod cloth;
pub mod config;
pub mod error;
pub mod reference;
pub mod strength;
pub mod trim;
pub mod types;

pub use config::EngineConfig;
pub use error::{Error, Result};
pub use types::{MeasuredLine, MeasurementSet, Phase, Side};
