//! Global tracing subscriber installation
//!
//! Kept in its own test binary: a process can install only one global
//! subscriber.

use paramot_rigging::config::{init_tracing, LoggingConfig};
use paramot_rigging::trim::{build_loop_matrix, CorrectionRecord, CorrectionType, LoopMatrix};
use paramot_rigging::reference::GroupMapping;
use paramot_rigging::Side;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_init_tracing_writes_to_file_once() {
    std::env::remove_var("RUST_LOG");
    let dir = TempDir::new().unwrap();
    let log_path = dir.path().join("rigging.log");
    let logging = LoggingConfig {
        level: "warn".to_string(),
        file: Some(log_path.clone()),
    };

    init_tracing(&logging).unwrap();

    // Unmapped correction: the fold warns about an unresolved group
    let record = CorrectionRecord::new("B", 1, Side::Left, CorrectionType::LoopAdd);
    let fold = build_loop_matrix(&LoopMatrix::new(Side::Left), &[record], &GroupMapping::new());
    assert_eq!(fold.anomalies.len(), 1);

    let written = fs::read_to_string(&log_path).unwrap();
    assert!(written.contains("Loop fold anomaly"));

    assert!(init_tracing(&LoggingConfig::default()).is_err());
}

#[test]
fn test_invalid_level_rejected() {
    std::env::remove_var("RUST_LOG");
    let logging = LoggingConfig {
        level: "paramot_rigging=verbose".to_string(),
        file: None,
    };
    assert!(init_tracing(&logging).is_err());
}
