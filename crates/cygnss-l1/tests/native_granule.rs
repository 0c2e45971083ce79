//! Reads a real L1 granule when one is available (set TEST_DATA_DIR).

#![cfg(feature = "native")]

use cygnss_l1::{
    parse_granule_name, silence_hdf5_errors, CygnssConfig, FootprintEstimator, L1Reader,
    ReaderOptions, CYGNSS_COVERAGE,
};
use test_utils::{require_test_file, workspace_root};

const GRANULE: &str = "cyg01.ddmi.s20230101-000000-e20230101-235959.l1.power-brcs.a31.d32.nc";

#[test]
fn test_real_granule() {
    let path = require_test_file!(GRANULE);
    silence_hdf5_errors();

    let config = CygnssConfig::load(workspace_root().join("config/cygnss.yaml")).unwrap();
    let options = ReaderOptions {
        bbox: Some(CYGNSS_COVERAGE),
        ..Default::default()
    };
    let reader = L1Reader::new(&config.l1, options).unwrap();
    let records = reader.read_file(&path).unwrap();

    let info = parse_granule_name(GRANULE).unwrap();
    assert!(!records.is_empty());
    assert!(records.iter().all(|r| r.spacecraft_num() == info.spacecraft as u32));
    assert!(records
        .iter()
        .all(|r| r.sp_lon() > -180.0 - 1e-9 && r.sp_lon() <= 180.0));

    let report = FootprintEstimator::default().estimate(&records);
    assert_eq!(report.footprints.len() + report.failures.len(), records.len());
}
