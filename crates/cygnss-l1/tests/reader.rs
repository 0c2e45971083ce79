//! File reader behaviour against synthetic granules.

use cygnss_l1::radar::{corrected_snr, SnrTerms, CYGNSS_WAVELENGTH_M};
use cygnss_l1::{
    BoundingBox, CygnssConfig, FootprintError, FootprintEstimator, L1Config, L1Error, L1Reader,
    ReaderOptions, SnrCorrectionColumns,
};
use test_utils::{assert_approx_eq, fixtures, flags, SyntheticGranule};

fn config() -> L1Config {
    CygnssConfig::from_yaml_str(fixtures::TEST_CONFIG).unwrap().l1
}

fn reader(options: ReaderOptions) -> L1Reader {
    L1Reader::new(&config(), options).unwrap()
}

#[test]
fn test_no_filters_keeps_every_candidate() {
    let records = reader(ReaderOptions::default())
        .read_source(&SyntheticGranule::new(6, 3).build())
        .unwrap();
    assert_eq!(records.len(), 18);
    assert_eq!(records.stats().retained, 18);

    // Per-sample attributes are broadcast across channels.
    let sc_lat: Vec<f64> = records
        .iter()
        .filter(|r| r.sample_id() == 2)
        .map(|r| r.value("sc_lat").unwrap())
        .collect();
    assert_eq!(sc_lat, vec![-11.0; 3]);
}

#[test]
fn test_bbox_is_inclusive_at_every_edge() {
    // One channel at lon 150; latitudes -10, -9, -8, -7, -6.
    let source = SyntheticGranule::new(5, 1).build();
    let options = ReaderOptions {
        bbox: Some(BoundingBox::new(150.0, -9.0, 150.0, -7.0).unwrap()),
        ..Default::default()
    };
    let records = reader(options).read_source(&source).unwrap();

    let lats: Vec<f64> = records.iter().map(|r| r.sp_lat()).collect();
    assert_eq!(lats, vec![-9.0, -8.0, -7.0]);
    assert_eq!(records.stats().outside_bbox, 2);
}

#[test]
fn test_quality_screening_patterns() {
    let source = SyntheticGranule::new(4, 1)
        // all clear
        .with_quality_word(1, 0, 0, 0)
        // one screening flag
        .with_quality_word(1, 1, 0, flags::LARGE_SC_ATTITUDE_ERR)
        // every declared flag
        .with_quality_word(1, 2, 0, 0b11111)
        // only non-screening and reserved bits
        .with_quality_word(1, 3, 0, flags::S_BAND_POWERED_UP | flags::SP_OVER_LAND | flags::RESERVED)
        .build();

    let records = reader(ReaderOptions::default()).read_source(&source).unwrap();
    let kept: Vec<i64> = records.iter().map(|r| r.sample_id()).collect();
    assert_eq!(kept, vec![0, 3]);
    assert_eq!(records.stats().failed_quality, 2);
    assert_eq!(
        records.records()[1].quality_words(),
        &[flags::S_BAND_POWERED_UP | flags::SP_OVER_LAND | flags::RESERVED, 0]
    );
}

#[test]
fn test_near_land_uses_any_land_flag() {
    let source = SyntheticGranule::new(4, 1)
        .with_quality_word(1, 0, 0, flags::SP_OVER_LAND)
        .with_quality_word(1, 1, 0, flags::SP_VERY_NEAR_LAND)
        .with_quality_word(2, 2, 0, flags::SP_NEAR_LAND)
        .build();

    let options = ReaderOptions {
        near_land: true,
        ..Default::default()
    };
    let records = reader(options).read_source(&source).unwrap();
    let kept: Vec<i64> = records.iter().map(|r| r.sample_id()).collect();
    assert_eq!(kept, vec![0, 1, 2]);
    assert_eq!(records.stats().not_near_land, 1);
}

#[test]
fn test_invalid_geolocation_excluded() {
    let source = SyntheticGranule::new(3, 2)
        .set("sp_lat", 0, 0, f64::NAN)
        .set("sp_lon", 2, 1, f64::NAN)
        .build();

    let records = reader(ReaderOptions::default()).read_source(&source).unwrap();
    assert_eq!(records.len(), 4);
    assert_eq!(records.stats().invalid_geolocation, 2);
    assert!(records.iter().all(|r| r.sp_lat().is_finite() && r.sp_lon().is_finite()));
}

#[test]
fn test_fill_value_flag_word_fails_quality() {
    let source = SyntheticGranule::new(2, 1)
        .set("quality_flags_2", 1, 0, f64::NAN)
        .build();
    let records = reader(ReaderOptions::default()).read_source(&source).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records.stats().failed_quality, 1);
}

#[test]
fn test_longitudes_normalized() {
    let source = SyntheticGranule::new(2, 2)
        .with_per_ddm("sp_lon", |_, d| 300.0 + d as f64)
        .with_per_sample("sc_lon", |_| 200.0)
        .build();

    let records = reader(ReaderOptions::default()).read_source(&source).unwrap();
    for record in &records {
        assert_eq!(record.sp_lon(), -60.0 + record.ddm_id() as f64);
        assert_eq!(record.value("sc_lon"), Some(-160.0));
    }
}

#[test]
fn test_missing_attribute_names_it() {
    let yaml = fixtures::TEST_CONFIG.replace("    - track_id\n", "    - track_id\n    - sp_surface_wetness\n");
    let config = CygnssConfig::from_yaml_str(&yaml).unwrap();
    let reader = L1Reader::new(&config.l1, ReaderOptions::default()).unwrap();

    let source = SyntheticGranule::new(3, 2).without("ddm_snr").build();
    match reader.read_source(&source) {
        Err(L1Error::MissingVariables { file, names }) => {
            assert_eq!(file, "synthetic.nc");
            assert_eq!(names, vec!["ddm_snr".to_string(), "sp_surface_wetness".to_string()]);
        }
        other => panic!("expected MissingVariables, got {:?}", other),
    }
}

#[test]
fn test_missing_flag_variable() {
    let source = SyntheticGranule::new(3, 2).without("quality_flags_2").build();
    let err = reader(ReaderOptions::default()).read_source(&source).unwrap_err();
    assert!(err.to_string().contains("quality_flags_2"));
}

#[test]
fn test_dimension_mismatch() {
    let source = SyntheticGranule::new(3, 2)
        .with_per_sample("ddm_snr", |_| 4.0)
        .build();
    match reader(ReaderOptions::default()).read_source(&source) {
        Err(L1Error::DimensionMismatch { variable, found, .. }) => {
            assert_eq!(variable, "ddm_snr");
            assert_eq!(found, vec![3]);
        }
        other => panic!("expected DimensionMismatch, got {:?}", other),
    }

    let flat_bins = SyntheticGranule::new(3, 2).with_per_ddm("brcs", |_, _| 1.0).build();
    assert!(matches!(
        reader(ReaderOptions::default()).read_source(&flat_bins),
        Err(L1Error::DimensionMismatch { .. })
    ));
}

#[test]
fn test_ids_fall_back_to_indices() {
    let source = SyntheticGranule::new(3, 2)
        .with_variable("sample", vec![3], vec![100.0, 101.0, 102.0])
        .without("ddm")
        .without("spacecraft_num")
        .build();
    let records = reader(ReaderOptions::default()).read_source(&source).unwrap();
    let first = &records.records()[0];
    assert_eq!((first.sample_id(), first.ddm_id()), (100, 0));
    assert_eq!(first.spacecraft_num(), 0);
}

#[test]
fn test_timestamps_absent_without_coverage_start() {
    let source = SyntheticGranule::new(2, 1)
        .with_attribute("time_coverage_start", "yesterday")
        .build();
    let records = reader(ReaderOptions::default()).read_source(&source).unwrap();
    assert!(records.iter().all(|r| r.timestamp().is_none()));
}

#[test]
fn test_snr_correction_column() {
    let options = ReaderOptions {
        snr_correction: Some(SnrCorrectionColumns::default()),
        ..Default::default()
    };
    let records = reader(options)
        .read_source(&SyntheticGranule::new(2, 2).build())
        .unwrap();

    for record in &records {
        let expected = corrected_snr(
            &SnrTerms {
                ddm_snr_db: 5.0 + record.ddm_id() as f64,
                tx_power_db: 14.0,
                rx_gain_db: 10.0,
                tx_gain_db: 12.0,
                rx_range_m: 600_000.0,
                tx_range_m: 20_000_000.0,
            },
            CYGNSS_WAVELENGTH_M,
        );
        assert_approx_eq!(record.value("ddm_snr_corrected").unwrap(), expected, 1e-9);
    }
}

#[test]
fn test_reader_rejects_unusable_options() {
    let missing_inputs = ReaderOptions {
        snr_correction: Some(SnrCorrectionColumns {
            ddm_snr: "ddm_snr_v2".to_string(),
            ..Default::default()
        }),
        ..Default::default()
    };
    assert!(matches!(
        L1Reader::new(&config(), missing_inputs),
        Err(L1Error::Config(_))
    ));

    let yaml = fixtures::TEST_CONFIG.replace("    - sp_lon\n", "");
    let no_lon = CygnssConfig::from_yaml_str(&yaml).unwrap();
    assert!(L1Reader::new(&no_lon.l1, ReaderOptions::default()).is_err());
}

#[test]
fn test_truncated_track_skipped_others_continue() {
    // Channel 1 has a specular point only at sample 2; channel 0 has all three.
    let source = SyntheticGranule::new(3, 2)
        .set("sp_lat", 0, 1, f64::NAN)
        .set("sp_lat", 1, 1, f64::NAN)
        .build();
    let records = reader(ReaderOptions::default()).read_source(&source).unwrap();
    assert_eq!(records.len(), 4);
    assert_eq!(records.stats().invalid_geolocation, 2);

    let report = FootprintEstimator::default().estimate(&records);
    assert_eq!(report.footprints.len(), 3);
    assert!(report.footprints.iter().all(|fp| fp.record.ddm_id() == 0));
    assert_eq!(
        report.failures,
        vec![FootprintError::InsufficientTrackPoints {
            sample_id: 2,
            ddm_id: 1,
            points: 1,
            required: cygnss_l1::track::MIN_TRACK_POINTS,
        }]
    );
}

#[test]
fn test_isolated_land_sample_oriented_by_screened_neighbours() {
    // Only sample 1 is over land; samples 0 and 2 still define the track.
    let source = SyntheticGranule::new(3, 1)
        .with_quality_word(1, 1, 0, flags::SP_OVER_LAND)
        .build();
    let options = ReaderOptions {
        near_land: true,
        ..Default::default()
    };
    let records = reader(options).read_source(&source).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records.stats().not_near_land, 2);

    // Northbound along lon 150.
    let bearing = records.records()[0].bearing().unwrap();
    assert_approx_eq!(bearing, 0.0, 1e-9);

    let report = FootprintEstimator::default().estimate(&records);
    assert!(report.failures.is_empty());
    assert_eq!(report.footprints.len(), records.len());
}

#[test]
fn test_quality_screened_neighbours_still_orient_track() {
    let source = SyntheticGranule::new(3, 1)
        .with_quality_word(1, 0, 0, flags::POOR_OVERALL_QUALITY)
        .with_quality_word(1, 2, 0, flags::LARGE_SC_ATTITUDE_ERR)
        .build();
    let records = reader(ReaderOptions::default()).read_source(&source).unwrap();
    assert_eq!(records.len(), 1);

    let report = FootprintEstimator::default().estimate(&records);
    assert_eq!(report.footprints.len(), 1);
    assert_approx_eq!(report.footprints[0].ellipse.bearing_deg, 0.0, 1e-9);
}

#[test]
fn test_points_outside_bbox_do_not_orient_track() {
    // The box keeps sample 1 only; its neighbours are cut away before bearings.
    let source = SyntheticGranule::new(3, 1).build();
    let options = ReaderOptions {
        bbox: Some(BoundingBox::new(149.0, -9.5, 151.0, -8.5).unwrap()),
        ..Default::default()
    };
    let records = reader(options).read_source(&source).unwrap();
    assert_eq!(records.len(), 1);
    assert!(matches!(
        records.records()[0].bearing(),
        Err(FootprintError::InsufficientTrackPoints { points: 1, .. })
    ));
}

#[test]
fn test_malformed_geometry_reported_per_record() {
    let source = SyntheticGranule::new(4, 1)
        .set("rx_to_sp_range", 1, 0, -5.0)
        .set("sp_inc_angle", 3, 0, 91.0)
        .build();
    let records = reader(ReaderOptions::default()).read_source(&source).unwrap();
    let report = FootprintEstimator::default().estimate(&records);

    assert_eq!(report.footprints.len(), 2);
    assert_eq!(report.failures.len(), 2);
    assert!(report
        .failures
        .iter()
        .all(|f| matches!(f, FootprintError::MalformedGeometry { .. })));
}
