//! Common test fixtures for CYGNSS tests.

/// Configuration matching the variables of [`crate::SyntheticGranule`].
///
/// Flag bits are listed in [`flags`].
pub const TEST_CONFIG: &str = r#"
download:
  s3_bucket: podaac-ops-cumulus-protected
  http_base_url: https://archive.podaac.earthdata.nasa.gov/podaac-ops-cumulus-protected
L1:
  product_version: v3.1
  per_sample_attributes: [ddm_timestamp_utc, sc_lat, sc_lon]
  per_ddm_attributes:
    - sp_lat
    - sp_lon
    - sp_inc_angle
    - sp_rx_gain
    - gps_tx_power_db_w
    - gps_ant_gain_db_i
    - rx_to_sp_range
    - tx_to_sp_range
    - ddm_snr
    - track_id
  per_bin_attributes: [brcs]
  quality_flags:
    1:
      poor_overall_quality: true
      s_band_powered_up: false
      large_sc_attitude_err: true
      sp_over_land: false
      sp_very_near_land: false
    2:
      incorrect_ddm_peak_origin: true
      sp_near_land: false
"#;

/// The configuration shipped in `config/cygnss.yaml`.
pub const SHIPPED_CONFIG: &str = include_str!("../../../config/cygnss.yaml");

/// Bit masks of the flags declared in [`TEST_CONFIG`].
pub mod flags {
    /// Group 1 (`quality_flags`).
    pub const POOR_OVERALL_QUALITY: u32 = 1 << 0;
    pub const S_BAND_POWERED_UP: u32 = 1 << 1;
    pub const LARGE_SC_ATTITUDE_ERR: u32 = 1 << 2;
    pub const SP_OVER_LAND: u32 = 1 << 3;
    pub const SP_VERY_NEAR_LAND: u32 = 1 << 4;

    /// Group 2 (`quality_flags_2`).
    pub const INCORRECT_DDM_PEAK_ORIGIN: u32 = 1 << 0;
    pub const SP_NEAR_LAND: u32 = 1 << 1;

    /// A bit no flag is declared for.
    pub const RESERVED: u32 = 1 << 20;
}

/// Bounding boxes as (min_lon, min_lat, max_lon, max_lat).
pub mod bbox {
    /// Full CYGNSS latitude coverage.
    pub const CYGNSS_COVERAGE: (f64, f64, f64, f64) = (-180.0, -38.0, 180.0, 38.0);

    /// Samples 0 to 4 of a default synthetic granule.
    pub const SYNTHETIC_SOUTH: (f64, f64, f64, f64) = (-180.0, -10.0, 180.0, -6.0);

    /// Pantanal wetlands.
    pub const PANTANAL: (f64, f64, f64, f64) = (-58.5, -22.0, -55.0, -16.0);
}
