//! Configuration loading.

use cygnss_l1::{AttributeLevel, CygnssConfig, L1Error};
use test_utils::{fixtures, temp_test_dir, workspace_root};

#[test]
fn test_shipped_config_loads() {
    let path = workspace_root().join(cygnss_l1::DEFAULT_CONFIG_PATH);
    let config = CygnssConfig::load(&path).unwrap();

    assert_eq!(config.l1.product_version, "v3.1");
    assert_eq!(
        config.download.collection_name("L1", &config.l1.product_version),
        "CYGNSS_L1_V3.1"
    );
    assert_eq!(config.l1.catalog.level_of("sp_lat"), Some(AttributeLevel::Ddm));
    assert_eq!(config.l1.catalog.level_of("sc_alt"), Some(AttributeLevel::Sample));

    let table = &config.l1.quality_flags;
    let names: Vec<&str> = table.variable_names().collect();
    assert_eq!(names, vec!["quality_flags", "quality_flags_2"]);

    let group1 = &table.groups()[0];
    assert_eq!(group1.entries()[0].name, "poor_overall_quality");
    assert_eq!(group1.entry("sp_over_land").unwrap().bit, 10);
    assert!(!group1.entry("sp_over_land").unwrap().screen_out);
    assert_eq!(group1.entry("invalid_roll_state").unwrap().bit, 30);

    for flag in &config.l1.near_land_flags {
        assert!(table.contains(flag));
    }
}

#[test]
fn test_shipped_config_decodes_deterministically() {
    let config = CygnssConfig::from_yaml_str(fixtures::SHIPPED_CONFIG).unwrap();
    let table = &config.l1.quality_flags;
    let sp_over_land = 1u32 << 10;

    assert!(table.passes(&[0, 0]));
    assert!(table.passes(&[sp_over_land, 0]));
    assert!(!table.passes(&[1, 0]));
    assert!(!table.passes(&[0, 1]));
    assert!(!table.passes(&[u32::MAX, u32::MAX]));
    for _ in 0..3 {
        assert!(!table.passes(&[sp_over_land | 1, 0]));
    }
    assert_eq!(
        table.screened_flags(&[1 | sp_over_land, 1]),
        vec!["poor_overall_quality", "incorrect_ddm_peak_origin"]
    );
}

#[test]
fn test_load_from_file() {
    let dir = temp_test_dir();
    let path = dir.path().join("cygnss.yaml");
    std::fs::write(&path, fixtures::TEST_CONFIG).unwrap();

    let config = CygnssConfig::load(&path).unwrap();
    assert_eq!(config.l1.catalog.per_bin(), &["brcs".to_string()]);
    assert_eq!(
        config.l1.near_land_flags,
        vec!["sp_over_land", "sp_very_near_land", "sp_near_land"]
    );
}

#[test]
fn test_overlapping_catalog_rejected() {
    let yaml = fixtures::TEST_CONFIG.replace(
        "per_sample_attributes: [ddm_timestamp_utc, sc_lat, sc_lon]",
        "per_sample_attributes: [ddm_timestamp_utc, sc_lat, sc_lon, ddm_snr]",
    );
    assert!(matches!(
        CygnssConfig::from_yaml_str(&yaml),
        Err(L1Error::Config(_))
    ));
}

#[test]
fn test_duplicate_flag_group_rejected() {
    let yaml = fixtures::TEST_CONFIG.replace("    2:\n", "    \"1\":\n");
    assert!(matches!(
        CygnssConfig::from_yaml_str(&yaml),
        Err(L1Error::Config(_))
    ));
}

#[test]
fn test_oversized_flag_group_rejected() {
    let mut yaml = fixtures::TEST_CONFIG.to_string();
    let extra: String = (0..31)
        .map(|i| format!("      spare_{}: false\n", i))
        .collect();
    yaml = yaml.replace("      sp_near_land: false\n", &format!("      sp_near_land: false\n{}", extra));
    assert!(CygnssConfig::from_yaml_str(&yaml).is_err());
}

#[test]
fn test_empty_product_version_rejected() {
    let yaml = fixtures::TEST_CONFIG.replace("product_version: v3.1", "product_version: \"\"");
    assert!(CygnssConfig::from_yaml_str(&yaml).is_err());
}
