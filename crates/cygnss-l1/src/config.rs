//! Configuration loading for the CYGNSS pipeline.
//!
//! One YAML document declares where granules come from (`download`), which
//! product version is expected, the attribute catalog and the quality-flag
//! bit tables:
//!
//! ```yaml
//! download:
//!   s3_bucket: podaac-ops-cumulus-protected
//!   http_base_url: https://archive.podaac.earthdata.nasa.gov/podaac-ops-cumulus-protected
//! L1:
//!   product_version: v3.1
//!   per_sample_attributes: [ddm_timestamp_utc, sc_lat, sc_lon]
//!   per_ddm_attributes: [sp_lat, sp_lon, sp_inc_angle, ddm_snr]
//!   per_bin_attributes: [brcs]
//!   quality_flags:
//!     1:
//!       poor_overall_quality: true
//!       s_band_powered_up: false
//!     2:
//!       incorrect_ddm_peak_origin: true
//! ```
//!
//! Flag order inside a group is significant: the first flag is bit 0. The raw
//! YAML mapping keeps declaration order, and is converted here into explicit
//! [`QualityFlagEntry`](crate::quality::QualityFlagEntry) lists so nothing
//! downstream depends on map ordering.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use tracing::info;

use crate::catalog::AttributeCatalog;
use crate::error::{L1Error, Result};
use crate::quality::{QualityFlagGroup, QualityFlagTable};

/// Default location of the configuration document, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/cygnss.yaml";

/// Archive locations used by the downloader.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DownloadConfig {
    pub s3_bucket: String,
    pub http_base_url: String,
    /// Collection directory under `http_base_url`. `{level}` and `{version}`
    /// are substituted, the version upper-cased (`v3.1` -> `V3.1`).
    #[serde(default = "default_collection_template")]
    pub collection_template: String,
}

fn default_collection_template() -> String {
    "CYGNSS_{level}_{version}".to_string()
}

impl DownloadConfig {
    pub fn collection_name(&self, level: &str, version: &str) -> String {
        self.collection_template
            .replace("{level}", level)
            .replace("{version}", &version.to_uppercase())
    }
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    download: DownloadConfig,
    #[serde(rename = "L1")]
    l1: RawL1Config,
}

#[derive(Debug, Deserialize)]
struct RawL1Config {
    product_version: String,
    per_sample_attributes: Vec<String>,
    per_ddm_attributes: Vec<String>,
    #[serde(default)]
    per_bin_attributes: Vec<String>,
    #[serde(default = "default_near_land_flags")]
    near_land_flags: Vec<String>,
    quality_flags: Mapping,
}

fn default_near_land_flags() -> Vec<String> {
    ["sp_over_land", "sp_very_near_land", "sp_near_land"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Validated L1 settings.
#[derive(Debug, Clone, PartialEq)]
pub struct L1Config {
    pub product_version: String,
    pub catalog: AttributeCatalog,
    pub quality_flags: QualityFlagTable,
    /// Flags that mark a specular point as over or near land.
    pub near_land_flags: Vec<String>,
}

/// The whole configuration document, validated.
#[derive(Debug, Clone, PartialEq)]
pub struct CygnssConfig {
    pub download: DownloadConfig,
    pub l1: L1Config,
}

impl CygnssConfig {
    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| L1Error::io(path, e))?;
        let config = Self::from_yaml_str(&content)?;

        info!(
            path = %path.display(),
            product_version = %config.l1.product_version,
            attributes = config.l1.catalog.len(),
            flag_groups = config.l1.quality_flags.groups().len(),
            "Loaded CYGNSS configuration"
        );

        Ok(config)
    }

    /// Parse and validate a configuration document.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let raw: RawConfig = serde_yaml::from_str(content)
            .map_err(|e| L1Error::Config(format!("failed to parse configuration: {}", e)))?;

        if raw.l1.product_version.trim().is_empty() {
            return Err(L1Error::Config(
                "L1.product_version must not be empty".to_string(),
            ));
        }

        let catalog = AttributeCatalog::new(
            raw.l1.per_sample_attributes,
            raw.l1.per_ddm_attributes,
            raw.l1.per_bin_attributes,
        )?;

        let quality_flags = parse_quality_flags(&raw.l1.quality_flags)?;

        for name in &raw.l1.near_land_flags {
            if !quality_flags.contains(name) {
                return Err(L1Error::Config(format!(
                    "near-land flag '{}' is not declared in L1.quality_flags",
                    name
                )));
            }
        }

        Ok(Self {
            download: raw.download,
            l1: L1Config {
                product_version: raw.l1.product_version,
                catalog,
                quality_flags,
                near_land_flags: raw.l1.near_land_flags,
            },
        })
    }
}

fn parse_quality_flags(mapping: &Mapping) -> Result<QualityFlagTable> {
    let mut groups = Vec::with_capacity(mapping.len());

    for (key, value) in mapping {
        let group_key = parse_group_key(key)?;

        let flags_map = value.as_mapping().ok_or_else(|| {
            L1Error::Config(format!(
                "L1.quality_flags.{} must map flag names to true/false",
                group_key
            ))
        })?;

        let mut flags = Vec::with_capacity(flags_map.len());
        for (name, screen) in flags_map {
            let name = name.as_str().ok_or_else(|| {
                L1Error::Config(format!(
                    "L1.quality_flags.{} has a non-string flag name: {:?}",
                    group_key, name
                ))
            })?;
            let screen = screen.as_bool().ok_or_else(|| {
                L1Error::Config(format!(
                    "L1.quality_flags.{}.{} must be true or false",
                    group_key, name
                ))
            })?;
            flags.push((name.to_string(), screen));
        }

        groups.push(QualityFlagGroup::new(group_key, flags)?);
    }

    QualityFlagTable::new(groups)
}

fn parse_group_key(key: &Value) -> Result<u32> {
    let parsed = match key {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    };

    match parsed {
        Some(k) if k > 0 => Ok(k),
        _ => Err(L1Error::Config(format!(
            "L1.quality_flags keys must be positive integers, got {:?}",
            key
        ))),
    }
}
