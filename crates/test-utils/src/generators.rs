//! Synthetic CYGNSS L1 granules.
//!
//! [`SyntheticGranule`] builds an in-memory granule with predictable values
//! that match the attribute lists in [`crate::fixtures::TEST_CONFIG`]. By
//! default:
//!
//! - `sp_lat = -10 + sample` and `sp_lon = 150 + 2 * ddm`, so every channel
//!   moves north one degree per sample,
//! - `track_id = ddm + 1`, one track per channel,
//! - every quality-flag word is zero (all clear),
//! - `brcs` is `[sample, ddm, 3, 2]` with value `sample * 100 + ddm * 10 + bin`.
//!
//! ```
//! use test_utils::SyntheticGranule;
//! use netcdf_parser::VariableSource;
//!
//! let source = SyntheticGranule::new(10, 4).build();
//! assert_eq!(source.variable_shape("sp_lat").unwrap(), vec![10, 4]);
//! ```

use std::collections::BTreeMap;

use netcdf_parser::{MemorySource, Variable};

/// Coverage start written as the `time_coverage_start` global attribute.
pub const TIME_COVERAGE_START: &str = "2023-01-01T00:00:00Z";

/// Delay and Doppler bin counts of the default `brcs` variable.
pub const BRCS_BINS: (usize, usize) = (3, 2);

/// Builder for an in-memory L1 granule.
#[derive(Debug, Clone)]
pub struct SyntheticGranule {
    name: String,
    n_sample: usize,
    n_ddm: usize,
    variables: BTreeMap<String, (Vec<usize>, Vec<f64>)>,
    attributes: Vec<(String, String)>,
}

impl SyntheticGranule {
    pub fn new(n_sample: usize, n_ddm: usize) -> Self {
        let mut granule = Self {
            name: "synthetic.nc".to_string(),
            n_sample,
            n_ddm,
            variables: BTreeMap::new(),
            attributes: vec![(
                "time_coverage_start".to_string(),
                TIME_COVERAGE_START.to_string(),
            )],
        };

        granule = granule
            .with_variable("sample", vec![n_sample], (0..n_sample).map(|s| s as f64).collect())
            .with_variable("ddm", vec![n_ddm], (0..n_ddm).map(|d| d as f64).collect())
            .with_variable("spacecraft_num", vec![], vec![1.0])
            .with_per_sample("ddm_timestamp_utc", |s| s as f64)
            .with_per_sample("sc_lat", |s| -13.0 + s as f64)
            .with_per_sample("sc_lon", |_| 150.0)
            .with_per_ddm("sp_lat", |s, _| -10.0 + s as f64)
            .with_per_ddm("sp_lon", |_, d| 150.0 + 2.0 * d as f64)
            .with_per_ddm("sp_inc_angle", |_, _| 30.0)
            .with_per_ddm("sp_rx_gain", |_, _| 10.0)
            .with_per_ddm("gps_tx_power_db_w", |_, _| 14.0)
            .with_per_ddm("gps_ant_gain_db_i", |_, _| 12.0)
            .with_per_ddm("rx_to_sp_range", |_, _| 600_000.0)
            .with_per_ddm("tx_to_sp_range", |_, _| 20_000_000.0)
            .with_per_ddm("ddm_snr", |_, d| 5.0 + d as f64)
            .with_per_ddm("track_id", |_, d| d as f64 + 1.0)
            .with_per_ddm("quality_flags", |_, _| 0.0)
            .with_per_ddm("quality_flags_2", |_, _| 0.0);

        let (n_delay, n_doppler) = BRCS_BINS;
        granule.with_per_bin("brcs", n_delay, n_doppler, |s, d, bin| {
            (s * 100 + d * 10 + bin) as f64
        })
    }

    /// Source name reported by the built granule.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn n_sample(&self) -> usize {
        self.n_sample
    }

    pub fn n_ddm(&self) -> usize {
        self.n_ddm
    }

    /// Add or replace a variable with an arbitrary shape.
    pub fn with_variable(mut self, name: &str, shape: Vec<usize>, data: Vec<f64>) -> Self {
        self.variables.insert(name.to_string(), (shape, data));
        self
    }

    /// Add or replace a `[sample]` variable.
    pub fn with_per_sample(self, name: &str, f: impl Fn(usize) -> f64) -> Self {
        let data = (0..self.n_sample).map(f).collect();
        let shape = vec![self.n_sample];
        self.with_variable(name, shape, data)
    }

    /// Add or replace a `[sample, ddm]` variable.
    pub fn with_per_ddm(self, name: &str, f: impl Fn(usize, usize) -> f64) -> Self {
        let (n, m) = (self.n_sample, self.n_ddm);
        let data = (0..n)
            .flat_map(|s| (0..m).map(move |d| (s, d)))
            .map(|(s, d)| f(s, d))
            .collect();
        self.with_variable(name, vec![n, m], data)
    }

    /// Add or replace a `[sample, ddm, delay, doppler]` variable. `f` gets
    /// the flattened bin index within one DDM.
    pub fn with_per_bin(
        self,
        name: &str,
        n_delay: usize,
        n_doppler: usize,
        f: impl Fn(usize, usize, usize) -> f64,
    ) -> Self {
        let (n, m, bins) = (self.n_sample, self.n_ddm, n_delay * n_doppler);
        let mut data = Vec::with_capacity(n * m * bins);
        for s in 0..n {
            for d in 0..m {
                data.extend((0..bins).map(|b| f(s, d, b)));
            }
        }
        self.with_variable(name, vec![n, m, n_delay, n_doppler], data)
    }

    /// Set one element of an existing `[sample, ddm]` variable.
    pub fn set(mut self, name: &str, sample: usize, ddm: usize, value: f64) -> Self {
        let n_ddm = self.n_ddm;
        let (shape, data) = self
            .variables
            .get_mut(name)
            .unwrap_or_else(|| panic!("synthetic granule has no variable '{}'", name));
        assert_eq!(shape.len(), 2, "'{}' is not a [sample, ddm] variable", name);
        data[sample * n_ddm + ddm] = value;
        self
    }

    /// Set the packed flag word of quality-flag group `group` at one element.
    /// Group 1 is `quality_flags`, group N is `quality_flags_N`.
    pub fn with_quality_word(self, group: u32, sample: usize, ddm: usize, word: u32) -> Self {
        let name = quality_variable(group);
        let granule = if self.variables.contains_key(&name) {
            self
        } else {
            self.with_per_ddm(&name, |_, _| 0.0)
        };
        granule.set(&name, sample, ddm, word as f64)
    }

    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.retain(|(n, _)| n != name);
        self.attributes.push((name.to_string(), value.to_string()));
        self
    }

    /// Drop a variable.
    pub fn without(mut self, name: &str) -> Self {
        self.variables.remove(name);
        self
    }

    pub fn build(self) -> MemorySource {
        let mut source = MemorySource::new(self.name);
        for (name, (shape, data)) in self.variables {
            let variable =
                Variable::new(name, shape, data).expect("synthetic variable shape matches data");
            source.insert(variable);
        }
        for (name, value) in self.attributes {
            source.set_attribute(name, value);
        }
        source
    }
}

fn quality_variable(group: u32) -> String {
    if group <= 1 {
        "quality_flags".to_string()
    } else {
        format!("quality_flags_{}", group)
    }
}
