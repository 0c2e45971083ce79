//! Attribute catalog: which file variables become record columns.

use std::collections::HashSet;

use crate::error::{L1Error, Result};

/// Dimensionality class of a catalogued variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeLevel {
    /// `[sample]`, broadcast across every DDM channel.
    Sample,
    /// `[sample, ddm]`.
    Ddm,
    /// `[sample, ddm, ...bins]`, e.g. the 17x11 BRCS delay-Doppler map.
    Bin,
}

impl AttributeLevel {
    pub fn describe_shape(&self, n_sample: usize, n_ddm: usize) -> String {
        match self {
            AttributeLevel::Sample => format!("[{}]", n_sample),
            AttributeLevel::Ddm => format!("[{}, {}]", n_sample, n_ddm),
            AttributeLevel::Bin => format!("[{}, {}, ...]", n_sample, n_ddm),
        }
    }
}

/// Three disjoint, ordered lists of variable names.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AttributeCatalog {
    per_sample: Vec<String>,
    per_ddm: Vec<String>,
    per_bin: Vec<String>,
}

impl AttributeCatalog {
    /// Build a catalog, rejecting empty names and names listed twice
    /// (within a list or across lists).
    pub fn new(per_sample: Vec<String>, per_ddm: Vec<String>, per_bin: Vec<String>) -> Result<Self> {
        let mut seen = HashSet::new();
        for name in per_sample.iter().chain(&per_ddm).chain(&per_bin) {
            if name.trim().is_empty() {
                return Err(L1Error::Config(
                    "attribute catalog contains an empty name".to_string(),
                ));
            }
            if !seen.insert(name.as_str()) {
                return Err(L1Error::Config(format!(
                    "attribute '{}' is catalogued more than once",
                    name
                )));
            }
        }

        Ok(Self {
            per_sample,
            per_ddm,
            per_bin,
        })
    }

    pub fn per_sample(&self) -> &[String] {
        &self.per_sample
    }

    pub fn per_ddm(&self) -> &[String] {
        &self.per_ddm
    }

    pub fn per_bin(&self) -> &[String] {
        &self.per_bin
    }

    /// Every catalogued name with its level: samples, then DDMs, then bins.
    pub fn iter(&self) -> impl Iterator<Item = (AttributeLevel, &str)> {
        self.per_sample
            .iter()
            .map(|n| (AttributeLevel::Sample, n.as_str()))
            .chain(self.per_ddm.iter().map(|n| (AttributeLevel::Ddm, n.as_str())))
            .chain(self.per_bin.iter().map(|n| (AttributeLevel::Bin, n.as_str())))
    }

    pub fn level_of(&self, name: &str) -> Option<AttributeLevel> {
        self.iter().find(|(_, n)| *n == name).map(|(level, _)| level)
    }

    /// Whether the name is a scalar (per-sample or per-DDM) column.
    pub fn is_scalar(&self, name: &str) -> bool {
        matches!(
            self.level_of(name),
            Some(AttributeLevel::Sample) | Some(AttributeLevel::Ddm)
        )
    }

    pub fn len(&self) -> usize {
        self.per_sample.len() + self.per_ddm.len() + self.per_bin.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
