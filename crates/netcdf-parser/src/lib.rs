//! Named-variable access to CYGNSS L1 NetCDF granules.
//!
//! Consumers never touch the NetCDF library directly. Everything goes through
//! the narrow [`VariableSource`] interface: ask for a variable by name, get
//! back a dense [`Variable`] of `f64` values with its shape, or a
//! [`NetCdfError::MissingVariable`] if the file does not carry it.
//!
//! Two sources are provided:
//! - [`NetCdfFile`] (feature `native`): reads a granule from disk through
//!   libnetcdf, masking `_FillValue` to NaN and applying
//!   `scale_factor`/`add_offset`.
//! - [`MemorySource`]: an in-memory set of variables, used to build synthetic
//!   granules for tests and for callers that already hold decoded arrays.
//!
//! # Layout
//!
//! Values are stored row-major (C order), matching NetCDF's own layout. For a
//! CYGNSS `[sample, ddm]` variable, element `(s, d)` lives at
//! `s * n_ddm + d`.

mod error;
#[cfg(feature = "native")]
pub mod native;

use std::collections::{BTreeMap, HashMap};

pub use error::{NetCdfError, NetCdfResult};
#[cfg(feature = "native")]
pub use native::{silence_hdf5_errors, NetCdfFile};

/// A decoded variable: a name, a shape, and row-major values.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    name: String,
    shape: Vec<usize>,
    data: Vec<f64>,
}

impl Variable {
    /// Create a variable, checking that `data` fills `shape` exactly.
    ///
    /// A scalar variable has an empty shape and exactly one value.
    pub fn new(name: impl Into<String>, shape: Vec<usize>, data: Vec<f64>) -> NetCdfResult<Self> {
        let name = name.into();
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(NetCdfError::ShapeMismatch {
                name,
                shape,
                len: data.len(),
            });
        }
        Ok(Self { name, shape, data })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.data
    }

    /// Mutable access for in-place corrections (e.g. longitude wrapping).
    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Value at a multi-dimensional index, or `None` if out of range.
    pub fn get(&self, index: &[usize]) -> Option<f64> {
        if index.len() != self.shape.len() {
            return None;
        }
        let mut flat = 0usize;
        for (&i, &dim) in index.iter().zip(&self.shape) {
            if i >= dim {
                return None;
            }
            flat = flat * dim + i;
        }
        self.data.get(flat).copied()
    }

    /// Number of values per element of the leading `leading` dimensions.
    ///
    /// For a `[sample, ddm, delay, doppler]` variable, `stride(2)` is
    /// `delay * doppler`.
    pub fn stride(&self, leading: usize) -> usize {
        self.shape.iter().skip(leading).product()
    }
}

/// Read access to the named variables of one granule.
pub trait VariableSource {
    /// Human-readable identifier of the source (usually the file name).
    fn source_name(&self) -> &str;

    /// Whether the source carries a variable with this name.
    fn has_variable(&self, name: &str) -> bool;

    /// Shape of a variable without reading its values.
    fn variable_shape(&self, name: &str) -> NetCdfResult<Vec<usize>>;

    /// Read a whole variable. Fails with [`NetCdfError::MissingVariable`]
    /// if the source does not carry it.
    fn read_variable(&self, name: &str) -> NetCdfResult<Variable>;

    /// A global (file-level) attribute rendered as text.
    fn global_attribute(&self, name: &str) -> Option<String>;
}

/// An in-memory granule.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    name: String,
    variables: BTreeMap<String, Variable>,
    attributes: HashMap<String, String>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add or replace a variable.
    pub fn insert(&mut self, variable: Variable) -> &mut Self {
        self.variables.insert(variable.name.clone(), variable);
        self
    }

    /// Remove a variable, returning it if it was present.
    pub fn remove(&mut self, name: &str) -> Option<Variable> {
        self.variables.remove(name)
    }

    /// Add or replace a global attribute.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }

    fn missing(&self, name: &str) -> NetCdfError {
        NetCdfError::MissingVariable {
            source_name: self.name.clone(),
            name: name.to_string(),
        }
    }
}

impl VariableSource for MemorySource {
    fn source_name(&self) -> &str {
        &self.name
    }

    fn has_variable(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    fn variable_shape(&self, name: &str) -> NetCdfResult<Vec<usize>> {
        self.variables
            .get(name)
            .map(|v| v.shape.clone())
            .ok_or_else(|| self.missing(name))
    }

    fn read_variable(&self, name: &str) -> NetCdfResult<Variable> {
        self.variables
            .get(name)
            .cloned()
            .ok_or_else(|| self.missing(name))
    }

    fn global_attribute(&self, name: &str) -> Option<String> {
        self.attributes.get(name).cloned()
    }
}

impl<S: VariableSource + ?Sized> VariableSource for &S {
    fn source_name(&self) -> &str {
        (**self).source_name()
    }

    fn has_variable(&self, name: &str) -> bool {
        (**self).has_variable(name)
    }

    fn variable_shape(&self, name: &str) -> NetCdfResult<Vec<usize>> {
        (**self).variable_shape(name)
    }

    fn read_variable(&self, name: &str) -> NetCdfResult<Variable> {
        (**self).read_variable(name)
    }

    fn global_attribute(&self, name: &str) -> Option<String> {
        (**self).global_attribute(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_shape_checked() {
        let err = Variable::new("sp_lat", vec![2, 4], vec![0.0; 7]).unwrap_err();
        assert!(matches!(err, NetCdfError::ShapeMismatch { len: 7, .. }));
    }

    #[test]
    fn test_scalar_variable() {
        let v = Variable::new("spacecraft_num", vec![], vec![3.0]).unwrap();
        assert_eq!(v.rank(), 0);
        assert_eq!(v.get(&[]), Some(3.0));
    }

    #[test]
    fn test_row_major_indexing() {
        let data: Vec<f64> = (0..8).map(|i| i as f64).collect();
        let v = Variable::new("x", vec![2, 4], data).unwrap();
        assert_eq!(v.get(&[0, 3]), Some(3.0));
        assert_eq!(v.get(&[1, 0]), Some(4.0));
        assert_eq!(v.get(&[2, 0]), None);
        assert_eq!(v.stride(1), 4);
    }

    #[test]
    fn test_memory_source_missing_variable() {
        let source = MemorySource::new("cyg01.nc");
        match source.read_variable("brcs") {
            Err(NetCdfError::MissingVariable { source_name, name }) => {
                assert_eq!(source_name, "cyg01.nc");
                assert_eq!(name, "brcs");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_memory_source_attributes() {
        let mut source = MemorySource::new("g");
        source.set_attribute("time_coverage_start", "2023-01-01T00:00:00Z");
        assert_eq!(
            source.global_attribute("time_coverage_start").as_deref(),
            Some("2023-01-01T00:00:00Z")
        );
        assert!(source.global_attribute("missing").is_none());
    }
}
