//! Native NetCDF reading using the netcdf library.
//!
//! Values are always read as `f64`; libnetcdf performs the numeric
//! conversion from the on-disk type. Packed variables are unpacked with
//! `scale_factor`/`add_offset` and `_FillValue` entries become NaN, so callers
//! only ever see physical values.

use std::path::{Path, PathBuf};
use std::sync::Once;

use tracing::debug;

use crate::error::{NetCdfError, NetCdfResult};
use crate::{Variable, VariableSource};

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints verbose error messages to stderr even when errors
/// are handled gracefully by the Rust code (e.g., when checking for optional
/// attributes that don't exist). This disables that output by calling
/// H5Eset_auto2 with null handlers. It only needs to be called once per
/// process, but is safe to call multiple times.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and we're passing null pointers
        // to disable error output, which is a documented valid use.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// An open NetCDF granule on disk.
pub struct NetCdfFile {
    path: PathBuf,
    name: String,
    file: netcdf::File,
}

impl NetCdfFile {
    /// Open a granule read-only.
    pub fn open(path: impl AsRef<Path>) -> NetCdfResult<Self> {
        silence_hdf5_errors();

        let path = path.as_ref();
        if !path.exists() {
            return Err(NetCdfError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} does not exist", path.display()),
            )));
        }

        let file = netcdf::open(path).map_err(|e| {
            NetCdfError::InvalidFormat(format!("Failed to open {}: {}", path.display(), e))
        })?;

        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown.nc")
            .to_string();

        debug!(file = %name, "Opened NetCDF granule");

        Ok(Self {
            path: path.to_path_buf(),
            name,
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn variable(&self, name: &str) -> NetCdfResult<netcdf::Variable<'_>> {
        self.file
            .variable(name)
            .ok_or_else(|| NetCdfError::MissingVariable {
                source_name: self.name.clone(),
                name: name.to_string(),
            })
    }
}

impl VariableSource for NetCdfFile {
    fn source_name(&self) -> &str {
        &self.name
    }

    fn has_variable(&self, name: &str) -> bool {
        self.file.variable(name).is_some()
    }

    fn variable_shape(&self, name: &str) -> NetCdfResult<Vec<usize>> {
        let var = self.variable(name)?;
        Ok(var.dimensions().iter().map(|d| d.len()).collect())
    }

    fn read_variable(&self, name: &str) -> NetCdfResult<Variable> {
        let var = self.variable(name)?;
        let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();

        let raw: Vec<f64> = var
            .get_values(..)
            .map_err(|e| NetCdfError::InvalidFormat(format!("Failed to read {}: {}", name, e)))?;

        let scale_factor = get_f64_attr(&var, "scale_factor").unwrap_or(1.0);
        let add_offset = get_f64_attr(&var, "add_offset").unwrap_or(0.0);
        let fill_value = get_f64_attr(&var, "_FillValue");

        let data = raw
            .into_iter()
            .map(|val| match fill_value {
                Some(fill) if val == fill => f64::NAN,
                _ => val * scale_factor + add_offset,
            })
            .collect();

        Variable::new(name, shape, data)
    }

    fn global_attribute(&self, name: &str) -> Option<String> {
        let value = self.file.attribute(name)?.value().ok()?;
        match value {
            netcdf::AttributeValue::Str(s) => Some(s),
            netcdf::AttributeValue::Strs(parts) => Some(parts.join(" ")),
            other => f64::try_from(other).ok().map(|v| v.to_string()),
        }
    }
}

/// Check if a variable has an attribute with the given name.
/// This avoids HDF5 error spam when checking for optional attributes.
fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

fn get_f64_attr(var: &netcdf::Variable, name: &str) -> Option<f64> {
    if !has_attr(var, name) {
        return None;
    }
    let attr_value = var.attribute_value(name)?.ok()?;
    f64::try_from(attr_value).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_file() {
        let result = NetCdfFile::open("/nonexistent/cyg01.ddmi.nc");
        assert!(matches!(result, Err(NetCdfError::IoError(_))));
    }
}
