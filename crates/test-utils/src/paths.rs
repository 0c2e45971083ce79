//! Locating optional real granules and scratch directories for tests.

use std::path::PathBuf;

/// Workspace root, two levels above this crate's manifest.
pub fn workspace_root() -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    PathBuf::from(manifest_dir)
        .parent() // crates/
        .and_then(|p| p.parent())
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from(manifest_dir))
}

/// Look for a granule by file name.
///
/// Checked in order: `$TEST_DATA_DIR`, `crates/cygnss-l1/testdata/`,
/// `crates/netcdf-parser/testdata/`, then `testdata/` at the workspace root.
pub fn find_test_file(name: &str) -> Option<PathBuf> {
    let root = workspace_root();
    std::env::var_os("TEST_DATA_DIR")
        .map(PathBuf::from)
        .into_iter()
        .chain([
            root.join("crates/cygnss-l1/testdata"),
            root.join("crates/netcdf-parser/testdata"),
            root.join("testdata"),
        ])
        .map(|dir| dir.join(name))
        .find(|path| path.exists())
}

/// Scratch directory removed when the returned guard drops.
pub fn temp_test_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("Failed to create temporary test directory")
}
