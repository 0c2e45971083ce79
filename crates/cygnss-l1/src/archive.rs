//! Local granule archive layout, granule naming and sequential batch reads.
//!
//! Granules live under
//! `<root>/<level>/<version>/<YYYY>/<MM>/<DD>/cygNN.ddmi.s<date>-000000-e<date>-235959.l1.power-brcs.aXX.dYY.nc`,
//! the same layout the downloader writes.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{L1Error, Result};
use crate::record::RecordSet;

/// Number of CYGNSS observatories (FM1 to FM8).
pub const SPACECRAFT_COUNT: u8 = 8;

/// Product versions with a known granule suffix (algorithm and data versions).
const VERSION_SUFFIXES: &[(&str, &str)] = &[
    ("v2.1", "a21.d21"),
    ("v3.0", "a30.d31"),
    ("v3.1", "a31.d32"),
];

/// CYGNSS product processing level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductLevel {
    L1,
    L2,
    L3,
}

impl ProductLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductLevel::L1 => "L1",
            ProductLevel::L2 => "L2",
            ProductLevel::L3 => "L3",
        }
    }
}

impl fmt::Display for ProductLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductLevel {
    type Err = L1Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "L1" => Ok(ProductLevel::L1),
            "L2" => Ok(ProductLevel::L2),
            "L3" => Ok(ProductLevel::L3),
            other => Err(L1Error::Config(format!("unknown product level '{}'", other))),
        }
    }
}

/// Identity of one daily L1 granule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GranuleInfo {
    pub spacecraft: u8,
    pub date: NaiveDate,
    pub product_version: Option<String>,
}

/// File name of one spacecraft's daily L1 granule.
pub fn granule_file_name(spacecraft: u8, date: NaiveDate, version: &str) -> Result<String> {
    if spacecraft == 0 || spacecraft > SPACECRAFT_COUNT {
        return Err(L1Error::Config(format!(
            "spacecraft number {} outside 1..={}",
            spacecraft, SPACECRAFT_COUNT
        )));
    }
    let suffix = VERSION_SUFFIXES
        .iter()
        .find(|(v, _)| *v == version)
        .map(|(_, s)| *s)
        .ok_or_else(|| L1Error::Config(format!("no granule naming known for version '{}'", version)))?;

    let day = date.format("%Y%m%d");
    Ok(format!(
        "cyg{:02}.ddmi.s{day}-000000-e{day}-235959.l1.power-brcs.{suffix}.nc",
        spacecraft,
        day = day,
        suffix = suffix
    ))
}

/// Parse a daily L1 granule file name.
pub fn parse_granule_name(name: &str) -> Option<GranuleInfo> {
    let parts: Vec<&str> = name.split('.').collect();
    if parts.len() < 3 || parts[1] != "ddmi" {
        return None;
    }

    let spacecraft = parts[0].strip_prefix("cyg")?.parse::<u8>().ok()?;
    let day = parts[2].strip_prefix('s')?.get(..8)?;
    let date = NaiveDate::parse_from_str(day, "%Y%m%d").ok()?;

    let product_version = parts.iter().find_map(|p| {
        let digits = p.strip_prefix('a')?;
        VERSION_SUFFIXES
            .iter()
            .find(|(_, s)| s.split('.').next() == Some(*p) && digits.len() == 2)
            .map(|(v, _)| v.to_string())
    });

    Some(GranuleInfo {
        spacecraft,
        date,
        product_version,
    })
}

/// Every date from `start` to `end`, inclusive.
pub fn date_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let mut day = start;
    while day <= end {
        dates.push(day);
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }
    dates
}

/// A local directory tree of granules for one product level and version.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalArchive {
    root: PathBuf,
    level: ProductLevel,
    version: String,
}

impl LocalArchive {
    pub fn new(root: impl Into<PathBuf>, level: ProductLevel, version: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            level,
            version: version.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/<level>/<version>`
    pub fn product_dir(&self) -> PathBuf {
        self.root.join(self.level.as_str()).join(&self.version)
    }

    /// `<root>/<level>/<version>/<YYYY>/<MM>/<DD>`
    pub fn daily_dir(&self, date: NaiveDate) -> PathBuf {
        self.product_dir()
            .join(format!("{:04}", date.year()))
            .join(format!("{:02}", date.month()))
            .join(format!("{:02}", date.day()))
    }

    /// A day's `.nc` granules, sorted by name. A missing day directory
    /// yields an empty list.
    pub fn daily_files(&self, date: NaiveDate) -> Result<Vec<PathBuf>> {
        let dir = self.daily_dir(date);
        if !dir.is_dir() {
            debug!(dir = %dir.display(), "No granules for date");
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.clone());
                L1Error::io(path, e.into())
            })?;
            let path = entry.path();
            if entry.file_type().is_file() && path.extension().map_or(false, |ext| ext == "nc") {
                files.push(path.to_path_buf());
            }
        }
        files.sort();
        Ok(files)
    }

    /// All granules from `start` to `end` inclusive, in date then name order.
    pub fn files_in_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for date in date_range(start, end) {
            files.extend(self.daily_files(date)?);
        }
        Ok(files)
    }

    /// Read every granule from `start` to `end` inclusive, one at a time.
    #[cfg(feature = "native")]
    pub fn read_date_range(
        &self,
        reader: &crate::reader::L1Reader,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BatchReport> {
        let files = self.files_in_range(start, end)?;
        Ok(read_batch(files, |path| reader.read_file(path)))
    }
}

/// Outcome of reading several granules.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub record_sets: Vec<RecordSet>,
    pub failures: Vec<(PathBuf, L1Error)>,
}

impl BatchReport {
    pub fn total_records(&self) -> usize {
        self.record_sets.iter().map(RecordSet::len).sum()
    }
}

/// Read granules sequentially. A failing file is recorded and skipped; it
/// never stops the batch.
pub fn read_batch<I, P, F>(paths: I, mut read: F) -> BatchReport
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
    F: FnMut(&Path) -> Result<RecordSet>,
{
    let mut report = BatchReport::default();

    for path in paths {
        let path = path.as_ref();
        match read(path) {
            Ok(records) => report.record_sets.push(records),
            Err(e) => {
                warn!(file = %path.display(), error = %e, "Skipping granule");
                report.failures.push((path.to_path_buf(), e));
            }
        }
    }

    info!(
        files = report.record_sets.len() + report.failures.len(),
        failed = report.failures.len(),
        records = report.total_records(),
        "Batch read complete"
    );

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_granule_name_roundtrip() {
        let name = granule_file_name(3, date(2023, 1, 9), "v3.1").unwrap();
        assert_eq!(
            name,
            "cyg03.ddmi.s20230109-000000-e20230109-235959.l1.power-brcs.a31.d32.nc"
        );
        let info = parse_granule_name(&name).unwrap();
        assert_eq!(info.spacecraft, 3);
        assert_eq!(info.date, date(2023, 1, 9));
        assert_eq!(info.product_version.as_deref(), Some("v3.1"));
    }

    #[test]
    fn test_granule_name_rejects() {
        assert!(granule_file_name(0, date(2023, 1, 1), "v3.1").is_err());
        assert!(granule_file_name(9, date(2023, 1, 1), "v3.1").is_err());
        assert!(granule_file_name(1, date(2023, 1, 1), "v9.9").is_err());
        assert!(parse_granule_name("OR_ABI-L2-CMIPC-M6C13_G16.nc").is_none());
        assert!(parse_granule_name("cygXX.ddmi.s20230101.nc").is_none());
    }

    #[test]
    fn test_date_range_inclusive() {
        let dates = date_range(date(2020, 2, 27), date(2020, 3, 1));
        assert_eq!(dates.len(), 4);
        assert_eq!(dates[2], date(2020, 2, 29));
        assert!(date_range(date(2020, 3, 2), date(2020, 3, 1)).is_empty());
    }

    #[test]
    fn test_daily_dir_layout() {
        let archive = LocalArchive::new("/data/cygnss", ProductLevel::L1, "v3.1");
        assert_eq!(
            archive.daily_dir(date(2021, 7, 4)),
            PathBuf::from("/data/cygnss/L1/v3.1/2021/07/04")
        );
    }

    #[test]
    fn test_product_level_parse() {
        assert_eq!("l1".parse::<ProductLevel>().unwrap(), ProductLevel::L1);
        assert!("L4".parse::<ProductLevel>().is_err());
    }
}
