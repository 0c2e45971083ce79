//! Local archive listing and sequential batch reads.

use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use cygnss_l1::{
    granule_file_name, read_batch, CygnssConfig, L1Error, L1Reader, LocalArchive, ProductLevel,
    ReaderOptions,
};
use test_utils::{fixtures, temp_test_dir, SyntheticGranule};

fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, d).unwrap()
}

#[test]
fn test_daily_files_sorted_and_filtered() {
    let dir = temp_test_dir();
    let archive = LocalArchive::new(dir.path(), ProductLevel::L1, "v3.1");
    let day = archive.daily_dir(date(2));
    fs::create_dir_all(&day).unwrap();

    for sc in [3u8, 1, 2] {
        let name = granule_file_name(sc, date(2), "v3.1").unwrap();
        fs::write(day.join(name), b"").unwrap();
    }
    fs::write(day.join("README.txt"), b"").unwrap();
    fs::create_dir(day.join("nested.nc")).unwrap();

    let files = archive.daily_files(date(2)).unwrap();
    let names: Vec<String> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names.len(), 3);
    assert!(names[0].starts_with("cyg01"));
    assert!(names[2].starts_with("cyg03"));

    assert!(archive.daily_files(date(3)).unwrap().is_empty());
    assert_eq!(archive.files_in_range(date(1), date(5)).unwrap().len(), 3);
}

#[test]
fn test_batch_continues_past_failing_file() {
    let config = CygnssConfig::from_yaml_str(fixtures::TEST_CONFIG).unwrap();
    let reader = L1Reader::new(&config.l1, ReaderOptions::default()).unwrap();

    let paths = ["cyg01.nc", "cyg02.nc", "cyg03.nc"];
    let mut opened = Vec::new();

    let report = read_batch(paths, |path: &Path| {
        opened.push(path.to_path_buf());
        let name = path.to_string_lossy().into_owned();
        let granule = SyntheticGranule::new(2, 2).named(name.as_str());
        let granule = if name == "cyg02.nc" {
            granule.without("sp_inc_angle")
        } else {
            granule
        };
        reader.read_source(&granule.build())
    });

    assert_eq!(opened.len(), 3);
    assert_eq!(report.record_sets.len(), 2);
    assert_eq!(report.total_records(), 8);
    assert_eq!(report.failures.len(), 1);

    let (path, err) = &report.failures[0];
    assert_eq!(path, Path::new("cyg02.nc"));
    assert!(matches!(err, L1Error::MissingVariables { names, .. } if names == &["sp_inc_angle"]));
    assert_eq!(report.record_sets[1].source(), "cyg03.nc");
}

#[cfg(feature = "native")]
#[test]
fn test_read_date_range_reports_unreadable_files() {
    let dir = temp_test_dir();
    let archive = LocalArchive::new(dir.path(), ProductLevel::L1, "v3.1");
    let day = archive.daily_dir(date(4));
    fs::create_dir_all(&day).unwrap();
    fs::write(day.join(granule_file_name(5, date(4), "v3.1").unwrap()), b"not netcdf").unwrap();

    let config = CygnssConfig::from_yaml_str(fixtures::TEST_CONFIG).unwrap();
    let reader = L1Reader::new(&config.l1, ReaderOptions::default()).unwrap();

    let report = archive.read_date_range(&reader, date(1), date(7)).unwrap();
    assert!(report.record_sets.is_empty());
    assert_eq!(report.failures.len(), 1);
}
