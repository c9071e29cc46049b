//! Output caching tests

use super::fixtures::{Workspace, day, record, write_input};
use crate::processor::{DayPlan, DayRangeProcessor};
use std::fs;

fn workspace_with_one_day() -> Workspace {
    let workspace = Workspace::new();
    write_input(
        &workspace.input_root(),
        "o3",
        "2020-01-01",
        "2020-01-01",
        &[
            record(-97.0, 40.0, "2020-01-01T13:00:00Z", 10.0, "ppb"),
            record(-96.5, 40.2, "2020-01-01T15:00:00Z", 20.0, "ppb"),
        ],
    );
    workspace
}

#[test]
fn test_second_run_is_idempotent() {
    let workspace = workspace_with_one_day();
    let config = workspace
        .config(day(2020, 1, 1), day(2020, 1, 1))
        .without_netcdf();
    let processor = DayRangeProcessor::new(config).unwrap();

    let first = processor.process().unwrap();
    assert_eq!(first.tables_written, 1);

    let path = processor.outputs().csv(day(2020, 1, 1));
    let bytes = fs::read(&path).unwrap();
    let modified = fs::metadata(&path).unwrap().modified().unwrap();

    let second = processor.process().unwrap();
    assert_eq!(second.tables_written, 0);
    assert_eq!(second.days_cached, 1);
    assert_eq!(second.files_read, 0);

    assert_eq!(fs::read(&path).unwrap(), bytes);
    assert_eq!(fs::metadata(&path).unwrap().modified().unwrap(), modified);
}

#[test]
fn test_cached_day_does_not_read_inputs() {
    let workspace = Workspace::new();
    // Reading this would fail the run
    write_input(
        &workspace.input_root(),
        "o3",
        "2020-01-01",
        "2020-01-01",
        &["not json".to_string()],
    );

    let config = workspace
        .config(day(2020, 1, 1), day(2020, 1, 1))
        .without_netcdf();
    let processor = DayRangeProcessor::new(config).unwrap();
    let path = processor.outputs().csv(day(2020, 1, 1));
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, "cached").unwrap();

    let stats = processor.process().unwrap();
    assert_eq!(stats.days_cached, 1);
    assert_eq!(stats.days_processed, 0);
    assert_eq!(fs::read_to_string(&path).unwrap(), "cached");
}

#[test]
fn test_plan_only_lists_missing_requested_outputs() {
    let workspace = workspace_with_one_day();
    let config = workspace
        .config(day(2020, 1, 1), day(2020, 1, 2))
        .without_netcdf();
    let processor = DayRangeProcessor::new(config).unwrap();

    let plan = processor.plan_day(day(2020, 1, 1));
    assert_eq!(
        plan,
        DayPlan {
            netcdf: None,
            csv: Some(processor.outputs().csv(day(2020, 1, 1))),
        }
    );
    assert!(!plan.is_complete());

    processor.process().unwrap();
    assert!(processor.plan_day(day(2020, 1, 1)).is_complete());
    // No data for Jan 2, so it stays pending
    assert!(!processor.plan_day(day(2020, 1, 2)).is_complete());
}

#[test]
fn test_partial_files_are_not_left_behind() {
    let workspace = workspace_with_one_day();
    let config = workspace
        .config(day(2020, 1, 1), day(2020, 1, 1))
        .without_netcdf();
    let processor = DayRangeProcessor::new(config).unwrap();
    processor.process().unwrap();

    let dir = processor
        .outputs()
        .csv(day(2020, 1, 1))
        .parent()
        .unwrap()
        .to_path_buf();
    let names: Vec<String> = fs::read_dir(&dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["OPENAQ.12US1.2020-01-01.o3.1H.csv".to_string()]);
}

#[cfg(feature = "netcdf")]
#[test]
fn test_missing_kind_is_filled_in() {
    let workspace = workspace_with_one_day();
    let csv_only = workspace
        .config(day(2020, 1, 1), day(2020, 1, 1))
        .without_netcdf();
    let processor = DayRangeProcessor::new(csv_only).unwrap();
    processor.process().unwrap();
    let csv_path = processor.outputs().csv(day(2020, 1, 1));
    let csv_bytes = fs::read(&csv_path).unwrap();

    let both = DayRangeProcessor::new(workspace.config(day(2020, 1, 1), day(2020, 1, 1))).unwrap();
    let stats = both.process().unwrap();
    assert_eq!(stats.grids_written, 1);
    assert_eq!(stats.tables_written, 0);
    assert!(both.outputs().netcdf(day(2020, 1, 1)).exists());
    assert_eq!(fs::read(&csv_path).unwrap(), csv_bytes);
}
