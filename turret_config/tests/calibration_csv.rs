use std::fs::File;
use std::io::Write;

use rstest::rstest;
use tempfile::tempdir;
use turret_config::{CalibrationRow, TargetingCalibration, load_calibration_csv};

fn row(column: u32, angle: f64) -> CalibrationRow {
    CalibrationRow { column, angle }
}

#[rstest]
fn two_point_fit_is_exact() {
    let c = TargetingCalibration::from_rows(vec![row(0, 117.89), row(10, 123.503)]).unwrap();
    assert!((c.slope - 0.5613).abs() < 1e-9);
    assert!((c.intercept - 117.89).abs() < 1e-9);
    assert!((c.angle_for(10) - 123.503).abs() < 1e-9);
}

#[rstest]
fn outlier_is_rejected_on_refit() {
    // angle = 0.5 * column + 100, with one bad sighting at column 20.
    let mut rows: Vec<_> = (0..10).map(|c| row(c * 3, 0.5 * f64::from(c * 3) + 100.0)).collect();
    rows.push(row(20, 150.0));
    let c = TargetingCalibration::from_rows(rows).unwrap();
    assert!((c.slope - 0.5).abs() < 1e-9, "slope {}", c.slope);
    assert!((c.intercept - 100.0).abs() < 1e-9, "intercept {}", c.intercept);
}

#[rstest]
#[case(vec![row(4, 120.0)])]
#[case(vec![row(4, 120.0), row(4, 121.0)])]
#[case(vec![row(4, 120.0), row(5, f64::NAN)])]
fn degenerate_rows_fail(#[case] rows: Vec<CalibrationRow>) {
    assert!(TargetingCalibration::from_rows(rows).is_err());
}

#[test]
fn loads_csv_with_exact_headers() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cal.csv");
    let mut f = File::create(&path).unwrap();
    writeln!(f, "column,angle").unwrap();
    writeln!(f, "0, 117.89").unwrap();
    writeln!(f, "20,129.116").unwrap();
    drop(f);
    let c = load_calibration_csv(&path).unwrap();
    assert!((c.slope - 0.5613).abs() < 1e-9);
}

#[test]
fn rejects_wrong_headers() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cal.csv");
    std::fs::write(&path, "col,deg\n0,1\n1,2\n").unwrap();
    let err = load_calibration_csv(&path).unwrap_err();
    assert!(format!("{err}").contains("column,angle"));
}

#[test]
fn reports_bad_row_number() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cal.csv");
    std::fs::write(&path, "column,angle\n0,1.0\nx,2.0\n").unwrap();
    let err = load_calibration_csv(&path).unwrap_err();
    assert!(format!("{err}").contains("row 3"), "{err}");
}
