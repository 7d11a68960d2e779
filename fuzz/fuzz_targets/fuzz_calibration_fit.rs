#![no_main]
use libfuzzer_sys::arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use turret_config::{CalibrationRow, TargetingCalibration};

#[derive(Debug, Arbitrary)]
struct Row {
    column: u8,
    angle: f64,
}

fuzz_target!(|rows: Vec<Row>| {
    let rows: Vec<CalibrationRow> = rows
        .into_iter()
        .map(|r| CalibrationRow {
            column: u32::from(r.column),
            angle: r.angle,
        })
        .collect();
    // Any input set either fits a line or is rejected; never panics.
    if let Ok(cal) = TargetingCalibration::from_rows(rows) {
        let _ = cal.angle_for(16);
    }
});
