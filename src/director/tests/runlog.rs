use chrono::{Local, TimeZone};
use tempfile::tempdir;

use crate::director::{RUN_LOG_HEADER, RunLog, format_date};

use super::interval;

#[test]
fn header_carries_watts_columns() -> Result<(), String> {
    let mut buffer = Vec::new();
    let names = ["10.0.0.9:3300".to_owned(), "meter-b:22444".to_owned()];
    let mut log = RunLog::new(&mut buffer, &names)?;
    log.write_result(&interval(1.0, 8), &[120.5, 99.0])?;
    log.flush()?;
    drop(log);

    let text = String::from_utf8(buffer).map_err(|err| err.to_string())?;
    let mut lines = text.lines();
    let expected_header = format!(
        "{},Watts(10.0.0.9:3300),Watts(meter-b:22444)",
        RUN_LOG_HEADER
    );
    if lines.next() != Some(expected_header.as_str()) {
        return Err(format!("Unexpected header in {:?}", text));
    }
    if lines.next() != Some("1.0,10,8,1,1,0.02,1.01,120.5,99.0") {
        return Err(format!("Unexpected row in {:?}", text));
    }
    Ok(())
}

#[test]
fn warmup_rows_are_skipped() -> Result<(), String> {
    let mut buffer = Vec::new();
    let mut log = RunLog::new(&mut buffer, &[])?;
    let warmup = log.write_result(&interval(-3.0, 4), &[])?;
    let boundary = log.write_result(&interval(0.0, 4), &[])?;
    let measured = log.write_result(&interval(1.0, 4), &[])?;
    drop(log);

    if warmup || boundary || !measured {
        return Err(format!(
            "Unexpected writes: {} {} {}",
            warmup, boundary, measured
        ));
    }
    let text = String::from_utf8(buffer).map_err(|err| err.to_string())?;
    if text.lines().count() != 2 {
        return Err(format!("Unexpected log: {:?}", text));
    }
    Ok(())
}

#[test]
fn date_rows_use_day_first_format() -> Result<(), String> {
    let at = Local
        .with_ymd_and_hms(2024, 3, 7, 14, 5, 9)
        .single()
        .ok_or_else(|| "Ambiguous local time".to_owned())?;
    if format_date(&at) != "07.03.2024;14:05:09000" {
        return Err(format!("Unexpected date: {}", format_date(&at)));
    }

    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let path = dir.path().join("run.csv");
    let mut log = RunLog::create(&path, &[])?;
    log.write_date_row(&at)?;
    log.flush()?;
    drop(log);

    let text = std::fs::read_to_string(&path).map_err(|err| err.to_string())?;
    if text != format!("{}\n,07.03.2024;14:05:09000\n", RUN_LOG_HEADER) {
        return Err(format!("Unexpected log: {:?}", text));
    }
    Ok(())
}

#[test]
fn create_fails_for_missing_directory() -> Result<(), String> {
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let path = dir.path().join("missing").join("run.csv");
    if RunLog::create(&path, &[]).is_ok() {
        return Err("Expected create error".to_owned());
    }
    Ok(())
}
