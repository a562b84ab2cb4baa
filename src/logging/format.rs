//! Line format for log records
//!
//! `I20261018 09:15:02.123456: app.rs:42] {app_harness::app} message`

use std::io::{self, Write};
use std::path::Path;

use chrono::{DateTime, Local};
use log::Record;

/// Timestamp layout used in every record
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d %H:%M:%S%.6f";

/// Write one record in the harness line format
pub fn write_record<W: Write>(out: &mut W, now: DateTime<Local>, record: &Record<'_>) -> io::Result<()> {
    let level = record.level().as_str();
    let letter = level.chars().next().unwrap_or('?');
    let file = record
        .file()
        .and_then(|file| Path::new(file).file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "?".to_string());

    writeln!(
        out,
        "{}{}: {}:{}] {{{}}} {}",
        letter,
        now.format(TIMESTAMP_FORMAT),
        file,
        record.line().unwrap_or(0),
        record.target(),
        record.args()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use log::Level;

    #[test]
    fn test_record_layout() {
        let now = Local.with_ymd_and_hms(2026, 10, 18, 9, 15, 2).unwrap();
        let mut out = Vec::new();

        write_record(
            &mut out,
            now,
            &Record::builder()
                .args(format_args!("hello {}", "world"))
                .level(Level::Info)
                .target("app_harness::app")
                .file(Some("src/app/mod.rs"))
                .line(Some(42))
                .build(),
        )
        .unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "I20261018 09:15:02.000000: mod.rs:42] {app_harness::app} hello world\n"
        );
    }

    #[test]
    fn test_record_without_location() {
        let now = Local.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let mut out = Vec::new();

        write_record(
            &mut out,
            now,
            &Record::builder()
                .args(format_args!("bare"))
                .level(Level::Warn)
                .target("x")
                .build(),
        )
        .unwrap();

        assert!(String::from_utf8(out).unwrap().starts_with("W20260102 03:04:05.000000: ?:0] {x}"));
    }
}
