use super::add::{clean_category, clean_note, parse_amount, parse_kind};
use crate::error::{AppError, Result};
use crate::models::log::TransactionLog;
use crate::models::transaction::{TransactionKind, timestamp_in_range};
use chrono::{Local, NaiveDate, NaiveDateTime, TimeZone};
use rust_decimal::Decimal;
use std::fs::File;
use std::path::Path;
use tracing::info;

struct ImportedRow {
    kind: TransactionKind,
    amount: Decimal,
    category: String,
    note: String,
    timestamp: i64,
}

/// Appends every row of the CSV file at `path` to `log`.
///
/// Rows are `kind,amount,category,note[,when]` without a header. `when` is
/// epoch seconds, `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DD` in local time; rows
/// without it are stamped with `now`. Nothing is appended if any row fails.
pub fn import_csv(log: &mut TransactionLog, path: &Path, now: i64) -> Result<usize> {
    let file = File::open(path).map_err(|e| {
        AppError::Validation(format!("Failed to open file '{}': {}", path.display(), e))
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .has_headers(false)
        .flexible(true)
        .from_reader(file);

    let mut rows = Vec::new();
    for (line_index, result) in reader.records().enumerate() {
        let line = line_index + 1;
        let record = result?;
        let row = parse_record(&record, now)
            .map_err(|e| AppError::Validation(format!("Line {}: {}", line, e)))?;
        rows.push(row);
    }

    let count = rows.len();
    for row in rows {
        log.push(row.kind, row.amount, row.category, row.note, row.timestamp);
    }
    info!(count, path = %path.display(), "imported transactions");
    Ok(count)
}

fn parse_record(record: &csv::StringRecord, now: i64) -> Result<ImportedRow> {
    if record.len() != 4 && record.len() != 5 {
        return Err(AppError::Validation(format!(
            "Invalid number of columns: expected 4 or 5, got {}",
            record.len()
        )));
    }

    let field = |i: usize| record.get(i).unwrap_or("");
    let timestamp = match record.get(4) {
        Some(when) if !when.is_empty() => parse_when(when)?,
        _ => now,
    };

    Ok(ImportedRow {
        kind: parse_kind(field(0))?,
        amount: parse_amount(field(1))?,
        category: clean_category(field(2))?,
        note: clean_note(field(3))?,
        timestamp,
    })
}

fn parse_when(input: &str) -> Result<i64> {
    if let Ok(secs) = input.parse::<i64>() {
        if !timestamp_in_range(secs) {
            return Err(AppError::Validation(format!(
                "Timestamp {} is out of range",
                secs
            )));
        }
        return Ok(secs);
    }
    let naive = NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| {
            NaiveDate::parse_from_str(input, "%Y-%m-%d")
                .map(|d| d.and_hms_opt(12, 0, 0).unwrap_or_default())
        })
        .map_err(|_| {
            AppError::Validation(format!(
                "Invalid date '{}'. Use YYYY-MM-DD, YYYY-MM-DD HH:MM:SS or epoch seconds.",
                input
            ))
        })?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.timestamp())
        .ok_or_else(|| AppError::Validation(format!("Time '{}' does not exist locally", input)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::transaction::local_timestamp;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp_csv(contents: &str) -> NamedTempFile {
        let mut tmp = NamedTempFile::new().expect("Failed to create temp file");
        write!(tmp, "{}", contents).expect("Failed to write test CSV");
        tmp
    }

    #[test]
    fn test_import_csv_success() {
        let mut log = TransactionLog::new();
        let csv_data = "\
income,1500.00,Job,Salary,2025-11-10
expense,3.50,Food,Coffee,2025-11-11 08:15:00
expense,12,Transport,Taxi
";

        let tmp = write_temp_csv(csv_data);
        let count = import_csv(&mut log, tmp.path(), 42).unwrap();

        assert_eq!(count, 3);
        assert_eq!(log.len(), 3);
        assert_eq!(log.transactions[0].local_date(), NaiveDate::from_ymd_opt(2025, 11, 10).unwrap());
        assert_eq!(log.transactions[1].timestamp, local_timestamp(2025, 11, 11, 8, 15));
        assert_eq!(log.transactions[2].timestamp, 42);
        assert_eq!(log.categories, vec!["Job", "Food", "Transport"]);
    }

    #[test]
    fn test_import_csv_invalid_row_imports_nothing() {
        let mut log = TransactionLog::new();
        let csv_data = "\
income,1500.00,Job,Salary
expense,oops,Food,Coffee
";

        let tmp = write_temp_csv(csv_data);
        let err = import_csv(&mut log, tmp.path(), 0).unwrap_err().to_string();

        assert!(err.contains("Line 2"));
        assert!(err.contains("Invalid amount"));
        assert!(log.is_empty());
    }

    #[test]
    fn test_import_csv_bad_date() {
        let mut log = TransactionLog::new();
        let tmp = write_temp_csv("expense,1,Food,Tea,yesterday\n");
        let err = import_csv(&mut log, tmp.path(), 0).unwrap_err().to_string();
        assert!(err.contains("Line 1"));
        assert!(err.contains("Invalid date"));
    }

    #[test]
    fn test_import_csv_rejects_out_of_range_epoch() {
        let mut log = TransactionLog::new();
        let tmp = write_temp_csv("income,1,Job,ok,1700000000\nexpense,5,Food,x,99999999999999999\n");
        let err = import_csv(&mut log, tmp.path(), 0).unwrap_err().to_string();
        assert!(err.contains("Line 2"));
        assert!(err.contains("out of range"));
        assert!(log.is_empty());
    }

    #[test]
    fn test_import_csv_accepts_epoch_seconds() {
        let mut log = TransactionLog::new();
        let tmp = write_temp_csv("income,1,Job,ok,1700000000\n");
        import_csv(&mut log, tmp.path(), 0).unwrap();
        assert_eq!(log.transactions[0].timestamp, 1_700_000_000);
    }

    #[test]
    fn test_import_csv_wrong_column_count() {
        let mut log = TransactionLog::new();
        let tmp = write_temp_csv("expense,1,Food\n");
        let err = import_csv(&mut log, tmp.path(), 0).unwrap_err().to_string();
        assert!(err.contains("expected 4 or 5, got 3"));
    }

    #[test]
    fn test_import_nonexistent_file() {
        let mut log = TransactionLog::new();
        let result = import_csv(&mut log, Path::new("nonexistent.csv"), 0);

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Failed to open file"));
    }
}
