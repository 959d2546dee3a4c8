use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "income" => Ok(TransactionKind::Income),
            "expense" => Ok(TransactionKind::Expense),
            other => Err(format!(
                "Invalid transaction kind '{}'. Use 'income' or 'expense'.",
                other
            )),
        }
    }
}

/// Largest amount a single transaction may carry: one trillion.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xD4A5_1000, 0xE8, 0, false, 0);

/// True when `timestamp` (seconds since the epoch) maps to a local date.
pub fn timestamp_in_range(timestamp: i64) -> bool {
    Local.timestamp_opt(timestamp, 0).earliest().is_some()
}

/// A single income or expense entry.
///
/// `amount` is never negative; the direction of the cash flow comes from
/// `kind`. `timestamp` is fixed at creation and all date bucketing uses the
/// local calendar date derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: u64,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub category: String,
    pub note: String,
    pub timestamp: i64,
}

impl Transaction {
    pub fn new(
        id: u64,
        kind: TransactionKind,
        amount: Decimal,
        category: String,
        note: String,
        timestamp: i64,
    ) -> Self {
        Self {
            id,
            kind,
            amount,
            category,
            note,
            timestamp,
        }
    }

    pub fn is_expense(&self) -> bool {
        self.kind == TransactionKind::Expense
    }

    pub fn local_datetime(&self) -> DateTime<Local> {
        Local
            .timestamp_opt(self.timestamp, 0)
            .earliest()
            .unwrap_or_else(|| DateTime::<Utc>::default().with_timezone(&Local))
    }

    pub fn local_date(&self) -> NaiveDate {
        self.local_datetime().date_naive()
    }

    pub fn local_time(&self) -> NaiveTime {
        self.local_datetime().time()
    }
}

/// Seconds since the epoch for a wall-clock moment in the local timezone.
/// A time skipped by a DST jump resolves to the hour after it.
#[cfg(test)]
pub fn local_timestamp(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> i64 {
    Local
        .with_ymd_and_hms(year, month, day, hour, minute, 0)
        .earliest()
        .or_else(|| Local.with_ymd_and_hms(year, month, day, hour + 1, minute, 0).earliest())
        .expect("valid local time")
        .timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_amount_is_one_trillion() {
        assert_eq!(MAX_AMOUNT, Decimal::new(1_000_000_000_000, 0));
    }

    #[test]
    fn test_timestamp_range() {
        assert!(timestamp_in_range(0));
        assert!(timestamp_in_range(local_timestamp(2025, 6, 1, 12, 0)));
        assert!(!timestamp_in_range(99_999_999_999_999_999));
        assert!(!timestamp_in_range(i64::MIN));
    }

    #[test]
    fn test_kind_parse_is_case_insensitive() {
        assert_eq!("Income".parse::<TransactionKind>(), Ok(TransactionKind::Income));
        assert_eq!(" EXPENSE ".parse::<TransactionKind>(), Ok(TransactionKind::Expense));
    }

    #[test]
    fn test_kind_parse_rejects_unknown() {
        let err = "transfer".parse::<TransactionKind>().unwrap_err();
        assert!(err.contains("transfer"));
    }

    #[test]
    fn test_local_date_keeps_calendar_day_at_edges() {
        let early = Transaction::new(
            1,
            TransactionKind::Expense,
            Decimal::ONE,
            "Food".to_string(),
            String::new(),
            local_timestamp(2025, 3, 1, 0, 1),
        );
        let late = Transaction {
            id: 2,
            timestamp: local_timestamp(2025, 3, 1, 23, 59),
            ..early.clone()
        };
        let day = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        assert_eq!(early.local_date(), day);
        assert_eq!(late.local_date(), day);
        assert_eq!(late.local_time(), NaiveTime::from_hms_opt(23, 59, 0).unwrap());
    }

    #[test]
    fn test_kind_serializes_lowercase() {
        let json = serde_json::to_string(&TransactionKind::Expense).unwrap();
        assert_eq!(json, "\"expense\"");
    }
}
