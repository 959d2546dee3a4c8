//! Balance, period totals and chart series derived from a transaction snapshot.
//!
//! Every function here is a pure function of the transactions and a reference
//! date. Date comparisons use the local calendar date of each timestamp, never
//! elapsed time.

use crate::models::transaction::{Transaction, TransactionKind};
use chrono::{Datelike, Days, Months, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const WEEKDAY_LABELS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
pub const WEEK_OF_MONTH_LABELS: [&str; 5] = ["Week 1", "Week 2", "Week 3", "Week 4", "Week 5"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Weekly,
    Monthly,
}

impl ViewMode {
    pub fn window(self, reference: NaiveDate) -> DateWindow {
        match self {
            ViewMode::Weekly => {
                let start = week_start(reference);
                let end = start.checked_add_days(Days::new(6)).unwrap_or(NaiveDate::MAX);
                DateWindow { start, end }
            }
            ViewMode::Monthly => {
                let start = reference
                    .checked_sub_days(Days::new(u64::from(reference.day0())))
                    .unwrap_or(NaiveDate::MIN);
                let end = start
                    .checked_add_months(Months::new(1))
                    .and_then(|d| d.pred_opt())
                    .unwrap_or(NaiveDate::MAX);
                DateWindow { start, end }
            }
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            ViewMode::Weekly => ViewMode::Monthly,
            ViewMode::Monthly => ViewMode::Weekly,
        }
    }

    /// Moves the reference date by one period in either direction.
    pub fn shift(self, reference: NaiveDate, forward: bool) -> NaiveDate {
        let moved = match (self, forward) {
            (ViewMode::Weekly, true) => reference.checked_add_days(Days::new(7)),
            (ViewMode::Weekly, false) => reference.checked_sub_days(Days::new(7)),
            (ViewMode::Monthly, true) => reference.checked_add_months(Months::new(1)),
            (ViewMode::Monthly, false) => reference.checked_sub_months(Months::new(1)),
        };
        moved.unwrap_or(reference)
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewMode::Weekly => f.pad("weekly"),
            ViewMode::Monthly => f.pad("monthly"),
        }
    }
}

/// Inclusive range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// First day of the displayed week. Weeks start on Sunday, so a Sunday is its
/// own week start.
pub fn week_start(reference: NaiveDate) -> NaiveDate {
    let since_sunday = u64::from(reference.weekday().num_days_from_sunday());
    reference
        .checked_sub_days(Days::new(since_sunday))
        .unwrap_or(NaiveDate::MIN)
}

fn same_month(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

// Totals clamp at `Decimal::MAX` instead of panicking on overflow.
fn saturating_sum(values: impl Iterator<Item = Decimal>) -> Decimal {
    values.fold(Decimal::ZERO, Decimal::saturating_add)
}

fn sum_where<F>(transactions: &[Transaction], mut keep: F) -> Decimal
where
    F: FnMut(&Transaction) -> bool,
{
    transactions
        .iter()
        .filter(|t| keep(t))
        .fold(Decimal::ZERO, |acc, t| acc.saturating_add(t.amount))
}

pub fn current_balance(transactions: &[Transaction]) -> Decimal {
    transactions.iter().fold(Decimal::ZERO, |acc, t| match t.kind {
        TransactionKind::Income => acc.saturating_add(t.amount),
        TransactionKind::Expense => acc.saturating_sub(t.amount),
    })
}

pub fn month_to_date_expense(transactions: &[Transaction], now: NaiveDate) -> Decimal {
    sum_where(transactions, |t| t.is_expense() && same_month(t.local_date(), now))
}

pub fn day_to_date_expense(transactions: &[Transaction], now: NaiveDate) -> Decimal {
    sum_where(transactions, |t| t.is_expense() && t.local_date() == now)
}

/// Income and expense totals per bucket, aligned with `labels`.
#[derive(Debug, Clone, PartialEq)]
pub struct Series<const N: usize> {
    pub labels: [&'static str; N],
    pub income: [Decimal; N],
    pub expense: [Decimal; N],
    pub window: DateWindow,
}

impl<const N: usize> Series<N> {
    fn empty(labels: [&'static str; N], window: DateWindow) -> Self {
        Self {
            labels,
            income: [Decimal::ZERO; N],
            expense: [Decimal::ZERO; N],
            window,
        }
    }

    fn add(&mut self, bucket: usize, transaction: &Transaction) {
        let slot = match transaction.kind {
            TransactionKind::Income => self.income.get_mut(bucket),
            TransactionKind::Expense => self.expense.get_mut(bucket),
        };
        if let Some(slot) = slot {
            *slot = slot.saturating_add(transaction.amount);
        }
    }

    pub fn total_income(&self) -> Decimal {
        saturating_sum(self.income.iter().copied())
    }

    pub fn total_expense(&self) -> Decimal {
        saturating_sum(self.expense.iter().copied())
    }

    /// `(label, income, expense)` rows, one per bucket.
    pub fn rows(&self) -> impl Iterator<Item = (&'static str, Decimal, Decimal)> + '_ {
        self.labels
            .iter()
            .zip(self.income.iter().zip(self.expense.iter()))
            .map(|(label, (income, expense))| (*label, *income, *expense))
    }
}

pub fn weekly_series(transactions: &[Transaction], reference: NaiveDate) -> Series<7> {
    let window = ViewMode::Weekly.window(reference);
    let mut series = Series::empty(WEEKDAY_LABELS, window);

    for transaction in transactions {
        let date = transaction.local_date();
        if !window.contains(date) {
            continue;
        }
        let offset = (date - window.start).num_days();
        series.add(offset as usize, transaction);
    }

    series
}

/// Week-of-month bucket index: days 1-7 land in 0, 8-14 in 1, ..., 29-31 in 4.
pub fn week_of_month(date: NaiveDate) -> usize {
    (date.day0() / 7) as usize
}

pub fn monthly_series(transactions: &[Transaction], reference: NaiveDate) -> Series<5> {
    let window = ViewMode::Monthly.window(reference);
    let mut series = Series::empty(WEEK_OF_MONTH_LABELS, window);

    for transaction in transactions {
        let date = transaction.local_date();
        if !same_month(date, reference) {
            continue;
        }
        series.add(week_of_month(date), transaction);
    }

    series
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryShare {
    pub category: String,
    pub total: Decimal,
    pub percent: Decimal,
}

impl CategoryShare {
    pub fn percent_label(&self) -> String {
        format!("{:.1}%", self.percent.to_f64().unwrap_or(0.0))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CategoryBreakdown {
    NoData,
    Shares(Vec<CategoryShare>),
}

impl CategoryBreakdown {
    pub fn shares(&self) -> &[CategoryShare] {
        match self {
            CategoryBreakdown::NoData => &[],
            CategoryBreakdown::Shares(shares) => shares,
        }
    }

    pub fn total(&self) -> Decimal {
        saturating_sum(self.shares().iter().map(|s| s.total))
    }
}

/// Expense totals per category inside the window selected by `mode`.
///
/// Categories are matched exactly (case and whitespace included) and keep the
/// order in which they first appear in the log.
pub fn category_breakdown(
    transactions: &[Transaction],
    reference: NaiveDate,
    mode: ViewMode,
) -> CategoryBreakdown {
    let window = mode.window(reference);
    let mut totals: Vec<(String, Decimal)> = Vec::new();

    for transaction in transactions
        .iter()
        .filter(|t| t.is_expense() && window.contains(t.local_date()))
    {
        match totals.iter_mut().find(|(c, _)| *c == transaction.category) {
            Some((_, total)) => *total = total.saturating_add(transaction.amount),
            None => totals.push((transaction.category.clone(), transaction.amount)),
        }
    }

    if totals.is_empty() {
        return CategoryBreakdown::NoData;
    }

    let grand_total = saturating_sum(totals.iter().map(|(_, v)| *v));
    let shares = totals
        .into_iter()
        .map(|(category, total)| {
            // All-zero expenses leave nothing to divide by; report 0%.
            let percent = total
                .checked_div(grand_total)
                .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
                .unwrap_or(Decimal::ZERO);
            CategoryShare {
                category,
                total,
                percent,
            }
        })
        .collect();

    CategoryBreakdown::Shares(shares)
}

/// The three headline figures shown above the charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub balance: Decimal,
    pub month_expense: Decimal,
    pub day_expense: Decimal,
}

impl Summary {
    pub fn compute(transactions: &[Transaction], today: NaiveDate) -> Self {
        Self {
            balance: current_balance(transactions),
            month_expense: month_to_date_expense(transactions, today),
            day_expense: day_to_date_expense(transactions, today),
        }
    }
}
