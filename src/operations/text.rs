//! Plain-text renderings for the non-interactive commands.

use super::summary::{CategoryBreakdown, Series, Summary};
use crate::models::transaction::Transaction;
use rust_decimal::{Decimal, RoundingStrategy};

/// `1234567.5` -> `1,234,567.50`.
pub fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let mut magnitude = rounded.abs();
    magnitude.rescale(2);
    let text = magnitude.to_string();
    let (whole, frac) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::new();
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if rounded < Decimal::ZERO { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, frac)
}

const TRANSACTION_COLUMNS: usize = 7;

fn transaction_row(cells: [&str; TRANSACTION_COLUMNS]) -> String {
    let [id, date, time, kind, amount, category, note] = cells;
    format!(
        "{:>5}  {:<10}  {:<8}  {:<7}  {:>14}  {:<15}  {}",
        id, date, time, kind, amount, category, note
    )
}

fn money_row(label: &str, income: Decimal, expense: Decimal) -> String {
    format!(
        "{:<8}  {:>14}  {:>14}",
        label,
        format_amount(income),
        format_amount(expense)
    )
}

/// Joins `lines` with a trailing newline after the last one.
fn finish(lines: Vec<String>) -> String {
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

pub fn render_transactions(transactions: &[&Transaction]) -> String {
    if transactions.is_empty() {
        return "No transactions.\n".to_string();
    }

    let mut lines = vec![transaction_row([
        "Id", "Date", "Time", "Kind", "Amount", "Category", "Note",
    ])];
    for t in transactions {
        let id = t.id.to_string();
        let date = t.local_date().format("%Y-%m-%d").to_string();
        let time = t.local_time().format("%H:%M:%S").to_string();
        let amount = format_amount(t.amount);
        lines.push(transaction_row([
            &id,
            &date,
            &time,
            t.kind.as_str(),
            &amount,
            &t.category,
            &t.note,
        ]));
    }
    finish(lines)
}

pub fn render_summary(summary: &Summary) -> String {
    format!(
        "Balance: {}\nSpent this month: {}\nSpent today: {}\n",
        format_amount(summary.balance),
        format_amount(summary.month_expense),
        format_amount(summary.day_expense)
    )
}

pub fn render_series<const N: usize>(series: &Series<N>) -> String {
    let mut lines = vec![
        format!(
            "{} .. {}",
            series.window.start.format("%Y-%m-%d"),
            series.window.end.format("%Y-%m-%d")
        ),
        format!("{:<8}  {:>14}  {:>14}", "", "Income", "Expense"),
    ];
    lines.extend(
        series
            .rows()
            .map(|(label, income, expense)| money_row(label, income, expense)),
    );
    lines.push(money_row("Total", series.total_income(), series.total_expense()));
    finish(lines)
}

pub fn render_breakdown(breakdown: &CategoryBreakdown) -> String {
    match breakdown {
        CategoryBreakdown::NoData => "No data\n".to_string(),
        CategoryBreakdown::Shares(shares) => {
            let mut lines: Vec<String> = shares
                .iter()
                .map(|share| {
                    let name = if share.category.is_empty() {
                        "(none)"
                    } else {
                        share.category.as_str()
                    };
                    format!(
                        "{:<15}  {:>14}  {:>6}",
                        name,
                        format_amount(share.total),
                        share.percent_label()
                    )
                })
                .collect();
            lines.push(format!("{:<15}  {:>14}", "Total", format_amount(breakdown.total())));
            finish(lines)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::transaction::TransactionKind;
    use crate::operations::summary::{CategoryShare, monthly_series};
    use chrono::NaiveDate;

    #[test]
    fn test_format_amount_groups_thousands() {
        assert_eq!(format_amount(Decimal::new(12345675, 1)), "1,234,567.50");
        assert_eq!(format_amount(Decimal::new(999, 0)), "999.00");
        assert_eq!(format_amount(Decimal::new(1000, 0)), "1,000.00");
        assert_eq!(format_amount(Decimal::new(-250050, 2)), "-2,500.50");
        assert_eq!(format_amount(Decimal::new(5, 3)), "0.01");
        assert_eq!(format_amount(Decimal::ZERO), "0.00");
    }

    #[test]
    fn test_render_breakdown_no_data() {
        assert_eq!(render_breakdown(&CategoryBreakdown::NoData), "No data\n");
    }

    #[test]
    fn test_render_breakdown_names_empty_category() {
        let breakdown = CategoryBreakdown::Shares(vec![CategoryShare {
            category: String::new(),
            total: Decimal::TEN,
            percent: Decimal::ONE_HUNDRED,
        }]);
        let text = render_breakdown(&breakdown);
        assert!(text.contains("(none)"));
        assert!(text.contains("100.0%"));
    }

    #[test]
    fn test_render_series_lists_every_bucket() {
        let series = monthly_series(&[], NaiveDate::from_ymd_opt(2025, 2, 10).unwrap());
        let text = render_series(&series);
        assert!(text.starts_with("2025-02-01 .. 2025-02-28"));
        for label in ["Week 1", "Week 2", "Week 3", "Week 4", "Week 5", "Total"] {
            assert!(text.contains(label), "missing {}", label);
        }
    }

    #[test]
    fn test_render_transactions_empty_and_filled() {
        assert_eq!(render_transactions(&[]), "No transactions.\n");

        let tx = Transaction::new(
            7,
            TransactionKind::Expense,
            Decimal::new(350, 2),
            "Food".to_string(),
            "Coffee".to_string(),
            0,
        );
        let text = render_transactions(&[&tx]);
        assert!(text.contains("expense"));
        assert!(text.contains("3.50"));
        assert!(text.contains("Coffee"));
    }

    #[test]
    fn test_render_breakdown_exact_layout() {
        let breakdown = CategoryBreakdown::Shares(vec![
            CategoryShare {
                category: "Food".to_string(),
                total: Decimal::new(75, 0),
                percent: Decimal::new(75, 0),
            },
            CategoryShare {
                category: "Bus".to_string(),
                total: Decimal::new(25, 0),
                percent: Decimal::new(25, 0),
            },
        ]);
        let expected = format!(
            "{:<15}  {:>14}  {:>6}\n{:<15}  {:>14}  {:>6}\n{:<15}  {:>14}\n",
            "Food", "75.00", "75.0%", "Bus", "25.00", "25.0%", "Total", "100.00"
        );
        assert_eq!(render_breakdown(&breakdown), expected);
    }

    #[test]
    fn test_render_transactions_one_line_per_row() {
        let tx = Transaction::new(1, TransactionKind::Income, Decimal::ONE, "Job".to_string(), String::new(), 0);
        let text = render_transactions(&[&tx, &tx]);
        assert_eq!(text.lines().count(), 3);
        assert!(text.ends_with('\n'));
        assert!(text.lines().next().unwrap().trim_start().starts_with("Id"));
    }

    #[test]
    fn test_render_series_ends_with_totals() {
        let series = monthly_series(&[], NaiveDate::from_ymd_opt(2025, 2, 10).unwrap());
        let text = render_series(&series);
        assert_eq!(text.lines().count(), 8);
        assert!(text.lines().last().unwrap().starts_with("Total"));
    }
}
