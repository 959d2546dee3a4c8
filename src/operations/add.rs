use crate::error::{AppError, Result};
use crate::models::log::TransactionLog;
use crate::models::transaction::{MAX_AMOUNT, TransactionKind};
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::info;

const MAX_NOTE_LEN: usize = 255;
const MAX_CATEGORY_LEN: usize = 50;

pub fn parse_kind(input: &str) -> Result<TransactionKind> {
    TransactionKind::from_str(input).map_err(AppError::Validation)
}

pub fn parse_amount(input: &str) -> Result<Decimal> {
    let amount = Decimal::from_str(input.trim()).map_err(|_| {
        AppError::Validation(format!(
            "Invalid amount format {}. Please provide a valid decimal number.",
            input.trim()
        ))
    })?;
    validate_amount(amount)
}

pub fn validate_amount(amount: Decimal) -> Result<Decimal> {
    if amount < Decimal::ZERO {
        return Err(AppError::Validation(
            "Amount cannot be negative. Use the expense kind for money going out.".to_string(),
        ));
    }
    if amount > MAX_AMOUNT {
        return Err(AppError::Validation(format!(
            "Amount cannot exceed {}.",
            MAX_AMOUNT
        )));
    }
    Ok(amount)
}

pub fn clean_category(category: &str) -> Result<String> {
    let category = category.trim();
    if category.len() > MAX_CATEGORY_LEN {
        return Err(AppError::Validation("Category too long".to_string()));
    }
    Ok(category.to_string())
}

pub fn clean_note(note: &str) -> Result<String> {
    let note = note.trim();
    if note.len() > MAX_NOTE_LEN {
        return Err(AppError::Validation("Note too long".to_string()));
    }
    Ok(note.to_string())
}

/// Validates the fields and appends a new transaction stamped with
/// `timestamp`. Returns the new id.
pub fn create_transaction(
    log: &mut TransactionLog,
    kind: TransactionKind,
    amount: Decimal,
    category: &str,
    note: &str,
    timestamp: i64,
) -> Result<u64> {
    let amount = validate_amount(amount)?;
    let category = clean_category(category)?;
    let note = clean_note(note)?;
    let id = log.push(kind, amount, category, note, timestamp);
    info!(id, %kind, %amount, "transaction added");
    Ok(id)
}
