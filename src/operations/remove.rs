use crate::error::{AppError, Result};
use crate::models::log::TransactionLog;
use crate::models::transaction::Transaction;
use tracing::info;

pub fn remove_transaction(log: &mut TransactionLog, id: u64) -> Result<Transaction> {
    let removed = log.remove(id).ok_or(AppError::NotFound(id))?;
    info!(id, "transaction removed");
    Ok(removed)
}

pub fn parse_id(input: &str) -> Result<u64> {
    let input = input.trim();
    if input.is_empty() {
        return Err(AppError::Validation("Transaction ID cannot be empty.".to_string()));
    }
    input.parse::<u64>().map_err(|_| {
        AppError::Validation(format!("Invalid transaction ID '{}'. Expected a number.", input))
    })
}
