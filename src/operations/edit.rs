use super::add::{clean_category, clean_note, validate_amount};
use crate::error::{AppError, Result};
use crate::models::log::TransactionLog;
use crate::models::transaction::TransactionKind;
use rust_decimal::Decimal;
use tracing::info;

/// Fields to overwrite. `None` leaves the current value. The timestamp is
/// never editable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionEdit {
    pub kind: Option<TransactionKind>,
    pub amount: Option<Decimal>,
    pub category: Option<String>,
    pub note: Option<String>,
}

impl TransactionEdit {
    pub fn is_empty(&self) -> bool {
        self.kind.is_none() && self.amount.is_none() && self.category.is_none() && self.note.is_none()
    }
}

pub fn edit_transaction(log: &mut TransactionLog, id: u64, edit: TransactionEdit) -> Result<()> {
    let amount = edit.amount.map(validate_amount).transpose()?;
    let category = edit.category.as_deref().map(clean_category).transpose()?;
    let note = edit.note.as_deref().map(clean_note).transpose()?;

    let tx = log.get_mut(id).ok_or(AppError::NotFound(id))?;
    if let Some(kind) = edit.kind {
        tx.kind = kind;
    }
    if let Some(amount) = amount {
        tx.amount = amount;
    }
    if let Some(ref category) = category {
        tx.category = category.clone();
    }
    if let Some(note) = note {
        tx.note = note;
    }

    if let Some(category) = category {
        log.remember_category(&category);
    }
    info!(id, "transaction edited");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_with_one() -> (TransactionLog, u64) {
        let mut log = TransactionLog::new();
        let id = log.push(
            TransactionKind::Expense,
            Decimal::new(20, 0),
            "Food".to_string(),
            "dinner".to_string(),
            1_700_000_000,
        );
        (log, id)
    }

    #[test]
    fn test_edit_changes_requested_fields_only() {
        let (mut log, id) = log_with_one();
        let edit = TransactionEdit {
            amount: Some(Decimal::new(25, 0)),
            note: Some("late dinner".to_string()),
            ..Default::default()
        };

        edit_transaction(&mut log, id, edit).unwrap();
        let tx = log.get(id).unwrap();
        assert_eq!(tx.amount, Decimal::new(25, 0));
        assert_eq!(tx.note, "late dinner");
        assert_eq!(tx.category, "Food");
        assert_eq!(tx.kind, TransactionKind::Expense);
        assert_eq!(tx.timestamp, 1_700_000_000);
    }

    #[test]
    fn test_edit_new_category_joins_catalog() {
        let (mut log, id) = log_with_one();
        let edit = TransactionEdit {
            kind: Some(TransactionKind::Income),
            category: Some("Refund".to_string()),
            ..Default::default()
        };

        edit_transaction(&mut log, id, edit).unwrap();
        assert_eq!(log.get(id).unwrap().kind, TransactionKind::Income);
        assert_eq!(log.categories, vec!["Food", "Refund"]);
    }

    #[test]
    fn test_edit_unknown_id() {
        let (mut log, _) = log_with_one();
        let err = edit_transaction(&mut log, 99, TransactionEdit::default()).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_edit_rejects_negative_amount_without_changes() {
        let (mut log, id) = log_with_one();
        let edit = TransactionEdit {
            amount: Some(Decimal::new(-1, 0)),
            note: Some("changed".to_string()),
            ..Default::default()
        };

        assert!(edit_transaction(&mut log, id, edit).is_err());
        assert_eq!(log.get(id).unwrap().note, "dinner");
    }
}
