use crate::models::transaction::{Transaction, TransactionKind};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Snapshot of everything the tracker persists.
///
/// `categories` is the autocomplete catalog. It is only ever appended to, so
/// it can hold names no transaction uses, and a hand-edited data file can
/// carry transactions whose category it lacks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionLog {
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default = "first_id")]
    pub next_id: u64,
}

fn first_id() -> u64 {
    1
}

impl TransactionLog {
    pub fn new() -> Self {
        Self {
            transactions: Vec::new(),
            categories: Vec::new(),
            next_id: first_id(),
        }
    }

    pub fn push(
        &mut self,
        kind: TransactionKind,
        amount: Decimal,
        category: String,
        note: String,
        timestamp: i64,
    ) -> u64 {
        // Snapshots written by older builds may have ids beyond next_id.
        let max_seen = self.transactions.iter().map(|t| t.id).max().unwrap_or(0);
        let id = self.next_id.max(max_seen + 1);
        self.next_id = id + 1;
        self.remember_category(&category);
        self.transactions
            .push(Transaction::new(id, kind, amount, category, note, timestamp));
        id
    }

    pub fn remember_category(&mut self, category: &str) {
        if !self.categories.iter().any(|c| c == category) {
            self.categories.push(category.to_string());
        }
    }

    pub fn get(&self, id: u64) -> Option<&Transaction> {
        self.transactions.iter().find(|t| t.id == id)
    }

    pub fn get_mut(&mut self, id: u64) -> Option<&mut Transaction> {
        self.transactions.iter_mut().find(|t| t.id == id)
    }

    pub fn remove(&mut self, id: u64) -> Option<Transaction> {
        let pos = self.transactions.iter().position(|t| t.id == id)?;
        Some(self.transactions.remove(pos))
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    /// Sorted, de-duplicated union of the catalog and the categories
    /// actually present on transactions.
    pub fn category_catalog(&self) -> Vec<String> {
        let mut all: Vec<String> = self
            .categories
            .iter()
            .cloned()
            .chain(self.transactions.iter().map(|t| t.category.clone()))
            .collect();
        all.sort();
        all.dedup();
        all
    }

    pub fn available_dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self.transactions.iter().map(|t| t.local_date()).collect();
        dates.sort();
        dates.dedup();
        dates
    }

    pub fn on_date(&self, date: NaiveDate) -> Vec<&Transaction> {
        self.transactions
            .iter()
            .filter(|t| t.local_date() == date)
            .collect()
    }
}
