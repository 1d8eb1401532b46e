//! Ledger management
//!
//! Wraps a [`LedgerStore`] and normalizes what it returns: values are
//! trimmed, blank cells are skipped and duplicates collapse into one set
//! entry.

use crate::adapters::traits::LedgerStore;
use crate::domain::{RecordId, Result};
use std::collections::HashSet;
use std::sync::Arc;

/// The ledger contents read at the start of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerSnapshot {
    /// Distinct exported identifiers
    pub ids: HashSet<RecordId>,
    /// Values read from storage, blanks and duplicates included
    pub stored_entries: usize,
    /// Blank values skipped
    pub blank_entries: usize,
    /// Values that repeated an earlier identifier
    pub duplicate_entries: usize,
}

impl LedgerSnapshot {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.ids.contains(id)
    }
}

/// Append-only ledger of exported record identifiers
#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn LedgerStore>,
}

impl Ledger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Load every recorded identifier
    ///
    /// # Errors
    ///
    /// Returns the store's error if it is unreachable or malformed.
    pub async fn load(&self) -> Result<LedgerSnapshot> {
        let raw = self.store.load().await?;

        let mut snapshot = LedgerSnapshot {
            stored_entries: raw.len(),
            ..LedgerSnapshot::default()
        };
        for value in raw {
            match RecordId::new(value) {
                Ok(id) => {
                    if !snapshot.ids.insert(id) {
                        snapshot.duplicate_entries += 1;
                    }
                }
                Err(_) => snapshot.blank_entries += 1,
            }
        }

        if snapshot.duplicate_entries > 0 {
            tracing::warn!(
                duplicates = snapshot.duplicate_entries,
                store = %self.store.describe(),
                "Ledger contains repeated identifiers"
            );
        }
        tracing::info!(
            ids = snapshot.len(),
            stored_entries = snapshot.stored_entries,
            blank_entries = snapshot.blank_entries,
            "Ledger loaded"
        );

        Ok(snapshot)
    }

    /// Append identifiers in order; existing entries are never touched
    ///
    /// # Errors
    ///
    /// Returns the store's error if the append is not confirmed.
    pub async fn append(&self, ids: &[RecordId]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        self.store.append(ids).await?;
        tracing::info!(appended = ids.len(), "Ledger updated");
        Ok(())
    }

    pub fn describe(&self) -> String {
        self.store.describe()
    }
}
