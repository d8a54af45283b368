//! In-memory ledger backend.
//!
//! Rows live in a HashMap behind a read-write lock. No persistence across
//! restarts; intended for tests and development runs.

use crate::{LedgerInterface, StoreError};
use async_trait::async_trait;
use relayer_types::LedgerTransaction;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Ledger backend keeping rows in process memory.
pub struct MemoryLedger {
	rows: RwLock<HashMap<String, LedgerTransaction>>,
}

impl MemoryLedger {
	pub fn new() -> Self {
		Self {
			rows: RwLock::new(HashMap::new()),
		}
	}
}

impl Default for MemoryLedger {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl LedgerInterface for MemoryLedger {
	async fn get(&self, tx_hash: &str) -> Result<Option<LedgerTransaction>, StoreError> {
		let rows = self.rows.read().await;
		Ok(rows.get(tx_hash).cloned())
	}

	async fn put(&self, tx: LedgerTransaction) -> Result<(), StoreError> {
		let mut rows = self.rows.write().await;
		rows.insert(tx.tx_hash.clone(), tx);
		Ok(())
	}

	async fn all(&self) -> Result<Vec<LedgerTransaction>, StoreError> {
		let rows = self.rows.read().await;
		Ok(rows.values().cloned().collect())
	}
}

/// Factory function to create a memory ledger from configuration.
///
/// Configuration parameters: none.
pub fn create_ledger(_config: &toml::Value) -> Result<Box<dyn LedgerInterface>, StoreError> {
	Ok(Box::new(MemoryLedger::new()))
}
