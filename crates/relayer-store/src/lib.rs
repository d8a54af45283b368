//! Transaction ledger for the tunnel relayer.
//!
//! The ledger keeps one row per broadcast transaction, keyed by hash, so the
//! relayer's status tracking survives restarts. Backends implement a small
//! get/put interface; the insert-or-update policy that makes status writes
//! idempotent lives once, in `LedgerService`.

use async_trait::async_trait;
use relayer_types::LedgerTransaction;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod file;
	pub mod memory;
}

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum StoreError {
	/// Error that occurs during row serialization/deserialization.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// Error that occurs in the storage backend.
	#[error("Backend error: {0}")]
	Backend(String),
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Low-level interface a ledger backend must provide.
///
/// Backends store rows verbatim; they are not responsible for the
/// no-downgrade policy, which `LedgerService` applies before calling `put`.
#[async_trait]
pub trait LedgerInterface: Send + Sync {
	/// Fetches the row for a transaction hash, if one exists.
	async fn get(&self, tx_hash: &str) -> Result<Option<LedgerTransaction>, StoreError>;

	/// Inserts or replaces the row keyed by its transaction hash.
	async fn put(&self, tx: LedgerTransaction) -> Result<(), StoreError>;

	/// Returns every stored row.
	async fn all(&self) -> Result<Vec<LedgerTransaction>, StoreError>;
}

/// Type alias for ledger factory functions.
pub type LedgerFactory = fn(&toml::Value) -> Result<Box<dyn LedgerInterface>, StoreError>;

/// Get all registered ledger implementations.
pub fn get_all_implementations() -> Vec<(&'static str, LedgerFactory)> {
	use implementations::{file, memory};

	vec![
		("file", file::create_ledger as LedgerFactory),
		("memory", memory::create_ledger as LedgerFactory),
	]
}

/// High-level ledger service applying the idempotent update policy.
pub struct LedgerService {
	backend: Box<dyn LedgerInterface>,
}

impl LedgerService {
	pub fn new(backend: Box<dyn LedgerInterface>) -> Self {
		Self { backend }
	}

	/// Records a transaction outcome, insert-if-absent by hash.
	///
	/// An existing pending row is updated in place when the new status is
	/// terminal; a row that already reached `Success` or `Failed` is never
	/// overwritten. Re-reporting after a crash or a duplicate confirmation is
	/// therefore harmless.
	pub async fn add_or_update_transaction(
		&self,
		tx: LedgerTransaction,
	) -> Result<(), StoreError> {
		match self.backend.get(&tx.tx_hash).await? {
			None => self.backend.put(tx).await,
			Some(existing) if existing.status.is_terminal() => {
				tracing::debug!(
					tx_hash = %tx.tx_hash,
					status = ?existing.status,
					"Ledger row already terminal, keeping it"
				);
				Ok(())
			}
			Some(_) => self.backend.put(tx).await,
		}
	}

	/// Fetches one row by transaction hash.
	pub async fn get_transaction(
		&self,
		tx_hash: &str,
	) -> Result<Option<LedgerTransaction>, StoreError> {
		self.backend.get(tx_hash).await
	}

	/// Returns every recorded transaction.
	pub async fn list_transactions(&self) -> Result<Vec<LedgerTransaction>, StoreError> {
		self.backend.all().await
	}
}

#[cfg(test)]
mod tests {
	use super::implementations::memory::MemoryLedger;
	use super::*;
	use chrono::Utc;
	use relayer_types::{ChainType, TxStatus};
	use rust_decimal::Decimal;

	fn row(tx_hash: &str, status: TxStatus) -> LedgerTransaction {
		LedgerTransaction {
			tx_hash: tx_hash.to_string(),
			tunnel_id: 1,
			sequence: 42,
			chain_name: "testnet-evm".to_string(),
			chain_type: ChainType::Evm,
			status,
			gas_used: None,
			effective_gas_price: None,
			balance_delta: None,
			signal_prices: vec![],
			timestamp: Utc::now(),
		}
	}

	fn service() -> LedgerService {
		LedgerService::new(Box::new(MemoryLedger::new()))
	}

	#[tokio::test]
	async fn test_pending_then_terminal_updates_in_place() {
		let ledger = service();
		ledger
			.add_or_update_transaction(row("0xaa", TxStatus::Unmined))
			.await
			.unwrap();

		let mut success = row("0xaa", TxStatus::Success);
		success.gas_used = Some(Decimal::from(21_000u64));
		ledger.add_or_update_transaction(success).await.unwrap();

		let rows = ledger.list_transactions().await.unwrap();
		assert_eq!(rows.len(), 1);
		assert_eq!(rows[0].status, TxStatus::Success);
		assert_eq!(rows[0].gas_used, Some(Decimal::from(21_000u64)));
	}

	#[tokio::test]
	async fn test_terminal_row_is_never_downgraded() {
		let ledger = service();
		ledger
			.add_or_update_transaction(row("0xbb", TxStatus::Success))
			.await
			.unwrap();
		ledger
			.add_or_update_transaction(row("0xbb", TxStatus::Failed))
			.await
			.unwrap();
		ledger
			.add_or_update_transaction(row("0xbb", TxStatus::Unmined))
			.await
			.unwrap();

		let stored = ledger.get_transaction("0xbb").await.unwrap().unwrap();
		assert_eq!(stored.status, TxStatus::Success);
	}

	#[tokio::test]
	async fn test_distinct_hashes_get_distinct_rows() {
		let ledger = service();
		ledger
			.add_or_update_transaction(row("0xaa", TxStatus::Unmined))
			.await
			.unwrap();
		ledger
			.add_or_update_transaction(row("0xbb", TxStatus::Unmined))
			.await
			.unwrap();
		assert_eq!(ledger.list_transactions().await.unwrap().len(), 2);
	}
}
