//! File-backed ledger backend.
//!
//! One JSON document per transaction hash under a configured directory.
//! Writes go through a temp file followed by a rename, so a crash mid-write
//! leaves either the old row or the new one, never a torn file.

use crate::{LedgerInterface, StoreError};
use async_trait::async_trait;
use relayer_types::LedgerTransaction;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Ledger backend persisting rows as JSON files.
pub struct FileLedger {
	dir: PathBuf,
}

impl FileLedger {
	/// Creates the backend, ensuring the directory exists.
	pub fn new(dir: PathBuf) -> Result<Self, StoreError> {
		std::fs::create_dir_all(&dir)
			.map_err(|e| StoreError::Backend(format!("create {}: {}", dir.display(), e)))?;
		Ok(Self { dir })
	}

	/// Path of the row file for a transaction hash.
	fn row_path(&self, tx_hash: &str) -> PathBuf {
		// strip the 0x prefix so filenames stay uniform
		let name = tx_hash.trim_start_matches("0x");
		self.dir.join(format!("{}.json", name))
	}
}

async fn read_row(path: &Path) -> Result<Option<LedgerTransaction>, StoreError> {
	match fs::read(path).await {
		Ok(bytes) => {
			let row = serde_json::from_slice(&bytes)
				.map_err(|e| StoreError::Serialization(e.to_string()))?;
			Ok(Some(row))
		}
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
		Err(e) => Err(StoreError::Backend(format!("read {}: {}", path.display(), e))),
	}
}

#[async_trait]
impl LedgerInterface for FileLedger {
	async fn get(&self, tx_hash: &str) -> Result<Option<LedgerTransaction>, StoreError> {
		read_row(&self.row_path(tx_hash)).await
	}

	async fn put(&self, tx: LedgerTransaction) -> Result<(), StoreError> {
		let path = self.row_path(&tx.tx_hash);
		let bytes =
			serde_json::to_vec_pretty(&tx).map_err(|e| StoreError::Serialization(e.to_string()))?;

		let tmp = path.with_extension("json.tmp");
		fs::write(&tmp, &bytes)
			.await
			.map_err(|e| StoreError::Backend(format!("write {}: {}", tmp.display(), e)))?;
		fs::rename(&tmp, &path)
			.await
			.map_err(|e| StoreError::Backend(format!("rename {}: {}", path.display(), e)))?;
		Ok(())
	}

	async fn all(&self) -> Result<Vec<LedgerTransaction>, StoreError> {
		let mut entries = fs::read_dir(&self.dir)
			.await
			.map_err(|e| StoreError::Backend(format!("read_dir {}: {}", self.dir.display(), e)))?;

		let mut rows = Vec::new();
		while let Some(entry) = entries
			.next_entry()
			.await
			.map_err(|e| StoreError::Backend(e.to_string()))?
		{
			let path = entry.path();
			if path.extension().and_then(|e| e.to_str()) != Some("json") {
				continue;
			}
			if let Some(row) = read_row(&path).await? {
				rows.push(row);
			}
		}
		Ok(rows)
	}
}

/// Factory function to create a file ledger from configuration.
///
/// Configuration parameters:
/// - `path` (required): directory the row files live in
pub fn create_ledger(config: &toml::Value) -> Result<Box<dyn LedgerInterface>, StoreError> {
	let path = config
		.get("path")
		.and_then(|v| v.as_str())
		.ok_or_else(|| StoreError::Configuration("path is required".to_string()))?;

	let ledger = FileLedger::new(PathBuf::from(path))?;
	Ok(Box::new(ledger))
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Utc;
	use relayer_types::{ChainType, TxStatus};
	use tempfile::tempdir;

	fn row(tx_hash: &str, status: TxStatus) -> LedgerTransaction {
		LedgerTransaction {
			tx_hash: tx_hash.to_string(),
			tunnel_id: 3,
			sequence: 9,
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

	#[tokio::test]
	async fn test_rows_survive_reopen() {
		let dir = tempdir().unwrap();

		{
			let ledger = FileLedger::new(dir.path().to_path_buf()).unwrap();
			ledger.put(row("0xaa", TxStatus::Unmined)).await.unwrap();
		}

		let reopened = FileLedger::new(dir.path().to_path_buf()).unwrap();
		let stored = reopened.get("0xaa").await.unwrap().unwrap();
		assert_eq!(stored.sequence, 9);
	}

	#[tokio::test]
	async fn test_put_overwrites_and_all_lists() {
		let dir = tempdir().unwrap();
		let ledger = FileLedger::new(dir.path().to_path_buf()).unwrap();

		ledger.put(row("0xaa", TxStatus::Unmined)).await.unwrap();
		ledger.put(row("0xaa", TxStatus::Success)).await.unwrap();
		ledger.put(row("0xbb", TxStatus::Unmined)).await.unwrap();

		let rows = ledger.all().await.unwrap();
		assert_eq!(rows.len(), 2);
		let stored = ledger.get("0xaa").await.unwrap().unwrap();
		assert_eq!(stored.status, TxStatus::Success);
	}

	#[tokio::test]
	async fn test_missing_row_is_none() {
		let dir = tempdir().unwrap();
		let ledger = FileLedger::new(dir.path().to_path_buf()).unwrap();
		assert!(ledger.get("0xdoes-not-exist").await.unwrap().is_none());
	}

	#[test]
	fn test_factory_requires_path() {
		let config: toml::Value = toml::from_str("").unwrap();
		let err = create_ledger(&config).err().unwrap();
		assert!(matches!(err, StoreError::Configuration(_)));
	}
}
