//! Confirmation depth resolution for broadcast transactions.
//!
//! The tracker is stateless per call: it fetches the receipt, applies the
//! confirmation-depth rule, and reports `Unmined`, `Success`, or `Failed`.
//! Polling cadence belongs to the caller.

use crate::endpoints::EndpointManager;
use crate::ChainError;
use alloy_primitives::B256;
use relayer_types::ConfirmTxResult;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Resolves a broadcast transaction's status against the confirmation depth.
pub struct ConfirmationTracker {
	endpoints: Arc<EndpointManager>,
	confirmation_depth: u64,
}

impl ConfirmationTracker {
	pub fn new(endpoints: Arc<EndpointManager>, confirmation_depth: u64) -> Self {
		Self {
			endpoints,
			confirmation_depth,
		}
	}

	/// Checks one transaction once.
	///
	/// A receipt with failed execution resolves `Failed` immediately, without
	/// waiting for depth: a reverted transaction never becomes successful. A
	/// missing receipt, or one not yet buried under the configured depth,
	/// resolves `Unmined` and the caller polls again later.
	pub async fn check_confirmed_tx(&self, tx_hash: B256) -> Result<ConfirmTxResult, ChainError> {
		let client = self.endpoints.client()?;
		let hash_str = format!("0x{}", hex::encode(tx_hash));

		let receipt = match client.transaction_receipt(tx_hash).await? {
			Some(receipt) => receipt,
			None => return Ok(ConfirmTxResult::unmined(hash_str)),
		};

		if !receipt.success {
			return Ok(ConfirmTxResult::failed(hash_str, "execution reverted"));
		}

		let block_number = match receipt.block_number {
			Some(block_number) => block_number,
			None => return Ok(ConfirmTxResult::unmined(hash_str)),
		};

		let current_height = client.block_number().await?;
		if current_height.saturating_sub(block_number) < self.confirmation_depth {
			return Ok(ConfirmTxResult::unmined(hash_str));
		}

		Ok(ConfirmTxResult::success(
			hash_str,
			Decimal::from_u128(receipt.gas_used).unwrap_or(Decimal::MAX),
			Decimal::from_u128(receipt.effective_gas_price).unwrap_or(Decimal::MAX),
			block_number,
		))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::client::ReceiptInfo;
	use crate::testing::{MockConnector, MockNode};
	use relayer_types::TxStatus;
	use std::time::Duration;

	const TX_HASH: B256 = B256::repeat_byte(0x11);

	async fn tracker_with(node: Arc<MockNode>, depth: u64) -> ConfirmationTracker {
		let connector = MockConnector::new();
		connector.add("http://node", node);
		let endpoints = Arc::new(EndpointManager::new(
			vec!["http://node".to_string()],
			Duration::from_secs(60),
			Arc::new(connector),
		));
		endpoints.connect().await.unwrap();
		ConfirmationTracker::new(endpoints, depth)
	}

	fn mined_receipt(success: bool, block_number: u64) -> ReceiptInfo {
		ReceiptInfo {
			success,
			block_number: Some(block_number),
			gas_used: 200_000,
			effective_gas_price: 18_000_000_000,
		}
	}

	#[tokio::test]
	async fn test_missing_receipt_is_unmined() {
		let tracker = tracker_with(MockNode::new().height(100), 5).await;
		let result = tracker.check_confirmed_tx(TX_HASH).await.unwrap();
		assert_eq!(result.status, TxStatus::Unmined);
	}

	#[tokio::test]
	async fn test_below_depth_is_unmined() {
		let node = MockNode::new().height(104).receipt(mined_receipt(true, 100));
		let tracker = tracker_with(node, 5).await;
		let result = tracker.check_confirmed_tx(TX_HASH).await.unwrap();
		assert_eq!(result.status, TxStatus::Unmined);
	}

	#[tokio::test]
	async fn test_at_depth_is_success_with_fields() {
		let node = MockNode::new().height(105).receipt(mined_receipt(true, 100));
		let tracker = tracker_with(node, 5).await;
		let result = tracker.check_confirmed_tx(TX_HASH).await.unwrap();

		assert_eq!(result.status, TxStatus::Success);
		assert_eq!(result.block_number, Some(100));
		assert_eq!(result.gas_used, Some(Decimal::from(200_000u64)));
		assert_eq!(
			result.effective_gas_price,
			Some(Decimal::from(18_000_000_000u64))
		);
	}

	#[tokio::test]
	async fn test_failed_receipt_is_terminal_regardless_of_depth() {
		// zero confirmations on top of the receipt block
		let node = MockNode::new().height(100).receipt(mined_receipt(false, 100));
		let tracker = tracker_with(node, 5).await;
		let result = tracker.check_confirmed_tx(TX_HASH).await.unwrap();

		assert_eq!(result.status, TxStatus::Failed);
		assert_eq!(result.failure_reason.as_deref(), Some("execution reverted"));
	}
}
