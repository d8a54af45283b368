//! Transaction outcome and ledger record types.
//!
//! `ConfirmTxResult` is the per-broadcast resolution produced by the
//! confirmation tracker; `LedgerTransaction` is the durable row the relayer
//! reports to the transaction ledger.

use crate::packet::SignalPrice;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Resolution state of a broadcast transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxStatus {
	/// No receipt yet, or not enough confirmations on top of it.
	Unmined,
	/// Executed successfully and buried under the confirmation depth.
	Success,
	/// Included with a failed execution status.
	Failed,
}

impl TxStatus {
	/// Whether this status will never change again.
	pub fn is_terminal(&self) -> bool {
		matches!(self, TxStatus::Success | TxStatus::Failed)
	}
}

/// Outcome of checking one broadcast transaction against the chain.
///
/// Produced once per check; terminal once `status` is `Success` or `Failed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmTxResult {
	/// Hash of the checked transaction, 0x-prefixed.
	pub tx_hash: String,
	pub status: TxStatus,
	/// Gas consumed, populated on success.
	pub gas_used: Option<Decimal>,
	/// Price actually paid per gas, populated on success.
	pub effective_gas_price: Option<Decimal>,
	/// Block the transaction was included in, when mined.
	pub block_number: Option<u64>,
	/// Failure detail for failed transactions.
	pub failure_reason: Option<String>,
}

impl ConfirmTxResult {
	/// A transaction that is not yet resolvable.
	pub fn unmined(tx_hash: impl Into<String>) -> Self {
		Self {
			tx_hash: tx_hash.into(),
			status: TxStatus::Unmined,
			gas_used: None,
			effective_gas_price: None,
			block_number: None,
			failure_reason: None,
		}
	}

	/// A confirmed, successful transaction.
	pub fn success(
		tx_hash: impl Into<String>,
		gas_used: Decimal,
		effective_gas_price: Decimal,
		block_number: u64,
	) -> Self {
		Self {
			tx_hash: tx_hash.into(),
			status: TxStatus::Success,
			gas_used: Some(gas_used),
			effective_gas_price: Some(effective_gas_price),
			block_number: Some(block_number),
			failure_reason: None,
		}
	}

	/// A transaction whose receipt reports failed execution.
	pub fn failed(tx_hash: impl Into<String>, reason: impl Into<String>) -> Self {
		Self {
			tx_hash: tx_hash.into(),
			status: TxStatus::Failed,
			gas_used: None,
			effective_gas_price: None,
			block_number: None,
			failure_reason: Some(reason.into()),
		}
	}
}

/// Family of chains a transaction was sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainType {
	Evm,
}

/// Durable record of one relay transaction, keyed by `tx_hash`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerTransaction {
	/// Transaction hash, 0x-prefixed. The ledger's primary key.
	pub tx_hash: String,
	pub tunnel_id: u64,
	pub sequence: u64,
	/// Operator-facing name of the destination chain.
	pub chain_name: String,
	pub chain_type: ChainType,
	pub status: TxStatus,
	pub gas_used: Option<Decimal>,
	pub effective_gas_price: Option<Decimal>,
	/// Change in the sender's native balance across the relay, in wei.
	pub balance_delta: Option<Decimal>,
	/// The prices this transaction delivered.
	pub signal_prices: Vec<SignalPrice>,
	/// When this record was produced.
	pub timestamp: DateTime<Utc>,
}
