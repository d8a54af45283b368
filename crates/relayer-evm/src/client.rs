//! RPC client abstraction for the destination chain.
//!
//! `EvmClient` is the narrow surface the relay engine needs from a node;
//! `AlloyClient` implements it over an alloy HTTP provider with every call
//! bounded by its own deadline. `Connector` abstracts client construction so
//! endpoint racing can be driven against simulated nodes in tests.

use crate::ChainError;
use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_provider::{Provider, RootProvider};
use alloy_rpc_types::{BlockNumberOrTag, BlockTransactionsKind, TransactionRequest};
use alloy_transport_http::Http;
use async_trait::async_trait;
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

/// Receipt fields the relay engine cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiptInfo {
	/// Whether execution succeeded.
	pub success: bool,
	/// Block the transaction was included in, when known.
	pub block_number: Option<u64>,
	/// Gas consumed by the transaction.
	pub gas_used: u128,
	/// Price actually paid per gas.
	pub effective_gas_price: u128,
}

/// The destination-chain RPC surface consumed by the relay engine.
#[async_trait]
pub trait EvmClient: Send + Sync {
	/// The endpoint URL this client is connected to.
	fn endpoint(&self) -> &str;

	/// Current chain head height.
	async fn block_number(&self) -> Result<u64, ChainError>;

	/// Next nonce for an account, including pending transactions.
	async fn pending_nonce(&self, address: Address) -> Result<u64, ChainError>;

	/// Executes a read-only call against a contract.
	async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ChainError>;

	/// Simulates a call to size its gas usage.
	async fn estimate_gas(&self, from: Address, to: Address, data: Bytes)
		-> Result<u64, ChainError>;

	/// Suggested legacy gas price in wei.
	async fn gas_price(&self) -> Result<u128, ChainError>;

	/// Suggested priority fee per gas in wei.
	async fn max_priority_fee_per_gas(&self) -> Result<u128, ChainError>;

	/// Base fee per gas of the latest block, in wei.
	async fn latest_base_fee(&self) -> Result<u128, ChainError>;

	/// Submits a signed, 2718-encoded transaction and returns its hash.
	async fn send_raw_transaction(&self, raw: Vec<u8>) -> Result<B256, ChainError>;

	/// Fetches the receipt for a transaction, if one exists yet.
	async fn transaction_receipt(&self, tx_hash: B256)
		-> Result<Option<ReceiptInfo>, ChainError>;

	/// Native balance of an account in wei.
	async fn balance(&self, address: Address) -> Result<U256, ChainError>;
}

/// Builds clients for candidate endpoints.
#[async_trait]
pub trait Connector: Send + Sync {
	/// Opens a client against the given endpoint URL.
	async fn connect(&self, endpoint: &str) -> Result<Arc<dyn EvmClient>, ChainError>;
}

/// Runs an RPC future under a deadline, folding both failure modes into
/// `ChainError::Network` with the call name attached.
async fn bounded<T, E, F>(deadline: Duration, call: &str, fut: F) -> Result<T, ChainError>
where
	E: std::fmt::Display,
	F: IntoFuture<Output = Result<T, E>>,
{
	match tokio::time::timeout(deadline, fut.into_future()).await {
		Ok(Ok(value)) => Ok(value),
		Ok(Err(e)) => Err(ChainError::Network(format!("{}: {}", call, e))),
		Err(_) => Err(ChainError::Network(format!(
			"{}: timed out after {:?}",
			call, deadline
		))),
	}
}

/// `EvmClient` implementation over an alloy HTTP provider.
pub struct AlloyClient {
	endpoint: String,
	provider: RootProvider<Http<reqwest::Client>>,
	query_timeout: Duration,
	execute_timeout: Duration,
}

impl AlloyClient {
	/// Connects to an HTTP JSON-RPC endpoint.
	pub fn new(
		endpoint: &str,
		query_timeout: Duration,
		execute_timeout: Duration,
	) -> Result<Self, ChainError> {
		let url = endpoint
			.parse()
			.map_err(|e| ChainError::Network(format!("invalid endpoint {}: {}", endpoint, e)))?;
		Ok(Self {
			endpoint: endpoint.to_string(),
			provider: RootProvider::new_http(url),
			query_timeout,
			execute_timeout,
		})
	}
}

#[async_trait]
impl EvmClient for AlloyClient {
	fn endpoint(&self) -> &str {
		&self.endpoint
	}

	async fn block_number(&self) -> Result<u64, ChainError> {
		bounded(
			self.query_timeout,
			"get_block_number",
			self.provider.get_block_number(),
		)
		.await
	}

	async fn pending_nonce(&self, address: Address) -> Result<u64, ChainError> {
		bounded(
			self.query_timeout,
			"get_transaction_count",
			self.provider.get_transaction_count(address).pending(),
		)
		.await
	}

	async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ChainError> {
		let request = TransactionRequest::default().to(to).input(data.into());
		bounded(self.query_timeout, "call", self.provider.call(&request)).await
	}

	async fn estimate_gas(
		&self,
		from: Address,
		to: Address,
		data: Bytes,
	) -> Result<u64, ChainError> {
		let request = TransactionRequest::default()
			.from(from)
			.to(to)
			.input(data.into());
		bounded(
			self.query_timeout,
			"estimate_gas",
			self.provider.estimate_gas(&request),
		)
		.await
	}

	async fn gas_price(&self) -> Result<u128, ChainError> {
		bounded(self.query_timeout, "get_gas_price", self.provider.get_gas_price()).await
	}

	async fn max_priority_fee_per_gas(&self) -> Result<u128, ChainError> {
		bounded(
			self.query_timeout,
			"get_max_priority_fee_per_gas",
			self.provider.get_max_priority_fee_per_gas(),
		)
		.await
	}

	async fn latest_base_fee(&self) -> Result<u128, ChainError> {
		let block = bounded(
			self.query_timeout,
			"get_block_by_number",
			self.provider
				.get_block_by_number(BlockNumberOrTag::Latest, BlockTransactionsKind::Hashes),
		)
		.await?
		.ok_or_else(|| ChainError::Network("latest block not available".to_string()))?;

		block
			.header
			.base_fee_per_gas
			.map(u128::from)
			.ok_or_else(|| ChainError::Network("latest block carries no base fee".to_string()))
	}

	async fn send_raw_transaction(&self, raw: Vec<u8>) -> Result<B256, ChainError> {
		let pending = bounded(
			self.execute_timeout,
			"send_raw_transaction",
			self.provider.send_raw_transaction(&raw),
		)
		.await?;
		Ok(*pending.tx_hash())
	}

	async fn transaction_receipt(
		&self,
		tx_hash: B256,
	) -> Result<Option<ReceiptInfo>, ChainError> {
		let receipt = bounded(
			self.query_timeout,
			"get_transaction_receipt",
			self.provider.get_transaction_receipt(tx_hash),
		)
		.await?;

		Ok(receipt.map(|receipt| ReceiptInfo {
			success: receipt.status(),
			block_number: receipt.block_number,
			gas_used: receipt.gas_used as u128,
			effective_gas_price: receipt.effective_gas_price as u128,
		}))
	}

	async fn balance(&self, address: Address) -> Result<U256, ChainError> {
		bounded(
			self.query_timeout,
			"get_balance",
			self.provider.get_balance(address),
		)
		.await
	}
}

/// Production connector building `AlloyClient`s.
pub struct AlloyConnector {
	query_timeout: Duration,
	execute_timeout: Duration,
}

impl AlloyConnector {
	pub fn new(query_timeout: Duration, execute_timeout: Duration) -> Self {
		Self {
			query_timeout,
			execute_timeout,
		}
	}
}

#[async_trait]
impl Connector for AlloyConnector {
	async fn connect(&self, endpoint: &str) -> Result<Arc<dyn EvmClient>, ChainError> {
		let client = AlloyClient::new(endpoint, self.query_timeout, self.execute_timeout)?;
		Ok(Arc::new(client))
	}
}
