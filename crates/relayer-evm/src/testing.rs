//! Simulated nodes and connectors for driving the relay engine in tests.

use crate::client::{Connector, EvmClient, ReceiptInfo};
use crate::ChainError;
use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

/// Scripted behavior of one simulated node.
#[derive(Clone)]
pub(crate) struct NodeState {
	pub height: u64,
	pub reachable: bool,
	pub nonce: u64,
	pub gas_price: u128,
	pub priority_fee: u128,
	pub base_fee: Option<u128>,
	pub estimate: u64,
	pub estimate_fails: bool,
	pub broadcast_fails: bool,
	pub tx_hash: B256,
	pub receipt: Option<ReceiptInfo>,
	pub call_response: Bytes,
	pub balance: U256,
}

impl Default for NodeState {
	fn default() -> Self {
		Self {
			height: 1,
			reachable: true,
			nonce: 0,
			gas_price: 1_000_000_000,
			priority_fee: 1_000_000_000,
			base_fee: Some(1_000_000_000),
			estimate: 21_000,
			estimate_fails: false,
			broadcast_fails: false,
			tx_hash: B256::repeat_byte(0x11),
			receipt: None,
			call_response: Bytes::new(),
			balance: U256::ZERO,
		}
	}
}

/// A simulated node shared between the test and the clients opened on it.
pub(crate) struct MockNode {
	pub state: Mutex<NodeState>,
	pub broadcasts: AtomicU64,
	pub raw_txs: Mutex<Vec<Vec<u8>>>,
}

impl MockNode {
	pub fn new() -> Arc<Self> {
		Arc::new(Self {
			state: Mutex::new(NodeState::default()),
			broadcasts: AtomicU64::new(0),
			raw_txs: Mutex::new(Vec::new()),
		})
	}

	pub fn height(self: Arc<Self>, height: u64) -> Arc<Self> {
		self.state.lock().unwrap().height = height;
		self
	}

	pub fn unreachable(self: Arc<Self>) -> Arc<Self> {
		self.state.lock().unwrap().reachable = false;
		self
	}

	pub fn nonce(self: Arc<Self>, nonce: u64) -> Arc<Self> {
		self.state.lock().unwrap().nonce = nonce;
		self
	}

	pub fn gas_price(self: Arc<Self>, wei: u128) -> Arc<Self> {
		self.state.lock().unwrap().gas_price = wei;
		self
	}

	pub fn fees(self: Arc<Self>, priority_fee: u128, base_fee: u128) -> Arc<Self> {
		{
			let mut state = self.state.lock().unwrap();
			state.priority_fee = priority_fee;
			state.base_fee = Some(base_fee);
		}
		self
	}

	pub fn estimate(self: Arc<Self>, gas: u64) -> Arc<Self> {
		self.state.lock().unwrap().estimate = gas;
		self
	}

	pub fn estimate_fails(self: Arc<Self>) -> Arc<Self> {
		self.state.lock().unwrap().estimate_fails = true;
		self
	}

	pub fn broadcast_fails(self: Arc<Self>) -> Arc<Self> {
		self.state.lock().unwrap().broadcast_fails = true;
		self
	}

	pub fn receipt(self: Arc<Self>, receipt: ReceiptInfo) -> Arc<Self> {
		self.state.lock().unwrap().receipt = Some(receipt);
		self
	}

	pub fn call_response(self: Arc<Self>, data: Bytes) -> Arc<Self> {
		self.state.lock().unwrap().call_response = data;
		self
	}

	pub fn balance(self: Arc<Self>, wei: U256) -> Arc<Self> {
		self.state.lock().unwrap().balance = wei;
		self
	}
}

/// Client handle opened against a simulated node.
pub(crate) struct MockClient {
	endpoint: String,
	node: Arc<MockNode>,
}

#[async_trait]
impl EvmClient for MockClient {
	fn endpoint(&self) -> &str {
		&self.endpoint
	}

	async fn block_number(&self) -> Result<u64, ChainError> {
		Ok(self.node.state.lock().unwrap().height)
	}

	async fn pending_nonce(&self, _address: Address) -> Result<u64, ChainError> {
		Ok(self.node.state.lock().unwrap().nonce)
	}

	async fn call(&self, _to: Address, _data: Bytes) -> Result<Bytes, ChainError> {
		Ok(self.node.state.lock().unwrap().call_response.clone())
	}

	async fn estimate_gas(
		&self,
		_from: Address,
		_to: Address,
		_data: Bytes,
	) -> Result<u64, ChainError> {
		let state = self.node.state.lock().unwrap();
		if state.estimate_fails {
			return Err(ChainError::Network("estimate refused (mock)".to_string()));
		}
		Ok(state.estimate)
	}

	async fn gas_price(&self) -> Result<u128, ChainError> {
		Ok(self.node.state.lock().unwrap().gas_price)
	}

	async fn max_priority_fee_per_gas(&self) -> Result<u128, ChainError> {
		Ok(self.node.state.lock().unwrap().priority_fee)
	}

	async fn latest_base_fee(&self) -> Result<u128, ChainError> {
		self.node
			.state
			.lock()
			.unwrap()
			.base_fee
			.ok_or_else(|| ChainError::Network("no base fee (mock)".to_string()))
	}

	async fn send_raw_transaction(&self, raw: Vec<u8>) -> Result<B256, ChainError> {
		self.node.broadcasts.fetch_add(1, Ordering::SeqCst);
		self.node.raw_txs.lock().unwrap().push(raw);
		let state = self.node.state.lock().unwrap();
		if state.broadcast_fails {
			return Err(ChainError::Network("broadcast refused (mock)".to_string()));
		}
		Ok(state.tx_hash)
	}

	async fn transaction_receipt(
		&self,
		tx_hash: B256,
	) -> Result<Option<ReceiptInfo>, ChainError> {
		let state = self.node.state.lock().unwrap();
		if tx_hash != state.tx_hash {
			return Ok(None);
		}
		Ok(state.receipt)
	}

	async fn balance(&self, _address: Address) -> Result<U256, ChainError> {
		Ok(self.node.state.lock().unwrap().balance)
	}
}

/// Connector over a fixed set of simulated nodes.
pub(crate) struct MockConnector {
	nodes: Arc<Mutex<HashMap<String, Arc<MockNode>>>>,
	handles: Arc<Mutex<Vec<(String, Weak<MockClient>)>>>,
	attempts: Arc<AtomicU64>,
}

impl MockConnector {
	pub fn new() -> Self {
		Self {
			nodes: Arc::new(Mutex::new(HashMap::new())),
			handles: Arc::new(Mutex::new(Vec::new())),
			attempts: Arc::new(AtomicU64::new(0)),
		}
	}

	/// Another handle onto the same simulated network.
	pub fn clone_handle(&self) -> Self {
		Self {
			nodes: self.nodes.clone(),
			handles: self.handles.clone(),
			attempts: self.attempts.clone(),
		}
	}

	pub fn add(&self, endpoint: &str, node: Arc<MockNode>) {
		self.nodes.lock().unwrap().insert(endpoint.to_string(), node);
	}

	pub fn set_height(&self, endpoint: &str, height: u64) {
		let nodes = self.nodes.lock().unwrap();
		if let Some(node) = nodes.get(endpoint) {
			node.state.lock().unwrap().height = height;
		}
	}

	/// Weak handles to every client ever opened, for leak checks.
	pub fn handles(&self) -> Arc<Mutex<Vec<(String, Weak<MockClient>)>>> {
		self.handles.clone()
	}

	/// Counter of connection rounds (one per manager-level connect call).
	pub fn connect_attempts(&self) -> Arc<AtomicU64> {
		self.attempts.clone()
	}
}

#[async_trait]
impl Connector for MockConnector {
	async fn connect(&self, endpoint: &str) -> Result<Arc<dyn EvmClient>, ChainError> {
		self.attempts.fetch_add(1, Ordering::SeqCst);
		let node = self
			.nodes
			.lock()
			.unwrap()
			.get(endpoint)
			.cloned()
			.ok_or_else(|| ChainError::Network(format!("unknown endpoint {}", endpoint)))?;
		if !node.state.lock().unwrap().reachable {
			return Err(ChainError::Network(format!("{} unreachable (mock)", endpoint)));
		}

		let client = Arc::new(MockClient {
			endpoint: endpoint.to_string(),
			node,
		});
		self.handles
			.lock()
			.unwrap()
			.push((endpoint.to_string(), Arc::downgrade(&client)));
		Ok(client)
	}
}
