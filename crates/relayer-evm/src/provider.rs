//! Chain provider facade.
//!
//! `EvmChainProvider` is the surface upstream orchestration consumes: connect
//! and keep the connection fresh, query tunnel state, and relay packets. It
//! wires the endpoint manager, gas pricing, confirmation tracking, signer
//! pool, and ledger into one object built from configuration.

use crate::client::Connector;
use crate::confirm::ConfirmationTracker;
use crate::endpoints::EndpointManager;
use crate::gas::{GasCaps, GasFeeService};
use crate::relayer::{PacketRelayer, RelayerSettings};
use crate::router;
use crate::ChainError;
use alloy_primitives::{Address, U256};
use relayer_config::TargetChainConfig;
use relayer_signer::{SignerInterface, SignerPool};
use relayer_store::LedgerService;
use relayer_types::{Packet, Tunnel};
use std::sync::Arc;
use tokio::sync::watch;

/// Destination-chain provider for tunnel packets.
pub struct EvmChainProvider {
	router_address: Address,
	endpoints: Arc<EndpointManager>,
	relayer: PacketRelayer,
}

impl EvmChainProvider {
	/// Builds the provider and its component stack from configuration.
	pub fn new(
		config: &TargetChainConfig,
		chain_name: &str,
		connector: Arc<dyn Connector>,
		signers: Vec<Arc<dyn SignerInterface>>,
		ledger: LedgerService,
	) -> Result<Self, ChainError> {
		let settings = RelayerSettings::from_config(config, chain_name)?;

		let endpoints = Arc::new(EndpointManager::new(
			config.endpoints.clone(),
			config.liveliness_interval(),
			connector,
		));
		let gas = Arc::new(GasFeeService::new(
			&config.gas.gas_type,
			GasCaps::from(&config.gas),
			endpoints.clone(),
		)?);
		let confirmations = Arc::new(ConfirmationTracker::new(
			endpoints.clone(),
			config.block_confirmation,
		));
		let signer_pool = Arc::new(SignerPool::load(signers));
		let ledger = Arc::new(ledger);

		let router_address = settings.router_address;
		let relayer = PacketRelayer::new(
			settings,
			endpoints.clone(),
			gas,
			confirmations,
			signer_pool,
			ledger,
		);

		Ok(Self {
			router_address,
			endpoints,
			relayer,
		})
	}

	/// Selects the freshest configured endpoint.
	pub async fn connect(&self) -> Result<(), ChainError> {
		self.endpoints.connect().await
	}

	/// Re-runs endpoint selection on the configured interval until shutdown.
	pub async fn run_liveliness_loop(&self, shutdown: watch::Receiver<bool>) {
		self.endpoints.run_liveliness_loop(shutdown).await
	}

	/// Reads one tunnel's delivery state from the router contract.
	pub async fn query_tunnel_info(
		&self,
		tunnel_id: u64,
		target_address: Address,
	) -> Result<Tunnel, ChainError> {
		self.endpoints.ensure_connected().await?;
		let client = self.endpoints.client()?;

		let calldata = router::tunnel_info_calldata(tunnel_id, target_address);
		let raw = client.call(self.router_address, calldata).await?;
		router::decode_tunnel_info(tunnel_id, target_address, &raw)
	}

	/// Delivers one packet to the router, confirming it on-chain.
	pub async fn relay_packet(&self, packet: &Packet) -> Result<(), ChainError> {
		self.relayer.relay_packet(packet).await
	}

	/// Native balance of an account on the destination chain.
	pub async fn balance(&self, address: Address) -> Result<U256, ChainError> {
		self.endpoints.ensure_connected().await?;
		let client = self.endpoints.client()?;
		client.balance(address).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{MockConnector, MockNode};
	use alloy_sol_types::SolValue;
	use relayer_config::{GasConfig, TargetChainConfig};
	use relayer_signer::implementations::local::LocalSigner;
	use relayer_store::implementations::memory::MemoryLedger;
	use relayer_types::SecretString;

	const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

	fn chain_config() -> TargetChainConfig {
		TargetChainConfig {
			endpoints: vec!["http://node".to_string()],
			chain_id: 31337,
			router_address: "0x7777777777777777777777777777777777777777".to_string(),
			block_confirmation: 5,
			max_retry: 3,
			query_timeout_secs: 5,
			execute_timeout_secs: 30,
			liveliness_interval_secs: 60,
			check_confirmation_interval_secs: 1,
			waiting_confirmation_timeout_secs: 1,
			gas_limit_margin_pct: 20,
			gas: GasConfig {
				gas_type: "legacy".to_string(),
				gas_multiplier: 1.1,
				max_gas_price: 0,
				max_priority_fee: 0,
				max_base_fee: 0,
			},
		}
	}

	fn provider_with(node: Arc<MockNode>) -> EvmChainProvider {
		let connector = MockConnector::new();
		connector.add("http://node", node);
		let signer: Arc<dyn SignerInterface> = Arc::new(
			LocalSigner::new("dev".to_string(), SecretString::from(DEV_KEY)).unwrap(),
		);
		EvmChainProvider::new(
			&chain_config(),
			"testnet-evm",
			Arc::new(connector),
			vec![signer],
			LedgerService::new(Box::new(MemoryLedger::new())),
		)
		.unwrap()
	}

	#[tokio::test]
	async fn test_query_tunnel_info_decodes_router_response() {
		let response = (true, 41u64, U256::from(5_000u64)).abi_encode_params();
		let node = MockNode::new().call_response(response.into());
		let provider = provider_with(node);

		let target = Address::repeat_byte(0x33);
		let tunnel = provider.query_tunnel_info(1, target).await.unwrap();

		assert_eq!(tunnel.id, 1);
		assert!(tunnel.is_active);
		assert_eq!(tunnel.latest_sequence, 41);
		assert_eq!(tunnel.balance, U256::from(5_000u64));
	}

	#[tokio::test]
	async fn test_balance_connects_on_demand() {
		let node = MockNode::new().balance(U256::from(42u64));
		let provider = provider_with(node);

		let balance = provider
			.balance(Address::repeat_byte(0x01))
			.await
			.unwrap();
		assert_eq!(balance, U256::from(42u64));
	}

	#[test]
	fn test_invalid_router_address_is_fatal() {
		let mut config = chain_config();
		config.router_address = "not-an-address".to_string();

		let err = EvmChainProvider::new(
			&config,
			"testnet-evm",
			Arc::new(MockConnector::new()),
			vec![],
			LedgerService::new(Box::new(MemoryLedger::new())),
		)
		.err().unwrap();
		assert!(matches!(err, ChainError::InvalidAddress(_)));
	}

	#[test]
	fn test_unsupported_gas_type_is_fatal() {
		let mut config = chain_config();
		config.gas.gas_type = "eip4844".to_string();

		let err = EvmChainProvider::new(
			&config,
			"testnet-evm",
			Arc::new(MockConnector::new()),
			vec![],
			LedgerService::new(Box::new(MemoryLedger::new())),
		)
		.err().unwrap();
		assert!(matches!(err, ChainError::UnsupportedGasType(_)));
	}
}
