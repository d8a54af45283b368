//! The packet relay state machine.
//!
//! `relay_packet` drives one packet end to end: acquire a signer, build
//! calldata, price and size the transaction, sign, broadcast, and wait for
//! confirmation, retrying with an escalated bid until the configured ceiling.
//! The relayer is the only component that counts retries; everything below it
//! fails fast and leaves the decision here.

use crate::confirm::ConfirmationTracker;
use crate::endpoints::EndpointManager;
use crate::gas::GasFeeService;
use crate::router;
use crate::ChainError;
use alloy_consensus::{SignableTransaction, TxEip1559, TxEnvelope, TxLegacy};
use alloy_eips::eip2718::Encodable2718;
use alloy_eips::eip2930::AccessList;
use alloy_primitives::{Address, Bytes, TxKind, B256, U256};
use chrono::Utc;
use relayer_config::TargetChainConfig;
use relayer_signer::{SignerInterface, SignerPool};
use relayer_store::LedgerService;
use relayer_types::{
	ChainType, ConfirmTxResult, GasFee, LedgerTransaction, Packet, TxStatus,
};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;

/// Relay policy resolved from configuration at startup.
#[derive(Debug, Clone)]
pub struct RelayerSettings {
	pub chain_id: u64,
	pub chain_name: String,
	pub router_address: Address,
	pub max_retry: u64,
	pub gas_limit_margin_pct: u64,
	pub gas_multiplier: Decimal,
	pub check_confirmation_interval: Duration,
	pub waiting_confirmation_timeout: Duration,
}

impl RelayerSettings {
	/// Resolves settings from the chain configuration.
	///
	/// Address and multiplier conversion failures are fatal configuration
	/// errors surfaced before any packet is accepted.
	pub fn from_config(config: &TargetChainConfig, chain_name: &str) -> Result<Self, ChainError> {
		let router_address = config
			.router_address
			.parse::<Address>()
			.map_err(|e| ChainError::InvalidAddress(format!("{}: {}", config.router_address, e)))?;
		let gas_multiplier = Decimal::from_f64(config.gas.gas_multiplier).ok_or_else(|| {
			ChainError::Configuration(format!(
				"gas_multiplier {} is not representable",
				config.gas.gas_multiplier
			))
		})?;

		Ok(Self {
			chain_id: config.chain_id,
			chain_name: chain_name.to_string(),
			router_address,
			max_retry: config.max_retry,
			gas_limit_margin_pct: config.gas_limit_margin_pct,
			gas_multiplier,
			check_confirmation_interval: config.check_confirmation_interval(),
			waiting_confirmation_timeout: config.waiting_confirmation_timeout(),
		})
	}
}

/// Orchestrates the end-to-end delivery of packets to the router contract.
pub struct PacketRelayer {
	settings: RelayerSettings,
	endpoints: Arc<EndpointManager>,
	gas: Arc<GasFeeService>,
	confirmations: Arc<ConfirmationTracker>,
	signers: Arc<SignerPool>,
	ledger: Arc<LedgerService>,
}

impl PacketRelayer {
	pub fn new(
		settings: RelayerSettings,
		endpoints: Arc<EndpointManager>,
		gas: Arc<GasFeeService>,
		confirmations: Arc<ConfirmationTracker>,
		signers: Arc<SignerPool>,
		ledger: Arc<LedgerService>,
	) -> Self {
		Self {
			settings,
			endpoints,
			gas,
			confirmations,
			signers,
			ledger,
		}
	}

	/// Delivers one packet, retrying up to the configured ceiling.
	///
	/// The checked-out signer is held across every retry of this packet and
	/// returned to the pool on all exit paths, so at most one transaction per
	/// signer account is ever outstanding.
	pub async fn relay_packet(&self, packet: &Packet) -> Result<(), ChainError> {
		self.endpoints.ensure_connected().await?;

		let signer = self
			.signers
			.acquire()
			.await
			.map_err(|e| ChainError::Signing(e.to_string()))?;
		tracing::info!(
			tunnel_id = packet.tunnel_id,
			sequence = packet.sequence,
			signer = signer.name(),
			"Relaying packet"
		);

		self.relay_with_signer(packet, &*signer).await
		// the pool guard drops here, releasing the signer on every outcome
	}

	async fn relay_with_signer(
		&self,
		packet: &Packet,
		signer: &dyn SignerInterface,
	) -> Result<(), ChainError> {
		// calldata is a pure function of the packet, build it once
		let calldata = router::relay_calldata(packet);
		let mut previous_fee: Option<GasFee> = None;

		for attempt in 1..=self.settings.max_retry {
			match self
				.attempt_relay(packet, signer, calldata.clone(), &mut previous_fee)
				.await
			{
				Ok(()) => return Ok(()),
				Err(e) => {
					tracing::warn!(
						tunnel_id = packet.tunnel_id,
						sequence = packet.sequence,
						attempt,
						max_retry = self.settings.max_retry,
						error = %e,
						"Relay attempt failed"
					);
				}
			}
		}

		Err(ChainError::RelayPacketRetries(self.settings.max_retry))
	}

	/// One full attempt: price, size, sign, broadcast, confirm.
	async fn attempt_relay(
		&self,
		packet: &Packet,
		signer: &dyn SignerInterface,
		calldata: Bytes,
		previous_fee: &mut Option<GasFee>,
	) -> Result<(), ChainError> {
		// First attempt bids the fresh estimate clamped to the caps; retries
		// escalate the previous bid. A failed estimate leaves `previous_fee`
		// empty so the next attempt re-queries pricing.
		let gas_fee = match previous_fee.take() {
			None => {
				let estimated = self.gas.estimate_gas_fee().await?;
				self.gas.bump_and_bound(&estimated, Decimal::ONE)
			}
			Some(previous) => self.gas.bump_and_bound(&previous, self.settings.gas_multiplier),
		};
		*previous_fee = Some(gas_fee);

		let client = self.endpoints.client()?;
		let sender = signer.address();

		let estimated_gas = client
			.estimate_gas(sender, self.settings.router_address, calldata.clone())
			.await
			.map_err(|e| ChainError::GasEstimation(e.to_string()))?;
		// padded to tolerate state drift between estimation and inclusion
		let gas_limit = estimated_gas
			.saturating_add(estimated_gas.saturating_mul(self.settings.gas_limit_margin_pct) / 100);

		let nonce = client.pending_nonce(sender).await?;
		let raw_tx = self
			.sign_transaction(signer, nonce, gas_limit, &gas_fee, calldata)
			.await?;

		let balance_before = client.balance(sender).await.ok();

		let tx_hash = client
			.send_raw_transaction(raw_tx)
			.await
			.map_err(|e| ChainError::Broadcast(e.to_string()))?;
		let hash_str = format!("0x{}", hex::encode(tx_hash));
		tracing::debug!(
			tunnel_id = packet.tunnel_id,
			sequence = packet.sequence,
			tx_hash = %hash_str,
			"Broadcast transaction"
		);
		self.record(packet, &hash_str, TxStatus::Unmined, None, None).await;

		let outcome = self.wait_confirmation(tx_hash, &hash_str).await?;
		match outcome.status {
			TxStatus::Success => {
				let balance_after = client.balance(sender).await.ok();
				let delta = balance_delta(balance_before, balance_after);
				self.record(packet, &hash_str, TxStatus::Success, Some(&outcome), delta)
					.await;
				tracing::info!(
					tunnel_id = packet.tunnel_id,
					sequence = packet.sequence,
					tx_hash = %hash_str,
					block_number = outcome.block_number,
					"Packet relayed"
				);
				Ok(())
			}
			TxStatus::Failed => {
				self.record(packet, &hash_str, TxStatus::Failed, Some(&outcome), None)
					.await;
				// a revert may stem from transient underpricing; the loop
				// re-attempts with a freshly built transaction
				Err(ChainError::TransactionFailed(
					outcome
						.failure_reason
						.unwrap_or_else(|| "no failure reason".to_string()),
				))
			}
			TxStatus::Unmined => Err(ChainError::ConfirmationTimeout(
				hash_str,
				self.settings.waiting_confirmation_timeout,
			)),
		}
	}

	/// Polls the tracker until the transaction resolves or the budget lapses.
	///
	/// Returns an `Unmined` result when the waiting budget runs out; the
	/// caller treats that as a failed attempt and re-prices.
	async fn wait_confirmation(
		&self,
		tx_hash: B256,
		hash_str: &str,
	) -> Result<ConfirmTxResult, ChainError> {
		let started = tokio::time::Instant::now();
		loop {
			let result = self.confirmations.check_confirmed_tx(tx_hash).await?;
			if result.status.is_terminal() {
				return Ok(result);
			}
			if started.elapsed() >= self.settings.waiting_confirmation_timeout {
				return Ok(ConfirmTxResult::unmined(hash_str));
			}
			tokio::time::sleep(self.settings.check_confirmation_interval).await;
		}
	}

	/// Assembles, signs, and 2718-encodes the transaction for this bid.
	async fn sign_transaction(
		&self,
		signer: &dyn SignerInterface,
		nonce: u64,
		gas_limit: u64,
		gas_fee: &GasFee,
		calldata: Bytes,
	) -> Result<Vec<u8>, ChainError> {
		let to = TxKind::Call(self.settings.router_address);
		match *gas_fee {
			GasFee::Legacy { gas_price } => {
				let tx = TxLegacy {
					chain_id: Some(self.settings.chain_id),
					nonce,
					gas_price,
					gas_limit,
					to,
					value: U256::ZERO,
					input: calldata,
				};
				let signature = signer
					.sign_hash(&tx.signature_hash())
					.await
					.map_err(|e| ChainError::Signing(e.to_string()))?;
				let envelope: TxEnvelope = tx.into_signed(signature).into();
				Ok(envelope.encoded_2718())
			}
			GasFee::Eip1559 {
				priority_fee,
				fee_cap,
				..
			} => {
				let tx = TxEip1559 {
					chain_id: self.settings.chain_id,
					nonce,
					gas_limit,
					max_fee_per_gas: fee_cap,
					max_priority_fee_per_gas: priority_fee,
					to,
					value: U256::ZERO,
					access_list: AccessList::default(),
					input: calldata,
				};
				let signature = signer
					.sign_hash(&tx.signature_hash())
					.await
					.map_err(|e| ChainError::Signing(e.to_string()))?;
				let envelope: TxEnvelope = tx.into_signed(signature).into();
				Ok(envelope.encoded_2718())
			}
		}
	}

	/// Reports an outcome to the ledger; failures are logged, not fatal.
	async fn record(
		&self,
		packet: &Packet,
		tx_hash: &str,
		status: TxStatus,
		outcome: Option<&ConfirmTxResult>,
		balance_delta: Option<Decimal>,
	) {
		let row = LedgerTransaction {
			tx_hash: tx_hash.to_string(),
			tunnel_id: packet.tunnel_id,
			sequence: packet.sequence,
			chain_name: self.settings.chain_name.clone(),
			chain_type: ChainType::Evm,
			status,
			gas_used: outcome.and_then(|o| o.gas_used),
			effective_gas_price: outcome.and_then(|o| o.effective_gas_price),
			balance_delta,
			signal_prices: packet.signal_prices.clone(),
			timestamp: Utc::now(),
		};

		if let Err(e) = self.ledger.add_or_update_transaction(row).await {
			tracing::error!(tx_hash = %tx_hash, error = %e, "Ledger write failed");
		}
	}
}

/// Signed change in the sender's balance across a relay.
fn balance_delta(before: Option<U256>, after: Option<U256>) -> Option<Decimal> {
	let (before, after) = (before?, after?);
	if after >= before {
		decimal_from_u256(after - before)
	} else {
		decimal_from_u256(before - after).map(|d| -d)
	}
}

fn decimal_from_u256(value: U256) -> Option<Decimal> {
	u128::try_from(value).ok().and_then(Decimal::from_u128)
}
