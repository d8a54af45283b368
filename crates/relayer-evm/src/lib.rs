//! Destination-chain relay engine for the tunnel relayer.
//!
//! This crate owns everything that talks to the destination EVM chain: the
//! multi-endpoint connection manager, the gas pricing engine, the packet
//! relay state machine, and the confirmation tracker. The surface consumed
//! by upstream orchestration is `EvmChainProvider`.

use std::time::Duration;
use thiserror::Error;

/// RPC client abstraction and the alloy-backed implementation.
pub mod client;
/// Confirmation depth resolution for broadcast transactions.
pub mod confirm;
/// Endpoint racing, selection, and the liveliness loop.
pub mod endpoints;
/// Gas fee estimation and the bump-and-bound policy.
pub mod gas;
/// Chain provider facade tying the components together.
pub mod provider;
/// The packet relay state machine.
pub mod relayer;
/// Tunnel router ABI and calldata construction.
pub mod router;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{AlloyConnector, Connector, EvmClient, ReceiptInfo};
pub use confirm::ConfirmationTracker;
pub use endpoints::EndpointManager;
pub use gas::{GasCaps, GasFeeService};
pub use provider::EvmChainProvider;
pub use relayer::{PacketRelayer, RelayerSettings};

/// Errors produced by the destination-chain components.
///
/// Configuration-class variants (`UnsupportedGasType`, `InvalidAddress`,
/// `Configuration`) are fatal and never retried. Everything else is fair game
/// for the relayer's bounded retry loop, which is the only retry counter in
/// the crate; lower layers fail fast.
#[derive(Debug, Error)]
pub enum ChainError {
	/// No configured endpoint produced a usable connection.
	#[error("No endpoint produced a usable connection")]
	NoLiveEndpoint,
	/// The configured gas market is not in the supported table.
	#[error("Unsupported gas type: {0}")]
	UnsupportedGasType(String),
	/// An address string failed to parse.
	#[error("Invalid address: {0}")]
	InvalidAddress(String),
	/// A non-address configuration value was unusable.
	#[error("Configuration error: {0}")]
	Configuration(String),
	/// Error that occurs during network communication.
	#[error("RPC error: {0}")]
	Network(String),
	/// The simulated call used to size the gas limit failed.
	#[error("Gas estimation failed: {0}")]
	GasEstimation(String),
	/// Producing a transaction signature failed.
	#[error("Signing failed: {0}")]
	Signing(String),
	/// The node refused the signed transaction.
	#[error("Broadcast rejected: {0}")]
	Broadcast(String),
	/// The transaction was included but reverted.
	#[error("Transaction failed on-chain: {0}")]
	TransactionFailed(String),
	/// The transaction stayed unmined past the waiting budget.
	#[error("Transaction {0} not confirmed within {1:?}")]
	ConfirmationTimeout(String, Duration),
	/// Every relay attempt failed.
	#[error("Relaying packet failed after {0} attempts")]
	RelayPacketRetries(u64),
}
