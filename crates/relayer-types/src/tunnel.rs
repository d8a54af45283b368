//! Destination-side tunnel snapshot.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// Read-only view of a tunnel as recorded by the destination router contract.
///
/// Queried before relaying to check activity and sequencing; never mutated by
/// the relayer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tunnel {
	pub id: u64,
	/// Target contract the tunnel delivers prices to, 0x-prefixed.
	pub target_address: String,
	/// Whether the tunnel currently accepts packets.
	pub is_active: bool,
	/// Highest sequence number the router has accepted.
	pub latest_sequence: u64,
	/// Native-token balance funding this tunnel's deliveries, in wei.
	pub balance: U256,
}
