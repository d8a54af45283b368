//! Price-feed packet types.
//!
//! A packet is the unit of delivery: a batch of signal prices for one tunnel,
//! stamped with a sequence number and the threshold signature produced by the
//! source chain. Packets are immutable once received; the relayer only reads
//! them.

use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

/// A single price observation for a named signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalPrice {
	/// Identifier of the signal, e.g. "CS:BTC-USD".
	pub signal_id: String,
	/// Price in the source chain's integer unit.
	pub price: u64,
}

/// Signature bundle attached to a packet by the source chain's
/// threshold-signature module.
///
/// The destination router verifies `signature` over `message`; the relayer
/// treats the bundle as opaque apart from ABI-encoding it into calldata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningInfo {
	/// The signed message bytes as produced upstream.
	pub message: Bytes,
	/// Address form of the group nonce commitment.
	pub r_address: Address,
	/// The s component of the group signature.
	pub signature: U256,
}

/// A signed price-feed packet to be relayed to the destination chain.
///
/// Uniquely identified by `(tunnel_id, sequence)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet {
	/// Tunnel this packet belongs to.
	pub tunnel_id: u64,
	/// Per-tunnel monotonically increasing sequence number.
	pub sequence: u64,
	/// Ordered signal prices carried by this packet.
	pub signal_prices: Vec<SignalPrice>,
	/// Threshold signature over the packet payload.
	pub signing_info: SigningInfo,
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample_packet() -> Packet {
		Packet {
			tunnel_id: 1,
			sequence: 42,
			signal_prices: vec![
				SignalPrice {
					signal_id: "CS:BTC-USD".to_string(),
					price: 100,
				},
				SignalPrice {
					signal_id: "CS:ETH-USD".to_string(),
					price: 200,
				},
			],
			signing_info: SigningInfo {
				message: Bytes::from(vec![0xde, 0xad, 0xbe, 0xef]),
				r_address: Address::ZERO,
				signature: U256::from(7u64),
			},
		}
	}

	#[test]
	fn test_packet_json_round_trip() {
		let packet = sample_packet();
		let json = serde_json::to_string(&packet).unwrap();
		let decoded: Packet = serde_json::from_str(&json).unwrap();
		assert_eq!(decoded, packet);
	}

	#[test]
	fn test_signal_prices_keep_order() {
		let packet = sample_packet();
		assert_eq!(packet.signal_prices[0].signal_id, "CS:BTC-USD");
		assert_eq!(packet.signal_prices[1].signal_id, "CS:ETH-USD");
	}
}
