//! Tunnel router ABI and calldata construction.
//!
//! The router is the destination contract packets are delivered to. Relay
//! calldata is derived deterministically from a packet's signature bundle;
//! tunnel state is read back through `tunnelInfo`.

use crate::ChainError;
use alloy_primitives::{Address, Bytes};
use alloy_sol_types::{sol, SolCall};
use relayer_types::{Packet, Tunnel};

sol! {
	/// Router contract verifying and dispatching price-feed packets.
	interface ITunnelRouter {
		/// Verifies the threshold signature over `message` and forwards the
		/// decoded prices to the tunnel's target contract.
		function relay(bytes calldata message, address rAddress, uint256 signature) external;

		/// Snapshot of one tunnel's delivery state.
		function tunnelInfo(uint64 tunnelId, address targetAddress)
			external
			view
			returns (bool isActive, uint64 latestSequence, uint256 balance);
	}
}

/// Builds the relay calldata for a packet.
pub fn relay_calldata(packet: &Packet) -> Bytes {
	let call = ITunnelRouter::relayCall {
		message: packet.signing_info.message.clone(),
		rAddress: packet.signing_info.r_address,
		signature: packet.signing_info.signature,
	};
	call.abi_encode().into()
}

/// Builds the calldata for a tunnel info query.
pub fn tunnel_info_calldata(tunnel_id: u64, target_address: Address) -> Bytes {
	let call = ITunnelRouter::tunnelInfoCall {
		tunnelId: tunnel_id,
		targetAddress: target_address,
	};
	call.abi_encode().into()
}

/// Decodes a `tunnelInfo` return into a tunnel snapshot.
pub fn decode_tunnel_info(
	tunnel_id: u64,
	target_address: Address,
	data: &[u8],
) -> Result<Tunnel, ChainError> {
	let info = ITunnelRouter::tunnelInfoCall::abi_decode_returns(data, true)
		.map_err(|e| ChainError::Network(format!("decode tunnelInfo return: {}", e)))?;

	Ok(Tunnel {
		id: tunnel_id,
		target_address: target_address.to_string(),
		is_active: info.isActive,
		latest_sequence: info.latestSequence,
		balance: info.balance,
	})
}
