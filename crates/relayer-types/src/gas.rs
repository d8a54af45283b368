//! Gas fee representations.
//!
//! `GasFee` is the tagged union the pricing engine produces and the relayer
//! feeds into transaction assembly. All amounts are in wei.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error raised for a gas market name outside the supported table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported gas type: {0}")]
pub struct UnsupportedGasType(pub String);

/// The fee markets the relayer knows how to price.
///
/// This enum is the one lookup table for gas market names; configuration
/// strings are converted exactly once at startup and anything unrecognized is
/// a fatal error, never a silent default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GasType {
	Legacy,
	Eip1559,
}

impl FromStr for GasType {
	type Err = UnsupportedGasType;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"legacy" => Ok(GasType::Legacy),
			"eip1559" => Ok(GasType::Eip1559),
			other => Err(UnsupportedGasType(other.to_string())),
		}
	}
}

impl fmt::Display for GasType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			GasType::Legacy => f.write_str("legacy"),
			GasType::Eip1559 => f.write_str("eip1559"),
		}
	}
}

/// A gas bid for one of the two EVM fee markets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GasFee {
	/// Pre-EIP-1559 single-price market.
	Legacy {
		/// Gas price in wei.
		gas_price: u128,
	},
	/// EIP-1559 market with a network-set base fee and a bidder-set tip.
	Eip1559 {
		/// Priority fee (tip) per gas in wei.
		priority_fee: u128,
		/// Base fee per gas in wei, dictated by the network.
		base_fee: u128,
		/// Maximum total fee per gas; always `base_fee + priority_fee`.
		fee_cap: u128,
	},
}

impl GasFee {
	/// Creates a legacy-market fee.
	pub fn legacy(gas_price: u128) -> Self {
		GasFee::Legacy { gas_price }
	}

	/// Creates an EIP-1559 fee with the cap derived from its parts.
	pub fn eip1559(priority_fee: u128, base_fee: u128) -> Self {
		GasFee::Eip1559 {
			priority_fee,
			base_fee,
			fee_cap: base_fee.saturating_add(priority_fee),
		}
	}

	/// The effective per-gas price this bid is willing to pay.
	pub fn price_per_gas(&self) -> u128 {
		match self {
			GasFee::Legacy { gas_price } => *gas_price,
			GasFee::Eip1559 { fee_cap, .. } => *fee_cap,
		}
	}
}
