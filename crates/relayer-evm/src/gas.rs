//! Gas fee estimation and the bump-and-bound policy.
//!
//! `estimate_gas_fee` produces a fresh bid for the configured market;
//! `bump_and_bound` escalates a previous bid by a multiplier and clamps every
//! price-like field to its operator cap. Together they let the relayer bid
//! higher on each retry while keeping worst-case cost bounded: a stuck
//! transaction can never push the bid past the configured ceilings.

use crate::endpoints::EndpointManager;
use crate::ChainError;
use relayer_config::GasConfig;
use relayer_types::{GasFee, GasType};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Operator-configured ceilings per price-like field, in wei.
///
/// A zero cap disables bounding for that field. Built once at startup and
/// never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasCaps {
	pub max_gas_price: u128,
	pub max_priority_fee: u128,
	pub max_base_fee: u128,
}

impl From<&GasConfig> for GasCaps {
	fn from(config: &GasConfig) -> Self {
		Self {
			max_gas_price: config.max_gas_price,
			max_priority_fee: config.max_priority_fee,
			max_base_fee: config.max_base_fee,
		}
	}
}

/// Prices gas bids for the configured fee market.
pub struct GasFeeService {
	gas_type: GasType,
	caps: GasCaps,
	endpoints: Arc<EndpointManager>,
}

impl GasFeeService {
	/// Builds the service, resolving the market name exactly once.
	///
	/// An unrecognized name is a fatal configuration error, never defaulted.
	pub fn new(
		gas_type: &str,
		caps: GasCaps,
		endpoints: Arc<EndpointManager>,
	) -> Result<Self, ChainError> {
		let gas_type = gas_type
			.parse::<GasType>()
			.map_err(|e| ChainError::UnsupportedGasType(e.0))?;
		Ok(Self {
			gas_type,
			caps,
			endpoints,
		})
	}

	/// Queries the chain for a fresh bid in the configured market.
	pub async fn estimate_gas_fee(&self) -> Result<GasFee, ChainError> {
		let client = self.endpoints.client()?;
		match self.gas_type {
			GasType::Legacy => {
				let gas_price = client.gas_price().await?;
				Ok(GasFee::legacy(gas_price))
			}
			GasType::Eip1559 => {
				let priority_fee = client.max_priority_fee_per_gas().await?;
				let base_fee = client.latest_base_fee().await?;
				Ok(GasFee::eip1559(priority_fee, base_fee))
			}
		}
	}

	/// Escalates a bid by `multiplier` and clamps it to the configured caps.
	///
	/// Bidder-set fields (legacy price, priority fee) are multiplied then
	/// clamped. The base fee is network-dictated and is only clamped, never
	/// multiplied; the fee cap is recomputed as the sum of the bounded parts.
	pub fn bump_and_bound(&self, current: &GasFee, multiplier: Decimal) -> GasFee {
		match *current {
			GasFee::Legacy { gas_price } => {
				GasFee::legacy(clamp(bump(gas_price, multiplier), self.caps.max_gas_price))
			}
			GasFee::Eip1559 {
				priority_fee,
				base_fee,
				..
			} => {
				let priority = clamp(bump(priority_fee, multiplier), self.caps.max_priority_fee);
				let base = clamp(base_fee, self.caps.max_base_fee);
				GasFee::eip1559(priority, base)
			}
		}
	}
}

/// Multiplies a wei amount by a decimal ratio, truncating back to wei.
fn bump(value: u128, multiplier: Decimal) -> u128 {
	let scaled = Decimal::from_u128(value).and_then(|v| v.checked_mul(multiplier));
	match scaled {
		Some(scaled) => scaled.trunc().to_u128().unwrap_or(u128::MAX),
		// out of decimal range; the caps are the only bound left
		None => u128::MAX,
	}
}

/// Clamps a value to a cap, where zero means uncapped.
fn clamp(value: u128, cap: u128) -> u128 {
	if cap == 0 {
		value
	} else {
		value.min(cap)
	}
}
