//! Configuration for the tunnel relayer.
//!
//! This crate loads the relayer's TOML configuration and validates it before
//! any component starts. Validation is strict: an unknown gas market, an
//! unparseable router address, or an empty endpoint list is a fatal error at
//! startup, not something discovered mid-relay.

use alloy_primitives::Address;
use relayer_types::GasType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep the message, drop the input dump
		ConfigError::Parse(err.message().to_string())
	}
}

/// Top-level relayer configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Identity and labeling for this relayer instance.
	pub relayer: RelayerConfig,
	/// Destination chain connection and relay policy.
	pub target_chain: TargetChainConfig,
	/// Signer entries handed to the signer factories; each table must carry a
	/// `kind` key naming the implementation ("local", "remote").
	pub signers: Vec<toml::Value>,
	/// Transaction ledger backend selection.
	pub ledger: LedgerConfig,
}

/// Identity settings for the relayer instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelayerConfig {
	/// Destination chain name recorded on every ledger row.
	pub chain_name: String,
}

/// Destination chain connection settings and relay policy knobs.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TargetChainConfig {
	/// Candidate JSON-RPC endpoints; the freshest one is selected at connect.
	pub endpoints: Vec<String>,
	pub chain_id: u64,
	/// Address of the tunnel router contract packets are delivered to.
	pub router_address: String,
	/// Blocks required on top of inclusion before a transaction is final.
	pub block_confirmation: u64,
	/// Attempts per packet before giving up.
	#[serde(default = "default_max_retry")]
	pub max_retry: u64,
	#[serde(default = "default_query_timeout_secs")]
	pub query_timeout_secs: u64,
	#[serde(default = "default_execute_timeout_secs")]
	pub execute_timeout_secs: u64,
	/// Interval between liveliness re-connects.
	#[serde(default = "default_liveliness_interval_secs")]
	pub liveliness_interval_secs: u64,
	/// Interval between confirmation checks for a broadcast transaction.
	#[serde(default = "default_check_confirmation_interval_secs")]
	pub check_confirmation_interval_secs: u64,
	/// How long a broadcast may stay unmined before the attempt is abandoned.
	#[serde(default = "default_waiting_confirmation_timeout_secs")]
	pub waiting_confirmation_timeout_secs: u64,
	/// Percent padding added to simulated gas estimates.
	#[serde(default = "default_gas_limit_margin_pct")]
	pub gas_limit_margin_pct: u64,
	pub gas: GasConfig,
}

/// Gas market selection, escalation multiplier, and operator caps.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GasConfig {
	/// Fee market to price for: "legacy" or "eip1559".
	pub gas_type: String,
	/// Ratio applied to the previous bid on each retry; must be >= 1.0.
	#[serde(default = "default_gas_multiplier")]
	pub gas_multiplier: f64,
	/// Cap on the legacy gas price in wei; 0 disables the cap.
	#[serde(default)]
	pub max_gas_price: u128,
	/// Cap on the EIP-1559 priority fee in wei; 0 disables the cap.
	#[serde(default)]
	pub max_priority_fee: u128,
	/// Cap on the EIP-1559 base fee in wei; 0 disables the cap.
	#[serde(default)]
	pub max_base_fee: u128,
}

/// Transaction ledger backend selection.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LedgerConfig {
	/// Which implementation to use.
	pub primary: String,
	/// Map of ledger implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Returns the default number of relay attempts per packet.
fn default_max_retry() -> u64 {
	3
}

/// Returns the default deadline for read-only RPC calls, in seconds.
fn default_query_timeout_secs() -> u64 {
	5
}

/// Returns the default deadline for state-changing RPC calls, in seconds.
fn default_execute_timeout_secs() -> u64 {
	30
}

/// Returns the default liveliness re-connect interval, in seconds.
fn default_liveliness_interval_secs() -> u64 {
	15
}

/// Returns the default confirmation polling interval, in seconds.
fn default_check_confirmation_interval_secs() -> u64 {
	3
}

/// Returns the default budget for a broadcast to confirm, in seconds.
fn default_waiting_confirmation_timeout_secs() -> u64 {
	60
}

/// Returns the default gas limit padding percentage.
fn default_gas_limit_margin_pct() -> u64 {
	20
}

/// Returns the default retry gas escalation multiplier.
fn default_gas_multiplier() -> f64 {
	1.1
}

impl TargetChainConfig {
	pub fn query_timeout(&self) -> Duration {
		Duration::from_secs(self.query_timeout_secs)
	}

	pub fn execute_timeout(&self) -> Duration {
		Duration::from_secs(self.execute_timeout_secs)
	}

	pub fn liveliness_interval(&self) -> Duration {
		Duration::from_secs(self.liveliness_interval_secs)
	}

	pub fn check_confirmation_interval(&self) -> Duration {
		Duration::from_secs(self.check_confirmation_interval_secs)
	}

	pub fn waiting_confirmation_timeout(&self) -> Duration {
		Duration::from_secs(self.waiting_confirmation_timeout_secs)
	}
}

impl Config {
	/// Loads configuration from a TOML file and validates it.
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let content = std::fs::read_to_string(path)?;
		Self::from_toml(&content)
	}

	/// Parses configuration from a TOML string and validates it.
	pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
		let config: Config = toml::from_str(content)?;
		config.validate()?;
		Ok(config)
	}

	/// Checks cross-field rules that serde cannot express.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.target_chain.endpoints.is_empty() {
			return Err(ConfigError::Validation(
				"target_chain.endpoints must not be empty".to_string(),
			));
		}

		Address::from_str(&self.target_chain.router_address).map_err(|e| {
			ConfigError::Validation(format!(
				"invalid router address {}: {}",
				self.target_chain.router_address, e
			))
		})?;

		GasType::from_str(&self.target_chain.gas.gas_type)
			.map_err(|e| ConfigError::Validation(e.to_string()))?;

		if self.target_chain.gas.gas_multiplier < 1.0 {
			return Err(ConfigError::Validation(format!(
				"gas_multiplier must be >= 1.0, got {}",
				self.target_chain.gas.gas_multiplier
			)));
		}

		if self.signers.is_empty() {
			return Err(ConfigError::Validation(
				"at least one signer entry is required".to_string(),
			));
		}
		for (i, entry) in self.signers.iter().enumerate() {
			let kind = entry.get("kind").and_then(|v| v.as_str());
			if kind.is_none() {
				return Err(ConfigError::Validation(format!(
					"signer entry {} is missing a string `kind`",
					i
				)));
			}
		}

		if !self.ledger.implementations.contains_key(&self.ledger.primary) {
			return Err(ConfigError::Validation(format!(
				"ledger.primary `{}` has no matching implementation section",
				self.ledger.primary
			)));
		}

		Ok(())
	}
}
