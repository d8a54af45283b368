//! Main entry point for the tunnel relayer service.
//!
//! This binary wires configuration, signers, the transaction ledger, and the
//! destination-chain provider together, and exposes the relay operations as
//! subcommands: deliver a packet, inspect a tunnel, export a signer key.

use alloy_primitives::Address;
use clap::{Parser, Subcommand};
use relayer_config::Config;
use relayer_evm::{AlloyConnector, EvmChainProvider};
use relayer_signer::{SignerFactory, SignerInterface};
use relayer_store::{LedgerFactory, LedgerService};
use relayer_types::Packet;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;

/// Command-line arguments for the relayer service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Deliver a packet document to the destination chain
	Relay {
		/// Path to a JSON packet file
		#[arg(short, long)]
		packet: PathBuf,
	},
	/// Print a tunnel's delivery state as JSON
	TunnelInfo {
		#[arg(long)]
		tunnel_id: u64,
		#[arg(long)]
		target_address: String,
	},
	/// Print a signer's exported private key
	ExportKey {
		/// Name of the configured signer
		#[arg(long)]
		signer: String,
	},
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(args.log_level.to_string()));
	fmt().with_env_filter(env_filter).with_target(true).init();

	let config = Config::from_file(&args.config)?;
	tracing::info!(chain_name = %config.relayer.chain_name, "Loaded configuration");

	match args.command {
		Command::Relay { packet } => relay(&config, &packet).await,
		Command::TunnelInfo {
			tunnel_id,
			target_address,
		} => tunnel_info(&config, tunnel_id, &target_address).await,
		Command::ExportKey { signer } => export_key(&config, &signer),
	}
}

/// Delivers one packet, keeping the endpoint fresh while it is in flight.
async fn relay(config: &Config, packet_path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
	let content = std::fs::read_to_string(packet_path)?;
	let packet: Packet = serde_json::from_str(&content)?;

	let provider = Arc::new(build_provider(config)?);
	provider.connect().await?;

	let (shutdown_tx, shutdown_rx) = watch::channel(false);
	let liveliness = {
		let provider = Arc::clone(&provider);
		tokio::spawn(async move { provider.run_liveliness_loop(shutdown_rx).await })
	};

	let outcome = tokio::select! {
		result = provider.relay_packet(&packet) => result,
		_ = tokio::signal::ctrl_c() => {
			tracing::info!("Interrupted, shutting down");
			shutdown_tx.send(true).ok();
			liveliness.await.ok();
			return Ok(());
		}
	};

	shutdown_tx.send(true).ok();
	liveliness.await.ok();

	outcome?;
	tracing::info!(
		tunnel_id = packet.tunnel_id,
		sequence = packet.sequence,
		"Packet delivered"
	);
	Ok(())
}

/// Prints one tunnel's snapshot from the router contract.
async fn tunnel_info(
	config: &Config,
	tunnel_id: u64,
	target_address: &str,
) -> Result<(), Box<dyn std::error::Error>> {
	let target: Address = target_address.parse()?;
	let provider = build_provider(config)?;
	provider.connect().await?;

	let tunnel = provider.query_tunnel_info(tunnel_id, target).await?;
	println!("{}", serde_json::to_string_pretty(&tunnel)?);
	Ok(())
}

/// Prints a configured signer's private key, where the variant allows it.
fn export_key(config: &Config, name: &str) -> Result<(), Box<dyn std::error::Error>> {
	let signers = build_signers(config)?;
	let signer = signers
		.iter()
		.find(|s| s.name() == name)
		.ok_or_else(|| format!("no signer named {}", name))?;

	let key = signer.export_private_key()?;
	println!("{}", key.expose(|k| k.to_string()));
	Ok(())
}

/// Builds the chain provider with its full component stack.
fn build_provider(config: &Config) -> Result<EvmChainProvider, Box<dyn std::error::Error>> {
	let signers = build_signers(config)?;
	let ledger = build_ledger(config)?;
	let connector = Arc::new(AlloyConnector::new(
		config.target_chain.query_timeout(),
		config.target_chain.execute_timeout(),
	));

	Ok(EvmChainProvider::new(
		&config.target_chain,
		&config.relayer.chain_name,
		connector,
		signers,
		ledger,
	)?)
}

/// Builds every configured signer through the factory registry.
fn build_signers(
	config: &Config,
) -> Result<Vec<Arc<dyn SignerInterface>>, Box<dyn std::error::Error>> {
	let factories: HashMap<&str, SignerFactory> =
		relayer_signer::get_all_implementations().into_iter().collect();

	let mut signers = Vec::with_capacity(config.signers.len());
	for entry in &config.signers {
		let kind = entry
			.get("kind")
			.and_then(|v| v.as_str())
			.ok_or("signer entry is missing a string `kind`")?;
		let factory = factories
			.get(kind)
			.ok_or_else(|| format!("unknown signer kind `{}`", kind))?;
		signers.push(factory(entry)?);
	}
	Ok(signers)
}

/// Builds the configured ledger backend through the factory registry.
fn build_ledger(config: &Config) -> Result<LedgerService, Box<dyn std::error::Error>> {
	let factories: HashMap<&str, LedgerFactory> =
		relayer_store::get_all_implementations().into_iter().collect();

	let factory = factories
		.get(config.ledger.primary.as_str())
		.ok_or_else(|| format!("unknown ledger implementation `{}`", config.ledger.primary))?;
	let section = config
		.ledger
		.implementations
		.get(&config.ledger.primary)
		.cloned()
		.unwrap_or(toml::Value::Table(toml::map::Map::new()));

	Ok(LedgerService::new(factory(&section)?))
}

#[cfg(test)]
mod tests {
	use super::*;

	const SAMPLE_CONFIG: &str = r#"
[relayer]
chain_name = "testnet-evm"

[target_chain]
endpoints = ["http://localhost:8545"]
chain_id = 31337
router_address = "0x9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0"
block_confirmation = 5

[target_chain.gas]
gas_type = "legacy"
max_gas_price = 15000000000

[[signers]]
kind = "local"
name = "relayer-0"
private_key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"

[ledger]
primary = "memory"
[ledger.implementations.memory]
"#;

	const SAMPLE_PACKET: &str = r#"{
		"tunnel_id": 1,
		"sequence": 42,
		"signal_prices": [
			{"signal_id": "CS:BTC-USD", "price": 100},
			{"signal_id": "CS:ETH-USD", "price": 200}
		],
		"signing_info": {
			"message": "0xdeadbeef",
			"r_address": "0x2222222222222222222222222222222222222222",
			"signature": "0x7"
		}
	}"#;

	#[test]
	fn test_packet_document_parses() {
		let packet: Packet = serde_json::from_str(SAMPLE_PACKET).unwrap();
		assert_eq!(packet.tunnel_id, 1);
		assert_eq!(packet.sequence, 42);
		assert_eq!(packet.signal_prices.len(), 2);
	}

	#[test]
	fn test_build_signers_from_config() {
		let config = Config::from_toml(SAMPLE_CONFIG).unwrap();
		let signers = build_signers(&config).unwrap();
		assert_eq!(signers.len(), 1);
		assert_eq!(signers[0].name(), "relayer-0");
	}

	#[test]
	fn test_build_ledger_from_config() {
		let config = Config::from_toml(SAMPLE_CONFIG).unwrap();
		assert!(build_ledger(&config).is_ok());
	}

	#[test]
	fn test_build_provider_from_config() {
		let config = Config::from_toml(SAMPLE_CONFIG).unwrap();
		assert!(build_provider(&config).is_ok());
	}

	#[test]
	fn test_export_key_prints_local_key() {
		let config = Config::from_toml(SAMPLE_CONFIG).unwrap();
		assert!(export_key(&config, "relayer-0").is_ok());
		assert!(export_key(&config, "missing").is_err());
	}

	#[test]
	fn test_unknown_signer_kind_rejected() {
		let bad = SAMPLE_CONFIG.replace("kind = \"local\"", "kind = \"hsm\"");
		let config = Config::from_toml(&bad).unwrap();
		let err = build_signers(&config).err().unwrap();
		assert!(err.to_string().contains("hsm"));
	}
}
