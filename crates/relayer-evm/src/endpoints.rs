//! Endpoint racing, selection, and the liveliness loop.
//!
//! Every configured endpoint is tried concurrently; the one reporting the
//! greatest block height wins and the rest are closed. Block height doubles
//! as a freshness proxy, so a reachable node stuck at an old height loses to
//! a current one.

use crate::client::{Connector, EvmClient};
use crate::ChainError;
use arc_swap::ArcSwapOption;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// Result of probing one endpoint during selection.
///
/// Discarded once a winner is chosen; dropping the held client closes it.
struct ConnectionCandidate {
	endpoint: String,
	client: Option<Arc<dyn EvmClient>>,
	block_height: u64,
}

/// Holder for the selected client, swapped atomically as one unit.
struct Selected {
	client: Arc<dyn EvmClient>,
}

/// Maintains the single live connection to the destination chain.
///
/// The selected client handle is replaced wholesale on every reconnect, so
/// readers always observe a consistent handle, never a partially updated one.
pub struct EndpointManager {
	endpoints: Vec<String>,
	connector: Arc<dyn Connector>,
	liveliness_interval: Duration,
	selected: ArcSwapOption<Selected>,
}

impl EndpointManager {
	pub fn new(
		endpoints: Vec<String>,
		liveliness_interval: Duration,
		connector: Arc<dyn Connector>,
	) -> Self {
		Self {
			endpoints,
			connector,
			liveliness_interval,
			selected: ArcSwapOption::empty(),
		}
	}

	/// The currently selected client.
	pub fn client(&self) -> Result<Arc<dyn EvmClient>, ChainError> {
		self.selected
			.load_full()
			.map(|selected| selected.client.clone())
			.ok_or(ChainError::NoLiveEndpoint)
	}

	/// Connects if no client is currently selected.
	pub async fn ensure_connected(&self) -> Result<(), ChainError> {
		if self.selected.load().is_some() {
			return Ok(());
		}
		self.connect().await
	}

	/// Races every configured endpoint and keeps the freshest survivor.
	///
	/// Each attempt runs as its own task reporting into a shared queue, so a
	/// dead endpoint cannot stall the others. Selection is strictly-greater
	/// on block height with first-seen winning ties; every losing connection
	/// is dropped to avoid leaking sockets.
	pub async fn connect(&self) -> Result<(), ChainError> {
		let (results_tx, mut results_rx) = mpsc::channel(self.endpoints.len().max(1));

		for endpoint in &self.endpoints {
			let connector = self.connector.clone();
			let endpoint = endpoint.clone();
			let results_tx = results_tx.clone();
			tokio::spawn(async move {
				let candidate = probe_endpoint(connector, endpoint).await;
				let _ = results_tx.send(candidate).await;
			});
		}
		// receiving ends once every probe task has reported
		drop(results_tx);

		let mut best: Option<ConnectionCandidate> = None;
		while let Some(candidate) = results_rx.recv().await {
			if candidate.client.is_none() {
				continue;
			}
			match &best {
				Some(current) if candidate.block_height <= current.block_height => {
					// loser; dropping the candidate closes its connection
				}
				_ => best = Some(candidate),
			}
		}

		match best {
			Some(winner) => {
				tracing::info!(
					endpoint = %winner.endpoint,
					block_height = winner.block_height,
					"Selected endpoint"
				);
				self.selected
					.store(winner.client.map(|client| Arc::new(Selected { client })));
				Ok(())
			}
			None => Err(ChainError::NoLiveEndpoint),
		}
	}

	/// Re-runs `connect` on a fixed interval until shutdown is signalled.
	///
	/// A failed reconnect is logged and retried on the next tick; it never
	/// terminates the loop.
	pub async fn run_liveliness_loop(&self, mut shutdown: watch::Receiver<bool>) {
		let mut ticker = tokio::time::interval(self.liveliness_interval);
		loop {
			tokio::select! {
				_ = ticker.tick() => {
					if let Err(e) = self.connect().await {
						tracing::warn!(error = %e, "Liveliness reconnect failed, retrying next tick");
					}
				}
				changed = shutdown.changed() => {
					if changed.is_err() || *shutdown.borrow() {
						tracing::debug!("Liveliness loop stopped");
						return;
					}
				}
			}
		}
	}
}

/// Probes one endpoint: open a connection, then query its height.
async fn probe_endpoint(connector: Arc<dyn Connector>, endpoint: String) -> ConnectionCandidate {
	let client = match connector.connect(&endpoint).await {
		Ok(client) => client,
		Err(e) => {
			tracing::warn!(endpoint = %endpoint, error = %e, "Endpoint connection failed");
			return ConnectionCandidate {
				endpoint,
				client: None,
				block_height: 0,
			};
		}
	};

	match client.block_number().await {
		Ok(block_height) => ConnectionCandidate {
			endpoint,
			client: Some(client),
			block_height,
		},
		Err(e) => {
			tracing::warn!(endpoint = %endpoint, error = %e, "Endpoint height query failed");
			ConnectionCandidate {
				endpoint,
				client: None,
				block_height: 0,
			}
		}
	}
}
