//! Signing identities for the tunnel relayer.
//!
//! This crate defines the capability every signing identity must satisfy,
//! two conforming implementations (local key material and a remote signing
//! service), and the `SignerPool` that hands out exclusive use of one signer
//! per in-flight relay. Callers depend only on the capability set and never
//! branch on which variant they were given.

use alloy_primitives::{Address, PrimitiveSignature as Signature, B256};
use async_trait::async_trait;
use relayer_types::SecretString;
use std::ops::Deref;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};

/// Re-export implementations
pub mod implementations {
	pub mod local;
	pub mod remote;
}

/// Errors that can occur during signing operations.
#[derive(Debug, Error)]
pub enum SignerError {
	/// Error that occurs when a private key is invalid or malformed.
	#[error("Invalid key: {0}")]
	InvalidKey(String),
	/// Error that occurs when producing a signature fails.
	#[error("Signing failed: {0}")]
	SigningFailed(String),
	/// Error that occurs when a signer cannot reveal its key material.
	#[error("Signer {0} does not support key export")]
	NotExportable(String),
	/// Error that occurs when a signer configuration entry is unusable.
	#[error("Configuration error: {0}")]
	Configuration(String),
	/// Error that occurs when the signer pool has shut down.
	#[error("Signer pool closed")]
	PoolClosed,
}

/// Capability set every signing identity must provide.
///
/// Both the local and the remote variant satisfy this trait; the relayer and
/// the pool depend only on it.
#[async_trait]
pub trait SignerInterface: Send + Sync {
	/// Operator-facing name of this signer.
	fn name(&self) -> &str;

	/// The account address transactions are sent from.
	fn address(&self) -> Address;

	/// Signs a 32-byte transaction signature hash.
	async fn sign_hash(&self, digest: &B256) -> Result<Signature, SignerError>;

	/// Reveals the private key, where the variant supports it.
	fn export_private_key(&self) -> Result<SecretString, SignerError>;
}

/// Type alias for signer factory functions.
///
/// Each implementation provides one of these so the service binary can build
/// signers from configuration entries by kind.
pub type SignerFactory = fn(&toml::Value) -> Result<Arc<dyn SignerInterface>, SignerError>;

/// Get all registered signer implementations.
pub fn get_all_implementations() -> Vec<(&'static str, SignerFactory)> {
	use implementations::{local, remote};

	vec![
		("local", local::create_signer as SignerFactory),
		("remote", remote::create_signer as SignerFactory),
	]
}

/// Pool handing out exclusive use of one signer per in-flight relay.
///
/// Backed by a bounded queue sized to the signer count. `acquire` suspends
/// the calling task until a signer is free, which gives natural backpressure
/// when concurrent relays outnumber signers. Exactly one holder may use a
/// given signer at a time; this is what keeps two broadcasts from racing on
/// the same account's nonce.
pub struct SignerPool {
	slots: mpsc::Sender<Arc<dyn SignerInterface>>,
	available: Mutex<mpsc::Receiver<Arc<dyn SignerInterface>>>,
}

impl SignerPool {
	/// Loads the pool with the given signers.
	pub fn load(signers: Vec<Arc<dyn SignerInterface>>) -> Self {
		let (slots, available) = mpsc::channel(signers.len().max(1));
		for signer in signers {
			// capacity equals the signer count, this cannot fail
			let _ = slots.try_send(signer);
		}
		Self {
			slots,
			available: Mutex::new(available),
		}
	}

	/// Checks out a signer, waiting until one is available.
	///
	/// The returned guard re-queues the signer when dropped, so release
	/// happens on every exit path of the holder, panics included.
	pub async fn acquire(&self) -> Result<PooledSigner, SignerError> {
		let mut available = self.available.lock().await;
		let signer = available.recv().await.ok_or(SignerError::PoolClosed)?;
		Ok(PooledSigner {
			signer,
			slots: self.slots.clone(),
		})
	}
}

/// A signer checked out of the pool.
///
/// Dereferences to the signer capability; returning it to the pool is the
/// guard's Drop.
pub struct PooledSigner {
	signer: Arc<dyn SignerInterface>,
	slots: mpsc::Sender<Arc<dyn SignerInterface>>,
}

impl Deref for PooledSigner {
	type Target = dyn SignerInterface;

	fn deref(&self) -> &Self::Target {
		&*self.signer
	}
}

impl Drop for PooledSigner {
	fn drop(&mut self) {
		// the slot we vacated is the only free capacity, so this cannot fail
		let _ = self.slots.try_send(self.signer.clone());
	}
}
