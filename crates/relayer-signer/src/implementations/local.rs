//! Local signer backed by in-memory key material.

use crate::{SignerError, SignerInterface};
use alloy_primitives::{Address, PrimitiveSignature as Signature, B256};
use alloy_signer::Signer as _;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use relayer_types::SecretString;
use std::sync::Arc;

/// Signing identity holding its private key in process memory.
pub struct LocalSigner {
	name: String,
	private_key: SecretString,
	inner: PrivateKeySigner,
}

impl LocalSigner {
	/// Creates a local signer from a hex-encoded private key.
	pub fn new(name: String, private_key: SecretString) -> Result<Self, SignerError> {
		let inner: PrivateKeySigner = private_key
			.expose(|key| key.parse())
			.map_err(|_| SignerError::InvalidKey("invalid private key format".to_string()))?;
		Ok(Self {
			name,
			private_key,
			inner,
		})
	}
}

#[async_trait]
impl SignerInterface for LocalSigner {
	fn name(&self) -> &str {
		&self.name
	}

	fn address(&self) -> Address {
		self.inner.address()
	}

	async fn sign_hash(&self, digest: &B256) -> Result<Signature, SignerError> {
		self.inner
			.sign_hash(digest)
			.await
			.map_err(|e| SignerError::SigningFailed(e.to_string()))
	}

	fn export_private_key(&self) -> Result<SecretString, SignerError> {
		Ok(self.private_key.clone())
	}
}

/// Factory function to create a local signer from a configuration entry.
///
/// Configuration parameters:
/// - `name` (optional): label for the signer, defaults to "local"
/// - `private_key` (required): hex-encoded secp256k1 private key
pub fn create_signer(config: &toml::Value) -> Result<Arc<dyn SignerInterface>, SignerError> {
	let name = config
		.get("name")
		.and_then(|v| v.as_str())
		.unwrap_or("local")
		.to_string();
	let private_key = config
		.get("private_key")
		.and_then(|v| v.as_str())
		.ok_or_else(|| SignerError::Configuration("private_key is required".to_string()))?;

	let signer = LocalSigner::new(name, SecretString::from(private_key))?;
	Ok(Arc::new(signer))
}
