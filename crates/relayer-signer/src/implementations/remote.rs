//! Remote signer delegating to a signing service over HTTP.
//!
//! The service holds the key; this variant only ships digests to it and
//! parses signatures out of the response. Key export is refused.

use crate::{SignerError, SignerInterface};
use alloy_primitives::{Address, PrimitiveSignature as Signature, B256};
use async_trait::async_trait;
use relayer_types::SecretString;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Default deadline for one signing round-trip.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Request body sent to the signing service.
#[derive(Debug, Serialize)]
struct SignRequest<'a> {
	address: Address,
	/// 0x-prefixed hex of the 32-byte digest to sign.
	digest: &'a str,
}

/// Response body returned by the signing service.
#[derive(Debug, Deserialize)]
struct SignResponse {
	/// 0x-prefixed hex of the 65-byte r || s || v signature.
	signature: String,
}

/// Signing identity whose key lives in an external service.
pub struct RemoteSigner {
	name: String,
	address: Address,
	url: String,
	http: reqwest::Client,
}

impl RemoteSigner {
	/// Creates a remote signer targeting the given service URL.
	pub fn new(
		name: String,
		address: Address,
		url: String,
		request_timeout: Duration,
	) -> Result<Self, SignerError> {
		let http = reqwest::Client::builder()
			.timeout(request_timeout)
			.build()
			.map_err(|e| SignerError::Configuration(e.to_string()))?;
		Ok(Self {
			name,
			address,
			url,
			http,
		})
	}
}

#[async_trait]
impl SignerInterface for RemoteSigner {
	fn name(&self) -> &str {
		&self.name
	}

	fn address(&self) -> Address {
		self.address
	}

	async fn sign_hash(&self, digest: &B256) -> Result<Signature, SignerError> {
		let digest_hex = format!("0x{}", hex::encode(digest));
		let request = SignRequest {
			address: self.address,
			digest: &digest_hex,
		};

		let response = self
			.http
			.post(format!("{}/sign", self.url.trim_end_matches('/')))
			.json(&request)
			.send()
			.await
			.map_err(|e| SignerError::SigningFailed(format!("signing service: {}", e)))?;

		if !response.status().is_success() {
			return Err(SignerError::SigningFailed(format!(
				"signing service returned {}",
				response.status()
			)));
		}

		let body: SignResponse = response
			.json()
			.await
			.map_err(|e| SignerError::SigningFailed(format!("invalid response: {}", e)))?;

		let raw = hex::decode(body.signature.trim_start_matches("0x"))
			.map_err(|e| SignerError::SigningFailed(format!("invalid signature hex: {}", e)))?;
		Signature::try_from(raw.as_slice())
			.map_err(|e| SignerError::SigningFailed(format!("invalid signature: {}", e)))
	}

	fn export_private_key(&self) -> Result<SecretString, SignerError> {
		Err(SignerError::NotExportable(self.name.clone()))
	}
}

/// Factory function to create a remote signer from a configuration entry.
///
/// Configuration parameters:
/// - `name` (optional): label for the signer, defaults to "remote"
/// - `address` (required): account address the service signs for
/// - `url` (required): base URL of the signing service
/// - `request_timeout_secs` (optional): per-request deadline, defaults to 10
pub fn create_signer(config: &toml::Value) -> Result<Arc<dyn SignerInterface>, SignerError> {
	let name = config
		.get("name")
		.and_then(|v| v.as_str())
		.unwrap_or("remote")
		.to_string();
	let address = config
		.get("address")
		.and_then(|v| v.as_str())
		.ok_or_else(|| SignerError::Configuration("address is required".to_string()))?
		.parse::<Address>()
		.map_err(|e| SignerError::Configuration(format!("invalid address: {}", e)))?;
	let url = config
		.get("url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| SignerError::Configuration("url is required".to_string()))?
		.to_string();
	let request_timeout = config
		.get("request_timeout_secs")
		.and_then(|v| v.as_integer())
		.map(|secs| Duration::from_secs(secs as u64))
		.unwrap_or(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS));

	let signer = RemoteSigner::new(name, address, url, request_timeout)?;
	Ok(Arc::new(signer))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn remote_config(extra: &str) -> toml::Value {
		toml::from_str(&format!(
			"address = \"0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266\"\nurl = \"http://localhost:9000\"\n{}",
			extra
		))
		.unwrap()
	}

	#[test]
	fn test_factory_builds_signer() {
		let signer = create_signer(&remote_config("name = \"tss\"")).unwrap();
		assert_eq!(signer.name(), "tss");
		assert_eq!(
			signer.address().to_string(),
			"0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
		);
	}

	#[test]
	fn test_factory_requires_url() {
		let config: toml::Value =
			toml::from_str("address = \"0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266\"").unwrap();
		let err = create_signer(&config).err().unwrap();
		assert!(matches!(err, SignerError::Configuration(_)));
	}

	#[test]
	fn test_export_is_refused() {
		let signer = create_signer(&remote_config("")).unwrap();
		let err = signer.export_private_key().unwrap_err();
		assert!(matches!(err, SignerError::NotExportable(_)));
	}
}
