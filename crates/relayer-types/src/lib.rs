//! Common types for the tunnel relayer.
//!
//! This crate defines the data model shared across the relayer components:
//! price-feed packets, gas fee representations, transaction outcomes, ledger
//! records, and tunnel snapshots. Keeping them in one place ensures the
//! signer, chain, and ledger crates agree on the shapes they exchange.

/// Gas fee representations for legacy and EIP-1559 markets.
pub mod gas;
/// Price-feed packet types produced by the source chain.
pub mod packet;
/// Secure string type for private keys and other secrets.
pub mod secret_string;
/// Transaction outcome and ledger record types.
pub mod transaction;
/// Destination-side tunnel snapshot types.
pub mod tunnel;

pub use gas::{GasFee, GasType, UnsupportedGasType};
pub use packet::{Packet, SignalPrice, SigningInfo};
pub use secret_string::SecretString;
pub use transaction::{ChainType, ConfirmTxResult, LedgerTransaction, TxStatus};
pub use tunnel::Tunnel;
