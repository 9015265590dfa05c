//! Peer directory, relay and peer clients, and the chain-sync protocol.

pub mod client;
pub mod error;
pub mod peers;
pub mod relay;
pub mod sync;

pub use client::{HttpPeerClient, PeerClient};
pub use error::NetworkError;
pub use peers::PeerDirectory;
pub use relay::{HttpRelayClient, RelayClient};
pub use sync::ChainSync;
