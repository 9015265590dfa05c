//! Peer discovery and chain synchronisation.
//!
//! [`ChainSync`] drives the protocol side of the node:
//!
//! 1. **bootstrap**: learn the node's public address, register it with the
//!    relay, then ask the relay for random nodes until enough peers are
//!    known or the attempt budget runs out;
//! 2. **adoption**: fetch every peer's snapshot and fold them through the
//!    longest-valid-chain selector;
//! 3. **propagation**: push local changes to every known peer,
//!    at most once and without retries.
//!
//! Failures talking to a peer are logged and that peer is skipped.

use std::sync::Arc;

use crate::config::NetworkConfig;
use crate::consensus::LongestChainSelector;
use crate::ledger::{ChainSnapshot, TransactionRequest};
use crate::types::UserData;

use super::client::PeerClient;
use super::peers::PeerDirectory;
use super::relay::RelayClient;

pub struct ChainSync {
    config: NetworkConfig,
    peers: Arc<PeerDirectory>,
    relay: Arc<dyn RelayClient>,
    client: Arc<dyn PeerClient>,
}

impl ChainSync {
    pub fn new(
        config: NetworkConfig,
        peers: Arc<PeerDirectory>,
        relay: Arc<dyn RelayClient>,
        client: Arc<dyn PeerClient>,
    ) -> Self {
        Self {
            config,
            peers,
            relay,
            client,
        }
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn peers(&self) -> &Arc<PeerDirectory> {
        &self.peers
    }

    /// Joins the network and returns the best peer chain, if any.
    pub async fn bootstrap(&self) -> Option<ChainSnapshot> {
        self.announce().await;
        let added = self.discover_peers().await;
        tracing::info!(added, peers = self.peers.len(), "peer discovery finished");
        self.find_longest_chain().await
    }

    /// Resolves the node's public address and registers it with the relay.
    pub async fn announce(&self) {
        let ip = match &self.config.advertise_ip {
            Some(ip) => Some(ip.clone()),
            None => match self.relay.public_ip().await {
                Ok(ip) => Some(ip),
                Err(e) => {
                    tracing::warn!(error = %e, "failed to resolve public IP");
                    None
                }
            },
        };
        let Some(ip) = ip else {
            return;
        };

        self.peers.set_self_ip(ip.clone());
        match self.relay.register(&ip).await {
            Ok(()) => tracing::info!(%ip, "registered with relay"),
            Err(e) => tracing::warn!(%ip, error = %e, "relay registration failed"),
        }
    }

    /// Queries the relay until the peer target is met or the attempt
    /// budget is spent. Returns the number of peers added.
    ///
    /// Every newly added peer gets a liveness check; one that is not alive is dropped
    /// again straight away.
    pub async fn discover_peers(&self) -> usize {
        let target = self.config.effective_target_peers();
        let mut added = 0;
        let mut attempts = 0;

        while self.peers.len() < target && attempts < self.config.discovery_attempts {
            attempts += 1;

            let candidate = match self.relay.random_peer().await {
                Ok(ip) => ip,
                Err(e) => {
                    tracing::debug!(attempt = attempts, error = %e, "relay query failed");
                    continue;
                }
            };

            match self.peers.insert(&candidate) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    tracing::debug!(error = %e, "relay returned an unusable address");
                    continue;
                }
            }

            if self.client.is_alive(&candidate).await {
                tracing::debug!(peer = %candidate, "peer added");
                added += 1;
            } else {
                let dropped = self.peers.drop_last();
                tracing::debug!(peer = ?dropped, "peer failed liveness check");
            }
        }
        added
    }

    /// Fetches every known peer's snapshot and returns the longest valid
    /// one.
    pub async fn find_longest_chain(&self) -> Option<ChainSnapshot> {
        let mut selector: LongestChainSelector = LongestChainSelector::default();
        for peer in self.peers.peers() {
            match self.client.fetch_chain(&peer).await {
                Ok(snapshot) => {
                    let len = snapshot.chain_len();
                    if selector.offer(snapshot) {
                        tracing::debug!(%peer, len, "peer chain is the current best");
                    }
                }
                Err(e) => tracing::warn!(%peer, error = %e, "failed to fetch peer chain"),
            }
        }
        selector.into_winner()
    }

    /// Pushes the full snapshot to every peer. Returns the number of peers
    /// that accepted the push.
    pub async fn propagate_chain(&self, snapshot: &ChainSnapshot) -> usize {
        let mut delivered = 0;
        for peer in self.peers.peers() {
            match self.client.push_chain(&peer, snapshot).await {
                Ok(()) => delivered += 1,
                Err(e) => tracing::warn!(%peer, error = %e, "failed to push chain"),
            }
        }
        delivered
    }

    /// Forwards an admitted transaction request to every peer.
    pub async fn propagate_transaction(&self, request: &TransactionRequest) -> usize {
        let mut delivered = 0;
        for peer in self.peers.peers() {
            match self.client.push_transaction(&peer, request).await {
                Ok(()) => delivered += 1,
                Err(e) => tracing::warn!(%peer, error = %e, "failed to forward transaction"),
            }
        }
        delivered
    }

    /// Forwards an admitted data record to every peer.
    pub async fn propagate_data(&self, entry: &UserData) -> usize {
        let mut delivered = 0;
        for peer in self.peers.peers() {
            match self.client.push_data(&peer, entry).await {
                Ok(()) => delivered += 1,
                Err(e) => tracing::warn!(%peer, error = %e, "failed to forward data record"),
            }
        }
        delivered
    }
}
