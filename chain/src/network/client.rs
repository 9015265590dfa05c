//! Outbound side of the peer wire contract.
//!
//! Peers serve, on `http://{ip}:{peer_port}`:
//!
//! ```text
//! GET  /                 full ChainSnapshot as JSON
//! POST /sync             push a ChainSnapshot
//! PUT  /update/mempool   forward a signed TransactionRequest
//! PUT  /update/datapool  forward a UserData record
//! GET  /is_alive         liveness check
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};

use crate::ledger::{ChainSnapshot, TransactionRequest};
use crate::types::UserData;

use super::error::NetworkError;

#[async_trait]
pub trait PeerClient: Send + Sync {
    async fn fetch_chain(&self, peer: &str) -> Result<ChainSnapshot, NetworkError>;

    async fn is_alive(&self, peer: &str) -> bool;

    async fn push_chain(&self, peer: &str, snapshot: &ChainSnapshot) -> Result<(), NetworkError>;

    async fn push_transaction(
        &self,
        peer: &str,
        request: &TransactionRequest,
    ) -> Result<(), NetworkError>;

    async fn push_data(&self, peer: &str, entry: &UserData) -> Result<(), NetworkError>;
}

/// HTTP implementation of [`PeerClient`].
pub struct HttpPeerClient {
    client: Client,
    peer_port: u16,
}

impl HttpPeerClient {
    pub fn new(peer_port: u16, timeout: Duration) -> Result<Self, NetworkError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NetworkError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, peer_port })
    }

    fn url(&self, peer: &str, path: &str) -> String {
        if peer.contains(':') {
            format!("http://[{peer}]:{}{path}", self.peer_port)
        } else {
            format!("http://{peer}:{}{path}", self.peer_port)
        }
    }
}

fn ensure_success(url: &str, resp: Response) -> Result<Response, NetworkError> {
    let status = resp.status();
    if status.is_success() {
        Ok(resp)
    } else {
        Err(NetworkError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        })
    }
}

#[async_trait]
impl PeerClient for HttpPeerClient {
    async fn fetch_chain(&self, peer: &str) -> Result<ChainSnapshot, NetworkError> {
        let url = self.url(peer, "/");
        let resp = self.client.get(&url).send().await?;
        let resp = ensure_success(&url, resp)?;
        resp.json::<ChainSnapshot>()
            .await
            .map_err(|e| NetworkError::Decode {
                url,
                reason: e.to_string(),
            })
    }

    async fn is_alive(&self, peer: &str) -> bool {
        let url = self.url(peer, "/is_alive");
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                tracing::debug!(%peer, error = %e, "liveness check failed");
                false
            }
        }
    }

    async fn push_chain(&self, peer: &str, snapshot: &ChainSnapshot) -> Result<(), NetworkError> {
        let url = self.url(peer, "/sync");
        let resp = self.client.post(&url).json(snapshot).send().await?;
        ensure_success(&url, resp).map(|_| ())
    }

    async fn push_transaction(
        &self,
        peer: &str,
        request: &TransactionRequest,
    ) -> Result<(), NetworkError> {
        let url = self.url(peer, "/update/mempool");
        let resp = self.client.put(&url).json(request).send().await?;
        ensure_success(&url, resp).map(|_| ())
    }

    async fn push_data(&self, peer: &str, entry: &UserData) -> Result<(), NetworkError> {
        let url = self.url(peer, "/update/datapool");
        let resp = self.client.put(&url).json(entry).send().await?;
        ensure_success(&url, resp).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_urls_use_the_configured_port() {
        let client = HttpPeerClient::new(10111, Duration::from_secs(1)).expect("client");
        assert_eq!(client.url("1.2.3.4", "/sync"), "http://1.2.3.4:10111/sync");
        assert_eq!(client.url("::1", "/"), "http://[::1]:10111/");
    }
}
