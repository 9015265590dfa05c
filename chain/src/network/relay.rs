//! Bootstrap relay client.
//!
//! The relay is a small registry of node addresses:
//!
//! ```text
//! POST {relay}/add/{ip}    register this node
//! GET  {relay}/rand/node   -> "\"1.2.3.4\""   a random registered node
//! ```
//!
//! The node's own public address comes from a separate plain-text lookup
//! service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::error::NetworkError;

#[async_trait]
pub trait RelayClient: Send + Sync {
    /// This node's public IP as seen from outside.
    async fn public_ip(&self) -> Result<String, NetworkError>;

    /// Registers `ip` with the relay.
    async fn register(&self, ip: &str) -> Result<(), NetworkError>;

    /// A random node registered with the relay (possibly this one).
    async fn random_peer(&self) -> Result<String, NetworkError>;
}

/// HTTP implementation of [`RelayClient`].
pub struct HttpRelayClient {
    client: Client,
    relay_url: String,
    ip_lookup_url: String,
}

impl HttpRelayClient {
    pub fn new(
        relay_url: impl Into<String>,
        ip_lookup_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, NetworkError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NetworkError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            relay_url: relay_url.into(),
            ip_lookup_url: ip_lookup_url.into(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.relay_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn get_text(&self, url: &str) -> Result<String, NetworkError> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(NetworkError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = resp.text().await.map_err(|e| NetworkError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(unquote(&body))
    }
}

#[async_trait]
impl RelayClient for HttpRelayClient {
    async fn public_ip(&self) -> Result<String, NetworkError> {
        self.get_text(&self.ip_lookup_url).await
    }

    async fn register(&self, ip: &str) -> Result<(), NetworkError> {
        let url = self.endpoint(&format!("/add/{ip}"));
        let resp = self.client.post(&url).send().await?;
        if !resp.status().is_success() {
            return Err(NetworkError::Status {
                url,
                status: resp.status().as_u16(),
            });
        }
        Ok(())
    }

    async fn random_peer(&self) -> Result<String, NetworkError> {
        let url = self.endpoint("/rand/node");
        self.get_text(&url).await
    }
}

/// Strips whitespace and the JSON quotes the relay wraps addresses in.
pub(crate) fn unquote(raw: &str) -> String {
    raw.trim().trim_matches('"').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_avoids_double_slashes() {
        let relay = HttpRelayClient::new(
            "http://relay:10011/api/v1/",
            "http://lookup",
            Duration::from_secs(1),
        )
        .expect("client");
        assert_eq!(
            relay.endpoint("/rand/node"),
            "http://relay:10011/api/v1/rand/node"
        );
    }

    #[test]
    fn unquote_strips_json_quotes() {
        assert_eq!(unquote("\"1.2.3.4\"\n"), "1.2.3.4");
        assert_eq!(unquote("5.6.7.8"), "5.6.7.8");
    }
}
