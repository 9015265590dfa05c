//! Known peers and this node's own advertised address.

use std::net::IpAddr;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use rand::seq::SliceRandom;

use super::error::NetworkError;

#[derive(Debug, Default)]
struct Inner {
    self_ip: Option<String>,
    peers: Vec<String>,
}

/// Directory of peer addresses, shared between the sync protocol and the
/// HTTP handlers.
///
/// Entries are unique and never equal to the node's own address. The only
/// eviction is [`PeerDirectory::drop_last`], used when a freshly added
/// peer fails its liveness check.
#[derive(Debug, Default)]
pub struct PeerDirectory {
    inner: RwLock<Inner>,
    validate_ips: bool,
}

impl PeerDirectory {
    pub fn new(validate_ips: bool) -> Self {
        Self {
            inner: RwLock::default(),
            validate_ips,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|p| p.into_inner())
    }

    pub fn self_ip(&self) -> Option<String> {
        self.read().self_ip.clone()
    }

    pub fn set_self_ip(&self, ip: impl Into<String>) {
        let ip = normalize(&ip.into());
        let mut inner = self.write();
        inner.peers.retain(|p| p != &ip);
        inner.self_ip = Some(ip);
    }

    /// Copy of the current peer list.
    pub fn peers(&self) -> Vec<String> {
        self.read().peers.clone()
    }

    pub fn len(&self) -> usize {
        self.read().peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, ip: &str) -> bool {
        self.read().peers.iter().any(|p| p == ip)
    }

    /// Uniformly random peer, if any are known.
    pub fn random_peer(&self) -> Option<String> {
        self.read().peers.choose(&mut rand::thread_rng()).cloned()
    }

    /// Adds a peer address.
    ///
    /// Surrounding quotes and whitespace are stripped. Returns `Ok(false)`
    /// for duplicates and for the node's own address.
    pub fn insert(&self, ip: &str) -> Result<bool, NetworkError> {
        let ip = normalize(ip);
        if ip.is_empty() {
            return Err(NetworkError::InvalidPeer(ip));
        }
        if self.validate_ips && ip.parse::<IpAddr>().is_err() {
            return Err(NetworkError::InvalidPeer(ip));
        }

        let mut inner = self.write();
        if inner.self_ip.as_deref() == Some(ip.as_str()) || inner.peers.contains(&ip) {
            return Ok(false);
        }
        inner.peers.push(ip);
        Ok(true)
    }

    /// Removes and returns the most recently added peer.
    pub fn drop_last(&self) -> Option<String> {
        self.write().peers.pop()
    }
}

fn normalize(raw: &str) -> String {
    raw.trim().trim_matches('"').trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_dedupes_and_excludes_self() {
        let dir = PeerDirectory::new(true);
        dir.set_self_ip("10.0.0.1");

        assert!(dir.insert("\"10.0.0.2\"\n").expect("valid ip"));
        assert!(!dir.insert("10.0.0.2").expect("valid ip"));
        assert!(!dir.insert("10.0.0.1").expect("valid ip"));
        assert_eq!(dir.peers(), vec!["10.0.0.2".to_string()]);
    }

    #[test]
    fn invalid_addresses_are_rejected_when_validating() {
        let dir = PeerDirectory::new(true);
        assert!(matches!(
            dir.insert("not-an-ip"),
            Err(NetworkError::InvalidPeer(_))
        ));
        assert!(matches!(dir.insert("  "), Err(NetworkError::InvalidPeer(_))));

        let lenient = PeerDirectory::new(false);
        assert!(lenient.insert("peer-a.local").expect("hostnames allowed"));
    }

    #[test]
    fn random_peer_and_drop_last() {
        let dir = PeerDirectory::new(true);
        assert!(dir.random_peer().is_none());

        dir.insert("10.0.0.2").expect("insert");
        dir.insert("10.0.0.3").expect("insert");
        let picked = dir.random_peer().expect("a peer");
        assert!(dir.contains(&picked));

        assert_eq!(dir.drop_last(), Some("10.0.0.3".to_string()));
        assert_eq!(dir.len(), 1);
    }

    #[test]
    fn setting_self_ip_evicts_matching_peer() {
        let dir = PeerDirectory::new(false);
        dir.insert("me").expect("insert");
        dir.set_self_ip("me");
        assert!(dir.is_empty());
        assert_eq!(dir.self_ip().as_deref(), Some("me"));
    }
}
