//! # Connectivity
//!
//! The online/offline flag shared by the sync engine and the time oracle,
//! and the probe that keeps it current.
//!
//! ```text
//! HttpNetworkProbe ──HEAD health_url──► reachable?
//!        │
//!        ▼ (SyncEngine::run, every poll tick)
//! SyncEngine::set_online(reachable)
//!        │
//!        ├── offline → online : flush()
//!        └── online → offline : state only, queue kept
//! ```

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::config::SyncConfig;
use crate::error::SyncResult;

// =============================================================================
// Connectivity Flag
// =============================================================================

/// Shared online/offline state. Clones observe the same flag.
#[derive(Debug, Clone)]
pub struct Connectivity {
    online: Arc<AtomicBool>,
}

impl Connectivity {
    pub fn new(online: bool) -> Self {
        Connectivity {
            online: Arc::new(AtomicBool::new(online)),
        }
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }

    /// Sets the flag and returns the previous value.
    pub fn set(&self, online: bool) -> bool {
        self.online.swap(online, Ordering::AcqRel)
    }
}

impl Default for Connectivity {
    fn default() -> Self {
        Connectivity::new(true)
    }
}

// =============================================================================
// Probe
// =============================================================================

/// Answers "can the remote service be reached right now?".
#[async_trait]
pub trait NetworkProbe: Send + Sync {
    async fn is_reachable(&self) -> bool;
}

/// Probes a health URL with `HEAD`. Any 2xx/3xx counts as reachable.
#[derive(Debug, Clone)]
pub struct HttpNetworkProbe {
    client: reqwest::Client,
    url: String,
}

impl HttpNetworkProbe {
    pub fn new(url: impl Into<String>, timeout: Duration) -> SyncResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(HttpNetworkProbe {
            client,
            url: url.into(),
        })
    }

    /// Builds a probe from `[sync].health_url`, if configured.
    pub fn from_config(config: &SyncConfig) -> SyncResult<Option<Self>> {
        config
            .sync
            .health_url
            .as_ref()
            .map(|url| HttpNetworkProbe::new(url.clone(), config.time_timeout()))
            .transpose()
    }
}

#[async_trait]
impl NetworkProbe for HttpNetworkProbe {
    async fn is_reachable(&self) -> bool {
        match self.client.head(&self.url).send().await {
            Ok(resp) => {
                let ok = resp.status().is_success() || resp.status().is_redirection();
                debug!(url = %self.url, status = %resp.status(), reachable = ok, "Health probe");
                ok
            }
            Err(e) => {
                debug!(url = %self.url, error = %e, "Health probe failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let a = Connectivity::new(false);
        let b = a.clone();

        assert!(!a.set(true));
        assert!(b.is_online());
        assert!(b.set(false));
        assert!(!a.is_online());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_offline() {
        // Port 9 (discard) on localhost is closed in test environments.
        let probe = HttpNetworkProbe::new("http://127.0.0.1:9/health", Duration::from_millis(500)).unwrap();
        assert!(!probe.is_reachable().await);
    }

    #[test]
    fn test_from_config_without_url() {
        let config = SyncConfig::default();
        assert!(HttpNetworkProbe::from_config(&config).unwrap().is_none());
    }
}
