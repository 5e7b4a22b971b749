//! Sync configuration.

use std::future::Future;
use std::time::Duration;

use lanyard_transport::TransportError;
use tokio::time;

use crate::SyncError;

/// Configuration shared by the stat and achievement caches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Upper bound on every remote call a cache makes. A call that
    /// exceeds it fails with [`TransportError::Timeout`].
    ///
    /// Default: 10 seconds.
    pub request_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl SyncConfig {
    pub fn validated(mut self) -> Self {
        if self.request_timeout.is_zero() {
            self.request_timeout = Self::default().request_timeout;
        }
        self
    }

    /// Run a remote call under `request_timeout`.
    pub(crate) async fn bounded<T, F>(&self, call: F) -> Result<T, SyncError>
    where
        F: Future<Output = Result<T, TransportError>>,
    {
        let limit = self.request_timeout;
        match time::timeout(limit, call).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(TransportError::Timeout(limit).into()),
        }
    }
}
