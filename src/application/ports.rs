// Ports consumed by the tracking engine - sources, wake lock, preferences and the collector
use crate::domain::credentials::{Credentials, Preferences};
use crate::domain::policy::SamplingPolicy;
use crate::domain::position::TelemetryRecord;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("source unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("no bearer token available")]
    MissingCredential,
    #[error("upload timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("collector responded with status {0}")]
    Rejected(u16),
}

/// Emits position fixes under a given sampling policy.
pub trait PositionSource: Send + Sync {
    fn start(&self, policy: &SamplingPolicy) -> Result<(), SourceError>;
    fn stop(&self);
}

/// Emits activity enter/exit transitions.
pub trait ActivitySource: Send + Sync {
    fn start(&self) -> Result<(), SourceError>;
    fn stop(&self);
}

/// Keeps the host awake while tracking is active.
pub trait WakeLock: Send + Sync {
    fn acquire(&self);
    fn release(&self);
}

/// Persisted credentials and the tracking-enabled flag.
pub trait PreferenceStore: Send + Sync {
    fn load(&self) -> anyhow::Result<Preferences>;
    fn save(&self, preferences: &Preferences) -> anyhow::Result<()>;
}

#[async_trait]
pub trait LocationCollector: Send + Sync {
    /// Upload one ordered batch. `Ok` means the collector acknowledged every record.
    async fn upload(&self, credentials: &Credentials, records: &[TelemetryRecord]) -> Result<(), DeliveryError>;
}
