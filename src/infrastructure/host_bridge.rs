// Host bridge - Publishes sampling requests for the platform glue to apply
use crate::application::ports::{ActivitySource, PositionSource, SourceError, WakeLock};
use crate::domain::policy::SamplingPolicy;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;

/// What the host's sensors should currently be doing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplingRequest {
    /// Bumped on every position subscription so the host can tell restarts apart.
    pub generation: u64,
    pub policy: Option<SamplingPolicy>,
    pub activity_updates: bool,
    pub keep_awake: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionSet {
    pub location: bool,
    pub activity_recognition: bool,
}

pub struct HostBridge {
    request: watch::Sender<SamplingRequest>,
    location_granted: AtomicBool,
    activity_granted: AtomicBool,
}

impl HostBridge {
    pub fn new(permissions: PermissionSet) -> Self {
        let (request, _) = watch::channel(SamplingRequest::default());
        Self {
            request,
            location_granted: AtomicBool::new(permissions.location),
            activity_granted: AtomicBool::new(permissions.activity_recognition),
        }
    }

    pub fn current(&self) -> SamplingRequest {
        self.request.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SamplingRequest> {
        self.request.subscribe()
    }

    pub fn permissions(&self) -> PermissionSet {
        PermissionSet {
            location: self.location_granted.load(Ordering::SeqCst),
            activity_recognition: self.activity_granted.load(Ordering::SeqCst),
        }
    }

    pub fn set_permissions(&self, permissions: PermissionSet) {
        self.location_granted.store(permissions.location, Ordering::SeqCst);
        self.activity_granted
            .store(permissions.activity_recognition, Ordering::SeqCst);
        tracing::info!(
            location = permissions.location,
            activity_recognition = permissions.activity_recognition,
            "Host permissions updated"
        );
    }
}

impl PositionSource for HostBridge {
    fn start(&self, policy: &SamplingPolicy) -> Result<(), SourceError> {
        if !self.location_granted.load(Ordering::SeqCst) {
            return Err(SourceError::PermissionDenied(
                "location permission not granted".to_string(),
            ));
        }
        self.request.send_modify(|request| {
            request.generation += 1;
            request.policy = Some(*policy);
        });
        Ok(())
    }

    fn stop(&self) {
        self.request.send_modify(|request| request.policy = None);
    }
}

impl ActivitySource for HostBridge {
    fn start(&self) -> Result<(), SourceError> {
        if !self.activity_granted.load(Ordering::SeqCst) {
            return Err(SourceError::PermissionDenied(
                "activity recognition permission not granted".to_string(),
            ));
        }
        self.request.send_modify(|request| request.activity_updates = true);
        Ok(())
    }

    fn stop(&self) {
        self.request.send_modify(|request| request.activity_updates = false);
    }
}

impl WakeLock for HostBridge {
    fn acquire(&self) {
        self.request.send_modify(|request| request.keep_awake = true);
    }

    fn release(&self) {
        self.request.send_modify(|request| request.keep_awake = false);
    }
}
