// Application state for HTTP handlers
use crate::application::ports::PreferenceStore;
use crate::application::tracking_service::TrackerHandle;
use crate::infrastructure::host_bridge::HostBridge;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub tracker: TrackerHandle,
    pub preferences: Arc<dyn PreferenceStore>,
    pub bridge: Arc<HostBridge>,
}
