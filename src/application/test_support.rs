// Test doubles for the engine's ports
use crate::application::ports::{
    ActivitySource, DeliveryError, LocationCollector, PositionSource, PreferenceStore, SourceError,
    WakeLock,
};
use crate::domain::credentials::{Credentials, Preferences};
use crate::domain::policy::SamplingPolicy;
use crate::domain::position::{PositionFix, TelemetryRecord};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Shared, ordered log of side effects across fakes.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn position(&self, event: &str) -> Option<usize> {
        self.entries().iter().position(|e| e == event)
    }
}

#[derive(Default)]
pub struct FakePositionSource {
    starts: AtomicUsize,
    stops: AtomicUsize,
    denied: AtomicBool,
    last_policy: Mutex<Option<SamplingPolicy>>,
    log: EventLog,
}

impl FakePositionSource {
    pub fn with_log(log: EventLog) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }

    pub fn deny(&self) {
        self.denied.store(true, Ordering::SeqCst);
    }

    pub fn grant(&self) {
        self.denied.store(false, Ordering::SeqCst);
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn active_subscriptions(&self) -> usize {
        self.starts().saturating_sub(self.stops())
    }

    pub fn last_policy(&self) -> Option<SamplingPolicy> {
        *self.last_policy.lock().unwrap()
    }
}

impl PositionSource for FakePositionSource {
    fn start(&self, policy: &SamplingPolicy) -> Result<(), SourceError> {
        if self.denied.load(Ordering::SeqCst) {
            return Err(SourceError::PermissionDenied("location".to_string()));
        }
        self.starts.fetch_add(1, Ordering::SeqCst);
        *self.last_policy.lock().unwrap() = Some(*policy);
        self.log.push("positions.start");
        Ok(())
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.log.push("positions.stop");
    }
}

#[derive(Default)]
pub struct FakeActivitySource {
    pub running: AtomicBool,
    pub denied: AtomicBool,
    log: EventLog,
}

impl FakeActivitySource {
    pub fn with_log(log: EventLog) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }
}

impl ActivitySource for FakeActivitySource {
    fn start(&self) -> Result<(), SourceError> {
        if self.denied.load(Ordering::SeqCst) {
            return Err(SourceError::PermissionDenied("activity recognition".to_string()));
        }
        self.running.store(true, Ordering::SeqCst);
        self.log.push("activities.start");
        Ok(())
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.log.push("activities.stop");
    }
}

#[derive(Default)]
pub struct FakeWakeLock {
    pub held: AtomicBool,
    log: EventLog,
}

impl FakeWakeLock {
    pub fn with_log(log: EventLog) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }
}

impl WakeLock for FakeWakeLock {
    fn acquire(&self) {
        self.held.store(true, Ordering::SeqCst);
        self.log.push("wake_lock.acquire");
    }

    fn release(&self) {
        self.held.store(false, Ordering::SeqCst);
        self.log.push("wake_lock.release");
    }
}

#[derive(Default)]
pub struct MemoryPreferenceStore {
    preferences: Mutex<Preferences>,
}

impl MemoryPreferenceStore {
    pub fn with_token(token: &str) -> Self {
        Self {
            preferences: Mutex::new(Preferences {
                auth_token: Some(token.to_string()),
                api_url: Some("http://collector.test/api".to_string()),
                tracking_enabled: false,
            }),
        }
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn load(&self) -> anyhow::Result<Preferences> {
        Ok(self.preferences.lock().unwrap().clone())
    }

    fn save(&self, preferences: &Preferences) -> anyhow::Result<()> {
        *self.preferences.lock().unwrap() = preferences.clone();
        Ok(())
    }
}

/// Collector that records every attempted batch and fails while `failing` is set.
#[derive(Default)]
pub struct FakeCollector {
    pub failing: AtomicBool,
    attempts: Mutex<Vec<Vec<TelemetryRecord>>>,
    delivered: Mutex<Vec<TelemetryRecord>>,
    delay: Option<Duration>,
    log: EventLog,
}

impl FakeCollector {
    pub fn with_log(log: EventLog) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        let collector = Self::default();
        collector.failing.store(true, Ordering::SeqCst);
        collector
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn attempts(&self) -> Vec<Vec<TelemetryRecord>> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn delivered(&self) -> Vec<TelemetryRecord> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl LocationCollector for FakeCollector {
    async fn upload(&self, _credentials: &Credentials, records: &[TelemetryRecord]) -> Result<(), DeliveryError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.attempts.lock().unwrap().push(records.to_vec());
        self.log.push(format!("upload:{}", records.len()));

        if self.failing.load(Ordering::SeqCst) {
            return Err(DeliveryError::Timeout);
        }
        self.delivered.lock().unwrap().extend_from_slice(records);
        Ok(())
    }
}

pub fn credentials() -> Credentials {
    Credentials::new(Some("token".to_string()), "http://collector.test/api")
}

pub fn record(latitude: f64) -> TelemetryRecord {
    let fix = PositionFix::new(latitude, 0.0, 5.0, 0);
    TelemetryRecord::from_fix(&fix, Some(50), "Walking", 0)
}

pub fn latitudes(records: &[TelemetryRecord]) -> Vec<f64> {
    records.iter().map(|r| r.latitude).collect()
}
