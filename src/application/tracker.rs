// Tracker core - Orchestrates classification, filtering, interval policy and delivery
use crate::application::delivery_pipeline::{DeliveryPipeline, FlushOutcome, FlushTrigger};
use crate::application::fix_filter::{FixFilter, FixOutcome};
use crate::application::interval_policy::SamplingController;
use crate::application::motion_classifier;
use crate::application::ports::{ActivitySource, PositionSource, PreferenceStore, SourceError, WakeLock};
use crate::application::power_guard::PowerGuard;
use crate::application::session::TrackingSession;
use crate::domain::credentials::Credentials;
use crate::domain::motion::{ActivityTransition, MotionState};
use crate::domain::policy::IntervalTable;
use crate::domain::position::{PositionFix, TelemetryRecord};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("location permission denied: {0}")]
    PermissionDenied(String),
    #[error("location source unavailable: {0}")]
    SourceUnavailable(String),
    #[error(transparent)]
    Preferences(#[from] anyhow::Error),
    #[error("tracking service is not running")]
    ServiceStopped,
}

impl From<SourceError> for TrackerError {
    fn from(error: SourceError) -> Self {
        match error {
            SourceError::PermissionDenied(reason) => TrackerError::PermissionDenied(reason),
            SourceError::Unavailable(reason) => TrackerError::SourceUnavailable(reason),
        }
    }
}

/// Host memory pressure, mirroring the platform's trim levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryPressure {
    Mild,
    Moderate,
    Severe,
}

#[derive(Debug, Clone)]
pub struct TrackerSettings {
    pub intervals: IntervalTable,
    pub accuracy_ceiling_meters: f64,
    pub stationary_pause_millis: i64,
    pub low_battery_percent: f32,
    pub flush_interval: Duration,
    pub shutdown_grace: Duration,
    pub default_collector_url: String,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            intervals: IntervalTable::default(),
            accuracy_ceiling_meters: 25.0,
            stationary_pause_millis: 300_000,
            low_battery_percent: 20.0,
            flush_interval: Duration::from_millis(15_000),
            shutdown_grace: Duration::from_secs(20),
            default_collector_url: "http://127.0.0.1:3000/api".to_string(),
        }
    }
}

pub struct TrackerPorts {
    pub positions: Arc<dyn PositionSource>,
    pub activities: Arc<dyn ActivitySource>,
    pub wake_lock: Arc<dyn WakeLock>,
    pub preferences: Arc<dyn PreferenceStore>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerStatus {
    pub active: bool,
    pub motion: MotionState,
    pub activity: String,
    pub low_power: bool,
    pub battery_percent: Option<u8>,
    pub interval_millis: u64,
    pub auto_paused: bool,
    pub queued: usize,
    pub has_token: bool,
    pub summary: String,
}

pub struct Tracker {
    session: TrackingSession,
    settings: TrackerSettings,
    filter: FixFilter,
    guard: PowerGuard,
    sampling: SamplingController,
    activities: Arc<dyn ActivitySource>,
    wake_lock: Arc<dyn WakeLock>,
    preferences: Arc<dyn PreferenceStore>,
    pipeline: DeliveryPipeline,
}

impl Tracker {
    pub fn new(ports: TrackerPorts, pipeline: DeliveryPipeline, settings: TrackerSettings) -> Self {
        let credentials = Credentials::new(None, settings.default_collector_url.clone());
        let session = TrackingSession::new(credentials, settings.intervals.default_millis);
        let filter = FixFilter::new(
            settings.accuracy_ceiling_meters,
            settings.stationary_pause_millis,
            settings.intervals.clone(),
        );

        Self {
            session,
            filter,
            guard: PowerGuard::new(settings.low_battery_percent),
            sampling: SamplingController::new(ports.positions, settings.intervals.clone()),
            activities: ports.activities,
            wake_lock: ports.wake_lock,
            preferences: ports.preferences,
            pipeline,
            settings,
        }
    }

    pub fn is_active(&self) -> bool {
        self.session.active
    }

    pub fn settings(&self) -> &TrackerSettings {
        &self.settings
    }

    pub fn pipeline(&self) -> &DeliveryPipeline {
        &self.pipeline
    }

    /// Begin sampling with freshly loaded credentials. Calling it again while active only
    /// reloads the credentials.
    pub fn start(&mut self, now_millis: i64) -> Result<(), TrackerError> {
        let preferences = self
            .preferences
            .load()
            .context("failed to load stored credentials")?;
        self.session.credentials = preferences.credentials(&self.settings.default_collector_url);
        tracing::debug!(token_present = self.session.credentials.has_token(), "Credentials loaded");

        if self.session.active {
            // No-op unless a failed reconfigure dropped the subscription
            self.sampling.subscribe(&mut self.session)?;
            tracing::debug!("Tracking already active");
            return Ok(());
        }

        self.wake_lock.acquire();
        self.session.last_movement_at_millis = now_millis;

        if let Err(error) = self.sampling.subscribe(&mut self.session) {
            tracing::error!(%error, "Cannot start location updates");
            self.wake_lock.release();
            return Err(error.into());
        }

        if let Err(error) = self.activities.start() {
            // Tracking continues at the default cadence without motion hints
            tracing::warn!(%error, "Activity recognition unavailable");
        }

        self.session.active = true;
        tracing::info!(status = %self.session.summary(), "Tracking started");
        Ok(())
    }

    /// Final flush, then release resources and end sampling.
    pub async fn stop(&mut self) {
        if !self.session.active {
            return;
        }

        tracing::info!(queued = self.pipeline.queued(), "Stopping tracking, performing final sync");
        let outcome = self
            .pipeline
            .flush_now(&self.session.credentials, FlushTrigger::Teardown)
            .await;
        tracing::debug!(?outcome, "Final sync finished");
        self.pipeline.drain(self.settings.shutdown_grace).await;

        self.wake_lock.release();
        self.sampling.unsubscribe();
        self.activities.stop();
        self.session.reset(self.settings.intervals.default_millis);
        tracing::info!(queued = self.pipeline.queued(), "Tracking stopped");
    }

    pub fn on_fix(&mut self, fix: PositionFix, now_millis: i64) -> Option<FixOutcome> {
        if !self.session.active {
            tracing::trace!("Ignoring fix while tracking is stopped");
            return None;
        }

        let outcome = self.filter.evaluate(&mut self.session, &fix, now_millis);
        if outcome.is_significant() {
            let record = TelemetryRecord::from_fix(
                &fix,
                self.session.battery_percent,
                self.session.motion.label(),
                now_millis,
            );
            self.pipeline.enqueue(record, &self.session.credentials);
        }

        if self.filter.stationary_pause_due(&self.session, now_millis) {
            tracing::info!(
                stationary_secs = (now_millis - self.session.last_movement_at_millis) / 1000,
                "Stationary for a while, reducing update frequency"
            );
            self.session.auto_paused = true;
            self.sampling.force(&mut self.session);
        }

        Some(outcome)
    }

    pub fn on_transition(&mut self, transition: ActivityTransition, now_millis: i64) {
        if !self.session.active {
            return;
        }
        if motion_classifier::on_transition(&mut self.session, transition, now_millis).is_some() {
            self.sampling.recompute(&mut self.session);
        }
    }

    pub fn on_battery_sample(&mut self, level_percent: f32) {
        if self.guard.on_battery_sample(&mut self.session, level_percent) {
            self.sampling.recompute(&mut self.session);
        }
    }

    pub fn on_memory_pressure(&mut self, level: MemoryPressure) -> Option<JoinHandle<FlushOutcome>> {
        if level < MemoryPressure::Moderate {
            return None;
        }
        tracing::warn!(?level, "Memory pressure, forcing sync");
        self.pipeline.dispatch(&self.session.credentials, FlushTrigger::MemoryPressure)
    }

    pub fn on_flush_timer(&mut self) -> Option<JoinHandle<FlushOutcome>> {
        self.pipeline.dispatch(&self.session.credentials, FlushTrigger::Timer)
    }

    /// Delay until the next periodic flush; doubled while Still.
    pub fn flush_cadence(&self) -> Duration {
        if self.session.motion.is_still() {
            self.settings.flush_interval * 2
        } else {
            self.settings.flush_interval
        }
    }

    pub fn status(&self) -> TrackerStatus {
        TrackerStatus {
            active: self.session.active,
            motion: self.session.motion,
            activity: self.session.motion.label().to_string(),
            low_power: self.session.power.is_low_power,
            battery_percent: self.session.battery_percent,
            interval_millis: self.session.current_interval_millis,
            auto_paused: self.session.auto_paused,
            queued: self.pipeline.queued(),
            has_token: self.session.credentials.has_token(),
            summary: self.session.summary(),
        }
    }
}
