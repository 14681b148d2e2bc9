// Interval policy - Applies recomputed sampling policies to the position source
use crate::application::ports::{PositionSource, SourceError};
use crate::application::session::TrackingSession;
use crate::domain::policy::{IntervalTable, SamplingPolicy};
use std::sync::Arc;

pub struct SamplingController {
    source: Arc<dyn PositionSource>,
    table: IntervalTable,
    active: Option<SamplingPolicy>,
}

impl SamplingController {
    pub fn new(source: Arc<dyn PositionSource>, table: IntervalTable) -> Self {
        Self {
            source,
            table,
            active: None,
        }
    }

    #[cfg(test)]
    pub fn is_subscribed(&self) -> bool {
        self.active.is_some()
    }

    /// Start the position subscription with the policy for the current session state.
    /// A no-op when already subscribed.
    pub fn subscribe(&mut self, session: &mut TrackingSession) -> Result<(), SourceError> {
        if self.active.is_some() {
            return Ok(());
        }

        let policy = self.table.compute(session.motion, session.power, session.auto_paused);
        self.source.start(&policy)?;
        session.current_interval_millis = policy.interval_millis;
        self.active = Some(policy);

        tracing::info!(interval_ms = policy.interval_millis, "Location updates started");
        Ok(())
    }

    pub fn unsubscribe(&mut self) {
        if self.active.take().is_some() {
            self.source.stop();
            tracing::info!("Location updates stopped");
        }
    }

    /// Recompute after a motion or power change. Reconfigures the source only when the
    /// new interval falls outside the hysteresis margin. Returns whether it did.
    pub fn recompute(&mut self, session: &mut TrackingSession) -> bool {
        if self.active.is_none() {
            return false;
        }

        let policy = self.table.compute(session.motion, session.power, session.auto_paused);
        if !self
            .table
            .exceeds_hysteresis(session.current_interval_millis, policy.interval_millis)
        {
            tracing::debug!(
                active_ms = session.current_interval_millis,
                candidate_ms = policy.interval_millis,
                "Interval change within hysteresis, keeping subscription"
            );
            return false;
        }

        self.apply(session, policy);
        true
    }

    /// Apply the current policy regardless of hysteresis.
    pub fn force(&mut self, session: &mut TrackingSession) {
        if self.active.is_none() {
            return;
        }
        let policy = self.table.compute(session.motion, session.power, session.auto_paused);
        self.apply(session, policy);
    }

    fn apply(&mut self, session: &mut TrackingSession, policy: SamplingPolicy) {
        session.current_interval_millis = policy.interval_millis;

        self.source.stop();
        match self.source.start(&policy) {
            Ok(()) => {
                self.active = Some(policy);
                tracing::info!(
                    interval_ms = policy.interval_millis,
                    priority = ?policy.power_priority,
                    status = %session.summary(),
                    "Sampling reconfigured"
                );
            }
            Err(error) => {
                // Sampling stays down until access is granted and start is called again
                self.active = None;
                tracing::error!(%error, "Failed to restart location updates");
            }
        }
    }
}
