// Fix filter - Drops noisy fixes and separates real movement from jitter
use crate::application::session::TrackingSession;
use crate::domain::policy::IntervalTable;
use crate::domain::position::PositionFix;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FixOutcome {
    /// Accuracy worse than the quality ceiling; the fix is discarded entirely.
    Rejected { accuracy_meters: f64 },
    Accepted { significant: bool },
}

impl FixOutcome {
    pub fn is_significant(&self) -> bool {
        matches!(self, FixOutcome::Accepted { significant: true })
    }
}

#[derive(Debug, Clone)]
pub struct FixFilter {
    accuracy_ceiling_meters: f64,
    stationary_pause_millis: i64,
    table: IntervalTable,
}

impl FixFilter {
    pub fn new(accuracy_ceiling_meters: f64, stationary_pause_millis: i64, table: IntervalTable) -> Self {
        Self {
            accuracy_ceiling_meters,
            stationary_pause_millis,
            table,
        }
    }

    pub fn evaluate(&self, session: &mut TrackingSession, fix: &PositionFix, now_millis: i64) -> FixOutcome {
        if fix.accuracy_meters > self.accuracy_ceiling_meters {
            tracing::trace!(accuracy = fix.accuracy_meters, "Skipping inaccurate fix");
            return FixOutcome::Rejected {
                accuracy_meters: fix.accuracy_meters,
            };
        }

        let threshold = self.table.displacement_threshold(session.motion);
        let significant = match &session.last_fix {
            Some(last) => last.distance_to(fix) >= threshold,
            None => true,
        };

        // Distance is always measured from the true last position
        session.last_fix = Some(fix.clone());

        if significant {
            session.last_movement_at_millis = now_millis;
            tracing::debug!(
                latitude = fix.latitude,
                longitude = fix.longitude,
                accuracy = fix.accuracy_meters,
                speed = fix.speed.unwrap_or(0.0),
                "Accepted fix"
            );
        }

        FixOutcome::Accepted { significant }
    }

    /// Still for longer than the pause threshold while sampling faster than the Still rate.
    pub fn stationary_pause_due(&self, session: &TrackingSession, now_millis: i64) -> bool {
        session.motion.is_still()
            && now_millis - session.last_movement_at_millis > self.stationary_pause_millis
            && session.current_interval_millis < self.table.still_millis
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::credentials::Credentials;
    use crate::domain::motion::MotionState;

    fn filter() -> FixFilter {
        FixFilter::new(25.0, 300_000, IntervalTable::default())
    }

    fn session(motion: MotionState) -> TrackingSession {
        let mut session = TrackingSession::new(Credentials::new(None, "http://collector"), 4_000);
        session.motion = motion;
        session
    }

    #[test]
    fn test_rejects_low_accuracy_without_touching_last_fix() {
        let filter = filter();
        let mut session = session(MotionState::Walking);
        let outcome = filter.evaluate(&mut session, &PositionFix::new(1.0, 1.0, 25.5, 0), 0);
        assert_eq!(outcome, FixOutcome::Rejected { accuracy_meters: 25.5 });
        assert!(session.last_fix.is_none());

        // Exactly at the ceiling still passes
        let outcome = filter.evaluate(&mut session, &PositionFix::new(1.0, 1.0, 25.0, 0), 0);
        assert!(outcome.is_significant());
    }

    #[test]
    fn test_still_requires_fifteen_meters() {
        let filter = filter();
        let mut session = session(MotionState::Still);

        let first = filter.evaluate(&mut session, &PositionFix::new(10.0, 20.0, 5.0, 0), 100);
        assert!(first.is_significant());
        assert_eq!(session.last_movement_at_millis, 100);

        let jitter = filter.evaluate(&mut session, &PositionFix::new(10.00005, 20.00005, 5.0, 1), 200);
        assert_eq!(jitter, FixOutcome::Accepted { significant: false });
        assert_eq!(session.last_movement_at_millis, 100);
        assert_eq!(session.last_fix.as_ref().unwrap().latitude, 10.00005);

        // ~22 m north of the last fix
        let moved = filter.evaluate(&mut session, &PositionFix::new(10.00025, 20.00005, 5.0, 2), 300);
        assert!(moved.is_significant());
        assert_eq!(session.last_movement_at_millis, 300);
    }

    #[test]
    fn test_every_fix_counts_while_moving() {
        let filter = filter();
        let mut session = session(MotionState::Driving);
        for i in 0..5 {
            let outcome = filter.evaluate(&mut session, &PositionFix::new(10.0, 20.0, 5.0, i), i);
            assert!(outcome.is_significant());
        }
    }

    #[test]
    fn test_stationary_pause_rule() {
        let filter = filter();
        let mut session = session(MotionState::Still);
        session.current_interval_millis = 4_000;
        session.last_movement_at_millis = 0;

        assert!(!filter.stationary_pause_due(&session, 300_000));
        assert!(filter.stationary_pause_due(&session, 300_001));

        session.current_interval_millis = 30_000;
        assert!(!filter.stationary_pause_due(&session, 400_000));

        session.current_interval_millis = 4_000;
        session.motion = MotionState::Walking;
        assert!(!filter.stationary_pause_due(&session, 400_000));
    }
}
