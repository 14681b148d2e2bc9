// Motion classifier - Folds activity transitions into the session's motion state
use crate::application::session::TrackingSession;
use crate::domain::motion::{ActivityTransition, MotionState};

/// Apply a transition. Returns the previous state when the motion state changed.
pub fn on_transition(
    session: &mut TrackingSession,
    transition: ActivityTransition,
    now_millis: i64,
) -> Option<MotionState> {
    if !transition.is_enter() {
        return None;
    }

    let next = MotionState::from(transition.activity);
    if next == session.motion {
        return None;
    }

    let previous = session.motion;
    session.motion = next;

    if !next.is_still() {
        session.last_movement_at_millis = now_millis;
        session.auto_paused = false;
    }

    tracing::info!(from = previous.label(), to = next.label(), "Motion state changed");
    Some(previous)
}
