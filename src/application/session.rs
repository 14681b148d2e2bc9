// Tracking session - The mutable context every engine component operates on
use crate::domain::credentials::Credentials;
use crate::domain::motion::MotionState;
use crate::domain::policy::PowerState;
use crate::domain::position::PositionFix;

#[derive(Debug, Clone)]
pub struct TrackingSession {
    pub credentials: Credentials,
    pub active: bool,
    pub motion: MotionState,
    pub power: PowerState,
    pub battery_percent: Option<u8>,
    pub last_fix: Option<PositionFix>,
    pub last_movement_at_millis: i64,
    pub current_interval_millis: u64,
    pub auto_paused: bool,
}

impl TrackingSession {
    pub fn new(credentials: Credentials, initial_interval_millis: u64) -> Self {
        Self {
            credentials,
            active: false,
            motion: MotionState::Unknown,
            power: PowerState::default(),
            battery_percent: None,
            last_fix: None,
            last_movement_at_millis: 0,
            current_interval_millis: initial_interval_millis,
            auto_paused: false,
        }
    }

    /// One-line status shown on the host's status surface.
    pub fn summary(&self) -> String {
        if !self.active {
            return "Tracking stopped".to_string();
        }
        format!(
            "Tracking active • {} • {}s interval",
            self.motion.label(),
            self.current_interval_millis / 1000
        )
    }

    /// Drop per-run state; power and battery readings outlive a run.
    pub fn reset(&mut self, initial_interval_millis: u64) {
        self.active = false;
        self.motion = MotionState::Unknown;
        self.last_fix = None;
        self.last_movement_at_millis = 0;
        self.current_interval_millis = initial_interval_millis;
        self.auto_paused = false;
    }
}
