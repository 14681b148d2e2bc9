// Power guard - Tracks battery level and the low-power flag
use crate::application::session::TrackingSession;

#[derive(Debug, Clone)]
pub struct PowerGuard {
    low_battery_percent: f32,
}

impl PowerGuard {
    pub fn new(low_battery_percent: f32) -> Self {
        Self { low_battery_percent }
    }

    /// Record a battery sample. Returns true when the low-power flag flipped.
    pub fn on_battery_sample(&self, session: &mut TrackingSession, level_percent: f32) -> bool {
        if !level_percent.is_finite() || !(0.0..=100.0).contains(&level_percent) {
            tracing::warn!(level_percent, "Ignoring out-of-range battery sample");
            return false;
        }

        session.battery_percent = Some(level_percent.round() as u8);

        let was_low = session.power.is_low_power;
        session.power.is_low_power = level_percent < self.low_battery_percent;

        if session.power.is_low_power != was_low {
            tracing::info!(
                level_percent,
                mode = if session.power.is_low_power { "low power" } else { "normal" },
                "Battery mode changed"
            );
            return true;
        }
        false
    }
}
