// Sampling policy domain model - Interval table and the pure policy computation
use serde::{Deserialize, Serialize};

use super::motion::MotionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerPriority {
    HighAccuracy,
    BalancedPowerAccuracy,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PowerState {
    pub is_low_power: bool,
}

/// Configuration handed to the position source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SamplingPolicy {
    pub interval_millis: u64,
    pub min_fix_interval_millis: u64,
    pub min_displacement_meters: f64,
    pub power_priority: PowerPriority,
}

/// Per-state intervals and the constants the policy is derived from.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct IntervalTable {
    pub still_millis: u64,
    pub walking_millis: u64,
    pub running_millis: u64,
    pub driving_millis: u64,
    pub cycling_millis: u64,
    pub default_millis: u64,
    pub min_fix_interval_millis: u64,
    pub still_displacement_meters: f64,
    pub moving_displacement_meters: f64,
    pub low_power_floor_millis: u64,
    pub hysteresis_millis: u64,
}

impl Default for IntervalTable {
    fn default() -> Self {
        Self {
            still_millis: 30_000,
            walking_millis: 4_000,
            running_millis: 2_000,
            driving_millis: 2_000,
            cycling_millis: 2_000,
            default_millis: 4_000,
            min_fix_interval_millis: 1_000,
            still_displacement_meters: 15.0,
            moving_displacement_meters: 0.0,
            low_power_floor_millis: 30_000,
            hysteresis_millis: 2_000,
        }
    }
}

impl IntervalTable {
    fn base_interval(&self, motion: MotionState) -> u64 {
        match motion {
            MotionState::Driving => self.driving_millis,
            MotionState::Cycling => self.cycling_millis,
            MotionState::Running => self.running_millis,
            MotionState::Walking => self.walking_millis,
            MotionState::Still => self.still_millis,
            MotionState::Unknown => self.default_millis,
        }
    }

    /// Minimum displacement for a fix to count as movement in `motion`.
    pub fn displacement_threshold(&self, motion: MotionState) -> f64 {
        if motion.is_still() {
            self.still_displacement_meters
        } else {
            self.moving_displacement_meters
        }
    }

    pub fn compute(&self, motion: MotionState, power: PowerState, auto_paused: bool) -> SamplingPolicy {
        let effective = if auto_paused { MotionState::Still } else { motion };
        let mut interval_millis = self.base_interval(effective);
        let mut power_priority = PowerPriority::HighAccuracy;

        if power.is_low_power {
            interval_millis = (interval_millis * 2).max(self.low_power_floor_millis);
            power_priority = PowerPriority::BalancedPowerAccuracy;
        }

        SamplingPolicy {
            interval_millis,
            min_fix_interval_millis: self.min_fix_interval_millis,
            min_displacement_meters: self.displacement_threshold(effective),
            power_priority,
        }
    }

    /// Whether `candidate` differs enough from the active interval to reconfigure.
    pub fn exceeds_hysteresis(&self, active_millis: u64, candidate_millis: u64) -> bool {
        active_millis.abs_diff(candidate_millis) > self.hysteresis_millis
    }
}
