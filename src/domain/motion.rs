// Motion domain model - Activity vocabulary and the coarse motion state derived from it
use serde::{Deserialize, Serialize};

/// Activity types reported by the host's activity-recognition source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    InVehicle,
    OnBicycle,
    OnFoot,
    Running,
    Still,
    Tilting,
    Walking,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    Enter,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct ActivityTransition {
    pub activity: ActivityType,
    pub transition: TransitionKind,
}

impl ActivityTransition {
    pub fn enter(activity: ActivityType) -> Self {
        Self {
            activity,
            transition: TransitionKind::Enter,
        }
    }

    pub fn exit(activity: ActivityType) -> Self {
        Self {
            activity,
            transition: TransitionKind::Exit,
        }
    }

    pub fn is_enter(&self) -> bool {
        self.transition == TransitionKind::Enter
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionState {
    #[default]
    Unknown,
    Still,
    Walking,
    Running,
    Driving,
    Cycling,
}

impl MotionState {
    /// Label sent with every telemetry record and shown on the status surface.
    pub fn label(self) -> &'static str {
        match self {
            MotionState::Driving => "Driving",
            MotionState::Cycling => "Cycling",
            MotionState::Running => "Running",
            MotionState::Walking => "Walking",
            MotionState::Still => "Stationary",
            MotionState::Unknown => "Active",
        }
    }

    pub fn is_still(self) -> bool {
        self == MotionState::Still
    }
}

impl From<ActivityType> for MotionState {
    fn from(activity: ActivityType) -> Self {
        match activity {
            ActivityType::InVehicle => MotionState::Driving,
            ActivityType::OnBicycle => MotionState::Cycling,
            ActivityType::Running => MotionState::Running,
            ActivityType::Walking => MotionState::Walking,
            ActivityType::Still => MotionState::Still,
            // Coarse or ambiguous classifications keep the default cadence
            ActivityType::OnFoot | ActivityType::Tilting | ActivityType::Unknown => {
                MotionState::Unknown
            }
        }
    }
}
