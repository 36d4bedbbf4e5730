use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalCreated {
    pub goal_id: String,
    pub title: String,
    pub target_value: f64,
    /// Unix milliseconds.
    pub deadline: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalProgressUpdated {
    pub goal_id: String,
    pub current_value: f64,
    pub target_value: f64,
}

impl GoalProgressUpdated {
    /// Progress in percent, clamped to `0..=100`. A zero target counts as done.
    pub fn percent(&self) -> f64 {
        if self.target_value == 0.0 {
            return 100.0;
        }
        (self.current_value / self.target_value * 100.0).clamp(0.0, 100.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalCompleted {
    pub goal_id: String,
    pub completed_at: i64,
}
