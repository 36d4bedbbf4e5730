use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEventScheduled {
    pub event_id: String,
    pub title: String,
    pub starts_at: i64,
    pub ends_at: Option<i64>,
}

/// Only the fields that changed are present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEventUpdated {
    pub event_id: String,
    pub title: Option<String>,
    pub starts_at: Option<i64>,
    pub ends_at: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEventCancelled {
    pub event_id: String,
}
