use super::entity::EntityStatus;
use crate::common::DomainEvent;
use serde::{Deserialize, Serialize};

/// Notifications arriving over the push channel, one JSON object per message:
/// `{"event": "<name>", "data": {...}}`. Legacy simulator names are accepted as
/// aliases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum FeedEvent {
    #[serde(alias = "new_transporter")]
    EntityCreated {
        #[serde(alias = "name")]
        id: String,
        current_location: String,
        status: EntityStatus,
    },
    #[serde(alias = "transporter_update")]
    EntityMoved {
        #[serde(alias = "name")]
        id: String,
        path: Vec<String>,
        #[serde(default)]
        durations: Vec<u64>,
    },
    EntityStatusChanged {
        #[serde(alias = "name")]
        id: String,
        status: EntityStatus,
    },
    /// A transport request changed state; only the summary is refreshed.
    #[serde(alias = "transport_status_update", alias = "transport_completed")]
    RequestLifecycleChanged {
        #[serde(default)]
        request_id: Option<String>,
        #[serde(default)]
        status: Option<String>,
    },
    #[serde(alias = "transport_log")]
    ActivityLog { message: String },
    ClockTick {
        #[serde(alias = "simTime")]
        sim_time: f64,
    },
    #[serde(rename = "connect")]
    Connected,
    #[serde(rename = "disconnect")]
    Disconnected,
}

impl DomainEvent for FeedEvent {
    fn event_type(&self) -> &'static str {
        match self {
            FeedEvent::EntityCreated { .. } => "EntityCreated",
            FeedEvent::EntityMoved { .. } => "EntityMoved",
            FeedEvent::EntityStatusChanged { .. } => "EntityStatusChanged",
            FeedEvent::RequestLifecycleChanged { .. } => "RequestLifecycleChanged",
            FeedEvent::ActivityLog { .. } => "ActivityLog",
            FeedEvent::ClockTick { .. } => "ClockTick",
            FeedEvent::Connected => "Connected",
            FeedEvent::Disconnected => "Disconnected",
        }
    }

    fn entity_id(&self) -> Option<&str> {
        match self {
            FeedEvent::EntityCreated { id, .. } => Some(id),
            FeedEvent::EntityMoved { id, .. } => Some(id),
            FeedEvent::EntityStatusChanged { id, .. } => Some(id),
            _ => None,
        }
    }
}

/// Simulation clock as `HH:MM:SS`.
pub fn format_clock(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 { seconds as u64 } else { 0 };
    format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}
