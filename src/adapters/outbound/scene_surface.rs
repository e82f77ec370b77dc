use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::domains::facility::Position;
use crate::domains::view::{ConnectionStatus, EntityMarker, LinkGlyph, LocationGlyph, RenderSurface};

/// A transition handed to the surface; kept for inspection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionRecord {
    pub entity_id: String,
    pub from: Position,
    pub to: Position,
    pub duration_ms: u64,
}

/// In-memory retained-mode scene. A marker's `position` is where it is headed
/// (or resting); every transition is appended to `transitions`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SceneSurface {
    pub locations: Vec<LocationGlyph>,
    pub links: Vec<LinkGlyph>,
    pub entities: BTreeMap<String, EntityMarker>,
    pub transitions: Vec<TransitionRecord>,
    pub status: ConnectionStatus,
    pub caption: String,
    pub clock: String,
    pub summary_refreshes: u64,
    pub rebuilds: u64,
}

impl SceneSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn marker(&self, id: &str) -> Option<&EntityMarker> {
        self.entities.get(id)
    }

    pub fn position_of(&self, id: &str) -> Option<Position> {
        self.entities.get(id).map(|m| m.position)
    }

    pub fn transitions_for(&self, id: &str) -> Vec<&TransitionRecord> {
        self.transitions.iter().filter(|t| t.entity_id == id).collect()
    }

    pub fn idle_marker_count(&self) -> usize {
        self.entities.values().filter(|m| !m.animating).count()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl RenderSurface for SceneSurface {
    fn clear_layers(&mut self) {
        self.locations.clear();
        self.links.clear();
        self.rebuilds += 1;
    }

    fn draw_location(&mut self, glyph: LocationGlyph) {
        self.locations.push(glyph);
    }

    fn draw_link(&mut self, link: LinkGlyph) {
        self.links.push(link);
    }

    fn place_entity(&mut self, marker: EntityMarker) {
        self.entities.insert(marker.id.clone(), marker);
    }

    fn move_entity(&mut self, id: &str, to: Position, duration: Duration) {
        if let Some(marker) = self.entities.get_mut(id) {
            self.transitions.push(TransitionRecord {
                entity_id: id.to_string(),
                from: marker.position,
                to,
                duration_ms: duration.as_millis() as u64,
            });
            marker.position = to;
            marker.animating = true;
        }
    }

    fn remove_entity(&mut self, id: &str) {
        self.entities.remove(id);
    }

    fn has_entity(&self, id: &str) -> bool {
        self.entities.contains_key(id)
    }

    fn entity_ids(&self) -> Vec<String> {
        self.entities.keys().cloned().collect()
    }

    fn set_status(&mut self, status: ConnectionStatus) {
        self.status = status;
    }

    fn set_caption(&mut self, caption: &str) {
        self.caption = caption.to_string();
    }

    fn set_clock(&mut self, clock: &str) {
        self.clock = clock.to_string();
    }

    fn refresh_summary(&mut self) {
        self.summary_refreshes += 1;
    }
}
