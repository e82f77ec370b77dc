use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domains::facility::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GlyphKind {
    Department,
    Cluster,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationGlyph {
    pub id: String,
    pub label: String,
    pub kind: GlyphKind,
    pub position: Position,
    pub radius: f64,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkGlyph {
    pub source: String,
    pub target: String,
    pub from: Position,
    pub to: Position,
    pub width: f64,
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMarker {
    pub id: String,
    pub label: String,
    pub position: Position,
    pub radius: f64,
    pub color: String,
    pub location: String,
    pub animating: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Connected,
    Disconnected,
}

/// Output port for whatever draws the dashboard (SVG, canvas, terminal, test scene).
///
/// Location layers (nodes, clusters, links) and the entity layer are separate:
/// `clear_layers` never touches entity markers.
pub trait RenderSurface {
    fn clear_layers(&mut self);
    fn draw_location(&mut self, glyph: LocationGlyph);
    fn draw_link(&mut self, link: LinkGlyph);

    /// Create or replace a marker.
    fn place_entity(&mut self, marker: EntityMarker);
    /// Start a transition of an existing marker towards `to`.
    fn move_entity(&mut self, id: &str, to: Position, duration: Duration);
    fn remove_entity(&mut self, id: &str);
    fn has_entity(&self, id: &str) -> bool;
    fn entity_ids(&self) -> Vec<String>;

    fn set_status(&mut self, status: ConnectionStatus);
    fn set_caption(&mut self, caption: &str);
    fn set_clock(&mut self, clock: &str);
    /// Tabular/summary refresh; never touches markers.
    fn refresh_summary(&mut self);
}
