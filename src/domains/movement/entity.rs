use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityStatus {
    Active,
    Idle,
}

impl EntityStatus {
    pub fn color(&self) -> &'static str {
        match self {
            EntityStatus::Active => "#FF5252",
            EntityStatus::Idle => "#A9A9A9",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimationState {
    Idle,
    Animating,
}

/// Ground-truth entity record as delivered by a reconciliation pull.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    #[serde(alias = "name")]
    pub id: String,
    pub status: EntityStatus,
    pub current_location: String,
}

/// Authoritative per-entity record, independent of the displayed scope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityRenderState {
    pub id: String,
    pub status: EntityStatus,
    /// Node id or cluster id, depending on the scope of the last movement.
    pub current_location: String,
    pub animation: AnimationState,
}

impl EntityRenderState {
    pub fn is_animating(&self) -> bool {
        self.animation == AnimationState::Animating
    }

    /// Short display label: simulator-generated names collapse to `T<n>`.
    pub fn label(&self) -> String {
        match self.id.strip_prefix("Sim_Transporter_") {
            Some(rest) => format!("T{}", rest),
            None => self.id.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
    Unchanged,
    /// The entity is mid-flight; nothing was written.
    SkippedAnimating,
}

impl UpsertOutcome {
    pub fn changed(&self) -> bool {
        matches!(self, UpsertOutcome::Created | UpsertOutcome::Updated)
    }
}

/// One render state per entity id. Records are created lazily and only discarded
/// wholesale by `clear`.
#[derive(Debug, Clone, Default)]
pub struct EntityTable {
    entries: BTreeMap<String, EntityRenderState>,
}

impl EntityTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&EntityRenderState> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityRenderState> {
        self.entries.values()
    }

    pub fn idle(&self) -> impl Iterator<Item = &EntityRenderState> {
        self.entries.values().filter(|e| !e.is_animating())
    }

    pub fn animating_count(&self) -> usize {
        self.entries.values().filter(|e| e.is_animating()).count()
    }

    /// Write location and status, unless the entity is animating: a position is
    /// never overwritten mid-flight.
    pub fn upsert(&mut self, id: &str, location: &str, status: EntityStatus) -> UpsertOutcome {
        match self.entries.get_mut(id) {
            Some(entry) if entry.is_animating() => UpsertOutcome::SkippedAnimating,
            Some(entry) => {
                if entry.current_location == location && entry.status == status {
                    return UpsertOutcome::Unchanged;
                }
                entry.current_location = location.to_string();
                entry.status = status;
                UpsertOutcome::Updated
            }
            None => {
                self.entries.insert(
                    id.to_string(),
                    EntityRenderState {
                        id: id.to_string(),
                        status,
                        current_location: location.to_string(),
                        animation: AnimationState::Idle,
                    },
                );
                UpsertOutcome::Created
            }
        }
    }

    /// Status only affects colour, so it may change mid-flight.
    pub fn set_status(&mut self, id: &str, status: EntityStatus) -> bool {
        match self.entries.get_mut(id) {
            Some(entry) if entry.status != status => {
                entry.status = status;
                true
            }
            _ => false,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Claim the busy flag. Returns false if the entity is unknown or already busy.
    pub(crate) fn begin_animation(&mut self, id: &str, start: &str) -> bool {
        match self.entries.get_mut(id) {
            Some(entry) if !entry.is_animating() => {
                entry.animation = AnimationState::Animating;
                entry.current_location = start.to_string();
                true
            }
            _ => false,
        }
    }

    pub(crate) fn advance(&mut self, id: &str, location: &str) {
        if let Some(entry) = self.entries.get_mut(id) {
            entry.current_location = location.to_string();
        }
    }

    pub(crate) fn release(&mut self, id: &str) {
        if let Some(entry) = self.entries.get_mut(id) {
            entry.animation = AnimationState::Idle;
        }
    }
}
