use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

use super::compressor::{PlannedMove, DEFAULT_STEP_MS};
use super::entity::EntityTable;
use crate::common::{DomainError, DomainResult};
use crate::domains::facility::Position;
use crate::domains::view::{Scope, ScopedResolver};

/// One step the runtime must render and time: move `entity_id` towards `target`
/// over `duration`, then report completion with `ticket`.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOrder {
    pub entity_id: String,
    pub ticket: u64,
    /// Index into the path of the location this step arrives at.
    pub step: usize,
    pub from: String,
    pub to: String,
    pub target: Position,
    pub duration: Duration,
}

#[derive(Debug)]
pub enum StepOutcome {
    Next(StepOrder),
    Completed { entity_id: String, location: String },
    Aborted { entity_id: String, location: String, error: DomainError },
    /// Completion for an animation that no longer exists (aborted, reset or stale).
    Stale,
}

/// Deadline used when a step's duration does not fit the clock.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

#[derive(Debug, Clone)]
struct ActiveAnimation {
    ticket: u64,
    scope: Scope,
    planned: PlannedMove,
    step: usize,
    deadline: Instant,
}

/// Drives one strictly sequential step chain per entity. The busy flag lives on
/// the entity record; this type keeps the chain itself.
#[derive(Debug)]
pub struct AnimationScheduler {
    active: HashMap<String, ActiveAnimation>,
    next_ticket: u64,
    default_step: Duration,
    watchdog_slack: Duration,
}

impl Default for AnimationScheduler {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_STEP_MS), Duration::from_secs(5))
    }
}

impl AnimationScheduler {
    pub fn new(default_step: Duration, watchdog_slack: Duration) -> Self {
        Self {
            active: HashMap::new(),
            next_ticket: 1,
            default_step,
            watchdog_slack,
        }
    }

    pub fn is_animating(&self, entity_id: &str) -> bool {
        self.active.contains_key(entity_id)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Scope the entity's in-flight animation started in.
    pub fn scope_of(&self, entity_id: &str) -> Option<&Scope> {
        self.active.get(entity_id).map(|a| &a.scope)
    }

    /// Accept a movement and return its first step. Rejected without any state
    /// change when the entity is already animating.
    pub fn animate(
        &mut self,
        entities: &mut EntityTable,
        resolver: &dyn ScopedResolver,
        scope: &Scope,
        entity_id: &str,
        planned: PlannedMove,
        now: Instant,
    ) -> DomainResult<StepOrder> {
        if planned.path.len() < 2 {
            return Err(DomainError::malformed(format!(
                "path for {} has {} location(s)",
                entity_id,
                planned.path.len()
            )));
        }
        if self.active.contains_key(entity_id) {
            return Err(DomainError::EntityBusy { id: entity_id.to_string() });
        }
        match entities.get(entity_id) {
            None => {
                return Err(DomainError::InvalidCommand {
                    reason: format!("unknown entity {}", entity_id),
                })
            }
            Some(entity) if entity.is_animating() => {
                return Err(DomainError::EntityBusy { id: entity_id.to_string() })
            }
            Some(_) => {}
        }

        entities.begin_animation(entity_id, &planned.path[0]);
        let ticket = self.next_ticket;
        self.next_ticket += 1;

        let mut animation = ActiveAnimation {
            ticket,
            scope: scope.clone(),
            planned,
            step: 1,
            deadline: now,
        };

        match self.order_for(entity_id, &mut animation, resolver, now) {
            Ok(order) => {
                self.active.insert(entity_id.to_string(), animation);
                Ok(order)
            }
            Err(e) => {
                entities.release(entity_id);
                Err(e)
            }
        }
    }

    /// Advance the chain after the runtime reports that a step finished.
    pub fn on_step_complete(
        &mut self,
        entities: &mut EntityTable,
        resolver: &dyn ScopedResolver,
        entity_id: &str,
        ticket: u64,
        now: Instant,
    ) -> StepOutcome {
        let Some(mut animation) = self.active.remove(entity_id) else {
            return StepOutcome::Stale;
        };
        if animation.ticket != ticket {
            self.active.insert(entity_id.to_string(), animation);
            return StepOutcome::Stale;
        }

        let reached = animation.planned.path[animation.step].clone();
        entities.advance(entity_id, &reached);

        if animation.step + 1 >= animation.planned.path.len() {
            entities.release(entity_id);
            return StepOutcome::Completed {
                entity_id: entity_id.to_string(),
                location: reached,
            };
        }

        animation.step += 1;
        match self.order_for(entity_id, &mut animation, resolver, now) {
            Ok(order) => {
                self.active.insert(entity_id.to_string(), animation);
                StepOutcome::Next(order)
            }
            Err(error) => {
                entities.release(entity_id);
                StepOutcome::Aborted {
                    entity_id: entity_id.to_string(),
                    location: reached,
                    error,
                }
            }
        }
    }

    /// Abort every animation whose current step overran its deadline. Returns the
    /// released entities with the location they were left at.
    pub fn sweep_stalled(&mut self, entities: &mut EntityTable, now: Instant) -> Vec<(String, String)> {
        let stalled: Vec<String> = self
            .active
            .iter()
            .filter(|(_, a)| a.deadline <= now)
            .map(|(id, _)| id.clone())
            .collect();

        let mut released = Vec::with_capacity(stalled.len());
        for id in stalled {
            if self.active.remove(&id).is_some() {
                entities.release(&id);
                let location = entities
                    .get(&id)
                    .map(|e| e.current_location.clone())
                    .unwrap_or_default();
                released.push((id, location));
            }
        }
        released.sort();
        released
    }

    /// Drop every chain (full view reset). Pending completions become stale.
    pub fn cancel_all(&mut self, entities: &mut EntityTable) {
        for (id, _) in self.active.drain() {
            entities.release(&id);
        }
    }

    fn order_for(
        &self,
        entity_id: &str,
        animation: &mut ActiveAnimation,
        resolver: &dyn ScopedResolver,
        now: Instant,
    ) -> DomainResult<StepOrder> {
        let step = animation.step;
        let to = animation.planned.path[step].clone();
        let target = resolver
            .resolve(&animation.scope, &to)
            .ok_or_else(|| DomainError::UnresolvedLocation { id: to.clone() })?;

        let duration = animation
            .planned
            .durations
            .get(step - 1)
            .map(|&ms| Duration::from_millis(ms))
            .unwrap_or(self.default_step);
        animation.deadline = now
            .checked_add(duration.saturating_add(self.watchdog_slack))
            .unwrap_or_else(|| now + FAR_FUTURE);

        Ok(StepOrder {
            entity_id: entity_id.to_string(),
            ticket: animation.ticket,
            step,
            from: animation.planned.path[step - 1].clone(),
            to,
            target,
            duration,
        })
    }
}
