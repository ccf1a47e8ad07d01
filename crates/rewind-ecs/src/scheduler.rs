//! Deterministic deferred callbacks.
//!
//! Two kinds of action share one registry and are ticked once per step in
//! registry order:
//!
//! - **Timed**: counts a remaining duration down by the step's `dt`
//!   (optionally multiplied by the global time scale) and fires on the first
//!   step that leaves less than half a step remaining. Durations therefore
//!   round to the nearest whole step, so a truncated `dt` such as 1/60 does
//!   not push a one-second timer to step 61. Loops once, `n` times, forever,
//!   or until a predicate holds. Pausing freezes the remaining time.
//! - **Condition**: polls a predicate every step, fires the first step it
//!   holds, then removes itself.
//!
//! Callbacks and predicates are plain `fn` pointers registered by name in an
//! [`ActionTable`]. The [`Scheduler`] itself only stores names, so the whole
//! registry is serializable data and a rollback restore reconstructs it
//! exactly.
//!
//! Actions scheduled from inside a callback join the registry immediately
//! but are first ticked on the following step.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use rewind_math::prelude::*;

use crate::command::CommandQueue;
use crate::entity::EntityId;
use crate::input::InputState;
use crate::object::Entity;
use crate::store::Entities;

// ---------------------------------------------------------------------------
// Callback table
// ---------------------------------------------------------------------------

/// A scheduled callback.
pub type ActionFn = fn(&mut ActionContext<'_>);

/// A predicate polled by condition actions and `Until` loops.
pub type ConditionFn = fn(&ActionContext<'_>) -> bool;

/// Name-keyed registry of callbacks and predicates.
///
/// Both peers must register the same names with the same functions.
#[derive(Debug, Clone, Default)]
pub struct ActionTable {
    actions: BTreeMap<String, ActionFn>,
    conditions: BTreeMap<String, ConditionFn>,
}

impl ActionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Panics
    ///
    /// Panics if an action with the same name is already registered.
    pub fn register_action(&mut self, name: &str, f: ActionFn) {
        assert!(
            !self.actions.contains_key(name),
            "action '{name}' is already registered"
        );
        self.actions.insert(name.to_owned(), f);
    }

    /// # Panics
    ///
    /// Panics if a condition with the same name is already registered.
    pub fn register_condition(&mut self, name: &str, f: ConditionFn) {
        assert!(
            !self.conditions.contains_key(name),
            "condition '{name}' is already registered"
        );
        self.conditions.insert(name.to_owned(), f);
    }

    pub fn action(&self, name: &str) -> Option<ActionFn> {
        self.actions.get(name).copied()
    }

    pub fn condition(&self, name: &str) -> Option<ConditionFn> {
        self.conditions.get(name).copied()
    }

    /// The first name in `spec` this table cannot resolve, if any.
    pub fn missing_name<'s>(&self, spec: &'s ActionSpec) -> Option<&'s str> {
        if self.action(&spec.callback).is_none() {
            return Some(spec.callback.as_str());
        }
        match &spec.kind {
            ActionKind::Condition { predicate } if self.condition(predicate).is_none() => {
                Some(predicate.as_str())
            }
            ActionKind::Timed {
                loop_mode: LoopMode::Until(predicate),
                ..
            } if self.condition(predicate).is_none() => Some(predicate.as_str()),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Action data
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActionId(pub u64);

/// How often a timed action fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopMode {
    Once,
    Times(u32),
    Forever,
    /// Re-arm after every firing until the named predicate holds.
    Until(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    Timed {
        duration: Fixed,
        remaining: Fixed,
        /// Total time counted down since scheduling.
        elapsed: Fixed,
        loop_mode: LoopMode,
        /// Multiply `dt` by the scheduler's time scale.
        scaled: bool,
    },
    Condition {
        predicate: String,
    },
}

/// A registry entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledAction {
    pub id: ActionId,
    pub kind: ActionKind,
    pub callback: String,
    pub target: Option<EntityId>,
    pub arg: i64,
    pub paused: bool,
    pub loops_done: u32,
}

/// Builder for a new action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionSpec {
    kind: ActionKind,
    callback: String,
    target: Option<EntityId>,
    arg: i64,
}

impl ActionSpec {
    /// Fire `callback` once after `duration`.
    pub fn after(duration: Fixed, callback: &str) -> Self {
        Self {
            kind: ActionKind::Timed {
                duration,
                remaining: duration,
                elapsed: Fixed::ZERO,
                loop_mode: LoopMode::Once,
                scaled: true,
            },
            callback: callback.to_owned(),
            target: None,
            arg: 0,
        }
    }

    /// Fire `callback` the first step `predicate` holds.
    pub fn when(predicate: &str, callback: &str) -> Self {
        Self {
            kind: ActionKind::Condition {
                predicate: predicate.to_owned(),
            },
            callback: callback.to_owned(),
            target: None,
            arg: 0,
        }
    }

    /// Loop mode for a timed action. Ignored for condition actions.
    pub fn repeat(mut self, mode: LoopMode) -> Self {
        if let ActionKind::Timed { loop_mode, .. } = &mut self.kind {
            *loop_mode = mode;
        }
        self
    }

    /// Count down in unscaled time.
    pub fn unscaled(mut self) -> Self {
        if let ActionKind::Timed { scaled, .. } = &mut self.kind {
            *scaled = false;
        }
        self
    }

    pub fn target(mut self, entity: EntityId) -> Self {
        self.target = Some(entity);
        self
    }

    pub fn arg(mut self, arg: i64) -> Self {
        self.arg = arg;
        self
    }
}

// ---------------------------------------------------------------------------
// ActionContext
// ---------------------------------------------------------------------------

/// World access for callbacks and predicates.
pub struct ActionContext<'a> {
    pub entities: &'a mut Entities,
    pub scheduler: &'a mut Scheduler,
    pub commands: &'a mut CommandQueue,
    pub input: &'a InputState,
    pub frame: u32,
    /// The action being run.
    pub action: ActionId,
    pub target: Option<EntityId>,
    pub arg: i64,
}

impl ActionContext<'_> {
    /// The target entity, if one was set and it still exists.
    pub fn target_entity(&self) -> Option<&Entity> {
        self.target.and_then(|id| self.entities.get(id))
    }

    pub fn target_entity_mut(&mut self) -> Option<&mut Entity> {
        let id = self.target?;
        self.entities.get_mut(id)
    }
}

/// World state lent to [`Scheduler::tick`].
pub struct ActionEnv<'a> {
    pub entities: &'a mut Entities,
    pub commands: &'a mut CommandQueue,
    pub input: &'a InputState,
    pub frame: u32,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// The ordered action registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scheduler {
    actions: Vec<ScheduledAction>,
    next_id: u64,
    time_scale: Fixed,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// What to do with an action after it has been ticked.
enum Outcome {
    Keep,
    Rearm,
    Remove,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            actions: Vec::new(),
            next_id: 0,
            time_scale: Fixed::ONE,
        }
    }

    /// Append an action to the registry.
    pub fn schedule(&mut self, spec: ActionSpec) -> ActionId {
        let id = ActionId(self.next_id);
        self.next_id += 1;
        self.actions.push(ScheduledAction {
            id,
            kind: spec.kind,
            callback: spec.callback,
            target: spec.target,
            arg: spec.arg,
            paused: false,
            loops_done: 0,
        });
        id
    }

    /// Remove an action. Returns `false` if it was not scheduled, which
    /// makes repeated cancellation harmless.
    pub fn cancel(&mut self, id: ActionId) -> bool {
        match self.index_of(id) {
            Some(idx) => {
                self.actions.remove(idx);
                true
            }
            None => {
                trace!(action = id.0, "cancel of an action that is not scheduled");
                false
            }
        }
    }

    /// Remove every action targeting `entity`. Returns how many went.
    pub fn cancel_for(&mut self, entity: EntityId) -> usize {
        let before = self.actions.len();
        self.actions.retain(|a| a.target != Some(entity));
        before - self.actions.len()
    }

    /// Freeze an action, keeping its remaining time. Returns whether the
    /// paused state changed.
    pub fn pause(&mut self, id: ActionId) -> bool {
        self.set_paused(id, true)
    }

    pub fn resume(&mut self, id: ActionId) -> bool {
        self.set_paused(id, false)
    }

    fn set_paused(&mut self, id: ActionId, paused: bool) -> bool {
        match self.get_mut(id) {
            Some(action) if action.paused != paused => {
                action.paused = paused;
                true
            }
            _ => false,
        }
    }

    pub fn is_scheduled(&self, id: ActionId) -> bool {
        self.index_of(id).is_some()
    }

    pub fn is_paused(&self, id: ActionId) -> bool {
        self.get(id).is_some_and(|a| a.paused)
    }

    /// Time left on a timed action.
    pub fn remaining(&self, id: ActionId) -> Option<Fixed> {
        match self.get(id)?.kind {
            ActionKind::Timed { remaining, .. } => Some(remaining),
            ActionKind::Condition { .. } => None,
        }
    }

    pub fn get(&self, id: ActionId) -> Option<&ScheduledAction> {
        self.actions.iter().find(|a| a.id == id)
    }

    fn get_mut(&mut self, id: ActionId) -> Option<&mut ScheduledAction> {
        self.actions.iter_mut().find(|a| a.id == id)
    }

    fn index_of(&self, id: ActionId) -> Option<usize> {
        self.actions.iter().position(|a| a.id == id)
    }

    /// Registry entries in tick order.
    pub fn actions(&self) -> &[ScheduledAction] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn time_scale(&self) -> Fixed {
        self.time_scale
    }

    /// Multiplier applied to `dt` for scaled timed actions.
    pub fn set_time_scale(&mut self, scale: Fixed) {
        self.time_scale = scale.max(Fixed::ZERO);
    }

    pub fn clear(&mut self) {
        self.actions.clear();
    }

    /// Advance every action present at the start of the call by one step.
    /// Returns the number of callbacks fired.
    pub fn tick(&mut self, dt: Fixed, table: &ActionTable, env: &mut ActionEnv<'_>) -> usize {
        let ids: Vec<ActionId> = self.actions.iter().map(|a| a.id).collect();
        let mut fired = 0;

        for id in ids {
            let time_scale = self.time_scale;
            // An earlier callback this step may have cancelled it.
            let Some(action) = self.get_mut(id) else {
                continue;
            };
            if action.paused {
                continue;
            }
            let target = action.target;
            let arg = action.arg;
            let callback = action.callback.clone();

            let due = match &mut action.kind {
                ActionKind::Timed {
                    remaining,
                    elapsed,
                    scaled,
                    ..
                } => {
                    let step = if *scaled { dt * time_scale } else { dt };
                    *remaining -= step;
                    *elapsed += step;
                    *remaining <= Fixed::ZERO || *remaining + *remaining < step
                }
                ActionKind::Condition { predicate } => {
                    let predicate = predicate.clone();
                    match self.evaluate(table, &predicate, id, target, arg, env) {
                        Some(holds) => holds,
                        None => {
                            self.cancel(id);
                            continue;
                        }
                    }
                }
            };
            if !due {
                continue;
            }

            let Some(f) = table.action(&callback) else {
                warn!(action = id.0, callback = %callback, "unknown callback, dropping action");
                self.cancel(id);
                continue;
            };
            trace!(action = id.0, callback = %callback, frame = env.frame, "action fired");
            let mut ctx = ActionContext {
                entities: &mut *env.entities,
                scheduler: &mut *self,
                commands: &mut *env.commands,
                input: env.input,
                frame: env.frame,
                action: id,
                target,
                arg,
            };
            f(&mut ctx);
            fired += 1;

            match self.outcome_after_fire(id, table, target, arg, env) {
                Outcome::Keep => {}
                Outcome::Rearm => {
                    if let Some(ScheduledAction {
                        kind:
                            ActionKind::Timed {
                                duration, remaining, ..
                            },
                        ..
                    }) = self.get_mut(id)
                    {
                        *remaining += *duration;
                    }
                }
                Outcome::Remove => {
                    self.cancel(id);
                }
            }
        }
        fired
    }

    /// Run a predicate. `None` when it is not registered.
    fn evaluate(
        &mut self,
        table: &ActionTable,
        predicate: &str,
        id: ActionId,
        target: Option<EntityId>,
        arg: i64,
        env: &mut ActionEnv<'_>,
    ) -> Option<bool> {
        let Some(check) = table.condition(predicate) else {
            warn!(action = id.0, predicate = %predicate, "unknown predicate, dropping action");
            return None;
        };
        let ctx = ActionContext {
            entities: &mut *env.entities,
            scheduler: &mut *self,
            commands: &mut *env.commands,
            input: env.input,
            frame: env.frame,
            action: id,
            target,
            arg,
        };
        Some(check(&ctx))
    }

    fn outcome_after_fire(
        &mut self,
        id: ActionId,
        table: &ActionTable,
        target: Option<EntityId>,
        arg: i64,
        env: &mut ActionEnv<'_>,
    ) -> Outcome {
        // The callback may have cancelled its own action.
        let Some(action) = self.get_mut(id) else {
            return Outcome::Keep;
        };
        action.loops_done += 1;
        let loops_done = action.loops_done;
        let mode = match &action.kind {
            ActionKind::Condition { .. } => return Outcome::Remove,
            ActionKind::Timed { loop_mode, .. } => loop_mode.clone(),
        };
        match mode {
            LoopMode::Once => Outcome::Remove,
            LoopMode::Times(n) if loops_done >= n => Outcome::Remove,
            LoopMode::Times(_) | LoopMode::Forever => Outcome::Rearm,
            LoopMode::Until(predicate) => match self.evaluate(table, &predicate, id, target, arg, env) {
                Some(false) => Outcome::Rearm,
                Some(true) | None => Outcome::Remove,
            },
        }
    }
}
