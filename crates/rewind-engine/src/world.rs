//! The frame-stepped world driver.
//!
//! A [`World`] owns every entity, the action registry, the deterministic RNG
//! and the resolved input. Each call to [`World::update`] advances exactly one
//! fixed step, in this order:
//!
//! 1. Advance the frame counter and elapsed time; run the pre-step hooks.
//! 2. Flush the [`CommandQueue`] filled during the previous step.
//! 3. `begin` newly activated entities, then `tick` every active entity.
//! 4. Resolve both players' input masks.
//! 5. Tick the [`Scheduler`].
//! 6. Run the collision pass over the physics-active entities.
//! 7. `late_tick` every active entity.
//!
//! Because the phase order is fixed, entity and component iteration follows
//! insertion order, and every structural change is deferred to the next
//! step's flush, the step is fully deterministic: same state + same input
//! masks = same resulting state, byte for byte.
//!
//! # Example
//!
//! ```
//! use rewind_engine::prelude::*;
//!
//! fn shove(ctx: &mut ActionContext<'_>) {
//!     if let Some(e) = ctx.target_entity_mut() {
//!         e.core_mut().transform.translate(FVec3::UP);
//!     }
//! }
//!
//! let mut world = World::new(WorldConfig::default());
//! world.register_action("shove", shove);
//! let crate_id = world.spawn(Entity::new("crate"));
//! world.activate(crate_id);
//! world
//!     .schedule(ActionSpec::after(Fixed::from_ratio(3, 60), "shove").target(crate_id))
//!     .unwrap();
//!
//! for _ in 0..3 {
//!     world.update([0, 0], 0);
//! }
//! assert_eq!(world.entities().core(crate_id).unwrap().position(), FVec3::UP);
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use rewind_ecs::prelude::*;
use rewind_math::prelude::*;

use crate::collision::{CollisionEvent, IgnorePairs};

// ---------------------------------------------------------------------------
// WorldConfig
// ---------------------------------------------------------------------------

/// Configuration for a [`World`].
///
/// Loadable from JSON so hosts can ship it alongside content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Simulation time per step. Must be positive.
    pub fixed_dt: Fixed,
    /// Initial multiplier applied to scaled scheduler actions.
    pub time_scale: Fixed,
    /// Seed for the world's [`SimRng`].
    pub rng_seed: u64,
}

impl Default for WorldConfig {
    /// Defaults to 60 steps per second, unscaled time, seed 0.
    fn default() -> Self {
        Self {
            fixed_dt: Fixed::from_ratio(1, 60),
            time_scale: Fixed::ONE,
            rng_seed: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Hooks and presentation
// ---------------------------------------------------------------------------

/// A global hook run at the very start of every step with the new frame
/// number.
pub type PreStepHook = fn(u32, &mut Entities);

/// Read-only world pose for a renderer. Never feeds back into simulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PresentationPose {
    pub position: [f64; 3],
    /// Quaternion as `[x, y, z, w]`.
    pub rotation: [f64; 4],
}

impl From<Pose> for PresentationPose {
    fn from(pose: Pose) -> Self {
        let p = pose.position;
        let r = pose.rotation;
        Self {
            position: [p.x.to_f64(), p.y.to_f64(), p.z.to_f64()],
            rotation: [r.x.to_f64(), r.y.to_f64(), r.z.to_f64(), r.w.to_f64()],
        }
    }
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// The deterministic simulation driver.
///
/// Spawning and despawning are setup-time operations: they must not happen
/// inside the window a rollback transport may rewind over. Activation,
/// deactivation and collider changes made while stepping go through the
/// [`CommandQueue`] and are rollback state.
pub struct World {
    pub(crate) config: WorldConfig,
    pub(crate) entities: Entities,
    pub(crate) actions: ActionTable,
    pub(crate) scheduler: Scheduler,
    pub(crate) rng: SimRng,
    pub(crate) input: InputState,
    pub(crate) commands: CommandQueue,
    /// Active entities in activation order.
    pub(crate) active: Vec<EntityId>,
    /// The subset of `active` that owns at least one collider.
    pub(crate) physics: Vec<EntityId>,
    /// Activated since the last tick phase; `begin` has not run yet.
    pub(crate) pending_begin: Vec<EntityId>,
    pub(crate) ignore: IgnorePairs,
    pub(crate) frame: u32,
    pub(crate) elapsed: Fixed,
    hooks: Vec<(String, PreStepHook)>,
    pub(crate) events: Vec<CollisionEvent>,
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("frame", &self.frame)
            .field("elapsed", &self.elapsed)
            .field("entities", &self.entities.len())
            .field("active", &self.active)
            .field("scheduled", &self.scheduler.len())
            .finish_non_exhaustive()
    }
}

impl World {
    /// Create an empty world at frame 0.
    ///
    /// # Panics
    ///
    /// Panics if `config.fixed_dt` is not positive.
    pub fn new(config: WorldConfig) -> Self {
        assert!(
            config.fixed_dt > Fixed::ZERO,
            "fixed_dt must be positive, got {:?}",
            config.fixed_dt
        );
        let mut scheduler = Scheduler::new();
        scheduler.set_time_scale(config.time_scale);
        Self {
            config,
            entities: Entities::new(),
            actions: ActionTable::new(),
            scheduler,
            rng: SimRng::seeded(config.rng_seed),
            input: InputState::new(),
            commands: CommandQueue::new(),
            active: Vec::new(),
            physics: Vec::new(),
            pending_begin: Vec::new(),
            ignore: IgnorePairs::new(),
            frame: 0,
            elapsed: Fixed::ZERO,
            hooks: Vec::new(),
            events: Vec::new(),
        }
    }

    // -- registration -------------------------------------------------------

    /// Register a global hook run at the start of every step, in
    /// registration order.
    ///
    /// # Panics
    ///
    /// Panics if a hook with the same name is already registered.
    pub fn add_pre_step_hook(&mut self, name: &str, hook: PreStepHook) {
        assert!(
            !self.hooks.iter().any(|(n, _)| n == name),
            "duplicate pre-step hook name: {name:?}"
        );
        self.hooks.push((name.to_owned(), hook));
    }

    /// The names of all pre-step hooks, in execution order.
    pub fn hook_names(&self) -> Vec<&str> {
        self.hooks.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// # Panics
    ///
    /// Panics if an action with the same name is already registered.
    pub fn register_action(&mut self, name: &str, f: ActionFn) {
        self.actions.register_action(name, f);
    }

    /// # Panics
    ///
    /// Panics if a condition with the same name is already registered.
    pub fn register_condition(&mut self, name: &str, f: ConditionFn) {
        self.actions.register_condition(name, f);
    }

    /// Add an action to the registry after checking that every name it
    /// refers to is registered.
    pub fn schedule(&mut self, spec: ActionSpec) -> Result<ActionId, EcsError> {
        if let Some(name) = self.actions.missing_name(&spec) {
            return Err(EcsError::UnknownAction {
                name: name.to_owned(),
            });
        }
        Ok(self.scheduler.schedule(spec))
    }

    // -- entity lifecycle ---------------------------------------------------

    /// Move an entity into the world and run its components' `init`. The
    /// entity starts inactive.
    pub fn spawn(&mut self, entity: Entity) -> EntityId {
        let id = self.entities.spawn(entity);
        self.dispatch(id, Capabilities::NONE, |c, ctx| c.init(ctx));
        id
    }

    /// Deactivate and remove an entity, cancelling actions that target it
    /// and dropping its ignore pairs.
    pub fn despawn(&mut self, id: EntityId) -> Result<Entity, EcsError> {
        if !self.entities.contains(id) {
            return Err(EcsError::StaleEntity { entity: id });
        }
        self.deactivate(id);
        let cancelled = self.scheduler.cancel_for(id);
        self.ignore.remove_entity(id);
        let entity = self.entities.despawn(id)?;
        debug!(entity = %id, cancelled, "despawned from world");
        Ok(entity)
    }

    /// Activate immediately. `begin` runs on the next tick phase. Returns
    /// `false` if the entity is stale or already active.
    ///
    /// While stepping, prefer queueing [`Command::Activate`].
    pub fn activate(&mut self, id: EntityId) -> bool {
        let Some(core) = self.entities.core_mut(id) else {
            warn!(entity = %id, "activate of a stale entity ignored");
            return false;
        };
        if core.is_active() {
            return false;
        }
        core.set_active(true);
        let has_colliders = core.has_colliders();
        self.active.push(id);
        self.pending_begin.push(id);
        if has_colliders {
            self.register_physics(id);
        }
        debug!(frame = self.frame, entity = %id, "activated");
        true
    }

    /// Deactivate immediately: run `end`, drop the entity from the active
    /// lists and emit Exit to every partner still overlapping it. Returns
    /// `false` if the entity is stale or already inactive.
    ///
    /// `end` only pairs with a `begin` that ran: an entity deactivated
    /// before its first tick phase gets neither.
    pub fn deactivate(&mut self, id: EntityId) -> bool {
        if !self.entities.core(id).is_some_and(EntityCore::is_active) {
            return false;
        }
        let began = !self.pending_begin.contains(&id);
        if began {
            self.dispatch(id, Capabilities::NONE, |c, ctx| c.end(ctx));
        }
        if let Some(core) = self.entities.core_mut(id) {
            core.set_active(false);
        }
        self.active.retain(|e| *e != id);
        self.physics.retain(|e| *e != id);
        self.pending_begin.retain(|e| *e != id);
        self.release_overlaps(id);
        debug!(frame = self.frame, entity = %id, "deactivated");
        true
    }

    /// # Panics
    ///
    /// Panics if `id` is not a live, active entity or is already registered.
    fn register_physics(&mut self, id: EntityId) {
        assert!(
            self.entities.core(id).is_some_and(EntityCore::is_active),
            "cannot register {id:?} as physics-active: not an active entity in this world"
        );
        assert!(
            !self.physics.contains(&id),
            "{id:?} is already registered as physics-active"
        );
        self.physics.push(id);
    }

    /// Put an active entity that now owns colliders on the physics-active
    /// list, unless it is already there.
    fn join_physics(&mut self, id: EntityId) {
        let eligible = self
            .entities
            .core(id)
            .is_some_and(|core| core.is_active() && core.has_colliders());
        if eligible && !self.physics.contains(&id) {
            self.register_physics(id);
        }
    }

    /// Attach a collider immediately. An active entity joins collision
    /// testing from the next pass. Returns `None` for a stale entity.
    ///
    /// While stepping, prefer [`EntityContext::add_collider`].
    pub fn add_collider(&mut self, id: EntityId, collider: Collider) -> Option<ColliderId> {
        let cid = self.entities.attach_collider(id, collider)?;
        self.join_physics(id);
        Some(cid)
    }

    /// Exempt a pair from collision testing immediately. Any overlap
    /// records between the two are dropped without events.
    pub fn ignore_pair(&mut self, a: EntityId, b: EntityId) {
        if self.ignore.insert(a, b) {
            self.forget_pair(a, b);
        }
    }

    pub fn unignore_pair(&mut self, a: EntityId, b: EntityId) {
        self.ignore.remove(a, b);
    }

    pub fn is_ignored(&self, a: EntityId, b: EntityId) -> bool {
        self.ignore.contains(a, b)
    }

    // -- stepping -----------------------------------------------------------

    /// Advance one fixed step with both players' raw masks and the
    /// disconnect flags.
    pub fn update(&mut self, inputs: [u32; PLAYER_COUNT], disconnect_flags: u32) {
        self.step(&InputFrame {
            masks: inputs,
            disconnected: disconnect_flags,
        });
    }

    /// Poll `source` for the next frame's input, step, then report the
    /// resolved input back.
    pub fn step_from(&mut self, source: &mut dyn InputSource) {
        let frame = self.frame.wrapping_add(1);
        let input = source.poll(frame);
        self.step(&input);
        source.apply(frame, &self.input);
    }

    /// Advance one fixed step.
    pub fn step(&mut self, input: &InputFrame) {
        let dt = self.config.fixed_dt;

        // Phase 1: time and global hooks.
        self.frame = self.frame.wrapping_add(1);
        self.elapsed += dt;
        self.events.clear();
        for (_, hook) in &self.hooks {
            hook(self.frame, &mut self.entities);
        }

        // Phase 2: deferred structural changes from the previous step.
        self.flush_commands();

        // Phase 3: begin, then tick.
        for id in std::mem::take(&mut self.pending_begin) {
            self.dispatch(id, Capabilities::NONE, |c, ctx| c.begin(ctx));
        }
        for id in self.active.clone() {
            self.dispatch(id, Capabilities::TICK, |c, ctx| c.tick(ctx));
        }

        // Phase 4: authoritative input.
        self.input.resolve(input);

        // Phase 5: scheduler.
        let mut env = ActionEnv {
            entities: &mut self.entities,
            commands: &mut self.commands,
            input: &self.input,
            frame: self.frame,
        };
        let fired = self.scheduler.tick(dt, &self.actions, &mut env);

        // Phase 6: collisions.
        self.collision_pass();

        // Phase 7: late tick.
        for id in self.active.clone() {
            self.dispatch(id, Capabilities::LATE_TICK, |c, ctx| c.late_tick(ctx));
        }

        trace!(
            frame = self.frame,
            fired,
            contacts = self.events.len(),
            "step complete"
        );
    }

    /// Run `n` steps with neutral input.
    pub fn run_frames(&mut self, n: u32) {
        for _ in 0..n {
            self.update([0; PLAYER_COUNT], 0);
        }
    }

    fn flush_commands(&mut self) {
        for command in self.commands.drain() {
            match command {
                Command::Activate(id) => {
                    self.activate(id);
                }
                Command::Deactivate(id) => {
                    self.deactivate(id);
                }
                Command::AddCollider { entity, collider } => {
                    let cid = collider.id();
                    if self.entities.attach_reserved_collider(entity, collider) {
                        self.join_physics(entity);
                    } else {
                        trace!(entity = %entity, ?cid, "queued collider could not be attached");
                    }
                }
                Command::RemoveCollider { entity, collider } => {
                    self.remove_collider(entity, collider);
                }
                Command::SetColliderEnabled {
                    entity,
                    collider,
                    enabled,
                } => match self
                    .entities
                    .core_mut(entity)
                    .and_then(|core| core.collider_mut(collider))
                {
                    Some(c) => c.enabled = enabled,
                    None => trace!(entity = %entity, ?collider, "enable flag for a missing collider ignored"),
                },
                Command::IgnorePair(a, b) => self.ignore_pair(a, b),
                Command::UnignorePair(a, b) => self.unignore_pair(a, b),
            }
        }
    }

    /// Run `hook` on every component of `id` advertising `required`.
    pub(crate) fn dispatch<F>(&mut self, id: EntityId, required: Capabilities, hook: F)
    where
        F: FnMut(&mut dyn Component, &mut EntityContext<'_>),
    {
        let World {
            config,
            entities,
            scheduler,
            rng,
            input,
            commands,
            frame,
            ..
        } = self;
        let Some(entity) = entities.get_mut(id) else {
            return;
        };
        let mut env = StepEnv {
            input,
            frame: *frame,
            dt: config.fixed_dt,
            rng,
            scheduler,
            commands,
        };
        entity.dispatch(id, &mut env, required, hook);
    }

    // -- accessors ----------------------------------------------------------

    /// Steps executed so far.
    pub fn frame(&self) -> u32 {
        self.frame
    }

    /// Simulation time accumulated over all steps.
    pub fn elapsed(&self) -> Fixed {
        self.elapsed
    }

    pub fn fixed_dt(&self) -> Fixed {
        self.config.fixed_dt
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn entities(&self) -> &Entities {
        &self.entities
    }

    /// Direct arena access for setup and tests. Structural changes made
    /// here while a rollback window is open will desync peers.
    pub fn entities_mut(&mut self) -> &mut Entities {
        &mut self.entities
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    /// Active entities in tick order.
    pub fn active(&self) -> &[EntityId] {
        &self.active
    }

    /// Active entities that own colliders, in collision-pass order.
    pub fn physics_active(&self) -> &[EntityId] {
        &self.physics
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    pub fn rng_mut(&mut self) -> &mut SimRng {
        &mut self.rng
    }

    /// Queue a deferred command for the next step's flush.
    pub fn commands_mut(&mut self) -> &mut CommandQueue {
        &mut self.commands
    }

    /// Contacts reported during the last step.
    pub fn events(&self) -> &[CollisionEvent] {
        &self.events
    }

    /// Take the last step's contacts.
    pub fn drain_events(&mut self) -> Vec<CollisionEvent> {
        std::mem::take(&mut self.events)
    }

    /// World pose for rendering.
    pub fn presentation_pose(&self, id: EntityId) -> Option<PresentationPose> {
        self.entities.world_pose(id).map(PresentationPose::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Trace {
        calls: Vec<&'static str>,
    }

    impl Component for Trace {
        fn name(&self) -> &'static str {
            "trace"
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities::TICK | Capabilities::LATE_TICK
        }

        fn init(&mut self, _ctx: &mut EntityContext<'_>) {
            self.calls.push("init");
        }

        fn begin(&mut self, _ctx: &mut EntityContext<'_>) {
            self.calls.push("begin");
        }

        fn tick(&mut self, _ctx: &mut EntityContext<'_>) {
            self.calls.push("tick");
        }

        fn late_tick(&mut self, _ctx: &mut EntityContext<'_>) {
            self.calls.push("late_tick");
        }

        fn end(&mut self, _ctx: &mut EntityContext<'_>) {
            self.calls.push("end");
        }
    }

    fn calls(world: &World, id: EntityId) -> Vec<&'static str> {
        world.get(id).unwrap().get::<Trace>().unwrap().calls.clone()
    }

    #[test]
    fn lifecycle_order() {
        let mut world = World::new(WorldConfig::default());
        let id = world.spawn(Entity::new("t").with_component(Trace::default()));
        assert_eq!(calls(&world, id), ["init"]);
        assert!(world.active().is_empty());

        world.activate(id);
        world.update([0, 0], 0);
        assert_eq!(calls(&world, id), ["init", "begin", "tick", "late_tick"]);

        world.commands_mut().deactivate(id);
        world.update([0, 0], 0);
        assert_eq!(
            calls(&world, id),
            ["init", "begin", "tick", "late_tick", "end"]
        );
        assert!(!world.get(id).unwrap().is_active());
    }

    #[test]
    fn deactivating_before_begin_skips_end() {
        let mut world = World::new(WorldConfig::default());
        let id = world.spawn(Entity::new("t").with_component(Trace::default()));
        world.activate(id);
        assert!(world.deactivate(id));
        assert_eq!(calls(&world, id), ["init"]);

        world.commands_mut().activate(id);
        world.commands_mut().deactivate(id);
        world.update([0, 0], 0);
        assert_eq!(calls(&world, id), ["init"]);
        assert!(world.active().is_empty());

        world.activate(id);
        world.update([0, 0], 0);
        world.deactivate(id);
        assert_eq!(
            calls(&world, id),
            ["init", "begin", "tick", "late_tick", "end"]
        );
    }

    #[test]
    fn activation_is_idempotent() {
        let mut world = World::new(WorldConfig::default());
        let id = world.spawn(Entity::new("e").with_collider(Collider::solid_box(FVec2::ONE)));
        assert!(world.activate(id));
        assert!(!world.activate(id));
        assert_eq!(world.active(), &[id]);
        assert_eq!(world.physics_active(), &[id]);
        assert!(world.deactivate(id));
        assert!(!world.deactivate(id));
        assert!(world.physics_active().is_empty());
    }

    #[test]
    fn colliderless_entities_are_not_physics_active() {
        let mut world = World::new(WorldConfig::default());
        let id = world.spawn(Entity::new("ghost"));
        world.activate(id);
        assert_eq!(world.active(), &[id]);
        assert!(world.physics_active().is_empty());
    }

    #[test]
    fn time_advances_by_fixed_dt() {
        let mut world = World::new(WorldConfig {
            fixed_dt: Fixed::HALF,
            ..Default::default()
        });
        world.run_frames(4);
        assert_eq!(world.frame(), 4);
        assert_eq!(world.elapsed(), Fixed::TWO);
    }

    #[test]
    fn hooks_run_first_with_new_frame() {
        fn stamp(frame: u32, entities: &mut Entities) {
            if let Some(id) = entities.find("clock") {
                entities
                    .core_mut(id)
                    .unwrap()
                    .set_position(FVec3::from_ints(frame as i64, 0, 0));
            }
        }
        let mut world = World::new(WorldConfig::default());
        world.add_pre_step_hook("stamp", stamp);
        let clock = world.spawn(Entity::new("clock"));
        world.run_frames(3);
        assert_eq!(world.entities().core(clock).unwrap().position().x, Fixed::from_int(3));
        assert_eq!(world.hook_names(), ["stamp"]);
    }

    #[test]
    #[should_panic(expected = "duplicate pre-step hook name")]
    fn duplicate_hook_panics() {
        let mut world = World::new(WorldConfig::default());
        world.add_pre_step_hook("h", |_, _| {});
        world.add_pre_step_hook("h", |_, _| {});
    }

    #[test]
    #[should_panic(expected = "fixed_dt must be positive")]
    fn zero_dt_panics() {
        World::new(WorldConfig {
            fixed_dt: Fixed::ZERO,
            ..Default::default()
        });
    }

    #[test]
    fn schedule_rejects_unknown_names() {
        let mut world = World::new(WorldConfig::default());
        let err = world
            .schedule(ActionSpec::after(Fixed::ONE, "missing"))
            .unwrap_err();
        assert!(matches!(err, EcsError::UnknownAction { name } if name == "missing"));
        assert!(world.scheduler().is_empty());
    }

    #[test]
    fn disconnected_player_reads_neutral() {
        let mut world = World::new(WorldConfig::default());
        world.update([Buttons::LEFT.0, Buttons::RIGHT.0], 0b10);
        assert!(world.input().held(0, Buttons::LEFT));
        assert_eq!(world.input().buttons(1), Buttons::NONE);
        assert!(!world.input().is_connected(1));
    }

    #[test]
    fn step_from_polls_the_next_frame() {
        let mut world = World::new(WorldConfig::default());
        let mut source = ScriptedInput::new(vec![
            InputFrame::new(Buttons::UP.0, 0),
            InputFrame::new(0, Buttons::DOWN.0),
        ]);
        world.step_from(&mut source);
        assert!(world.input().held(0, Buttons::UP));
        world.step_from(&mut source);
        assert!(world.input().held(1, Buttons::DOWN));
        assert!(world.input().just_released(0, Buttons::UP));
    }

    #[test]
    fn despawn_cancels_targeted_actions() {
        let mut world = World::new(WorldConfig::default());
        world.register_action("noop", |_| {});
        let id = world.spawn(Entity::new("e"));
        world.activate(id);
        world
            .schedule(ActionSpec::after(Fixed::from_int(5), "noop").target(id))
            .unwrap();
        world.despawn(id).unwrap();
        assert!(world.scheduler().is_empty());
        assert!(world.active().is_empty());
        assert!(world.get(id).is_none());
    }

    #[test]
    fn presentation_pose_reads_world_values() {
        let mut world = World::new(WorldConfig::default());
        let id = world.spawn(Entity::new("e").at(FVec3::from_ints(2, 3, 0)));
        let pose = world.presentation_pose(id).unwrap();
        assert_eq!(pose.position, [2.0, 3.0, 0.0]);
        assert_eq!(pose.rotation, [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn config_loads_from_json_with_defaults() {
        let config: WorldConfig = serde_json::from_str(r#"{ "rng_seed": 7 }"#).unwrap();
        assert_eq!(config.rng_seed, 7);
        assert_eq!(config.fixed_dt, Fixed::from_ratio(1, 60));
    }
}
