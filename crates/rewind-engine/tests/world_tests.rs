//! Integration tests for the world driver: contact lifecycle, ignore pairs,
//! scheduler timing and deferred commands, all driven through `World::update`.

use rewind_engine::prelude::*;

// ---------------------------------------------------------------------------
// Test components
// ---------------------------------------------------------------------------

/// Records every hit transition with the frame it happened on.
#[derive(Debug, Default)]
struct HitLog {
    seen: Vec<(u32, ContactPhase, EntityId)>,
}

impl HitLog {
    fn push(&mut self, phase: ContactPhase, hit: &Collision, frame: u32) {
        self.seen.push((frame, phase, hit.other));
    }

    fn phases_with(&self, other: EntityId) -> Vec<(u32, ContactPhase)> {
        self.seen
            .iter()
            .filter(|(_, _, o)| *o == other)
            .map(|(f, p, _)| (*f, *p))
            .collect()
    }
}

impl Component for HitLog {
    fn name(&self) -> &'static str {
        "hit_log"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::HIT
    }

    fn on_hit_enter(&mut self, hit: &Collision, ctx: &mut EntityContext<'_>) {
        self.push(ContactPhase::Enter, hit, ctx.frame);
    }

    fn on_hit_stay(&mut self, hit: &Collision, ctx: &mut EntityContext<'_>) {
        self.push(ContactPhase::Stay, hit, ctx.frame);
    }

    fn on_hit_exit(&mut self, hit: &Collision, ctx: &mut EntityContext<'_>) {
        self.push(ContactPhase::Exit, hit, ctx.frame);
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn unit_box(world: &mut World, name: &str, x: i64) -> EntityId {
    let id = world.spawn(
        Entity::new(name)
            .at(FVec3::from_ints(x, 0, 0))
            .with_collider(Collider::solid_box(FVec2::ONE))
            .with_component(HitLog::default()),
    );
    world.activate(id);
    id
}

fn log(world: &World, id: EntityId) -> &HitLog {
    world.get(id).unwrap().get::<HitLog>().unwrap()
}

/// Parks "visitor" on column 0 for frames 6 through 10, at column 5
/// otherwise.
fn visit_frames_6_to_10(frame: u32, entities: &mut Entities) {
    let Some(id) = entities.find("visitor") else {
        return;
    };
    let x = if (6..11).contains(&frame) { 0 } else { 5 };
    if let Some(core) = entities.core_mut(id) {
        core.set_position(FVec3::from_ints(x, 0, 0));
    }
}

// ---------------------------------------------------------------------------
// Contact lifecycle
// ---------------------------------------------------------------------------

#[test]
fn visitor_enters_at_6_stays_through_10_exits_at_11() {
    let mut world = World::new(WorldConfig::default());
    world.add_pre_step_hook("visitor", visit_frames_6_to_10);
    let a = unit_box(&mut world, "anchor", 0);
    let b = unit_box(&mut world, "visitor", 5);

    world.run_frames(15);

    let expected: Vec<(u32, ContactPhase)> = std::iter::once((6, ContactPhase::Enter))
        .chain((7..=10).map(|f| (f, ContactPhase::Stay)))
        .chain(std::iter::once((11, ContactPhase::Exit)))
        .collect();
    assert_eq!(log(&world, a).phases_with(b), expected);
    assert_eq!(log(&world, b).phases_with(a), expected);
}

#[test]
fn event_log_holds_only_the_last_step() {
    let mut world = World::new(WorldConfig::default());
    world.add_pre_step_hook("visitor", visit_frames_6_to_10);
    let a = unit_box(&mut world, "anchor", 0);
    let b = unit_box(&mut world, "visitor", 5);

    world.run_frames(6);
    let events = world.drain_events();
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e.phase == ContactPhase::Enter && e.frame == 6));
    assert!(events.iter().all(|e| e.between(a, b)));
    assert!(world.events().is_empty());

    world.run_frames(1);
    assert!(world.events().iter().all(|e| e.phase == ContactPhase::Stay));
}

#[test]
fn contact_normal_points_away_from_partner() {
    let mut world = World::new(WorldConfig::default());
    let left = world.spawn(
        Entity::new("left")
            .at(FVec3::ZERO)
            .with_collider(Collider::solid_box(FVec2::from_ints(2, 2))),
    );
    let right = world.spawn(
        Entity::new("right")
            .at(FVec3::new(Fixed::from_ratio(3, 2), Fixed::ZERO, Fixed::ZERO))
            .with_collider(Collider::solid_box(FVec2::from_ints(2, 2))),
    );
    world.activate(left);
    world.activate(right);
    world.run_frames(1);

    let seen_by_left = world
        .events()
        .iter()
        .find(|e| e.contact.entity == left)
        .unwrap();
    assert_eq!(seen_by_left.contact.normal, FVec2::LEFT);
    assert_eq!(seen_by_left.contact.depth, Fixed::from_ratio(1, 2));
    let seen_by_right = world
        .events()
        .iter()
        .find(|e| e.contact.entity == right)
        .unwrap();
    assert_eq!(seen_by_right.contact.normal, FVec2::RIGHT);
}

// ---------------------------------------------------------------------------
// Ignore pairs
// ---------------------------------------------------------------------------

#[test]
fn ignored_pair_is_silent_while_others_collide() {
    let mut world = World::new(WorldConfig::default());
    let a = unit_box(&mut world, "a", 0);
    let b = unit_box(&mut world, "b", 0);
    let c = unit_box(&mut world, "c", 0);
    world.ignore_pair(a, b);

    world.run_frames(3);

    assert!(log(&world, a).phases_with(b).is_empty());
    assert!(log(&world, b).phases_with(a).is_empty());
    assert_eq!(log(&world, a).phases_with(c).len(), 3);
    assert_eq!(log(&world, b).phases_with(c).len(), 3);
}

#[test]
fn queued_ignore_drops_existing_overlap_silently() {
    let mut world = World::new(WorldConfig::default());
    let a = unit_box(&mut world, "a", 0);
    let b = unit_box(&mut world, "b", 0);
    world.run_frames(1);

    world.commands_mut().ignore_pair(b, a);
    world.run_frames(2);
    assert_eq!(log(&world, a).phases_with(b), [(1, ContactPhase::Enter)]);
    assert!(world.get(a).unwrap().core().colliders()[0].overlaps().is_empty());

    world.commands_mut().unignore_pair(a, b);
    world.run_frames(1);
    assert_eq!(log(&world, a).phases_with(b).last(), Some(&(4, ContactPhase::Enter)));
}

// ---------------------------------------------------------------------------
// Scheduler through the world
// ---------------------------------------------------------------------------

fn nudge(ctx: &mut ActionContext<'_>) {
    if let Some(e) = ctx.target_entity_mut() {
        e.core_mut().transform.translate(FVec3::RIGHT);
    }
}

fn frame_stamp(ctx: &mut ActionContext<'_>) {
    let frame = Fixed::from_int(ctx.frame as i64);
    if let Some(e) = ctx.target_entity_mut() {
        e.core_mut().set_position(FVec3::new(frame, Fixed::ZERO, Fixed::ZERO));
    }
}

fn unit_step_world() -> World {
    let mut world = World::new(WorldConfig {
        fixed_dt: Fixed::ONE,
        ..Default::default()
    });
    world.register_action("nudge", nudge);
    world.register_action("frame_stamp", frame_stamp);
    world
}

#[test]
fn three_unit_action_fires_on_third_step_only() {
    let mut world = unit_step_world();
    let e = world.spawn(Entity::new("e"));
    world
        .schedule(ActionSpec::after(Fixed::from_int(3), "frame_stamp").target(e))
        .unwrap();
    world.run_frames(2);
    assert_eq!(world.entities().core(e).unwrap().position(), FVec3::ZERO);
    world.run_frames(1);
    assert_eq!(world.entities().core(e).unwrap().position().x, Fixed::from_int(3));
    world.run_frames(5);
    assert_eq!(world.entities().core(e).unwrap().position().x, Fixed::from_int(3));
}

#[test]
fn paused_action_resumes_with_remaining_time() {
    let mut world = unit_step_world();
    let e = world.spawn(Entity::new("e"));
    let id = world
        .schedule(ActionSpec::after(Fixed::from_int(3), "frame_stamp").target(e))
        .unwrap();
    world.run_frames(1);
    world.scheduler_mut().pause(id);
    world.run_frames(4);
    assert_eq!(world.scheduler().remaining(id), Some(Fixed::TWO));
    world.scheduler_mut().resume(id);
    world.run_frames(2);
    assert_eq!(world.entities().core(e).unwrap().position().x, Fixed::from_int(7));
}

#[test]
fn world_time_scale_stretches_scaled_actions() {
    let mut world = World::new(WorldConfig {
        fixed_dt: Fixed::ONE,
        time_scale: Fixed::HALF,
        ..Default::default()
    });
    world.register_action("nudge", nudge);
    let e = world.spawn(Entity::new("e"));
    world
        .schedule(ActionSpec::after(Fixed::TWO, "nudge").target(e))
        .unwrap();
    world.run_frames(3);
    assert_eq!(world.entities().core(e).unwrap().position(), FVec3::ZERO);
    world.run_frames(1);
    assert_eq!(world.entities().core(e).unwrap().position(), FVec3::RIGHT);
}

// ---------------------------------------------------------------------------
// Deferred commands
// ---------------------------------------------------------------------------

/// Deactivates its entity the first time it is hit.
#[derive(Debug, Default)]
struct Fragile;

impl Component for Fragile {
    fn name(&self) -> &'static str {
        "fragile"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::HIT
    }

    fn on_hit_enter(&mut self, _hit: &Collision, ctx: &mut EntityContext<'_>) {
        ctx.deactivate_self();
    }
}

#[test]
fn deactivation_from_a_hook_applies_next_step() {
    let mut world = World::new(WorldConfig::default());
    let a = unit_box(&mut world, "a", 0);
    let glass = world.spawn(
        Entity::new("glass")
            .with_collider(Collider::solid_box(FVec2::ONE))
            .with_component(Fragile),
    );
    world.activate(glass);

    world.run_frames(1);
    assert!(world.get(glass).unwrap().is_active());
    assert_eq!(world.commands_mut().len(), 1);

    world.run_frames(1);
    assert!(!world.get(glass).unwrap().is_active());
    assert_eq!(
        log(&world, a).phases_with(glass),
        [(1, ContactPhase::Enter), (2, ContactPhase::Exit)]
    );
}

#[test]
fn activation_command_begins_same_step() {
    let mut world = World::new(WorldConfig::default());
    let a = unit_box(&mut world, "a", 0);
    let late = world.spawn(
        Entity::new("late")
            .with_collider(Collider::solid_box(FVec2::ONE))
            .with_component(HitLog::default()),
    );
    world.run_frames(2);
    world.commands_mut().activate(late);
    world.run_frames(1);
    assert_eq!(world.physics_active(), &[a, late]);
    assert_eq!(log(&world, a).phases_with(late), [(3, ContactPhase::Enter)]);
}

/// Grows a collider on frame 1 and sheds it on frame 4.
#[derive(Debug, Default)]
struct Sprout;

impl Component for Sprout {
    fn name(&self) -> &'static str {
        "sprout"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::TICK
    }

    fn tick(&mut self, ctx: &mut EntityContext<'_>) {
        match ctx.frame {
            1 => {
                ctx.add_collider(Collider::solid_box(FVec2::ONE));
            }
            4 => ctx.remove_collider(ColliderId(0)),
            _ => {}
        }
    }
}

fn sprouting_pair() -> (World, EntityId, EntityId) {
    let mut world = World::new(WorldConfig::default());
    let a = unit_box(&mut world, "a", 0);
    let sprout = world.spawn(
        Entity::new("sprout")
            .with_component(Sprout)
            .with_component(HitLog::default()),
    );
    world.activate(sprout);
    (world, a, sprout)
}

#[test]
fn collider_grown_while_active_joins_collision_testing() {
    let (mut world, a, sprout) = sprouting_pair();

    world.run_frames(1);
    assert_eq!(world.physics_active(), &[a]);
    assert!(!world.get(sprout).unwrap().core().has_colliders());

    world.run_frames(2);
    assert_eq!(world.physics_active(), &[a, sprout]);
    assert_eq!(
        log(&world, sprout).phases_with(a),
        [(2, ContactPhase::Enter), (3, ContactPhase::Stay)]
    );

    world.run_frames(2);
    assert_eq!(world.physics_active(), &[a]);
    assert_eq!(
        log(&world, a).phases_with(sprout),
        [
            (2, ContactPhase::Enter),
            (3, ContactPhase::Stay),
            (4, ContactPhase::Stay),
            (5, ContactPhase::Exit)
        ]
    );
    assert!(world.get(a).unwrap().core().colliders()[0].overlaps().is_empty());
}

#[test]
fn pending_collider_survives_a_rollback() {
    let (mut world, _, _) = sprouting_pair();
    world.run_frames(1);
    let saved = world.save_state().unwrap();
    world.run_frames(4);
    let straight = world.save_state().unwrap();

    world.load_state(&saved).unwrap();
    assert_eq!(world.commands_mut().len(), 1);
    world.run_frames(4);
    assert_eq!(world.save_state().unwrap(), straight);
}

#[test]
fn world_add_collider_registers_active_entities_only() {
    let mut world = World::new(WorldConfig::default());
    let a = unit_box(&mut world, "a", 0);
    let bare = world.spawn(Entity::new("bare"));
    world.activate(bare);
    let idle = world.spawn(Entity::new("idle"));

    assert!(world.add_collider(bare, Collider::solid_box(FVec2::ONE)).is_some());
    assert!(world.add_collider(idle, Collider::solid_box(FVec2::ONE)).is_some());
    assert_eq!(world.physics_active(), &[a, bare]);

    world.activate(idle);
    assert_eq!(world.physics_active(), &[a, bare, idle]);
}
