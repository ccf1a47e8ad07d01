//! Axis-aligned colliders on the 2D grid-row plane.
//!
//! The plane is `x` horizontal and `y` vertical; every collider additionally
//! sits on an integer grid *row*. Two colliders interact only when all of the
//! following hold:
//!
//! 1. **Horizontal**: box-vs-box intervals overlap strictly, or, when one side
//!    is a [`ColliderShape::Wall`], the box has crossed the wall's face.
//!    Wall-vs-wall never interacts.
//! 2. **Vertical**: the `y` intervals overlap strictly.
//! 3. **Row**: both rows are equal, or either collider opts into `any_row`.
//!
//! Ignore-pair exemptions are checked by the caller before any of this runs.
//!
//! Each collider keeps an ordered, growable [`OverlapSet`] of the partner
//! colliders it currently touches; the collision pass diffs it against the
//! pairs found this step to derive Enter/Stay/Exit.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use rewind_math::prelude::*;

use crate::entity::EntityId;

/// How far a wall's back side extends. Large enough to cover any arena,
/// small enough that differences of two bounds never saturate.
const WALL_REACH: Fixed = Fixed::from_int(1 << 24);

// ---------------------------------------------------------------------------
// Identifiers and shapes
// ---------------------------------------------------------------------------

/// Per-entity collider identifier. Stable for the collider's lifetime, so
/// removing one collider never renumbers the others.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ColliderId(pub u16);

impl fmt::Debug for ColliderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ColliderId({})", self.0)
    }
}

/// Which side of a wall is open space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Facing {
    /// Open to `+x`; anything reaching left of the face collides.
    Right,
    /// Open to `-x`; anything reaching right of the face collides.
    Left,
}

impl Facing {
    /// Unit direction the wall faces.
    pub fn direction(self) -> FVec2 {
        match self {
            Facing::Right => FVec2::RIGHT,
            Facing::Left => FVec2::LEFT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColliderShape {
    /// Axis-aligned box of `size`, centred on the entity position plus
    /// `offset`.
    Box { size: FVec2, offset: FVec2 },
    /// One-sided vertical wall with no width. The face sits at the entity
    /// position plus `offset`; it spans `height` centred on that point.
    Wall {
        facing: Facing,
        height: Fixed,
        offset: FVec2,
    },
}

/// Solid colliders produce hits and may be pushed apart; overlap colliders
/// are triggers that only report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColliderMode {
    Solid,
    Overlap,
}

/// Enter/Stay/Exit transition of a collider pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContactPhase {
    Enter,
    Stay,
    Exit,
}

// ---------------------------------------------------------------------------
// OverlapSet
// ---------------------------------------------------------------------------

/// A partner collider: owning entity plus its collider id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OverlapKey {
    pub entity: EntityId,
    pub collider: ColliderId,
}

/// The partners a collider currently overlaps, iterated in key order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlapSet {
    keys: BTreeSet<OverlapKey>,
}

impl OverlapSet {
    /// Record `key`. Returns `true` when it was not already present.
    pub fn insert(&mut self, key: OverlapKey) -> bool {
        self.keys.insert(key)
    }

    pub fn remove(&mut self, key: &OverlapKey) -> bool {
        self.keys.remove(key)
    }

    pub fn contains(&self, key: &OverlapKey) -> bool {
        self.keys.contains(key)
    }

    /// Remove every record that points at `entity`, returning them.
    pub fn remove_entity(&mut self, entity: EntityId) -> Vec<OverlapKey> {
        let gone: Vec<OverlapKey> = self.keys.iter().filter(|k| k.entity == entity).copied().collect();
        for key in &gone {
            self.keys.remove(key);
        }
        gone
    }

    pub fn iter(&self) -> impl Iterator<Item = &OverlapKey> {
        self.keys.iter()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Drain all records in key order.
    pub fn take(&mut self) -> Vec<OverlapKey> {
        std::mem::take(&mut self.keys).into_iter().collect()
    }
}

// ---------------------------------------------------------------------------
// Collider
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collider {
    pub(crate) id: ColliderId,
    pub shape: ColliderShape,
    pub mode: ColliderMode,
    /// Whether hits may move the owning entity.
    pub pushable: bool,
    /// Interact with colliders on every row.
    pub any_row: bool,
    pub enabled: bool,
    pub row: i32,
    pub(crate) overlaps: OverlapSet,
}

impl Collider {
    fn with_shape(shape: ColliderShape) -> Self {
        Self {
            id: ColliderId(0),
            shape,
            mode: ColliderMode::Solid,
            pushable: false,
            any_row: false,
            enabled: true,
            row: 0,
            overlaps: OverlapSet::default(),
        }
    }

    /// A solid box of `size` centred on the entity.
    pub fn solid_box(size: FVec2) -> Self {
        Self::with_shape(ColliderShape::Box {
            size,
            offset: FVec2::ZERO,
        })
    }

    /// A trigger box of `size` centred on the entity.
    pub fn trigger_box(size: FVec2) -> Self {
        Self {
            mode: ColliderMode::Overlap,
            ..Self::solid_box(size)
        }
    }

    /// A solid one-sided wall.
    pub fn wall(facing: Facing, height: Fixed) -> Self {
        Self::with_shape(ColliderShape::Wall {
            facing,
            height,
            offset: FVec2::ZERO,
        })
    }

    pub fn with_offset(mut self, new_offset: FVec2) -> Self {
        match &mut self.shape {
            ColliderShape::Box { offset, .. } | ColliderShape::Wall { offset, .. } => {
                *offset = new_offset
            }
        }
        self
    }

    pub fn on_row(mut self, row: i32) -> Self {
        self.row = row;
        self
    }

    pub fn any_row(mut self) -> Self {
        self.any_row = true;
        self
    }

    pub fn pushable(mut self) -> Self {
        self.pushable = true;
        self
    }

    pub fn id(&self) -> ColliderId {
        self.id
    }

    pub fn is_trigger(&self) -> bool {
        self.mode == ColliderMode::Overlap
    }

    pub fn is_wall(&self) -> bool {
        matches!(self.shape, ColliderShape::Wall { .. })
    }

    /// Partners currently overlapping this collider.
    pub fn overlaps(&self) -> &OverlapSet {
        &self.overlaps
    }

    pub fn overlaps_mut(&mut self) -> &mut OverlapSet {
        &mut self.overlaps
    }

    /// Whether two colliders share a row.
    pub fn shares_row(&self, other: &Collider) -> bool {
        self.row == other.row || self.any_row || other.any_row
    }

    /// World-space bounds for an owner at `origin`. A wall's back side
    /// extends [`WALL_REACH`] beyond its face.
    pub fn bounds(&self, origin: FVec2) -> Bounds {
        match self.shape {
            ColliderShape::Box { size, offset } => {
                let center = origin + offset;
                let half = size * Fixed::HALF;
                Bounds {
                    min: center - half,
                    max: center + half,
                }
            }
            ColliderShape::Wall {
                facing,
                height,
                offset,
            } => {
                let face = origin + offset;
                let half_h = height * Fixed::HALF;
                let (min_x, max_x) = match facing {
                    Facing::Right => (face.x - WALL_REACH, face.x),
                    Facing::Left => (face.x, face.x + WALL_REACH),
                };
                Bounds {
                    min: FVec2::new(min_x, face.y - half_h),
                    max: FVec2::new(max_x, face.y + half_h),
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// World-space axis-aligned bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub min: FVec2,
    pub max: FVec2,
}

impl Bounds {
    pub fn overlaps_x(&self, other: &Bounds) -> bool {
        self.min.x < other.max.x && other.min.x < self.max.x
    }

    pub fn overlaps_y(&self, other: &Bounds) -> bool {
        self.min.y < other.max.y && other.min.y < self.max.y
    }

    /// Midpoint of the overlap region.
    pub fn overlap_center(&self, other: &Bounds) -> FVec2 {
        let lo = FVec2::new(self.min.x.max(other.min.x), self.min.y.max(other.min.y));
        let hi = FVec2::new(self.max.x.min(other.max.x), self.max.y.min(other.max.y));
        (lo + hi) * Fixed::HALF
    }
}

/// A detected contact between two colliders, as seen by one of them.
///
/// Produced fresh every step; never stored across steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collision {
    pub entity: EntityId,
    pub collider: ColliderId,
    pub other: EntityId,
    pub other_collider: ColliderId,
    /// Unit axis pointing away from the other collider.
    pub normal: FVec2,
    pub contact: FVec2,
    /// Penetration along `normal`.
    pub depth: Fixed,
    /// Displacement this side should apply to resolve its share of the
    /// penetration. Zero when this side is not pushable.
    pub separation: FVec2,
}

impl Collision {
    /// The same contact from the other collider's point of view.
    pub fn mirrored(&self, other_pushable: bool, self_pushable: bool) -> Collision {
        Collision {
            entity: self.other,
            collider: self.other_collider,
            other: self.entity,
            other_collider: self.collider,
            normal: -self.normal,
            contact: self.contact,
            depth: self.depth,
            separation: separation(-self.normal, self.depth, other_pushable, self_pushable),
        }
    }
}

fn separation(normal: FVec2, depth: Fixed, mine: bool, theirs: bool) -> FVec2 {
    match (mine, theirs) {
        (true, true) => normal * (depth * Fixed::HALF),
        (true, false) => normal * depth,
        (false, _) => FVec2::ZERO,
    }
}

/// One side of a pair test: the collider and where its owner stands.
#[derive(Debug, Clone, Copy)]
pub struct Placed<'a> {
    pub entity: EntityId,
    pub origin: FVec2,
    pub collider: &'a Collider,
}

/// Test two placed colliders and, if they interact, return the contact as
/// seen by `a`.
///
/// The normal is the axis of minimum face-to-face distance. Candidates are
/// tried in the fixed order right-vs-left, left-vs-right, top-vs-bottom,
/// bottom-vs-top and the first minimum wins.
pub fn test_pair(a: Placed<'_>, b: Placed<'_>) -> Option<Collision> {
    if !a.collider.enabled || !b.collider.enabled {
        return None;
    }
    if a.collider.is_wall() && b.collider.is_wall() {
        return None;
    }
    if !a.collider.shares_row(b.collider) {
        return None;
    }
    let ab = a.collider.bounds(a.origin);
    let bb = b.collider.bounds(b.origin);
    if !ab.overlaps_x(&bb) || !ab.overlaps_y(&bb) {
        return None;
    }

    let candidates = [
        (ab.max.x - bb.min.x, FVec2::LEFT),
        (bb.max.x - ab.min.x, FVec2::RIGHT),
        (ab.max.y - bb.min.y, FVec2::DOWN),
        (bb.max.y - ab.min.y, FVec2::UP),
    ];
    let mut best = candidates[0];
    for c in &candidates[1..] {
        if c.0 < best.0 {
            best = *c;
        }
    }
    let (depth, normal) = best;

    Some(Collision {
        entity: a.entity,
        collider: a.collider.id,
        other: b.entity,
        other_collider: b.collider.id,
        normal,
        contact: ab.overlap_center(&bb),
        depth,
        separation: separation(normal, depth, a.collider.pushable, b.collider.pushable),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(index: u32, x: i64, y: i64, collider: &Collider) -> Placed<'_> {
        Placed {
            entity: EntityId::new(index, 0),
            origin: FVec2::from_ints(x, y),
            collider,
        }
    }

    fn unit_box() -> Collider {
        Collider::solid_box(FVec2::ONE)
    }

    #[test]
    fn touching_boxes_do_not_collide() {
        let c = unit_box();
        assert!(test_pair(place(0, 0, 0, &c), place(1, 1, 0, &c)).is_none());
    }

    #[test]
    fn overlapping_boxes_collide_with_min_face_normal() {
        let a = unit_box();
        let b = unit_box();
        let pa = Placed {
            entity: EntityId::new(0, 0),
            origin: FVec2::ZERO,
            collider: &a,
        };
        let pb = Placed {
            entity: EntityId::new(1, 0),
            origin: FVec2::new(Fixed::from_ratio(3, 4), Fixed::ZERO),
            collider: &b,
        };
        let hit = test_pair(pa, pb).unwrap();
        assert_eq!(hit.normal, FVec2::LEFT);
        assert_eq!(hit.depth, Fixed::from_ratio(1, 4));
        assert_eq!(hit.other, EntityId::new(1, 0));
        assert_eq!(hit.separation, FVec2::ZERO, "not pushable");
    }

    #[test]
    fn separation_is_shared_between_pushable_colliders() {
        let a = unit_box().pushable();
        let b = unit_box().pushable();
        let pb = Placed {
            entity: EntityId::new(1, 0),
            origin: FVec2::new(Fixed::HALF, Fixed::ZERO),
            collider: &b,
        };
        let hit = test_pair(place(0, 0, 0, &a), pb).unwrap();
        assert_eq!(hit.depth, Fixed::HALF);
        assert_eq!(hit.separation, FVec2::new(-Fixed::from_ratio(1, 4), Fixed::ZERO));

        let back = hit.mirrored(true, true);
        assert_eq!(back.normal, FVec2::RIGHT);
        assert_eq!(back.separation, FVec2::new(Fixed::from_ratio(1, 4), Fixed::ZERO));
    }

    #[test]
    fn single_pushable_side_takes_full_depth() {
        let a = unit_box().pushable();
        let b = unit_box();
        let pb = Placed {
            entity: EntityId::new(1, 0),
            origin: FVec2::new(Fixed::HALF, Fixed::ZERO),
            collider: &b,
        };
        let hit = test_pair(place(0, 0, 0, &a), pb).unwrap();
        assert_eq!(hit.separation, FVec2::new(-Fixed::HALF, Fixed::ZERO));
    }

    #[test]
    fn different_rows_do_not_collide_unless_any_row() {
        let a = unit_box();
        let b = unit_box().on_row(1);
        assert!(test_pair(place(0, 0, 0, &a), place(1, 0, 0, &b)).is_none());
        let b = b.any_row();
        assert!(test_pair(place(0, 0, 0, &a), place(1, 0, 0, &b)).is_some());
    }

    #[test]
    fn disabled_collider_never_collides() {
        let a = unit_box();
        let mut b = unit_box();
        b.enabled = false;
        assert!(test_pair(place(0, 0, 0, &a), place(1, 0, 0, &b)).is_none());
    }

    #[test]
    fn wall_is_one_sided() {
        let wall = Collider::wall(Facing::Right, Fixed::from_int(10));
        let b = unit_box();
        // Box fully on the open side.
        assert!(test_pair(place(0, 0, 0, &wall), place(1, 2, 0, &b)).is_none());
        // Box straddling the face is pushed out along the facing direction.
        let hit = test_pair(place(1, 0, 0, &b), place(0, 0, 0, &wall)).unwrap();
        assert_eq!(hit.normal, FVec2::RIGHT);
        assert_eq!(hit.depth, Fixed::HALF);
        // Box far behind the face still collides.
        assert!(test_pair(place(0, 0, 0, &wall), place(1, -50, 0, &b)).is_some());
    }

    #[test]
    fn walls_never_collide_with_walls() {
        let l = Collider::wall(Facing::Left, Fixed::from_int(10));
        let r = Collider::wall(Facing::Right, Fixed::from_int(10));
        assert!(test_pair(place(0, 0, 0, &l), place(1, 0, 0, &r)).is_none());
    }

    #[test]
    fn vertical_separation_prevents_contact() {
        let c = unit_box();
        assert!(test_pair(place(0, 0, 0, &c), place(1, 0, 3, &c)).is_none());
    }

    #[test]
    fn overlap_set_orders_and_removes_by_entity() {
        let mut set = OverlapSet::default();
        let k = |i: u32, c: u16| OverlapKey {
            entity: EntityId::new(i, 0),
            collider: ColliderId(c),
        };
        assert!(set.insert(k(2, 0)));
        assert!(set.insert(k(1, 1)));
        assert!(set.insert(k(1, 0)));
        assert!(!set.insert(k(1, 0)));
        let order: Vec<_> = set.iter().copied().collect();
        assert_eq!(order, vec![k(1, 0), k(1, 1), k(2, 0)]);

        let gone = set.remove_entity(EntityId::new(1, 0));
        assert_eq!(gone.len(), 2);
        assert_eq!(set.len(), 1);
    }
}
