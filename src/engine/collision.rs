// Collision volumes, masks and the per-frame brute-force traversal.
//
// Every "from" collider is tested against every other collider whose
// into-mask shares a bit with its from-mask. O(n·m), no broad phase:
// scenes hold a handful of bullets and a wave of enemies.

use bevy_ecs::prelude::*;
use glam::Vec3;

use super::components::{Collider, ColliderKind};

// ============================================================================
// MASKS
// ============================================================================

/// Bit mask used to filter which colliders may test against which.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CollideMask(pub u32);

impl CollideMask {
    pub const NONE: Self = Self(0);

    /// Player body. Nothing is hittable on this bit by default.
    pub const PLAYER: Self = Self::bit(0);

    /// Shootable targets: bullets look for it, enemy hitboxes carry it.
    pub const TARGET: Self = Self::bit(1);

    pub const fn bit(n: u32) -> Self {
        Self(1 << n)
    }

    #[inline]
    pub fn intersects(self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for CollideMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

// ============================================================================
// SOLIDS
// ============================================================================

/// A collision volume in its owner's local frame.
/// Owners only translate, so boxes stay axis-aligned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CollisionSolid {
    Sphere { center: Vec3, radius: f32 },
    Cuboid { center: Vec3, half_extents: Vec3 },
}

impl CollisionSolid {
    pub fn sphere(center: Vec3, radius: f32) -> Self {
        Self::Sphere { center, radius }
    }

    pub fn cuboid(center: Vec3, half_extents: Vec3) -> Self {
        Self::Cuboid { center, half_extents }
    }

    /// Move the solid into world space.
    pub fn at(self, owner: Vec3) -> Self {
        match self {
            Self::Sphere { center, radius } => Self::Sphere { center: center + owner, radius },
            Self::Cuboid { center, half_extents } => {
                Self::Cuboid { center: center + owner, half_extents }
            }
        }
    }

    /// Radius of the smallest sphere around the solid's centre.
    pub fn bounding_radius(&self) -> f32 {
        match self {
            Self::Sphere { radius, .. } => *radius,
            Self::Cuboid { half_extents, .. } => half_extents.length(),
        }
    }
}

/// Overlap test between two world-space solids. Touching counts as overlap.
pub fn overlaps(a: &CollisionSolid, b: &CollisionSolid) -> bool {
    use CollisionSolid::*;
    match (*a, *b) {
        (Sphere { center: ca, radius: ra }, Sphere { center: cb, radius: rb }) => {
            ca.distance_squared(cb) <= (ra + rb) * (ra + rb)
        }
        (Sphere { center, radius }, Cuboid { center: bc, half_extents })
        | (Cuboid { center: bc, half_extents }, Sphere { center, radius }) => {
            let closest = center.clamp(bc - half_extents, bc + half_extents);
            closest.distance_squared(center) <= radius * radius
        }
        (Cuboid { center: ca, half_extents: ha }, Cuboid { center: cb, half_extents: hb }) => {
            let d = (ca - cb).abs();
            d.cmple(ha + hb).all()
        }
    }
}

// ============================================================================
// TRAVERSAL
// ============================================================================

/// One detected overlap, from the active collider's point of view.
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionEntry {
    pub from: Entity,
    pub into: Entity,
    pub from_kind: ColliderKind,
    pub into_kind: ColliderKind,
    pub from_name: String,
    pub into_name: String,
}

/// Entries found by the most recent traversal.
#[derive(Resource, Debug, Default)]
pub struct CollisionQueue {
    pub entries: Vec<CollisionEntry>,
}

impl CollisionQueue {
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Test every from-collider against every eligible into-collider and push
/// the overlaps onto `queue`. The queue is cleared first.
pub fn traverse<'a>(
    colliders: &[(Entity, Vec3, &'a Collider)],
    queue: &mut CollisionQueue,
) {
    queue.clear();

    for &(from, from_pos, from_col) in colliders {
        if from_col.from_mask.is_empty() {
            continue;
        }
        let from_solid = from_col.solid.at(from_pos);

        for &(into, into_pos, into_col) in colliders {
            if into == from || !from_col.from_mask.intersects(into_col.into_mask) {
                continue;
            }
            if overlaps(&from_solid, &into_col.solid.at(into_pos)) {
                queue.entries.push(CollisionEntry {
                    from,
                    into,
                    from_kind: from_col.kind,
                    into_kind: into_col.kind,
                    from_name: from_col.name.clone(),
                    into_name: into_col.name.clone(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spheres_touching_overlap() {
        let a = CollisionSolid::sphere(Vec3::ZERO, 1.0);
        let b = CollisionSolid::sphere(Vec3::new(2.0, 0.0, 0.0), 1.0);
        assert!(overlaps(&a, &b));
        let c = CollisionSolid::sphere(Vec3::new(2.01, 0.0, 0.0), 1.0);
        assert!(!overlaps(&a, &c));
    }

    #[test]
    fn sphere_against_box_corner() {
        let b = CollisionSolid::cuboid(Vec3::ZERO, Vec3::ONE);
        // Corner distance is sqrt(0.75) ~= 0.866.
        let near_corner = CollisionSolid::sphere(Vec3::splat(1.5), 0.9);
        assert!(overlaps(&near_corner, &b));
        assert!(overlaps(&b, &near_corner));
        let off_corner = CollisionSolid::sphere(Vec3::splat(1.5), 0.8);
        assert!(!overlaps(&off_corner, &b));
    }

    #[test]
    fn sphere_inside_box_overlaps() {
        let b = CollisionSolid::cuboid(Vec3::new(0.0, 10.0, 0.0), Vec3::ONE);
        let s = CollisionSolid::sphere(Vec3::new(0.2, 10.1, 0.0), 0.1);
        assert!(overlaps(&s, &b));
    }

    #[test]
    fn boxes_separated_on_one_axis() {
        let a = CollisionSolid::cuboid(Vec3::ZERO, Vec3::ONE);
        let b = CollisionSolid::cuboid(Vec3::new(1.5, 1.5, 2.5), Vec3::ONE);
        assert!(!overlaps(&a, &b));
        let c = CollisionSolid::cuboid(Vec3::new(1.5, 1.5, 1.5), Vec3::ONE);
        assert!(overlaps(&a, &c));
    }

    #[test]
    fn solid_offset_follows_owner() {
        let s = CollisionSolid::sphere(Vec3::new(0.0, 0.0, 1.0), 0.5).at(Vec3::new(3.0, 0.0, 0.0));
        assert_eq!(s, CollisionSolid::sphere(Vec3::new(3.0, 0.0, 1.0), 0.5));
    }

    #[test]
    fn masks_filter_pairs() {
        let bullet = Collider::bullet(0.1);
        let hitbox = Collider::hitbox(0, Vec3::ONE);
        let player = Collider::player(1.0);
        let colliders = [
            (Entity::from_raw(0), Vec3::ZERO, &player),
            (Entity::from_raw(1), Vec3::ZERO, &bullet),
            (Entity::from_raw(2), Vec3::ZERO, &hitbox),
        ];

        let mut queue = CollisionQueue::default();
        traverse(&colliders, &mut queue);

        // Everything overlaps, but only bullet -> hitbox passes the masks.
        assert_eq!(queue.len(), 1);
        let entry = &queue.entries[0];
        assert_eq!(entry.from, Entity::from_raw(1));
        assert_eq!(entry.into, Entity::from_raw(2));
        assert_eq!(entry.from_name, "bullet");
        assert_eq!(entry.into_name, "hitbox-0");
    }

    #[test]
    fn traversal_clears_previous_entries() {
        let bullet = Collider::bullet(0.1);
        let hitbox = Collider::hitbox(0, Vec3::ONE);
        let mut queue = CollisionQueue::default();

        traverse(
            &[
                (Entity::from_raw(1), Vec3::ZERO, &bullet),
                (Entity::from_raw(2), Vec3::ZERO, &hitbox),
            ],
            &mut queue,
        );
        assert_eq!(queue.len(), 1);

        traverse(
            &[
                (Entity::from_raw(1), Vec3::new(0.0, 5.0, 0.0), &bullet),
                (Entity::from_raw(2), Vec3::ZERO, &hitbox),
            ],
            &mut queue,
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn one_bullet_can_report_two_hitboxes() {
        let bullet = Collider::bullet(0.1);
        let a = Collider::hitbox(0, Vec3::ONE);
        let b = Collider::hitbox(1, Vec3::ONE);
        let mut queue = CollisionQueue::default();
        traverse(
            &[
                (Entity::from_raw(1), Vec3::ZERO, &bullet),
                (Entity::from_raw(2), Vec3::new(0.9, 0.0, 0.0), &a),
                (Entity::from_raw(3), Vec3::new(-0.9, 0.0, 0.0), &b),
            ],
            &mut queue,
        );
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn mask_bits() {
        assert!((CollideMask::PLAYER | CollideMask::TARGET).intersects(CollideMask::TARGET));
        assert!(!CollideMask::PLAYER.intersects(CollideMask::TARGET));
        assert_eq!((CollideMask::PLAYER | CollideMask::TARGET).0, 0b11);
        assert!(CollideMask::NONE.is_empty());
    }
}
