use std::{
    fmt::{Debug, Display},
    ops::Add,
};

use glam::{DVec3, IVec3};
use serde::{Deserialize, Serialize};

use crate::{Axis, BLOCK_EPSILON};

pub trait HasAabb {
    fn aabb(&self) -> Aabb;
}

impl HasAabb for Aabb {
    fn aabb(&self) -> Aabb {
        *self
    }
}

/// An axis-aligned box in world space.
///
/// The invariant `min <= max` holds per axis for every box built through [`Aabb::new`],
/// [`Aabb::create`] and the operations below. [`Aabb::NULL`] is the one exception and is only
/// meaningful as the identity of [`Aabb::union`].
#[derive(Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: DVec3,
    pub max: DVec3,
}

impl From<[f64; 6]> for Aabb {
    fn from(value: [f64; 6]) -> Self {
        let [min_x, min_y, min_z, max_x, max_y, max_z] = value;
        Self::new(
            DVec3::new(min_x, min_y, min_z),
            DVec3::new(max_x, max_y, max_z),
        )
    }
}

impl FromIterator<Self> for Aabb {
    fn from_iter<T: IntoIterator<Item = Self>>(iter: T) -> Self {
        iter.into_iter().fold(Self::NULL, |acc, aabb| acc.union(&aabb))
    }
}

impl Debug for Aabb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

impl Display for Aabb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // write [0.000, 0.000, 0.000] -> [1.000, 1.000, 1.000]
        write!(
            f,
            "[{:.3}, {:.3}, {:.3}] -> [{:.3}, {:.3}, {:.3}]",
            self.min.x, self.min.y, self.min.z, self.max.x, self.max.y, self.max.z
        )
    }
}

impl Add<DVec3> for Aabb {
    type Output = Self;

    fn add(self, rhs: DVec3) -> Self::Output {
        self.move_by(rhs)
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::NULL
    }
}

impl Aabb {
    pub const NULL: Self = Self {
        min: DVec3::splat(f64::INFINITY),
        max: DVec3::splat(f64::NEG_INFINITY),
    };
    /// The unit cube `[0, 1]³`, the collision volume of a full block in block-local space.
    pub const UNIT: Self = Self {
        min: DVec3::ZERO,
        max: DVec3::ONE,
    };

    /// Builds a box from two corners, sorting each axis so that `min <= max`.
    #[must_use]
    pub fn new(a: impl Into<DVec3>, b: impl Into<DVec3>) -> Self {
        let a = a.into();
        let b = b.into();
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// The box of an entity standing with its feet centred on `feet`.
    #[must_use]
    pub fn create(feet: DVec3, width: f64, height: f64) -> Self {
        let half_width = width / 2.0;

        let min = DVec3::new(feet.x - half_width, feet.y, feet.z - half_width);
        let max = DVec3::new(feet.x + half_width, feet.y + height, feet.z + half_width);

        Self { min, max }
    }

    /// The full cube occupying the block cell at `pos`.
    #[must_use]
    pub fn block(pos: IVec3) -> Self {
        Self::UNIT.move_by(pos.as_dvec3())
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }

    #[must_use]
    pub fn move_by(&self, offset: DVec3) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    /// Grows the box only on the faces that `movement` points at, so that the result covers the
    /// box at both ends of the movement. This is the broad-phase volume of a sweep.
    #[must_use]
    pub fn expand_towards(&self, movement: DVec3) -> Self {
        let mut min = self.min;
        let mut max = self.max;

        for axis in Axis::ALL {
            let d = axis.of(movement);
            if d < 0.0 {
                let grown = axis.of(min) + d;
                axis.set(&mut min, grown);
            } else if d > 0.0 {
                let grown = axis.of(max) + d;
                axis.set(&mut max, grown);
            }
        }

        Self { min, max }
    }

    /// Grows every face outwards by `amount` (shrinks for a negative amount).
    #[must_use]
    pub fn inflate(self, amount: f64) -> Self {
        self.inflate_by(DVec3::splat(amount))
    }

    /// Per-axis version of [`Aabb::inflate`].
    #[must_use]
    pub fn inflate_by(self, amount: DVec3) -> Self {
        let min = self.min - amount;
        let max = self.max + amount;
        // Over-shrinking collapses the axis onto its centre instead of inverting it.
        let centre = (min + max) / 2.0;
        Self {
            min: min.min(centre),
            max: max.max(centre),
        }
    }

    /// Insets every face by `amount`.
    #[must_use]
    pub fn shrink(self, amount: f64) -> Self {
        self.inflate(-amount)
    }

    /// Strict overlap: boxes that only share a face do not intersect.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
            && self.min.z < other.max.z
            && self.max.z > other.min.z
    }

    /// Inclusive overlap: touching faces count.
    #[must_use]
    pub fn collides(&self, other: &Self) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// `true` when `other` lies entirely inside `self`.
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        self.min.cmple(other.min).all() && self.max.cmpge(other.max).all()
    }

    #[must_use]
    pub fn overlap(a: &Self, b: &Self) -> Option<Self> {
        let min = a.min.max(b.min);
        let max = a.max.min(b.max);

        if min.cmplt(max).all() {
            Some(Self { min, max })
        } else {
            None
        }
    }

    /// Check if a point is inside the AABB
    #[must_use]
    pub fn contains_point(&self, point: DVec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// The smallest box covering both boxes.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn expand_to_fit(&mut self, other: &Self) {
        *self = self.union(other);
    }

    #[must_use]
    pub fn lens(&self) -> DVec3 {
        self.max - self.min
    }

    #[must_use]
    pub fn volume(&self) -> f64 {
        let lens = self.lens();
        lens.x * lens.y * lens.z
    }

    /// Length of the space diagonal.
    #[must_use]
    pub fn diagonal(&self) -> f64 {
        self.lens().length()
    }

    #[must_use]
    pub fn mid(&self) -> DVec3 {
        (self.min + self.max) / 2.0
    }

    #[must_use]
    pub fn min_on(&self, axis: Axis) -> f64 {
        axis.of(self.min)
    }

    #[must_use]
    pub fn max_on(&self, axis: Axis) -> f64 {
        axis.of(self.max)
    }

    /// Squared distance from `point` to the closest point of the box.
    #[must_use]
    pub fn dist2(&self, point: DVec3) -> f64 {
        let clamped = point.clamp(self.min, self.max);
        (point - clamped).length_squared()
    }

    /// The inclusive range of block cells whose unit cube overlaps this box, with the box first
    /// shrunk by [`BLOCK_EPSILON`] so that a face resting exactly on a block boundary does not
    /// pull in the neighbouring cell.
    #[must_use]
    pub fn block_range(&self) -> (IVec3, IVec3) {
        let inner = self.shrink(BLOCK_EPSILON);
        (
            inner.min.floor().as_ivec3(),
            inner.max.floor().as_ivec3(),
        )
    }

    /// Every block cell in [`Aabb::block_range`], x fastest.
    pub fn blocks(&self) -> impl Iterator<Item = IVec3> + use<> {
        let (min, max) = self.block_range();
        cells(min, max)
    }

    pub fn overlaps<'a, T>(
        &'a self,
        elements: impl Iterator<Item = &'a T>,
    ) -> impl Iterator<Item = &'a T>
    where
        T: HasAabb + 'a,
    {
        elements.filter(|element| self.intersects(&element.aabb()))
    }

    pub fn containing<T: HasAabb>(input: &[T]) -> Self {
        input.iter().map(HasAabb::aabb).collect()
    }
}

impl<T: HasAabb> From<&[T]> for Aabb {
    fn from(elements: &[T]) -> Self {
        Self::containing(elements)
    }
}

/// Iterates the inclusive cell range `min..=max`, x fastest, then z, then y.
pub fn cells(min: IVec3, max: IVec3) -> impl Iterator<Item = IVec3> {
    (min.y..=max.y).flat_map(move |y| {
        (min.z..=max.z).flat_map(move |z| (min.x..=max.x).map(move |x| IVec3::new(x, y, z)))
    })
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::{DVec3, IVec3};

    use crate::aabb::Aabb;

    #[test]
    fn test_expand_to_fit() {
        let mut aabb = Aabb::new((0.0, 0.0, 0.0), (1.0, 1.0, 1.0));
        let other = Aabb::new((-1.0, -1.0, -1.0), (2.0, 2.0, 2.0));

        aabb.expand_to_fit(&other);

        assert_eq!(aabb.min, DVec3::new(-1.0, -1.0, -1.0));
        assert_eq!(aabb.max, DVec3::new(2.0, 2.0, 2.0));
    }

    #[test]
    fn containing_returns_null_aabb_for_empty_input() {
        let aabbs: Vec<Aabb> = vec![];

        let containing_aabb = Aabb::containing(&aabbs);

        assert_eq!(containing_aabb, Aabb::NULL);
    }

    #[test]
    fn new_sorts_corners() {
        let aabb = Aabb::new((1.0, -2.0, 3.0), (-1.0, 2.0, 0.0));
        assert_eq!(aabb.min, DVec3::new(-1.0, -2.0, 0.0));
        assert_eq!(aabb.max, DVec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn expand_towards_only_grows_in_movement_direction() {
        let aabb = Aabb::new((0.0, 0.0, 0.0), (1.0, 1.0, 1.0));
        let swept = aabb.expand_towards(DVec3::new(2.0, -0.5, 0.0));

        assert_eq!(swept.min, DVec3::new(0.0, -0.5, 0.0));
        assert_eq!(swept.max, DVec3::new(3.0, 1.0, 1.0));
        assert!(swept.contains(&aabb));
        assert!(swept.contains(&aabb.move_by(DVec3::new(2.0, -0.5, 0.0))));
    }

    #[test]
    fn shrink_insets_every_face() {
        let aabb = Aabb::new((0.0, 0.0, 0.0), (1.0, 2.0, 1.0)).shrink(0.25);
        assert_relative_eq!(aabb.min.x, 0.25);
        assert_relative_eq!(aabb.max.y, 1.75);
        assert_relative_eq!(aabb.volume(), 0.5 * 1.5 * 0.5);
    }

    #[test]
    fn over_shrinking_collapses_instead_of_inverting() {
        let aabb = Aabb::new((0.0, 0.0, 0.0), (1.0, 1.0, 1.0)).shrink(2.0);
        assert_eq!(aabb.min, aabb.max);
        assert_eq!(aabb.mid(), DVec3::splat(0.5));
    }

    #[test]
    fn touching_boxes_collide_but_do_not_intersect() {
        let a = Aabb::new((0.0, 0.0, 0.0), (1.0, 1.0, 1.0));
        let b = Aabb::new((1.0, 0.0, 0.0), (2.0, 1.0, 1.0));

        assert!(a.collides(&b));
        assert!(!a.intersects(&b));
        assert!(Aabb::overlap(&a, &b).is_none());
    }

    #[test]
    fn block_range_ignores_grazing_faces() {
        let aabb = Aabb::new((0.0, 0.0, 0.0), (1.0, 1.0, 1.0));
        assert_eq!(aabb.block_range(), (IVec3::ZERO, IVec3::ZERO));

        let aabb = Aabb::create(DVec3::new(0.5, 0.0, 0.5), 0.6, 1.8);
        assert_eq!(aabb.block_range(), (IVec3::ZERO, IVec3::new(0, 1, 0)));
        assert_eq!(aabb.blocks().count(), 2);
    }

    #[test]
    fn dist2_is_zero_inside() {
        let aabb = Aabb::new((0.0, 0.0, 0.0), (1.0, 1.0, 1.0));
        assert_relative_eq!(aabb.dist2(DVec3::splat(0.5)), 0.0);
        assert_relative_eq!(aabb.dist2(DVec3::new(3.0, 0.5, 0.5)), 4.0);
    }
}
