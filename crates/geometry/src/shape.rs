//! Per-block collision volumes and the single-axis clipping that the swept collision is built on.

use std::sync::Arc;

use glam::{DVec3, IVec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Aabb, Axis, COLLISION_EPSILON};

#[derive(Debug, Error, PartialEq)]
pub enum ShapeError {
    #[error("box {0} has a non-finite corner")]
    NonFinite(Aabb),
    #[error("box {0} is inverted")]
    Inverted(Aabb),
    #[error("boxes {0} and {1} overlap")]
    Overlapping(Aabb, Aabb),
}

/// The collidable volume of one block: a set of disjoint boxes in block-local coordinates.
///
/// An empty shape is passable, [`VoxelShape::block`] is a solid cube. Boxes may reach outside
/// the unit cell (fences and walls are 1.5 tall).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VoxelShape {
    boxes: Arc<[Aabb]>,
}

impl VoxelShape {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn block() -> Self {
        Self {
            boxes: Arc::new([Aabb::UNIT]),
        }
    }

    /// A full-width box from the floor of the cell up to `height`.
    #[must_use]
    pub fn slab(height: f64) -> Self {
        Self {
            boxes: Arc::new([Aabb::new(DVec3::ZERO, DVec3::new(1.0, height, 1.0))]),
        }
    }

    /// Validates and wraps a set of boxes.
    pub fn from_boxes(boxes: impl IntoIterator<Item = Aabb>) -> Result<Self, ShapeError> {
        let boxes: Vec<Aabb> = boxes.into_iter().collect();

        for aabb in &boxes {
            if !aabb.is_finite() {
                return Err(ShapeError::NonFinite(*aabb));
            }
            if aabb.min.cmpgt(aabb.max).any() {
                return Err(ShapeError::Inverted(*aabb));
            }
        }

        for (i, a) in boxes.iter().enumerate() {
            if let Some(b) = boxes[i + 1..].iter().find(|b| a.intersects(b)) {
                return Err(ShapeError::Overlapping(*a, *b));
            }
        }

        Ok(Self {
            boxes: boxes.into(),
        })
    }

    /// Wraps boxes the caller already knows to be finite, upright and pairwise disjoint.
    #[must_use]
    pub fn from_disjoint(boxes: impl Into<Arc<[Aabb]>>) -> Self {
        let boxes = boxes.into();
        debug_assert!(
            Self::from_boxes(boxes.iter().copied()).is_ok(),
            "invalid boxes passed to from_disjoint"
        );
        Self { boxes }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    #[must_use]
    pub fn boxes(&self) -> &[Aabb] {
        &self.boxes
    }

    /// Highest point of the shape in block-local space, `None` for an empty shape.
    #[must_use]
    pub fn max_y(&self) -> Option<f64> {
        self.boxes.iter().map(|aabb| aabb.max.y).reduce(f64::max)
    }

    /// The boxes translated into world space for the block at `pos`.
    pub fn at(&self, pos: IVec3) -> impl Iterator<Item = Aabb> + '_ {
        let offset = pos.as_dvec3();
        self.boxes.iter().map(move |aabb| aabb.move_by(offset))
    }
}

impl From<Aabb> for VoxelShape {
    fn from(aabb: Aabb) -> Self {
        Self {
            boxes: Arc::new([aabb]),
        }
    }
}

/// Clips a displacement `d` of `moving` along `axis` against one obstacle.
///
/// The obstacle only blocks if it overlaps `moving` on both perpendicular axes by more than
/// [`COLLISION_EPSILON`], and only if it lies ahead of the moving box (a gap of up to
/// `-COLLISION_EPSILON` still counts as ahead).
#[must_use]
pub fn clip(axis: Axis, moving: &Aabb, obstacle: &Aabb, d: f64) -> f64 {
    for other in axis.others() {
        let overlaps = moving.max_on(other) - COLLISION_EPSILON > obstacle.min_on(other)
            && moving.min_on(other) + COLLISION_EPSILON < obstacle.max_on(other);
        if !overlaps {
            return d;
        }
    }

    if d > 0.0 {
        let gap = obstacle.min_on(axis) - moving.max_on(axis);
        if gap >= -COLLISION_EPSILON {
            return d.min(gap);
        }
    } else if d < 0.0 {
        let gap = obstacle.max_on(axis) - moving.min_on(axis);
        if gap <= COLLISION_EPSILON {
            return d.max(gap);
        }
    }

    d
}

/// Clips `d` against every obstacle, returning `0` once the remaining displacement is
/// effectively zero.
#[must_use]
pub fn clip_all<'a>(
    axis: Axis,
    moving: &Aabb,
    obstacles: impl IntoIterator<Item = &'a Aabb>,
    mut d: f64,
) -> f64 {
    if d.abs() < COLLISION_EPSILON {
        return 0.0;
    }

    for obstacle in obstacles {
        d = clip(axis, moving, obstacle, d);
        if d.abs() < COLLISION_EPSILON {
            return 0.0;
        }
    }

    d
}
