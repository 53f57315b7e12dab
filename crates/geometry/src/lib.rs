//! Axis-aligned boxes, per-block collision shapes, and the tolerances the collision code shares.

pub mod aabb;
mod axis;
pub mod shape;

pub use aabb::{Aabb, HasAabb, cells};
pub use axis::Axis;
pub use shape::{ShapeError, VoxelShape, clip, clip_all};

/// Displacements (and squared displacement lengths) below this are treated as zero.
pub const COLLISION_EPSILON: f64 = 1.0e-7;

/// Inset applied to a box before asking which block cells it touches.
pub const BLOCK_EPSILON: f64 = 1.0e-6;

/// Piston pushes whose clamped result is at most this far are dropped.
pub const PISTON_EPSILON: f64 = 1.0e-5;

/// Inset applied to an entity box before sampling fluids.
pub const FLUID_EPSILON: f64 = 1.0e-3;
