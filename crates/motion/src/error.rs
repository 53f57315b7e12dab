use derive_more::Display;
use glam::{DVec3, IVec3};
use thiserror::Error;

use crate::EntityId;

/// A failure reported by the world while answering a query.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("block data at {0} is corrupt")]
    Corrupt(IVec3),
    #[error("chunk containing {0} is not available")]
    Unavailable(IVec3),
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Which world query was running when an error surfaced.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Display)]
pub enum Query {
    #[display("shape")]
    Shape,
    #[display("fluid")]
    Fluid,
    #[display("contact")]
    Contact,
    #[display("entity")]
    Entities,
}

/// A world query failed while resolving or applying one entity's movement.
#[derive(Debug, Error)]
#[error("{query} query for block at {block} failed")]
pub struct CollisionError {
    pub query: Query,
    pub block: IVec3,
    #[source]
    pub source: QueryError,
}

impl CollisionError {
    pub(crate) fn at(query: Query, block: IVec3) -> impl FnOnce(QueryError) -> Self {
        move |source| Self {
            query,
            block,
            source,
        }
    }
}

/// An entity could not finish its tick. The driver restores the entity's pre-tick state.
#[derive(Debug, Error)]
pub enum TickError {
    #[error("entity {entity} colliding with block at {block}")]
    Collision {
        entity: EntityId,
        block: IVec3,
        #[source]
        source: CollisionError,
    },
    #[error("entity {entity} sampling fluid at block {block}")]
    Fluid {
        entity: EntityId,
        block: IVec3,
        #[source]
        source: CollisionError,
    },
    #[error("entity {entity} touching block at {block}")]
    Contact {
        entity: EntityId,
        block: IVec3,
        #[source]
        source: CollisionError,
    },
    #[error("entity {entity} was handed an invalid value")]
    Invalid {
        entity: EntityId,
        #[source]
        source: InvalidInput,
    },
}

impl TickError {
    pub(crate) fn collision(entity: EntityId) -> impl FnOnce(CollisionError) -> Self {
        move |source| Self::Collision {
            entity,
            block: source.block,
            source,
        }
    }

    pub(crate) fn fluid(entity: EntityId) -> impl FnOnce(CollisionError) -> Self {
        move |source| Self::Fluid {
            entity,
            block: source.block,
            source,
        }
    }

    pub(crate) fn contact(entity: EntityId) -> impl FnOnce(CollisionError) -> Self {
        move |source| Self::Contact {
            entity,
            block: source.block,
            source,
        }
    }

    pub(crate) fn invalid(entity: EntityId) -> impl FnOnce(InvalidInput) -> Self {
        move |source| Self::Invalid { entity, source }
    }

    #[must_use]
    pub const fn entity(&self) -> EntityId {
        match self {
            Self::Collision { entity, .. }
            | Self::Fluid { entity, .. }
            | Self::Contact { entity, .. }
            | Self::Invalid { entity, .. } => *entity,
        }
    }

    /// The block whose query failed, if the failure came from the world.
    #[must_use]
    pub const fn block(&self) -> Option<IVec3> {
        match self {
            Self::Collision { block, .. } | Self::Fluid { block, .. } | Self::Contact { block, .. } => {
                Some(*block)
            }
            Self::Invalid { .. } => None,
        }
    }
}

/// A value handed to a setter that would break the kinematic invariants.
#[derive(Debug, Error, PartialEq)]
pub enum InvalidInput {
    #[error("position {0} is not finite")]
    Position(DVec3),
    #[error("motion {0} is not finite")]
    Motion(DVec3),
    #[error("displacement {0} is not finite")]
    Displacement(DVec3),
    #[error("rotation ({yaw}, {pitch}) is not finite")]
    Rotation { yaw: f32, pitch: f32 },
}
