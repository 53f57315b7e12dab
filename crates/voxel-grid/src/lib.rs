//! A sparse in-memory block grid that answers the [`motion::World`] queries.
//!
//! Blocks live in a hash map keyed by position; everything not set is air. Loading is tracked
//! per 16x16 chunk column: a world built with [`GridWorld::new`] is loaded everywhere, while one
//! built with [`GridWorld::with_chunks`] only answers inside the listed chunks and reports the
//! rest as still loading.

use geometry::{Aabb, VoxelShape};
use glam::{DVec3, IVec2, IVec3};
use motion::{
    CollidableBox, CollisionContext, Contact, EntityId, FluidKind, FluidState, QueryError, World,
    WorldBorder,
};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Fluid level of a source block. Fluid height is `level / 9`.
pub const SOURCE_LEVEL: u8 = 8;

const COBWEB_MULTIPLIER: DVec3 = DVec3::new(0.25, 0.05, 0.25);
const FIRE_DAMAGE: f32 = 1.0;
const ICE_FRICTION: f64 = 0.98;

/// The top plate of scaffolding that entities stand on when they are not climbing down.
const SCAFFOLD_TOP: Aabb = Aabb {
    min: DVec3::new(0.0, 0.875, 0.0),
    max: DVec3::new(1.0, 1.0, 1.0),
};

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    Solid,
    Ice,
    /// A full-width block from the floor up to `height`.
    Slab {
        height: f64,
    },
    /// Solid from above unless the entity is sneaking down through it.
    Scaffold,
    Water {
        #[serde(default = "source_level")]
        level: u8,
        #[serde(default)]
        flow: DVec3,
    },
    Lava {
        #[serde(default = "source_level")]
        level: u8,
    },
    Fire,
    PowderSnow,
    Cobweb,
    /// Block data that fails every query.
    Corrupt,
}

const fn source_level() -> u8 {
    SOURCE_LEVEL
}

fn fluid_height(level: u8) -> f64 {
    f64::from(level) / 9.0
}

impl Block {
    #[must_use]
    pub const fn water() -> Self {
        Self::Water {
            level: SOURCE_LEVEL,
            flow: DVec3::ZERO,
        }
    }

    #[must_use]
    pub const fn lava() -> Self {
        Self::Lava {
            level: SOURCE_LEVEL,
        }
    }

    fn shape(&self, pos: IVec3, context: &CollisionContext) -> VoxelShape {
        match self {
            Self::Solid | Self::Ice => VoxelShape::block(),
            Self::Slab { height } => VoxelShape::slab(*height),
            Self::Scaffold => {
                if context.is_above(&VoxelShape::block(), pos) && !context.descending {
                    VoxelShape::from(SCAFFOLD_TOP)
                } else {
                    VoxelShape::empty()
                }
            }
            Self::Water { .. }
            | Self::Lava { .. }
            | Self::Fire
            | Self::PowderSnow
            | Self::Cobweb
            | Self::Corrupt => VoxelShape::empty(),
        }
    }

    fn fluid(&self) -> FluidState {
        match *self {
            Self::Water { level, flow } => FluidState {
                kind: Some(FluidKind::Water),
                height: fluid_height(level),
                flow,
            },
            Self::Lava { level } => FluidState::still(FluidKind::Lava, fluid_height(level)),
            _ => FluidState::EMPTY,
        }
    }

    const fn contact(&self) -> Contact {
        match self {
            Self::Fire => Contact::Fire {
                damage: FIRE_DAMAGE,
            },
            Self::PowderSnow => Contact::PowderSnow,
            Self::Cobweb => Contact::Sticky {
                multiplier: COBWEB_MULTIPLIER,
            },
            _ => Contact::Inert,
        }
    }
}

const fn chunk_of(pos: IVec3) -> IVec2 {
    IVec2::new(pos.x >> 4, pos.z >> 4)
}

#[derive(Clone, Debug, Default)]
enum Loaded {
    #[default]
    Everywhere,
    Chunks(FxHashSet<IVec2>),
}

#[derive(Clone, Debug, Default)]
pub struct GridWorld {
    blocks: FxHashMap<IVec3, Block>,
    loaded: Loaded,
    entities: Vec<CollidableBox>,
    border: WorldBorder,
    raining: bool,
    ultra_warm: bool,
}

impl GridWorld {
    /// An empty world, loaded everywhere.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty world where only the given chunk columns are loaded.
    #[must_use]
    pub fn with_chunks(chunks: impl IntoIterator<Item = IVec2>) -> Self {
        Self {
            loaded: Loaded::Chunks(chunks.into_iter().collect()),
            ..Self::default()
        }
    }

    pub fn load_chunk(&mut self, chunk: IVec2) {
        if let Loaded::Chunks(chunks) = &mut self.loaded {
            chunks.insert(chunk);
        }
    }

    #[must_use]
    pub fn block(&self, pos: IVec3) -> Option<Block> {
        self.blocks.get(&pos).copied()
    }

    pub fn set(&mut self, pos: IVec3, block: Block) {
        self.blocks.insert(pos, block);
    }

    pub fn remove(&mut self, pos: IVec3) -> Option<Block> {
        self.blocks.remove(&pos)
    }

    /// Sets every block in the inclusive range.
    pub fn fill(&mut self, min: IVec3, max: IVec3, block: Block) {
        let before = self.blocks.len();
        for pos in geometry::cells(min, max) {
            self.blocks.insert(pos, block);
        }
        debug!(%min, %max, ?block, added = self.blocks.len() - before, "filled");
    }

    /// Adds a collidable box that stays where it is.
    pub fn add_entity(&mut self, id: EntityId, aabb: Aabb) {
        self.entities.push(CollidableBox { id, aabb });
    }

    pub const fn set_border(&mut self, border: WorldBorder) {
        self.border = border;
    }

    pub const fn set_raining(&mut self, raining: bool) {
        self.raining = raining;
    }

    pub const fn set_ultra_warm(&mut self, ultra_warm: bool) {
        self.ultra_warm = ultra_warm;
    }

    fn is_loaded(&self, pos: IVec3) -> bool {
        match &self.loaded {
            Loaded::Everywhere => true,
            Loaded::Chunks(chunks) => chunks.contains(&chunk_of(pos)),
        }
    }

    fn lookup(&self, pos: IVec3) -> Result<Option<&Block>, QueryError> {
        match self.blocks.get(&pos) {
            Some(Block::Corrupt) => Err(QueryError::Corrupt(pos)),
            block => Ok(block),
        }
    }
}

impl World for GridWorld {
    fn shape_at(
        &self,
        pos: IVec3,
        context: &CollisionContext,
    ) -> Result<Option<VoxelShape>, QueryError> {
        if !self.is_loaded(pos) {
            return Ok(None);
        }
        let shape = self
            .lookup(pos)?
            .map_or_else(VoxelShape::empty, |block| block.shape(pos, context));
        Ok(Some(shape))
    }

    fn fluid_at(&self, pos: IVec3) -> Result<FluidState, QueryError> {
        Ok(self.lookup(pos)?.map_or(FluidState::EMPTY, Block::fluid))
    }

    fn contact_at(&self, pos: IVec3) -> Result<Contact, QueryError> {
        Ok(self.lookup(pos)?.map_or(Contact::Air, Block::contact))
    }

    fn entities_near(
        &self,
        query: &Aabb,
        excluding: EntityId,
    ) -> Result<Vec<CollidableBox>, QueryError> {
        Ok(self
            .entities
            .iter()
            .filter(|other| other.id != excluding && other.aabb.intersects(query))
            .copied()
            .collect())
    }

    fn world_border(&self) -> WorldBorder {
        self.border
    }

    fn is_area_loaded(&self, min: IVec3, max: IVec3) -> bool {
        let Loaded::Chunks(chunks) = &self.loaded else {
            return true;
        };
        let (lo, hi) = (chunk_of(min), chunk_of(max));
        (lo.x..=hi.x).all(|x| (lo.y..=hi.y).all(|z| chunks.contains(&IVec2::new(x, z))))
    }

    fn is_raining_at(&self, _pos: IVec3) -> bool {
        self.raining
    }

    fn ultra_warm(&self) -> bool {
        self.ultra_warm
    }

    fn friction_at(&self, pos: IVec3) -> Option<f64> {
        matches!(self.blocks.get(&pos), Some(Block::Ice)).then_some(ICE_FRICTION)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    const STANDING_ON_TOP: CollisionContext = CollisionContext {
        descending: false,
        entity_bottom: 1.0,
    };

    #[test]
    fn air_is_empty_and_unloaded_is_unknown() {
        let world = GridWorld::with_chunks([IVec2::ZERO]);

        let air = world.shape_at(IVec3::new(3, 0, 3), &CollisionContext::EMPTY).unwrap();
        assert_eq!(air, Some(VoxelShape::empty()));

        let far = world.shape_at(IVec3::new(40, 0, 0), &CollisionContext::EMPTY).unwrap();
        assert_eq!(far, None);
    }

    #[test]
    fn area_loaded_needs_every_chunk() {
        let mut world = GridWorld::with_chunks([IVec2::ZERO]);
        assert!(world.is_area_loaded(IVec3::new(0, 0, 0), IVec3::new(15, 10, 15)));
        assert!(!world.is_area_loaded(IVec3::new(-1, 0, 0), IVec3::new(15, 10, 15)));

        world.load_chunk(IVec2::new(-1, 0));
        assert!(world.is_area_loaded(IVec3::new(-1, 0, 0), IVec3::new(15, 10, 15)));
    }

    #[test]
    fn scaffold_only_holds_from_above() {
        let mut world = GridWorld::new();
        world.set(IVec3::ZERO, Block::Scaffold);

        let top = world.shape_at(IVec3::ZERO, &STANDING_ON_TOP).unwrap();
        assert_eq!(top.and_then(|shape| shape.max_y()), Some(1.0));

        let sneaking = CollisionContext {
            descending: true,
            ..STANDING_ON_TOP
        };
        let through = world.shape_at(IVec3::ZERO, &sneaking).unwrap();
        assert_eq!(through, Some(VoxelShape::empty()));

        let inside = CollisionContext {
            descending: false,
            entity_bottom: 0.5,
        };
        assert_eq!(world.shape_at(IVec3::ZERO, &inside).unwrap(), Some(VoxelShape::empty()));
    }

    #[test]
    fn fluids_report_height_from_level() {
        let mut world = GridWorld::new();
        world.set(IVec3::ZERO, Block::water());
        world.set(IVec3::X, Block::Lava { level: 3 });

        let water = world.fluid_at(IVec3::ZERO).unwrap();
        assert!(water.is(FluidKind::Water));
        assert_relative_eq!(water.height, 8.0 / 9.0);

        let lava = world.fluid_at(IVec3::X).unwrap();
        assert!(lava.is(FluidKind::Lava));
        assert_relative_eq!(lava.height, 1.0 / 3.0);

        assert_eq!(world.fluid_at(IVec3::Y).unwrap(), FluidState::EMPTY);
    }

    #[test]
    fn corrupt_blocks_fail_every_query() {
        let mut world = GridWorld::new();
        world.set(IVec3::ONE, Block::Corrupt);

        assert!(matches!(
            world.shape_at(IVec3::ONE, &CollisionContext::EMPTY),
            Err(QueryError::Corrupt(pos)) if pos == IVec3::ONE
        ));
        assert!(world.fluid_at(IVec3::ONE).is_err());
        assert!(world.contact_at(IVec3::ONE).is_err());
    }

    #[test]
    fn entity_boxes_skip_the_asking_entity() {
        let mut world = GridWorld::new();
        let boat = Aabb::new((0.0, 0.0, 0.0), (1.0, 0.5, 1.0));
        world.add_entity(EntityId::from(1), boat);

        let query = Aabb::new((0.5, 0.0, 0.5), (2.0, 2.0, 2.0));
        assert_eq!(world.entities_near(&query, EntityId::from(2)).unwrap().len(), 1);
        assert!(world.entities_near(&query, EntityId::from(1)).unwrap().is_empty());
    }

    #[test]
    fn ice_is_slippery() {
        let mut world = GridWorld::new();
        world.fill(IVec3::new(0, 0, 0), IVec3::new(1, 0, 1), Block::Ice);
        assert_eq!(world.friction_at(IVec3::new(1, 0, 1)), Some(ICE_FRICTION));
        assert_eq!(world.friction_at(IVec3::new(2, 0, 1)), None);
    }
}
