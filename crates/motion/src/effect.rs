//! Observable consequences of a tick, handed to the host instead of being applied in place.

use derive_more::Display;
use glam::IVec3;
use serde::{Deserialize, Serialize};

use crate::EntityId;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum DamageSource {
    Fall,
    InFire,
    OnFire,
    Lava,
    Freeze,
    OutOfWorld,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum GameEvent {
    Step,
    Swim,
    Splash,
    HitGround,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Effect {
    PlayStepSound { pos: IVec3 },
    PlaySwimSound { volume: f32 },
    PlayFallSound { damage: f32 },
    PlayExtinguishSound,
    SpawnSplashParticles { strength: f32 },
    EmitGameEvent(GameEvent),
    ApplyDamage { source: DamageSource, amount: f32 },
    /// The entity's box started overlapping this block during the tick.
    BlockEntered { pos: IVec3 },
}

pub trait EffectSink {
    fn emit(&mut self, entity: EntityId, effect: Effect);
}

impl EffectSink for Vec<(EntityId, Effect)> {
    fn emit(&mut self, entity: EntityId, effect: Effect) {
        self.push((entity, effect));
    }
}

/// Drops everything.
impl EffectSink for () {
    fn emit(&mut self, _entity: EntityId, _effect: Effect) {}
}
