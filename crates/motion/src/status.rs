//! Fire and freeze counters as pure transitions.
//!
//! Each function maps the current counter and a few environment flags to the next counter plus
//! at most one [`Effect`]. Nothing here touches the entity directly.

use crate::{DamageSource, Effect, PhysicsConfig};

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Transition {
    pub counter: i32,
    pub effect: Option<Effect>,
}

impl Transition {
    const fn quiet(counter: i32) -> Self {
        Self {
            counter,
            effect: None,
        }
    }

    const fn with(counter: i32, effect: Effect) -> Self {
        Self {
            counter,
            effect: Some(effect),
        }
    }
}

/// One tick of burning. Fire-immune entities burn out four times as fast and take no damage;
/// lava deals its own damage, so burning in lava is silent.
#[must_use]
pub const fn burn(
    fire_ticks: i32,
    fire_immune: bool,
    in_lava: bool,
    damage_interval: i32,
) -> Transition {
    if fire_ticks <= 0 {
        return Transition::quiet(fire_ticks);
    }

    if fire_immune {
        let remaining = fire_ticks - 4;
        return Transition::quiet(if remaining < 0 { 0 } else { remaining });
    }

    let effect = if !in_lava && damage_interval > 0 && fire_ticks % damage_interval == 0 {
        Some(Effect::ApplyDamage {
            source: DamageSource::OnFire,
            amount: 1.0,
        })
    } else {
        None
    };

    Transition {
        counter: fire_ticks - 1,
        effect,
    }
}

/// Puts the fire out and starts the re-ignition cooldown. The extinguish sound only plays if
/// the entity was actually burning.
#[must_use]
pub const fn extinguish(fire_ticks: i32, immune_ticks: i32) -> Transition {
    if fire_ticks > 0 {
        Transition::with(-immune_ticks, Effect::PlayExtinguishSound)
    } else {
        Transition::quiet(-immune_ticks)
    }
}

/// What the entity touched during its move.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FireContact {
    /// Any fire or lava inside the box.
    pub touching_fire: bool,
    /// Water, rain or powder snow.
    pub wet: bool,
    pub was_on_fire: bool,
}

/// Settles the fire counter after a move: leaving every fire source restarts the cooldown, and
/// getting wet while burning puts the fire out.
#[must_use]
pub const fn settle_fire(fire_ticks: i32, contact: FireContact, immune_ticks: i32) -> Transition {
    let mut counter = fire_ticks;
    let mut effect = None;

    if !contact.touching_fire {
        if counter <= 0 {
            counter = -immune_ticks;
        }
        if contact.was_on_fire && contact.wet {
            effect = Some(Effect::PlayExtinguishSound);
        }
    }

    if counter > 0 && contact.wet {
        counter = -immune_ticks;
    }

    Transition { counter, effect }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FreezeEnvironment {
    pub in_powder_snow: bool,
    pub can_freeze: bool,
    pub age: u32,
}

/// One tick of freezing: climbs by one in powder snow, thaws by two elsewhere. A fully frozen
/// entity that can still freeze takes damage every `freeze_damage_interval` ticks.
#[must_use]
pub fn freeze(ticks_frozen: i32, env: FreezeEnvironment, config: &PhysicsConfig) -> Transition {
    let required = config.ticks_required_to_freeze;

    let counter = if env.in_powder_snow && env.can_freeze {
        (ticks_frozen + 1).min(required)
    } else {
        (ticks_frozen - 2).max(0)
    };

    let frozen = required > 0 && counter >= required;
    let interval = config.freeze_damage_interval;
    if frozen && env.can_freeze && interval > 0 && env.age % interval == 0 {
        return Transition::with(counter, Effect::ApplyDamage {
            source: DamageSource::Freeze,
            amount: 1.0,
        });
    }

    Transition::quiet(counter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burning_deals_damage_on_interval() {
        let t = burn(40, false, false, 20);
        assert_eq!(t.counter, 39);
        assert!(matches!(
            t.effect,
            Some(Effect::ApplyDamage {
                source: DamageSource::OnFire,
                ..
            })
        ));

        assert_eq!(burn(39, false, false, 20).effect, None);
        assert_eq!(burn(40, false, true, 20), Transition::quiet(39));
        assert_eq!(burn(0, false, false, 20), Transition::quiet(0));
        assert_eq!(burn(-20, false, false, 20), Transition::quiet(-20));
    }

    #[test]
    fn fire_immune_burns_out_fast() {
        assert_eq!(burn(10, true, false, 20), Transition::quiet(6));
        assert_eq!(burn(3, true, false, 20), Transition::quiet(0));
    }

    #[test]
    fn extinguish_reports_only_real_fires() {
        assert_eq!(
            extinguish(100, 20),
            Transition::with(-20, Effect::PlayExtinguishSound)
        );
        assert_eq!(extinguish(-5, 20), Transition::quiet(-20));
    }

    #[test]
    fn wet_entity_is_put_out_once() {
        let wet = FireContact {
            touching_fire: false,
            wet: true,
            was_on_fire: true,
        };
        let t = settle_fire(50, wet, 1);
        assert_eq!(t, Transition::with(-1, Effect::PlayExtinguishSound));

        let after = settle_fire(t.counter, FireContact { was_on_fire: false, ..wet }, 1);
        assert_eq!(after, Transition::quiet(-1));
    }

    #[test]
    fn leaving_fire_restarts_cooldown_but_keeps_burning() {
        let dry = FireContact::default();
        assert_eq!(settle_fire(0, dry, 20), Transition::quiet(-20));
        assert_eq!(settle_fire(80, dry, 20), Transition::quiet(80));

        let in_fire = FireContact {
            touching_fire: true,
            ..dry
        };
        assert_eq!(settle_fire(-3, in_fire, 20), Transition::quiet(-3));
    }

    #[test]
    fn freeze_climbs_then_thaws() {
        let config = PhysicsConfig::default();
        let snow = FreezeEnvironment {
            in_powder_snow: true,
            can_freeze: true,
            age: 1,
        };

        assert_eq!(freeze(0, snow, &config).counter, 1);
        assert_eq!(freeze(140, snow, &config).counter, 140);

        let thaw = FreezeEnvironment {
            in_powder_snow: false,
            ..snow
        };
        assert_eq!(freeze(1, thaw, &config).counter, 0);
        assert_eq!(freeze(100, thaw, &config).counter, 98);
    }

    #[test]
    fn frozen_entities_take_periodic_damage() {
        let config = PhysicsConfig::default();
        let mut env = FreezeEnvironment {
            in_powder_snow: true,
            can_freeze: true,
            age: 80,
        };

        assert!(freeze(140, env, &config).effect.is_some());
        env.age = 81;
        assert!(freeze(140, env, &config).effect.is_none());
        env.age = 80;
        assert!(freeze(138, env, &config).effect.is_none());
        env.can_freeze = false;
        assert!(freeze(140, env, &config).effect.is_none());
    }
}
