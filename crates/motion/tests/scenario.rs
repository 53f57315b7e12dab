use approx::assert_relative_eq;
use glam::{DVec3, IVec2, IVec3};
use motion::{
    DamageSource, Effect, Entity, EntityId, FluidKind, GameEvent, MotionProfile, MoverType,
    PhysicsConfig, Side, Simulation, TickContext, TickError, move_entity,
};
use voxel_grid::{Block, GridWorld};

fn flat_ground() -> GridWorld {
    let mut world = GridWorld::new();
    world.fill(IVec3::new(-16, -1, -16), IVec3::new(16, -1, 16), Block::Solid);
    world
}

fn count(effects: &[(EntityId, Effect)], wanted: impl Fn(&Effect) -> bool) -> usize {
    effects.iter().filter(|(_, effect)| wanted(effect)).count()
}

fn damage_from(source: DamageSource) -> impl Fn(&Effect) -> bool {
    move |effect| matches!(effect, Effect::ApplyDamage { source: s, .. } if *s == source)
}

fn standing(id: u64, position: DVec3) -> Entity {
    Entity::new(EntityId::from(id), MotionProfile::mob(0.6, 1.8), position).unwrap()
}

fn faller(id: u64, position: DVec3) -> Entity {
    let profile = MotionProfile {
        step_height: 0.0,
        ..MotionProfile::mob(0.6, 1.8)
    };
    let mut entity = Entity::new(EntityId::from(id), profile, position).unwrap();
    entity.state.set_motion(DVec3::new(0.0, -1.0, 0.0)).unwrap();
    entity
}

#[test]
fn falling_entity_lands_and_takes_damage() {
    let world = flat_ground();
    let mut simulation = Simulation::new(PhysicsConfig::default(), Side::Server);
    let mut entities = vec![faller(1, DVec3::new(0.0, 10.0, 0.0))];
    let mut effects: Vec<(EntityId, Effect)> = Vec::new();

    let report = simulation.tick(&world, &mut entities, &mut effects);
    assert_eq!(report.ticked, 1);
    let state = &entities[0].state;
    assert!(!state.on_ground);
    assert!(state.position().y > 0.0);
    assert!(state.fall_distance > 0.0);

    let mut ticks = 1;
    while !entities[0].state.on_ground {
        assert!(ticks < 40, "entity never landed");
        simulation.tick(&world, &mut entities, &mut effects);
        ticks += 1;
    }

    let state = &entities[0].state;
    assert!(state.vertical_collision);
    assert_eq!(state.fall_distance, 0.0);
    assert_eq!(state.position().y, 0.0);
    assert_eq!(simulation.clock().now(), ticks);

    let damage = effects
        .iter()
        .find_map(|(_, effect)| match effect {
            Effect::ApplyDamage {
                source: DamageSource::Fall,
                amount,
            } => Some(*amount),
            _ => None,
        })
        .expect("fall damage");
    assert!(damage >= 7.0);
    assert!(effects.contains(&(EntityId::from(1), Effect::PlayFallSound { damage })));
    assert!(effects.contains(&(EntityId::from(1), Effect::EmitGameEvent(GameEvent::HitGround))));
}

#[test]
fn short_fall_is_harmless() {
    let world = flat_ground();
    let mut simulation = Simulation::new(PhysicsConfig::default(), Side::Server);
    let mut entities = vec![faller(1, DVec3::new(0.0, 2.0, 0.0))];
    let mut effects: Vec<(EntityId, Effect)> = Vec::new();

    for _ in 0..10 {
        simulation.tick(&world, &mut entities, &mut effects);
    }

    assert!(entities[0].state.on_ground);
    assert!(
        !effects
            .iter()
            .any(|(_, effect)| matches!(effect, Effect::ApplyDamage { .. }))
    );
    assert!(effects.contains(&(EntityId::from(1), Effect::EmitGameEvent(GameEvent::HitGround))));
}

#[test]
fn client_side_never_deals_damage() {
    let world = flat_ground();
    let mut simulation = Simulation::new(PhysicsConfig::default(), Side::Client);
    let mut entities = vec![faller(1, DVec3::new(0.0, 10.0, 0.0))];
    let mut effects: Vec<(EntityId, Effect)> = Vec::new();

    for _ in 0..20 {
        simulation.tick(&world, &mut entities, &mut effects);
    }

    assert!(entities[0].state.on_ground);
    assert!(
        !effects
            .iter()
            .any(|(_, effect)| matches!(effect, Effect::ApplyDamage { .. }))
    );
}

#[test]
fn corrupt_block_freezes_only_that_entity() {
    let mut world = flat_ground();
    world.set(IVec3::new(0, 4, 0), Block::Corrupt);

    let mut simulation = Simulation::new(PhysicsConfig::default(), Side::Server);
    let mut entities = vec![
        faller(1, DVec3::new(0.5, 5.0, 0.5)),
        faller(2, DVec3::new(8.5, 5.0, 8.5)),
    ];
    let before = entities[0].state.clone();
    let mut effects: Vec<(EntityId, Effect)> = Vec::new();

    let report = simulation.tick(&world, &mut entities, &mut effects);

    assert_eq!(report.frozen, vec![EntityId::from(1)]);
    assert_eq!(report.ticked, 1);
    assert_eq!(entities[0].state, before);
    assert!(entities[1].state.position().y < 5.0);
    assert!(effects.iter().all(|(id, _)| *id == EntityId::from(2)));
    assert_eq!(simulation.clock().now(), 1);

    let config = PhysicsConfig::default();
    let ctx = TickContext {
        game_time: 1,
        side: Side::Server,
        config: &config,
    };
    let error = entities[0].tick(&world, &ctx, &mut ()).unwrap_err();
    assert!(matches!(error, TickError::Collision { .. }));
    assert_eq!(error.entity(), EntityId::from(1));
    assert_eq!(error.block(), Some(IVec3::new(0, 4, 0)));
}

#[test]
fn solid_entities_block_each_other() {
    let world = flat_ground();
    let mut simulation = Simulation::new(PhysicsConfig::default(), Side::Server);

    let boat = Entity::new(
        EntityId::from(1),
        MotionProfile::vehicle(1.0, 0.5),
        DVec3::new(0.5, 0.0, 0.5),
    )
    .unwrap();
    let mut walker = Entity::new(
        EntityId::from(2),
        MotionProfile {
            step_height: 0.0,
            ..MotionProfile::mob(0.6, 1.8)
        },
        DVec3::new(-1.0, 0.0, 0.5),
    )
    .unwrap();
    walker.state.on_ground = true;
    walker.input.acceleration = DVec3::new(1.2, 0.0, 0.0);

    let mut entities = vec![boat, walker];
    simulation.tick(&world, &mut entities, &mut ());

    let walker = &entities[1].state;
    assert!(walker.horizontal_collision);
    assert!((walker.bounding_box().max.x - 0.0).abs() < 1e-9);
}

#[test]
fn falling_into_water_splashes_and_puts_out_fire() {
    let mut world = flat_ground();
    world.fill(IVec3::new(-4, 0, -4), IVec3::new(4, 0, 4), Block::water());

    let mut simulation = Simulation::new(PhysicsConfig::default(), Side::Server);
    let mut diver = faller(1, DVec3::new(0.5, 1.5, 0.5));
    diver.state.set_motion(DVec3::new(0.0, -0.5, 0.0)).unwrap();
    diver.state.fire_ticks = 100;
    diver.state.fall_distance = 10.0;
    let mut entities = vec![diver];
    let mut effects: Vec<(EntityId, Effect)> = Vec::new();

    for _ in 0..6 {
        simulation.tick(&world, &mut entities, &mut effects);
    }

    let state = &entities[0].state;
    assert!(state.is_in_water());
    assert!(state.on_ground);
    assert_eq!(state.fire_ticks, -entities[0].profile.fire_immune_ticks);
    assert_eq!(state.fall_distance, 0.0);
    assert!(state.fluid_heights.get(FluidKind::Water) > 0.0);

    let splashes: Vec<f32> = effects
        .iter()
        .filter_map(|(_, effect)| match effect {
            Effect::SpawnSplashParticles { strength } => Some(*strength),
            _ => None,
        })
        .collect();
    assert_eq!(splashes.len(), 1);
    assert!(splashes[0] > 0.0 && splashes[0] <= 1.0);
    assert_eq!(count(&effects, |e| *e == Effect::EmitGameEvent(GameEvent::Splash)), 1);
    assert_eq!(count(&effects, |e| *e == Effect::PlayExtinguishSound), 1);
    assert_eq!(count(&effects, damage_from(DamageSource::Fall)), 0);
}

#[test]
fn fluids_next_to_unloaded_terrain_are_skipped() {
    let mut world = GridWorld::with_chunks([IVec2::ZERO]);
    world.fill(IVec3::new(0, -1, 0), IVec3::new(15, -1, 15), Block::Solid);
    world.fill(IVec3::new(0, 0, 0), IVec3::new(15, 0, 15), Block::water());

    let mut simulation = Simulation::new(PhysicsConfig::default(), Side::Server);
    let mut entities = vec![
        standing(1, DVec3::new(0.5, 0.0, 8.5)),
        standing(2, DVec3::new(8.5, 0.0, 8.5)),
    ];
    for entity in &mut entities {
        entity.state.fire_ticks = 100;
    }

    let report = simulation.tick(&world, &mut entities, &mut ());
    assert_eq!(report.ticked, 2);

    let edge = &entities[0].state;
    assert!(!edge.is_in_water());
    assert_eq!(edge.fluid_heights.get(FluidKind::Water), 0.0);
    assert_eq!(edge.fire_ticks, 99);

    let inside = &entities[1].state;
    assert!(inside.is_in_water());
    assert_eq!(inside.fire_ticks, -1);
}

#[test]
fn unloaded_blocks_collide_as_full_cubes() {
    let world = GridWorld::with_chunks([IVec2::ZERO]);
    let config = PhysicsConfig::default();
    let ctx = TickContext {
        game_time: 0,
        side: Side::Server,
        config: &config,
    };

    // box x in [0.7, 1.3]; chunk -1 starts at x = 0
    let mut entity = faller(1, DVec3::new(1.0, 5.0, 8.5));
    let outcome = move_entity(
        &world,
        &mut entity,
        MoverType::SelfMotion,
        DVec3::new(-2.0, 0.0, 0.0),
        &ctx,
        &mut (),
    )
    .unwrap();
    assert_relative_eq!(outcome.achieved.x, -0.7, epsilon = 1e-9);
    assert!(entity.state.horizontal_collision);

    let mut entity = faller(2, DVec3::new(1.0, 5.0, 8.5));
    let outcome = move_entity(
        &world,
        &mut entity,
        MoverType::SelfMotion,
        DVec3::new(2.0, 0.0, 0.0),
        &ctx,
        &mut (),
    )
    .unwrap();
    assert_relative_eq!(outcome.achieved.x, 2.0);
}

#[test]
fn lava_ignites_and_hurts_every_tick() {
    let mut world = flat_ground();
    world.fill(IVec3::new(-2, 0, -2), IVec3::new(2, 0, 2), Block::lava());

    let config = PhysicsConfig::default();
    let mut simulation = Simulation::new(config.clone(), Side::Server);
    let mut entities = vec![standing(1, DVec3::new(0.5, 0.0, 0.5))];
    let mut effects: Vec<(EntityId, Effect)> = Vec::new();

    for _ in 0..3 {
        simulation.tick(&world, &mut entities, &mut effects);
        assert_eq!(entities[0].state.fire_ticks, config.lava_fire_seconds * 20);
        assert!(entities[0].state.is_in_lava());
    }

    assert_eq!(
        count(&effects, |e| *e
            == Effect::ApplyDamage {
                source: DamageSource::Lava,
                amount: config.lava_damage,
            }),
        3
    );
    assert_eq!(count(&effects, damage_from(DamageSource::OnFire)), 0);
}

#[test]
fn fire_immune_entities_ignore_lava() {
    let mut world = flat_ground();
    world.set(IVec3::ZERO, Block::lava());

    let mut simulation = Simulation::new(PhysicsConfig::default(), Side::Server);
    let mut strider = standing(1, DVec3::new(0.5, 0.0, 0.5));
    strider.profile.fire_immune = true;
    let mut entities = vec![strider];
    let mut effects: Vec<(EntityId, Effect)> = Vec::new();

    simulation.tick(&world, &mut entities, &mut effects);

    assert!(entities[0].state.is_in_lava());
    assert!(!entities[0].state.is_on_fire());
    assert_eq!(count(&effects, damage_from(DamageSource::Lava)), 0);
}

#[test]
fn powder_snow_freezes_then_thaws() {
    let mut world = flat_ground();
    world.set(IVec3::ZERO, Block::PowderSnow);

    let config = PhysicsConfig::default();
    let mut simulation = Simulation::new(config.clone(), Side::Server);
    let mut entities = vec![standing(1, DVec3::new(0.5, 0.0, 0.5))];
    let mut effects: Vec<(EntityId, Effect)> = Vec::new();

    // contact is picked up during the move, so freezing trails it by one tick
    simulation.tick(&world, &mut entities, &mut effects);
    assert!(entities[0].state.in_powder_snow);
    assert_eq!(entities[0].state.ticks_frozen, 0);
    simulation.tick(&world, &mut entities, &mut effects);
    assert_eq!(entities[0].state.ticks_frozen, 1);

    for _ in 2..200 {
        simulation.tick(&world, &mut entities, &mut effects);
    }
    let state = &entities[0].state;
    assert_eq!(state.ticks_frozen, config.ticks_required_to_freeze);
    assert!(state.is_fully_frozen(config.ticks_required_to_freeze));
    // fully frozen from age 141; damage lands on ages 160 and 200
    assert_eq!(count(&effects, damage_from(DamageSource::Freeze)), 2);

    world.remove(IVec3::ZERO);
    let thawing: Vec<i32> = (0..3)
        .map(|_| {
            simulation.tick(&world, &mut entities, &mut ());
            entities[0].state.ticks_frozen
        })
        .collect();
    assert_eq!(thawing, vec![140, 138, 136]);
}

#[test]
fn rain_and_powder_snow_put_out_fire() {
    let mut rainy = flat_ground();
    rainy.set_raining(true);
    let mut snowy = flat_ground();
    snowy.set(IVec3::ZERO, Block::PowderSnow);

    for world in [rainy, snowy] {
        let mut simulation = Simulation::new(PhysicsConfig::default(), Side::Server);
        let mut burning = standing(1, DVec3::new(0.5, 0.0, 0.5));
        burning.state.fire_ticks = 100;
        let mut entities = vec![burning];
        let mut effects: Vec<(EntityId, Effect)> = Vec::new();

        simulation.tick(&world, &mut entities, &mut effects);

        assert_eq!(entities[0].state.fire_ticks, -1);
        assert_eq!(count(&effects, |e| *e == Effect::PlayExtinguishSound), 1);
    }

    let mut simulation = Simulation::new(PhysicsConfig::default(), Side::Server);
    let mut burning = standing(1, DVec3::new(0.5, 0.0, 0.5));
    burning.state.fire_ticks = 100;
    let mut entities = vec![burning];
    simulation.tick(&flat_ground(), &mut entities, &mut ());
    assert_eq!(entities[0].state.fire_ticks, 99);
}

#[test]
fn falling_out_of_the_world_hurts_on_the_server_only() {
    let world = GridWorld::new();

    for (side, expected) in [(Side::Server, 3), (Side::Client, 0)] {
        let mut simulation = Simulation::new(PhysicsConfig::default(), side);
        let mut entities = vec![standing(1, DVec3::new(0.0, -200.0, 0.0))];
        let mut effects: Vec<(EntityId, Effect)> = Vec::new();

        for _ in 0..3 {
            simulation.tick(&world, &mut entities, &mut effects);
        }

        assert_eq!(
            count(&effects, |e| *e
                == Effect::ApplyDamage {
                    source: DamageSource::OutOfWorld,
                    amount: 4.0,
                }),
            expected
        );
    }

    let mut simulation = Simulation::new(PhysicsConfig::default(), Side::Server);
    let mut entities = vec![standing(1, DVec3::new(0.0, -100.0, 0.0))];
    let mut effects: Vec<(EntityId, Effect)> = Vec::new();
    simulation.tick(&world, &mut entities, &mut effects);
    assert_eq!(count(&effects, damage_from(DamageSource::OutOfWorld)), 0);
}
