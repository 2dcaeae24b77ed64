//! # ECS Performance Benchmark
//!
//! Measures the structural paths of the runtime:
//! - Entity creation through edits vs. archetypes
//! - Transmuting entities between compositions
//! - Flushing a round of changes into subscriptions
//!
//! Run with: `cargo bench --package ember_ecs`

// Benchmarks don't need docs and only write some component fields
#![allow(missing_docs)]
#![allow(dead_code)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ember_ecs::{
    ArchetypeBuilder, Aspect, Component, EntityTransmuterFactory, World, WorldConfig,
};

/// Entities per iteration.
const ENTITY_COUNT: usize = 10_000;

#[derive(Clone, Copy, Default)]
struct Position {
    x: f32,
    y: f32,
}
impl Component for Position {}

#[derive(Clone, Copy, Default)]
struct Velocity {
    dx: f32,
    dy: f32,
}
impl Component for Velocity {}

#[derive(Clone, Copy, Default)]
struct Frozen;
impl Component for Frozen {}

fn new_world(count: usize) -> World {
    let config = WorldConfig::new().with_expected_entity_count(count);
    World::with_config(config).expect("valid config")
}

/// Benchmark: create entities by editing vs. from an archetype.
fn bench_create(c: &mut Criterion) {
    let mut group = c.benchmark_group("create");

    for count in [1_000, ENTITY_COUNT] {
        group.bench_with_input(BenchmarkId::new("edit", count), &count, |b, &count| {
            b.iter(|| {
                let mut world = new_world(count);
                for i in 0..count {
                    let e = world.create();
                    let f = i as f32;
                    world
                        .edit(e)
                        .expect("live entity")
                        .add(Position { x: f, y: f })
                        .add(Velocity { dx: 1.0, dy: 0.0 });
                }
                world.update().expect("flush");
                black_box(world.entity_count())
            });
        });

        group.bench_with_input(BenchmarkId::new("archetype", count), &count, |b, &count| {
            b.iter(|| {
                let mut world = new_world(count);
                let mover = ArchetypeBuilder::new()
                    .add::<Position>()
                    .add::<Velocity>()
                    .build(&mut world, None);
                for _ in 0..count {
                    black_box(world.create_from(&mover));
                }
                world.update().expect("flush");
                black_box(world.entity_count())
            });
        });
    }

    group.finish();
}

/// Benchmark: freeze and thaw every entity with cached transmute operations.
fn bench_transmute(c: &mut Criterion) {
    let mut world = new_world(ENTITY_COUNT);
    let mover = ArchetypeBuilder::new()
        .add::<Position>()
        .add::<Velocity>()
        .build(&mut world, None);
    let entities: Vec<_> = (0..ENTITY_COUNT).map(|_| world.create_from(&mover)).collect();

    let mut freeze = EntityTransmuterFactory::new()
        .add::<Frozen>()
        .remove::<Velocity>()
        .build(&mut world);
    let mut thaw = EntityTransmuterFactory::new()
        .add::<Velocity>()
        .remove::<Frozen>()
        .build(&mut world);

    c.bench_function("transmute_freeze_thaw_10K", |b| {
        b.iter(|| {
            for &e in &entities {
                freeze.transmute(&mut world, e).expect("freeze");
            }
            for &e in &entities {
                thaw.transmute(&mut world, e).expect("thaw");
            }
            world.update().expect("flush");
        });
    });
}

/// Benchmark: flush a full round of edits into several subscriptions.
fn bench_flush(c: &mut Criterion) {
    let mut world = new_world(ENTITY_COUNT);
    world.subscribe(Aspect::all::<Position>());
    world.subscribe(Aspect::all::<Position>().all::<Velocity>());
    world.subscribe(Aspect::all::<Position>().exclude::<Frozen>());
    let entities: Vec<_> = (0..ENTITY_COUNT).map(|_| world.create()).collect();

    c.bench_function("flush_toggle_10K", |b| {
        let mut frozen = false;
        b.iter(|| {
            frozen = !frozen;
            for &e in &entities {
                let mut edit = world.edit(e).expect("live entity");
                edit.create::<Position>();
                if frozen {
                    edit.add(Frozen);
                } else {
                    edit.remove::<Frozen>();
                }
            }
            world.update().expect("flush");
        });
    });
}

criterion_group!(benches, bench_create, bench_transmute, bench_flush);
criterion_main!(benches);
