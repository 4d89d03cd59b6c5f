use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec2;
use particle_core::{
    Goodbye, ParticleColor, ParticleDef, ParticleFlags, ParticleGroupDef, ParticleSystem,
    ParticleSystemDef, Shape, Transform,
};

const DT: f32 = 1.0 / 60.0;

fn spaced_particles(system: &mut ParticleSystem, n: usize) {
    for i in 0..n {
        system
            .create_particle(&ParticleDef {
                position: Vec2::new(3.0 * i as f32, 0.0),
                velocity: Vec2::new(0.0, i as f32),
                user_data: 100 + i,
                ..Default::default()
            })
            .unwrap();
    }
}

#[test]
fn test_survivors_keep_order_and_attributes() {
    let mut system = ParticleSystem::new(ParticleSystemDef::default()).unwrap();
    spaced_particles(&mut system, 10);
    for i in [0, 3, 4, 9] {
        system.destroy_particle(i, false).unwrap();
    }

    system.step(DT, Vec2::ZERO);

    assert_eq!(system.particle_count(), 6);
    let expected = [1, 2, 5, 6, 7, 8];
    let user_data = system.user_data().unwrap();
    for (new, &old) in expected.iter().enumerate() {
        assert_eq!(system.positions()[new].x, 3.0 * old as f32, "particle {} moved", old);
        assert_eq!(user_data[new], 100 + old);
    }
}

#[test]
fn test_listener_hears_only_flagged_particles() {
    let mut system = ParticleSystem::new(ParticleSystemDef::default()).unwrap();
    let goodbyes = Rc::new(RefCell::new(Vec::new()));
    let log = goodbyes.clone();
    system.set_destruction_listener(move |g: Goodbye| log.borrow_mut().push(g));
    spaced_particles(&mut system, 5);

    system.destroy_particle(1, true).unwrap();
    system.destroy_particle(3, false).unwrap();
    system.step(DT, Vec2::ZERO);

    assert_eq!(*goodbyes.borrow(), vec![Goodbye::Particle(1)]);
    assert_eq!(system.particle_count(), 3);
}

#[test]
fn test_destroying_everything_empties_the_system() {
    let mut system = ParticleSystem::new(ParticleSystemDef::default()).unwrap();
    spaced_particles(&mut system, 4);
    for i in 0..4 {
        system.destroy_particle(i, false).unwrap();
    }

    system.step(DT, Vec2::ZERO);

    assert_eq!(system.particle_count(), 0);
    assert!(system.positions().is_empty());
    assert!(system.contacts().is_empty());
}

#[test]
fn test_pairs_and_triads_follow_compaction() {
    let mut system = ParticleSystem::new(ParticleSystemDef::default()).unwrap();
    system
        .create_particle(&ParticleDef {
            position: Vec2::new(-10.0, 0.0),
            ..Default::default()
        })
        .unwrap();
    system
        .create_particle_group(&ParticleGroupDef {
            flags: ParticleFlags::SPRING | ParticleFlags::ELASTIC,
            shape: Some(Shape::new_box(1.0, 1.0)),
            ..Default::default()
        })
        .unwrap();
    let pairs_before = system.pairs().len();
    assert!(!system.triads().is_empty());

    // Particle 0 is not part of any pair; particle 5 (group center) is in four.
    system.destroy_particle(0, false).unwrap();
    system.destroy_particle(5, false).unwrap();
    system.step(DT, Vec2::ZERO);

    assert_eq!(system.particle_count(), 8);
    assert_eq!(system.pairs().len(), pairs_before - 4);
    let count = system.particle_count() as u32;
    for pair in system.pairs() {
        assert!(pair.index_a < count && pair.index_b < count);
    }
    for triad in system.triads() {
        assert!(triad.index_a < count && triad.index_b < count && triad.index_c < count);
    }
}

#[test]
fn test_group_range_shrinks_to_survivors() {
    let mut system = ParticleSystem::new(ParticleSystemDef::default()).unwrap();
    spaced_particles(&mut system, 2);
    let handle = system
        .create_particle_group(&ParticleGroupDef {
            position: Vec2::new(0.0, 10.0),
            shape: Some(Shape::new_box(1.0, 1.0)),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(system.group(handle).unwrap().first_index(), 2);

    system.destroy_particle(0, false).unwrap();
    system.destroy_particle(2, false).unwrap();
    system.destroy_particle(10, false).unwrap();
    system.step(DT, Vec2::ZERO);

    let group = system.group(handle).unwrap();
    assert_eq!((group.first_index(), group.last_index()), (1, 8));
    assert!(system.particle_groups()[1..8].iter().all(|g| *g == Some(handle)));
    assert_eq!(system.particle_groups()[0], None);
}

#[test]
fn test_destroy_in_shape_counts_and_removes() {
    let mut system = ParticleSystem::new(ParticleSystemDef::default()).unwrap();
    spaced_particles(&mut system, 6);

    // Covers x = 3, 6 and 9.
    let removed = system.destroy_particles_in_shape(
        &Shape::new_box(3.5, 1.0),
        &Transform::new(Vec2::new(6.0, 0.0), 0.0),
        false,
    );
    assert_eq!(removed, 3);

    system.step(DT, Vec2::ZERO);
    let xs: Vec<f32> = system.positions().iter().map(|p| p.x).collect();
    assert_eq!(xs, vec![0.0, 12.0, 15.0]);
}

#[test]
fn test_colors_survive_compaction() {
    let mut system = ParticleSystem::new(ParticleSystemDef::default()).unwrap();
    for i in 0..3u8 {
        system
            .create_particle(&ParticleDef {
                position: Vec2::new(3.0 * i as f32, 0.0),
                color: ParticleColor::new(i, 0, 0, 255),
                ..Default::default()
            })
            .unwrap();
    }

    system.destroy_particle(0, false).unwrap();
    system.step(DT, Vec2::ZERO);

    let reds: Vec<u8> = system.colors().unwrap().iter().map(|c| c.r).collect();
    assert_eq!(reds, vec![1, 2]);
}
