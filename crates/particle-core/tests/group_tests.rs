use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec2;
use particle_core::{
    Goodbye, ParticleDef, ParticleError, ParticleFlags, ParticleGroupDef, ParticleGroupFlags,
    ParticleSystem, ParticleSystemDef, Shape,
};

const DT: f32 = 1.0 / 60.0;

fn system() -> ParticleSystem {
    ParticleSystem::new(ParticleSystemDef::default()).unwrap()
}

/// 3x3 particles at spacing 0.75 around `position`.
fn square(position: Vec2) -> ParticleGroupDef {
    ParticleGroupDef {
        position,
        shape: Some(Shape::new_box(1.0, 1.0)),
        ..Default::default()
    }
}

/// 5 particles in a row at spacing 0.75, centered on `position`.
fn row(position: Vec2) -> ParticleGroupDef {
    ParticleGroupDef {
        position,
        shape: Some(Shape::new_box(2.0, 0.1)),
        ..Default::default()
    }
}

fn assert_groups_disjoint(system: &ParticleSystem) {
    let ranges: Vec<(usize, usize)> = system
        .groups()
        .map(|(_, g)| (g.first_index(), g.last_index()))
        .filter(|(first, last)| first < last)
        .collect();
    for (i, a) in ranges.iter().enumerate() {
        for b in &ranges[i + 1..] {
            assert!(a.1 <= b.0 || b.1 <= a.0, "ranges {:?} and {:?} overlap", a, b);
        }
    }
}

#[test]
fn test_create_group_samples_shape() {
    let mut system = system();
    let handle = system.create_particle_group(&square(Vec2::new(10.0, 5.0))).unwrap();

    let group = system.group(handle).unwrap();
    assert_eq!(group.first_index(), 0);
    assert_eq!(group.last_index(), 9);
    assert_eq!(system.particle_count(), 9);
    assert_eq!(group.position(), Vec2::new(10.0, 5.0));
    for (i, p) in system.positions().iter().enumerate() {
        assert!(
            (p.x - 10.0).abs() <= 1.0 && (p.y - 5.0).abs() <= 1.0,
            "particle {} at {:?} outside the box",
            i,
            p
        );
        assert_eq!(system.particle_groups()[i], Some(handle));
    }
}

#[test]
fn test_create_group_gives_rigid_motion_velocities() {
    let mut system = system();
    system
        .create_particle_group(&ParticleGroupDef {
            linear_velocity: Vec2::new(1.0, 0.0),
            angular_velocity: 2.0,
            ..square(Vec2::new(3.0, 0.0))
        })
        .unwrap();

    for (p, v) in system.positions().iter().zip(system.velocities()) {
        let r = *p - Vec2::new(3.0, 0.0);
        let expected = Vec2::new(1.0, 0.0) + 2.0 * Vec2::new(-r.y, r.x);
        assert!((*v - expected).length() < 1e-5, "velocity {:?} != {:?}", v, expected);
    }
}

#[test]
fn test_group_without_shape_is_empty() {
    let mut system = system();
    let handle = system.create_particle_group(&ParticleGroupDef::default()).unwrap();
    assert_eq!(system.group(handle).unwrap().particle_count(), 0);
    assert_eq!(system.group_count(), 1);
    assert_eq!(system.particle_count(), 0);
}

#[test]
fn test_group_particles_carry_def_flags_and_color() {
    let mut system = system();
    let color = particle_core::ParticleColor::new(10, 20, 30, 255);
    system
        .create_particle_group(&ParticleGroupDef {
            flags: ParticleFlags::VISCOUS,
            color,
            ..square(Vec2::ZERO)
        })
        .unwrap();

    assert!(system.flags().iter().all(|f| *f == ParticleFlags::VISCOUS));
    assert!(system.colors().unwrap().iter().all(|c| *c == color));
}

#[test]
fn test_spring_group_creates_pairs_inside_group() {
    let mut system = system();
    let handle = system
        .create_particle_group(&ParticleGroupDef {
            flags: ParticleFlags::SPRING,
            strength: 0.5,
            ..square(Vec2::ZERO)
        })
        .unwrap();
    let group = system.group(handle).unwrap();

    // 3x3 grid at spacing 0.75: 12 edges shorter than one diameter.
    assert_eq!(system.pairs().len(), 12);
    for pair in system.pairs() {
        let (a, b) = (pair.index_a as usize, pair.index_b as usize);
        assert!(a < b, "pair not ordered");
        assert!(group.contains(a) && group.contains(b));
        assert_eq!(pair.strength, 0.5);
        let d = system.positions()[a].distance(system.positions()[b]);
        assert!((pair.distance - d).abs() < 1e-6);
    }
}

#[test]
fn test_elastic_group_creates_short_triads() {
    let mut system = system();
    system
        .create_particle_group(&ParticleGroupDef {
            flags: ParticleFlags::ELASTIC,
            ..square(Vec2::ZERO)
        })
        .unwrap();

    assert!(!system.triads().is_empty(), "no triads built");
    let max = 2.0 * system.diameter();
    let positions = system.positions();
    for triad in system.triads() {
        let (a, b, c) = (
            positions[triad.index_a as usize],
            positions[triad.index_b as usize],
            positions[triad.index_c as usize],
        );
        assert!(a.distance(b) < max && b.distance(c) < max && c.distance(a) < max);
        assert!(triad.flags.contains(ParticleFlags::ELASTIC));
    }
}

#[test]
fn test_solid_group_depth() {
    let mut system = system();
    system
        .create_particle_group(&ParticleGroupDef {
            group_flags: ParticleGroupFlags::SOLID,
            ..square(Vec2::ZERO)
        })
        .unwrap();

    let depths = system.depths().expect("depth buffer allocated");
    // Index 4 is the center; every other particle is on the surface.
    for (i, d) in depths.iter().enumerate() {
        if i == 4 {
            assert!((d - 0.75).abs() < 1e-5, "center depth {}", d);
        } else {
            assert_eq!(*d, 0.0, "surface particle {} has depth {}", i, d);
        }
    }
}

#[test]
fn test_join_moves_groups_together() {
    let mut system = system();
    let a = system.create_particle_group(&square(Vec2::ZERO)).unwrap();
    let loose = system
        .create_particle(&ParticleDef {
            position: Vec2::new(0.0, 20.0),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(loose, 9);
    let b = system.create_particle_group(&square(Vec2::new(5.0, 0.0))).unwrap();

    system.join_particle_groups(a, b).unwrap();

    assert!(system.group(b).is_none(), "absorbed group still alive");
    assert_eq!(system.group_count(), 1);
    // The loose particle is rotated in front of A so B can follow A.
    let group = system.group(a).unwrap();
    assert_eq!((group.first_index(), group.last_index()), (1, 19));
    assert_eq!(system.particle_count(), 19);
    assert_eq!(system.positions()[0], Vec2::new(0.0, 20.0));
    assert_eq!(system.particle_groups()[0], None);
    assert!(system.particle_groups()[1..].iter().all(|g| *g == Some(a)));
    assert!(system.positions()[1..10].iter().all(|p| p.x.abs() <= 1.0));
    assert!(system.positions()[10..].iter().all(|p| p.x > 3.0));
}

#[test]
fn test_join_when_second_group_comes_first() {
    let mut system = system();
    let b = system.create_particle_group(&square(Vec2::new(5.0, 0.0))).unwrap();
    let a = system.create_particle_group(&square(Vec2::ZERO)).unwrap();

    system.join_particle_groups(a, b).unwrap();

    let group = system.group(a).unwrap();
    assert_eq!(group.particle_count(), 18);
    assert!(system.positions()[group.first_index()..group.first_index() + 9]
        .iter()
        .all(|p| p.x.abs() <= 1.0));
    assert_groups_disjoint(&system);
}

#[test]
fn test_join_adds_pairs_across_seam() {
    let mut system = system();
    let spring = |position| ParticleGroupDef {
        flags: ParticleFlags::SPRING,
        ..square(position)
    };
    let a = system.create_particle_group(&spring(Vec2::ZERO)).unwrap();
    let b = system.create_particle_group(&spring(Vec2::new(2.25, 0.0))).unwrap();
    let before = system.pairs().len();

    system.join_particle_groups(a, b).unwrap();

    // The facing columns are 0.75 apart: three more pairs.
    assert_eq!(system.pairs().len(), before + 3);
    for pair in system.pairs() {
        let d = system.positions()[pair.index_a as usize]
            .distance(system.positions()[pair.index_b as usize]);
        assert!((pair.distance - d).abs() < 1e-5, "pair remapped wrongly");
    }
}

#[test]
fn test_join_rejects_bad_handles() {
    let mut system = system();
    let a = system.create_particle_group(&square(Vec2::ZERO)).unwrap();
    let b = system.create_particle_group(&square(Vec2::new(5.0, 0.0))).unwrap();

    assert!(matches!(
        system.join_particle_groups(a, a),
        Err(ParticleError::JoinSameGroup)
    ));

    system.destroy_particle_group(b).unwrap();
    assert!(matches!(
        system.join_particle_groups(a, b),
        Err(ParticleError::InvalidGroup)
    ));
}

#[test]
fn test_join_with_empty_second_group() {
    let mut system = system();
    let empty = system.create_particle_group(&ParticleGroupDef::default()).unwrap();
    let a = system.create_particle_group(&square(Vec2::ZERO)).unwrap();

    system.join_particle_groups(a, empty).unwrap();

    assert!(system.group(empty).is_none(), "empty group survived the join");
    assert_eq!(system.group_count(), 1);
    let group = system.group(a).unwrap();
    assert_eq!((group.first_index(), group.last_index()), (0, 9));
    assert!(system.particle_groups().iter().all(|&g| g == Some(a)));
}

#[test]
fn test_join_empty_group_adopts_second_range() {
    let mut system = system();
    let empty = system.create_particle_group(&ParticleGroupDef::default()).unwrap();
    let loose = system
        .create_particle(&ParticleDef {
            position: Vec2::new(-5.0, 0.0),
            ..Default::default()
        })
        .unwrap();
    let c = system.create_particle_group(&square(Vec2::new(5.0, 0.0))).unwrap();
    let b = system.create_particle_group(&square(Vec2::new(10.0, 0.0))).unwrap();

    system.join_particle_groups(empty, b).unwrap();

    assert!(system.group(b).is_none());
    let merged = system.group(empty).unwrap();
    assert_eq!((merged.first_index(), merged.last_index()), (10, 19));
    assert!(!merged.contains(loose), "merged group took the loose particle");
    assert_eq!(system.particle_groups()[loose], None);
    let other = system.group(c).unwrap();
    assert_eq!((other.first_index(), other.last_index()), (1, 10));
    for i in 10..19 {
        assert_eq!(system.particle_groups()[i], Some(empty));
    }
    assert_groups_disjoint(&system);
}

#[test]
fn test_destroy_group_keeps_particles() {
    let mut system = system();
    let goodbyes = Rc::new(RefCell::new(Vec::new()));
    let log = goodbyes.clone();
    system.set_destruction_listener(move |g: Goodbye| log.borrow_mut().push(g));
    let handle = system.create_particle_group(&square(Vec2::ZERO)).unwrap();

    system.destroy_particle_group(handle).unwrap();

    assert_eq!(system.particle_count(), 9);
    assert_eq!(system.group_count(), 0);
    assert!(system.particle_groups().iter().all(|g| g.is_none()));
    assert_eq!(*goodbyes.borrow(), vec![Goodbye::Group(handle)]);
    assert!(matches!(
        system.destroy_particle_group(handle),
        Err(ParticleError::InvalidGroup)
    ));
}

#[test]
fn test_emptied_group_is_destroyed_automatically() {
    let mut system = system();
    let goodbyes = Rc::new(RefCell::new(Vec::new()));
    let log = goodbyes.clone();
    system.set_destruction_listener(move |g: Goodbye| log.borrow_mut().push(g));
    let handle = system.create_particle_group(&square(Vec2::ZERO)).unwrap();

    system.destroy_particles_in_group(handle, true).unwrap();
    system.step(DT, Vec2::ZERO);

    assert_eq!(system.particle_count(), 0);
    assert!(system.group(handle).is_none());
    let goodbyes = goodbyes.borrow();
    assert_eq!(goodbyes.len(), 10);
    assert_eq!(goodbyes[9], Goodbye::Group(handle));
}

#[test]
fn test_emptied_group_can_survive() {
    let mut system = system();
    let handle = system
        .create_particle_group(&ParticleGroupDef {
            destroy_automatically: false,
            ..square(Vec2::ZERO)
        })
        .unwrap();
    system
        .create_particle(&ParticleDef {
            position: Vec2::new(10.0, 0.0),
            ..Default::default()
        })
        .unwrap();

    system.destroy_particles_in_group(handle, false).unwrap();
    system.step(DT, Vec2::ZERO);

    let group = system.group(handle).expect("group kept");
    assert_eq!(group.particle_count(), 0);
    assert_eq!(system.particle_count(), 1);
}

#[test]
fn test_group_statistics() {
    let mut system = system();
    let handle = system
        .create_particle_group(&ParticleGroupDef {
            linear_velocity: Vec2::new(0.5, -1.0),
            ..square(Vec2::new(2.0, 3.0))
        })
        .unwrap();

    let stats = system.group_statistics(handle).unwrap();
    assert!((stats.mass - 9.0 * system.particle_mass()).abs() < 1e-5);
    assert!((stats.center - Vec2::new(2.0, 3.0)).length() < 1e-5);
    assert!((stats.linear_velocity - Vec2::new(0.5, -1.0)).length() < 1e-5);
    assert!(stats.angular_velocity.abs() < 1e-5);
    assert!(stats.inertia > 0.0);
    assert_eq!(system.group_statistics(handle).unwrap(), stats, "cached value differs");
}

#[test]
fn test_group_statistics_refresh_after_step() {
    let mut system = system();
    let handle = system
        .create_particle_group(&ParticleGroupDef {
            linear_velocity: Vec2::new(1.0, 0.0),
            ..square(Vec2::ZERO)
        })
        .unwrap();
    let before = system.group_statistics(handle).unwrap();

    system.step(DT, Vec2::ZERO);

    let after = system.group_statistics(handle).unwrap();
    assert!(after.center.x > before.center.x, "statistics not recomputed");
}

#[test]
fn test_rigid_group_splits_when_broken() {
    let mut system = system();
    let handle = system
        .create_particle_group(&ParticleGroupDef {
            group_flags: ParticleGroupFlags::RIGID,
            user_data: 7,
            ..row(Vec2::ZERO)
        })
        .unwrap();
    assert_eq!(system.particle_count(), 5);

    system.destroy_particle(2, false).unwrap();
    system.step(DT, Vec2::ZERO);

    assert_eq!(system.particle_count(), 4);
    assert_eq!(system.group_count(), 2);
    let original = system.group(handle).unwrap();
    assert_eq!((original.first_index(), original.last_index()), (0, 2));
    for (_, group) in system.groups() {
        assert_eq!(group.particle_count(), 2);
        assert!(group.group_flags().contains(ParticleGroupFlags::RIGID));
        assert_eq!(group.user_data(), 7);
    }
    assert_groups_disjoint(&system);
}

#[test]
fn test_rigid_group_stays_whole_when_connected() {
    let mut system = system();
    system
        .create_particle_group(&ParticleGroupDef {
            group_flags: ParticleGroupFlags::RIGID,
            ..row(Vec2::ZERO)
        })
        .unwrap();

    system.destroy_particle(0, false).unwrap();
    system.step(DT, Vec2::ZERO);

    assert_eq!(system.group_count(), 1);
    assert_eq!(system.particle_count(), 4);
}

#[test]
fn test_creation_respects_max_count_atomically() {
    let mut system = ParticleSystem::new(ParticleSystemDef {
        max_count: 5,
        ..Default::default()
    })
    .unwrap();

    let result = system.create_particle_group(&square(Vec2::ZERO));

    assert!(matches!(result, Err(ParticleError::MaxCountReached { max_count: 5 })));
    assert_eq!(system.particle_count(), 0, "partial group left behind");
    assert_eq!(system.group_count(), 0);
}
