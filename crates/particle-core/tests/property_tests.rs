//! Property-based tests for the particle system using proptest
//!
//! Invariants checked across random particle clouds:
//! - Compaction keeps survivors in their original relative order
//! - Contacts are unique, in range and weighted in (0, 1]
//! - Group ranges stay disjoint and match the per-particle group refs
//! - Positions and velocities stay finite

use glam::Vec2;
use particle_core::{
    ParticleDef, ParticleFlags, ParticleGroupDef, ParticleSystem, ParticleSystemDef, Shape,
};
use proptest::prelude::*;

const DT: f32 = 1.0 / 60.0;
const EXTENT: f32 = 8.0;

fn position() -> impl Strategy<Value = Vec2> {
    (-EXTENT..EXTENT, -EXTENT..EXTENT).prop_map(|(x, y)| Vec2::new(x, y))
}

fn velocity() -> impl Strategy<Value = Vec2> {
    (-5.0f32..5.0, -5.0f32..5.0).prop_map(|(x, y)| Vec2::new(x, y))
}

fn material() -> impl Strategy<Value = ParticleFlags> {
    prop_oneof![
        Just(ParticleFlags::empty()),
        Just(ParticleFlags::VISCOUS),
        Just(ParticleFlags::POWDER),
        Just(ParticleFlags::TENSILE),
        Just(ParticleFlags::WALL),
    ]
}

/// Particles tagged with user data `1..=n`, each with a kill bit.
fn cloud() -> impl Strategy<Value = Vec<(Vec2, Vec2, ParticleFlags, bool)>> {
    prop::collection::vec((position(), velocity(), material(), any::<bool>()), 1..120)
}

fn build(cloud: &[(Vec2, Vec2, ParticleFlags, bool)]) -> ParticleSystem {
    let mut system = ParticleSystem::new(ParticleSystemDef::default()).unwrap();
    for (i, &(position, velocity, flags, _)) in cloud.iter().enumerate() {
        system
            .create_particle(&ParticleDef {
                flags,
                position,
                velocity,
                user_data: i + 1,
                ..Default::default()
            })
            .unwrap();
    }
    system
}

fn group_defs() -> impl Strategy<Value = Vec<(Vec2, f32, f32, bool)>> {
    prop::collection::vec(
        (position(), 0.2f32..2.0, 0.2f32..2.0, any::<bool>()),
        1..6,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Property: removing particles never reorders the survivors
    #[test]
    fn test_compaction_preserves_order(cloud in cloud()) {
        let mut system = build(&cloud);
        for (i, &(_, _, _, kill)) in cloud.iter().enumerate() {
            if kill {
                system.destroy_particle(i, false).unwrap();
            }
        }

        system.step(DT, Vec2::ZERO);

        let expected: Vec<usize> = cloud
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.3)
            .map(|(i, _)| i + 1)
            .collect();
        prop_assert_eq!(system.particle_count(), expected.len());
        if !expected.is_empty() {
            prop_assert_eq!(system.user_data().unwrap(), &expected[..]);
        }
    }

    /// Property: every contact is a distinct in-range pair closer than one diameter
    #[test]
    fn test_contacts_are_well_formed(cloud in cloud()) {
        let mut system = build(&cloud);
        system.update_contacts();

        let count = system.particle_count() as u32;
        let diameter = system.diameter();
        let mut seen = std::collections::HashSet::new();
        for c in system.contacts() {
            prop_assert!(c.index_a < count && c.index_b < count);
            prop_assert!(c.index_a != c.index_b, "self contact {}", c.index_a);
            prop_assert!(c.weight > 0.0 && c.weight <= 1.0, "weight {}", c.weight);
            let key = (c.index_a.min(c.index_b), c.index_a.max(c.index_b));
            prop_assert!(seen.insert(key), "duplicate contact {:?}", key);
            let d = system.positions()[c.index_a as usize]
                .distance(system.positions()[c.index_b as usize]);
            prop_assert!(d < diameter, "contact at distance {}", d);
        }
    }

    /// Property: simulation state stays finite
    #[test]
    fn test_stepping_stays_finite(cloud in cloud()) {
        let mut system = build(&cloud);
        for _ in 0..10 {
            system.step(DT, Vec2::new(0.0, -10.0));
        }
        for (i, (p, v)) in system.positions().iter().zip(system.velocities()).enumerate() {
            prop_assert!(p.is_finite(), "position {} is {:?}", i, p);
            prop_assert!(v.is_finite(), "velocity {} is {:?}", i, v);
        }
    }

    /// Property: group ranges partition their particles after joins and removals
    #[test]
    fn test_groups_stay_disjoint(defs in group_defs(), loose in cloud()) {
        let mut system = build(&loose[..loose.len().min(10)]);
        let mut handles = Vec::new();
        for &(position, hx, hy, spring) in &defs {
            let flags = if spring { ParticleFlags::SPRING } else { ParticleFlags::empty() };
            let handle = system
                .create_particle_group(&ParticleGroupDef {
                    flags,
                    position,
                    shape: Some(Shape::new_box(hx, hy)),
                    ..Default::default()
                })
                .unwrap();
            handles.push(handle);
        }
        for pair in handles.chunks(2) {
            if let &[a, b] = pair {
                system.join_particle_groups(a, b).unwrap();
            }
        }
        for i in (0..system.particle_count()).step_by(3) {
            system.destroy_particle(i, false).unwrap();
        }
        system.step(DT, Vec2::ZERO);

        let count = system.particle_count() as u32;
        for pair in system.pairs() {
            prop_assert!(pair.index_a < count && pair.index_b < count);
        }
        let mut ranges: Vec<(usize, usize)> = system
            .groups()
            .map(|(_, g)| (g.first_index(), g.last_index()))
            .collect();
        ranges.sort_unstable();
        for w in ranges.windows(2) {
            prop_assert!(w[0].1 <= w[1].0, "overlapping ranges {:?}", w);
        }
        for (handle, group) in system.groups() {
            prop_assert!(group.first_index() < group.last_index(), "empty group survived");
            for i in group.first_index()..group.last_index() {
                prop_assert_eq!(system.particle_groups()[i], Some(handle));
            }
        }
        let grouped: usize = system.groups().map(|(_, g)| g.particle_count()).sum();
        let referenced = system.particle_groups().iter().filter(|g| g.is_some()).count();
        prop_assert_eq!(grouped, referenced);
    }
}
