use glam::Vec2;
use particle_core::{
    ParticleColor, ParticleDef, ParticleError, ParticleSystem, ParticleSystemDef,
};

fn system() -> ParticleSystem {
    ParticleSystem::new(ParticleSystemDef::default()).unwrap()
}

fn particle_at(x: f32) -> ParticleDef {
    ParticleDef {
        position: Vec2::new(x, 0.0),
        ..Default::default()
    }
}

#[test]
fn test_capacity_starts_at_minimum_and_doubles() {
    let mut system = system();
    assert_eq!(system.particle_capacity(), 0);

    system.create_particle(&particle_at(0.0)).unwrap();
    assert_eq!(system.particle_capacity(), 256);

    for i in 1..257 {
        system.create_particle(&particle_at(i as f32)).unwrap();
    }
    assert_eq!(system.particle_count(), 257);
    assert_eq!(system.particle_capacity(), 512);
    assert_eq!(system.positions()[256], Vec2::new(256.0, 0.0));
}

#[test]
fn test_growth_respects_max_count() {
    let mut system = ParticleSystem::new(ParticleSystemDef {
        max_count: 3,
        ..Default::default()
    })
    .unwrap();
    for i in 0..3 {
        system.create_particle(&particle_at(i as f32)).unwrap();
    }
    assert_eq!(system.particle_capacity(), 3);
    assert_eq!(
        system.create_particle(&particle_at(9.0)),
        Err(ParticleError::MaxCountReached { max_count: 3 })
    );
    assert_eq!(system.particle_count(), 3);
}

#[test]
fn test_lowered_max_count_applies_to_single_particles() {
    let mut system = system();
    system.create_particle(&particle_at(0.0)).unwrap();
    assert_eq!(system.particle_capacity(), 256);

    system.set_max_count(2).unwrap();
    system.create_particle(&particle_at(1.0)).unwrap();
    assert_eq!(
        system.create_particle(&particle_at(2.0)),
        Err(ParticleError::MaxCountReached { max_count: 2 })
    );
    assert_eq!(system.particle_count(), 2);

    system.set_max_count(0).unwrap();
    system.create_particle(&particle_at(2.0)).unwrap();
    assert_eq!(system.particle_count(), 3);
}

#[test]
fn test_optional_buffers_are_lazy() {
    let mut system = system();
    system.create_particle(&particle_at(0.0)).unwrap();
    assert!(system.colors().is_none());
    assert!(system.user_data().is_none());
    assert!(system.depths().is_none());

    system
        .create_particle(&ParticleDef {
            position: Vec2::new(5.0, 0.0),
            color: ParticleColor::new(10, 20, 30, 40),
            ..Default::default()
        })
        .unwrap();
    let colors = system.colors().expect("color buffer after a colored particle");
    assert_eq!(colors[0], ParticleColor::default());
    assert_eq!(colors[1], ParticleColor::new(10, 20, 30, 40));
    assert!(system.user_data().is_none(), "user data allocated with colors");

    system.user_data_mut()[0] = 17;
    assert_eq!(system.user_data().unwrap(), &[17, 0]);
}

#[test]
fn test_pinned_positions_are_used_in_place() {
    let mut system = system();
    system.create_particle(&particle_at(1.0)).unwrap();
    system.create_particle(&particle_at(2.0)).unwrap();

    system.set_position_buffer(vec![Vec2::splat(-1.0); 4]).unwrap();
    assert_eq!(system.positions(), &[Vec2::new(1.0, 0.0), Vec2::new(2.0, 0.0)]);
    assert_eq!(system.particle_capacity(), 4);

    system.create_particle(&particle_at(3.0)).unwrap();
    system.create_particle(&particle_at(4.0)).unwrap();
    assert_eq!(
        system.create_particle(&particle_at(5.0)),
        Err(ParticleError::CapacityExceeded {
            buffer: "position",
            capacity: 4,
        })
    );

    let released = system.release_position_buffer().expect("buffer was pinned");
    let xs: Vec<f32> = released.iter().map(|p| p.x).collect();
    assert_eq!(xs, vec![1.0, 2.0, 3.0, 4.0]);

    // Back on owned storage: growth resumes.
    system.create_particle(&particle_at(5.0)).unwrap();
    assert_eq!(system.particle_count(), 5);
    assert_eq!(system.positions()[4].x, 5.0);
}

#[test]
fn test_pinned_buffer_shorter_than_count_is_rejected() {
    let mut system = system();
    for i in 0..3 {
        system.create_particle(&particle_at(i as f32)).unwrap();
    }
    assert!(matches!(
        system.set_velocity_buffer(vec![Vec2::ZERO; 2]),
        Err(ParticleError::CapacityExceeded { buffer: "velocity", .. })
    ));
    assert!(system.release_velocity_buffer().is_none(), "nothing was pinned");
}

#[test]
fn test_pinned_user_data_buffer_takes_values() {
    let mut system = system();
    system.set_user_data_buffer(vec![0; 8]).unwrap();
    system
        .create_particle(&ParticleDef {
            user_data: 99,
            ..Default::default()
        })
        .unwrap();
    assert_eq!(system.user_data().unwrap(), &[99]);
    let released = system.release_user_data_buffer().unwrap();
    assert_eq!(released.len(), 8);
    assert_eq!(released[0], 99);
}

#[test]
fn test_group_creation_checks_pinned_room_up_front() {
    let mut system = system();
    system.set_flags_buffer(vec![Default::default(); 5]).unwrap();
    let result = system.create_particle_group(&particle_core::ParticleGroupDef {
        shape: Some(particle_core::Shape::new_box(1.0, 1.0)),
        ..Default::default()
    });
    assert_eq!(
        result,
        Err(ParticleError::CapacityExceeded {
            buffer: "flags",
            capacity: 5,
        })
    );
    assert_eq!(system.particle_count(), 0);
    assert_eq!(system.group_count(), 0);
}
