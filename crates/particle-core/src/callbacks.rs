use crate::group::ParticleGroupHandle;

/// What is being destroyed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Goodbye {
    /// Index of the particle at the moment it is removed.
    Particle(usize),
    Group(ParticleGroupHandle),
}

/// Notified right before particles or groups go away.
///
/// Particles are reported only when they carry
/// [`ParticleFlags::DESTRUCTION_LISTENER`](crate::particle::ParticleFlags::DESTRUCTION_LISTENER).
pub trait DestructionListener {
    fn say_goodbye(&mut self, goodbye: Goodbye);
}

impl<F: FnMut(Goodbye)> DestructionListener for F {
    fn say_goodbye(&mut self, goodbye: Goodbye) {
        self(goodbye)
    }
}
