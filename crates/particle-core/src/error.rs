use thiserror::Error;

/// Errors reported by fallible particle system operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParticleError {
    /// A caller-supplied buffer is too short for the live particles.
    #[error("pinned {buffer} buffer is full (capacity {capacity})")]
    CapacityExceeded {
        buffer: &'static str,
        capacity: usize,
    },
    #[error("particle limit of {max_count} reached")]
    MaxCountReached { max_count: usize },
    #[error("particle index {index} out of range (count {count})")]
    InvalidParticleIndex { index: usize, count: usize },
    #[error("particle group handle is stale or unknown")]
    InvalidGroup,
    #[error("cannot join a particle group with itself")]
    JoinSameGroup,
    #[error("max count {requested} is below the live particle count {count}")]
    InvalidMaxCount { requested: usize, count: usize },
    #[error("invalid particle system configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, ParticleError>;
