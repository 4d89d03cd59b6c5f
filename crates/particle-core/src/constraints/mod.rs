pub mod contact;
pub mod pair;
pub mod rigid;
pub mod triad;

pub use contact::{find_contacts, BodyContact, ParticleContact};
pub use pair::{solve_springs, Pair};
pub use rigid::solve_rigid_group;
pub use triad::{solve_elastic, Triad};
