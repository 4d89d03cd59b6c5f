use glam::Vec2;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::grid::{relative_tag, Proxy};
use crate::particle::ParticleFlags;
use crate::world::{BodyId, FixtureId};

/// Two particles closer than one diameter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParticleContact {
    pub index_a: u32,
    pub index_b: u32,
    /// `1 - distance / diameter`, in `(0, 1]`.
    pub weight: f32,
    /// Unit vector from A to B; zero when the particles coincide.
    pub normal: Vec2,
    /// Union of both particles' flags.
    pub flags: ParticleFlags,
}

/// A particle closer than one diameter to a body fixture.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyContact {
    pub index: u32,
    pub body: BodyId,
    pub fixture: FixtureId,
    pub weight: f32,
    /// Points from the fixture surface towards the particle's far side.
    pub normal: Vec2,
    /// Effective mass along `normal`.
    pub mass: f32,
}

/// Contact between particles `a` and `b`, or `None` when they are too far apart.
#[inline]
pub fn make_contact(
    a: u32,
    b: u32,
    positions: &[Vec2],
    flags: &[ParticleFlags],
    diameter: f32,
) -> Option<ParticleContact> {
    let d = positions[b as usize] - positions[a as usize];
    let dist_sq = d.length_squared();
    if dist_sq >= diameter * diameter {
        return None;
    }
    let dist = dist_sq.sqrt();
    let normal = if dist > 0.0 { d / dist } else { Vec2::ZERO };
    Some(ParticleContact {
        index_a: a,
        index_b: b,
        weight: 1.0 - dist / diameter,
        normal,
        flags: flags[a as usize] | flags[b as usize],
    })
}

/// Contacts of proxy `a` with the proxies after it in its own cell row and
/// with the three cells of the next row.
fn contacts_of(
    a: usize,
    proxies: &[Proxy],
    positions: &[Vec2],
    flags: &[ParticleFlags],
    diameter: f32,
    out: &mut Vec<ParticleContact>,
) {
    let proxy = proxies[a];
    let right = relative_tag(proxy.tag, 1, 0);
    for other in &proxies[a + 1..] {
        if right < other.tag {
            break;
        }
        out.extend(make_contact(proxy.index, other.index, positions, flags, diameter));
    }

    let bottom_left = relative_tag(proxy.tag, -1, 1);
    let bottom_right = relative_tag(proxy.tag, 1, 1);
    let start = a + 1 + proxies[a + 1..].partition_point(|p| p.tag < bottom_left);
    for other in &proxies[start..] {
        if bottom_right < other.tag {
            break;
        }
        out.extend(make_contact(proxy.index, other.index, positions, flags, diameter));
    }
}

/// Finds every particle pair closer than `diameter` using proxies sorted by tag.
///
/// Each pair is reported once. Only forward scans are needed: the current row
/// up to one cell right, and the next row from one cell left to one cell right.
pub fn find_contacts(
    proxies: &[Proxy],
    positions: &[Vec2],
    flags: &[ParticleFlags],
    diameter: f32,
) -> Vec<ParticleContact> {
    #[cfg(feature = "parallel")]
    {
        (0..proxies.len())
            .into_par_iter()
            .flat_map_iter(|a| {
                let mut local = Vec::new();
                contacts_of(a, proxies, positions, flags, diameter, &mut local);
                local
            })
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        let mut contacts = Vec::new();
        for a in 0..proxies.len() {
            contacts_of(a, proxies, positions, flags, diameter, &mut contacts);
        }
        contacts
    }
}
