use crate::constraints::ParticleContact;
use crate::particle::{ParticleColor, ParticleFlags};

/// Exchanges color between touching color-mixing particles.
///
/// Integer fixed point with 8 fractional bits; the exchange is symmetric
/// so both colors stay between their old values.
pub fn solve_color_mixing(
    color_mixing_strength: f32,
    contacts: &[ParticleContact],
    flags: &[ParticleFlags],
    colors: &mut [ParticleColor],
) {
    let k = (256.0 * color_mixing_strength) as i32;
    let mix = |a: &mut u8, b: &mut u8| {
        let d = (k * (*b as i32 - *a as i32)) >> 8;
        *a = (*a as i32 + d) as u8;
        *b = (*b as i32 - d) as u8;
    };
    for contact in contacts {
        let a = contact.index_a as usize;
        let b = contact.index_b as usize;
        if !(flags[a] & flags[b]).contains(ParticleFlags::COLOR_MIXING) || a == b {
            continue;
        }
        let (ca, cb) = if a < b {
            let (lo, hi) = colors.split_at_mut(b);
            (&mut lo[a], &mut hi[0])
        } else {
            let (lo, hi) = colors.split_at_mut(a);
            (&mut hi[0], &mut lo[b])
        };
        mix(&mut ca.r, &mut cb.r);
        mix(&mut ca.g, &mut cb.g);
        mix(&mut ca.b, &mut cb.b);
        mix(&mut ca.a, &mut cb.a);
    }
}
