use glam::Vec2;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

const X_TRUNC_BITS: u32 = 12;
const Y_TRUNC_BITS: u32 = 12;
const TAG_BITS: u32 = u32::BITS;
const Y_OFFSET: u32 = 1 << (Y_TRUNC_BITS - 1);
const Y_SHIFT: u32 = TAG_BITS - Y_TRUNC_BITS;
const X_SHIFT: u32 = TAG_BITS - Y_TRUNC_BITS - X_TRUNC_BITS;
const X_SCALE: f32 = (1u32 << X_SHIFT) as f32;
const X_OFFSET: f32 = X_SCALE * (1u32 << (X_TRUNC_BITS - 1)) as f32;

/// Packs a position, already scaled to cell units, into a sortable key.
///
/// The row (`y`) occupies the high bits and the column (`x`) the low bits,
/// so sorting by tag orders particles row-major and neighbours in the next
/// row are found by a second contiguous scan.
#[inline]
pub fn compute_tag(x: f32, y: f32) -> u32 {
    ((y + Y_OFFSET as f32) as u32)
        .wrapping_shl(Y_SHIFT)
        .wrapping_add((X_SCALE * x + X_OFFSET) as u32)
}

/// Tag of the cell `(x, y)` cells away from `tag`.
#[inline]
pub fn relative_tag(tag: u32, x: i32, y: i32) -> u32 {
    tag.wrapping_add((y as u32).wrapping_shl(Y_SHIFT))
        .wrapping_add((x as u32).wrapping_shl(X_SHIFT))
}

/// A particle index paired with the tag of its cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Proxy {
    pub index: u32,
    pub tag: u32,
}

/// Proxies sorted by tag. One proxy exists per live particle.
///
/// The order is only valid after `update`; creating particles or writing
/// positions marks the index stale until the next sort.
#[derive(Debug, Default)]
pub struct SpatialIndex {
    proxies: Vec<Proxy>,
    inv_diameter: f32,
    stale: bool,
}

impl SpatialIndex {
    pub fn new(inv_diameter: f32) -> Self {
        Self {
            proxies: Vec::new(),
            inv_diameter,
            stale: false,
        }
    }

    pub fn proxies(&self) -> &[Proxy] {
        &self.proxies
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn mark_stale(&mut self) {
        self.stale = true;
    }

    pub fn set_inv_diameter(&mut self, inv_diameter: f32) {
        self.inv_diameter = inv_diameter;
        self.stale = true;
    }

    /// Tag of a world-space position.
    #[inline]
    pub fn tag_of(&self, p: Vec2) -> u32 {
        compute_tag(self.inv_diameter * p.x, self.inv_diameter * p.y)
    }

    /// Registers a new particle. Its tag is computed on the next `update`.
    pub fn push(&mut self, index: usize) {
        self.proxies.push(Proxy {
            index: index as u32,
            tag: 0,
        });
        self.stale = true;
    }

    /// Recomputes every tag from `positions` and re-sorts.
    pub fn update(&mut self, positions: &[Vec2]) {
        let inv_diameter = self.inv_diameter;
        let retag = |proxy: &mut Proxy| {
            let p = positions[proxy.index as usize];
            proxy.tag = compute_tag(inv_diameter * p.x, inv_diameter * p.y);
        };

        #[cfg(feature = "parallel")]
        {
            self.proxies.par_iter_mut().for_each(retag);
            self.proxies.par_sort_unstable_by_key(|p| (p.tag, p.index));
        }

        #[cfg(not(feature = "parallel"))]
        {
            self.proxies.iter_mut().for_each(retag);
            self.proxies.sort_unstable_by_key(|p| (p.tag, p.index));
        }

        self.stale = false;
    }

    /// Proxies whose tags fall between the tags of `lower` and `upper`.
    ///
    /// The slice is a superset of the particles inside the box: whole rows
    /// between the two corners are included, so callers still test positions.
    pub fn range(&self, lower: Vec2, upper: Vec2) -> &[Proxy] {
        let lower_tag = self.tag_of(lower);
        let upper_tag = self.tag_of(upper);
        let first = self.proxies.partition_point(|p| p.tag < lower_tag);
        let last = self.proxies.partition_point(|p| p.tag <= upper_tag);
        if first >= last {
            return &[];
        }
        &self.proxies[first..last]
    }

    /// Rewrites proxy indices through `map`, dropping proxies mapped to `None`.
    /// Sort order is preserved; tags stay those of the old positions.
    pub fn remap(&mut self, map: impl Fn(u32) -> Option<u32>) {
        self.proxies.retain_mut(|proxy| match map(proxy.index) {
            Some(index) => {
                proxy.index = index;
                true
            }
            None => false,
        });
    }
}
