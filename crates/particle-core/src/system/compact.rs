use crate::callbacks::Goodbye;
use crate::group::{ParticleGroup, ParticleGroupFlags, ParticleGroupHandle};
use crate::particle::ParticleFlags;

use super::ParticleSystem;

impl ParticleSystem {
    /// Rewrites every stored particle index through `map`. Entries that map
    /// to `None` are dropped; the order of the remaining entries is kept.
    fn remap_indices(&mut self, map: impl Fn(u32) -> Option<u32>) {
        self.index.remap(&map);
        self.contacts.retain_mut(|c| match (map(c.index_a), map(c.index_b)) {
            (Some(a), Some(b)) => {
                c.index_a = a;
                c.index_b = b;
                true
            }
            _ => false,
        });
        self.body_contacts.retain_mut(|c| match map(c.index) {
            Some(a) => {
                c.index = a;
                true
            }
            None => false,
        });
        self.pairs.retain_mut(|p| match (map(p.index_a), map(p.index_b)) {
            (Some(a), Some(b)) => {
                p.index_a = a;
                p.index_b = b;
                true
            }
            _ => false,
        });
        self.triads.retain_mut(|t| {
            match (map(t.index_a), map(t.index_b), map(t.index_c)) {
                (Some(a), Some(b), Some(c)) => {
                    t.index_a = a;
                    t.index_b = b;
                    t.index_c = c;
                    true
                }
                _ => false,
            }
        });
    }

    /// Removes every particle flagged as a zombie.
    ///
    /// Survivors keep their relative order. Groups shrink to the range of
    /// their survivors; emptied groups are destroyed if they destroy
    /// automatically, and partly destroyed rigid groups are split into
    /// their connected pieces.
    pub(crate) fn solve_zombie(&mut self) {
        let count = self.buffers.count;
        let mut new_indices: Vec<Option<u32>> = vec![None; count];
        let mut new_count = 0;
        for (i, slot) in new_indices.iter_mut().enumerate() {
            let flags = self.buffers.flags.data[i];
            if flags.contains(ParticleFlags::ZOMBIE) {
                if flags.contains(ParticleFlags::DESTRUCTION_LISTENER) {
                    if let Some(listener) = self.listener.as_mut() {
                        listener.say_goodbye(Goodbye::Particle(i));
                    }
                }
            } else {
                *slot = Some(new_count as u32);
                if i != new_count {
                    self.buffers.move_particle(i, new_count);
                }
                new_count += 1;
            }
        }

        self.remap_indices(|i| new_indices[i as usize]);

        for group in self.groups.values_mut() {
            let mut first = new_count;
            let mut last = 0;
            let mut modified = false;
            for &j in &new_indices[group.first..group.last] {
                match j {
                    Some(j) => {
                        first = first.min(j as usize);
                        last = last.max(j as usize + 1);
                    }
                    None => modified = true,
                }
            }
            if first < last {
                group.first = first;
                group.last = last;
                if modified && group.group_flags.contains(ParticleGroupFlags::RIGID) {
                    group.to_be_split = true;
                }
            } else {
                group.first = 0;
                group.last = 0;
                if group.destroy_automatically {
                    group.to_be_destroyed = true;
                }
            }
        }

        self.buffers.count = new_count;
        self.touch();
        log::debug!("compacted particles {} -> {}", count, new_count);

        let doomed: Vec<ParticleGroupHandle> = self
            .groups
            .iter()
            .filter(|(_, g)| g.to_be_destroyed)
            .map(|(h, _)| h)
            .collect();
        for handle in doomed {
            self.remove_group(handle, true);
        }

        let to_split: Vec<ParticleGroupHandle> = self
            .groups
            .iter()
            .filter(|(_, g)| g.to_be_split)
            .map(|(h, _)| h)
            .collect();
        for handle in to_split {
            self.split_rigid_group(handle);
        }
    }

    /// Moves particles `[mid, end)` to `start`, shifting `[start, mid)` up
    /// behind them, and remaps every index and group range.
    pub(crate) fn rotate_buffer(&mut self, start: usize, mid: usize, end: usize) {
        if start == mid || mid == end {
            return;
        }
        let new_index = |i: usize| -> usize {
            if i < start {
                i
            } else if i < mid {
                i + end - mid
            } else if i < end {
                i + start - mid
            } else {
                i
            }
        };
        self.buffers.rotate(start, mid, end);
        self.remap_indices(|i| Some(new_index(i as usize) as u32));
        for group in self.groups.values_mut() {
            if group.first < group.last {
                group.first = new_index(group.first);
                group.last = new_index(group.last - 1) + 1;
            }
        }
        self.touch();
    }

    /// Reorders `[start, start + order.len())` so slot `start + k` receives
    /// the particle previously at `start + order[k]`.
    pub(crate) fn permute_range(&mut self, start: usize, order: &[usize]) {
        let mut inverse = vec![0usize; order.len()];
        for (k, &old) in order.iter().enumerate() {
            inverse[old] = k;
        }
        let end = start + order.len();
        self.buffers.permute(start, order);
        self.remap_indices(|i| {
            let i = i as usize;
            let j = if start <= i && i < end {
                start + inverse[i - start]
            } else {
                i
            };
            Some(j as u32)
        });
        self.touch();
    }

    /// Splits a rigid group whose particles no longer touch into one group
    /// per connected piece. The first piece keeps the handle.
    pub(crate) fn split_rigid_group(&mut self, handle: ParticleGroupHandle) {
        let Some(group) = self.groups.get_mut(handle) else {
            return;
        };
        group.to_be_split = false;
        let (first, last) = (group.first, group.last);
        if last - first < 2 {
            return;
        }

        self.rebuild_contacts(false);
        let n = last - first;
        let mut parent: Vec<usize> = (0..n).collect();
        fn find(parent: &mut [usize], mut i: usize) -> usize {
            while parent[i] != i {
                parent[i] = parent[parent[i]];
                i = parent[i];
            }
            i
        }
        for contact in &self.contacts {
            let a = contact.index_a as usize;
            let b = contact.index_b as usize;
            if a < first || a >= last || b < first || b >= last {
                continue;
            }
            let ra = find(&mut parent, a - first);
            let rb = find(&mut parent, b - first);
            if ra != rb {
                parent[ra.max(rb)] = ra.min(rb);
            }
        }

        // Component ids in order of each component's lowest index.
        let mut component_of_root = vec![usize::MAX; n];
        let mut component = vec![0usize; n];
        let mut components = 0;
        for k in 0..n {
            let root = find(&mut parent, k);
            if component_of_root[root] == usize::MAX {
                component_of_root[root] = components;
                components += 1;
            }
            component[k] = component_of_root[root];
        }
        if components < 2 {
            return;
        }

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by_key(|&k| component[k]);
        self.permute_range(first, &order);

        let mut sizes = vec![0usize; components];
        for &c in &component {
            sizes[c] += 1;
        }

        let Some(original) = self.groups.get_mut(handle) else {
            return;
        };
        original.last = first + sizes[0];
        original.invalidate_stats();
        let (group_flags, strength, transform, user_data, destroy_automatically) = (
            original.group_flags,
            original.strength,
            original.transform,
            original.user_data,
            original.destroy_automatically,
        );

        let mut start = first + sizes[0];
        for &size in &sizes[1..] {
            let mut piece = ParticleGroup::new(start, start + size, group_flags, strength, transform);
            piece.user_data = user_data;
            piece.destroy_automatically = destroy_automatically;
            let piece_handle = self.groups.insert(piece);
            for slot in &mut self.buffers.group[start..start + size] {
                *slot = Some(piece_handle);
            }
            start += size;
        }
        log::info!("split rigid group into {} groups", components);
    }
}
