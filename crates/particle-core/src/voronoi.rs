//! Discrete Voronoi diagram used to triangulate particle groups.
//!
//! Generators are rasterized onto a grid, every cell is flood-filled with
//! its nearest generator, and triangles are read off 2x2 blocks of cells
//! that touch three different generators.

use std::collections::VecDeque;

use glam::Vec2;

struct Generator {
    center: Vec2,
    tag: u32,
}

#[derive(Clone, Copy)]
struct Task {
    x: usize,
    y: usize,
    cell: usize,
    generator: usize,
}

#[derive(Default)]
pub struct VoronoiDiagram {
    generators: Vec<Generator>,
    count_x: usize,
    count_y: usize,
    cells: Vec<Option<usize>>,
}

impl VoronoiDiagram {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            generators: Vec::with_capacity(capacity),
            ..Default::default()
        }
    }

    /// Adds a site. `tag` is reported back by [`nodes`](Self::nodes).
    pub fn add_generator(&mut self, center: Vec2, tag: u32) {
        self.generators.push(Generator { center, tag });
    }

    /// Rasterizes the diagram with cells of size `radius`.
    pub fn generate(&mut self, radius: f32) {
        if self.generators.is_empty() {
            return;
        }
        let inv_radius = 1.0 / radius;
        let mut lower = Vec2::splat(f32::MAX);
        let mut upper = Vec2::splat(-f32::MAX);
        for g in &self.generators {
            lower = lower.min(g.center);
            upper = upper.max(g.center);
        }
        self.count_x = 1 + (inv_radius * (upper.x - lower.x)) as usize;
        self.count_y = 1 + (inv_radius * (upper.y - lower.y)) as usize;
        let count_x = self.count_x;
        let count_y = self.count_y;
        self.cells = vec![None; count_x * count_y];

        let mut queue = VecDeque::new();
        for (k, g) in self.generators.iter_mut().enumerate() {
            g.center = inv_radius * (g.center - lower);
            let x = (g.center.x.max(0.0) as usize).min(count_x - 1);
            let y = (g.center.y.max(0.0) as usize).min(count_y - 1);
            queue.push_back(Task {
                x,
                y,
                cell: x + y * count_x,
                generator: k,
            });
        }

        // Flood fill: first generator to reach a cell claims it.
        while let Some(task) = queue.pop_front() {
            if self.cells[task.cell].is_none() {
                self.cells[task.cell] = Some(task.generator);
                self.push_neighbours(&mut queue, task);
            }
        }

        // Relax borders until every cell holds its nearest generator.
        for _ in 0..count_x + count_y {
            for y in 0..count_y {
                for x in 0..count_x - 1 {
                    let i = x + y * count_x;
                    self.push_if_different(&mut queue, (x, y, i), (x + 1, y, i + 1));
                }
            }
            for y in 0..count_y - 1 {
                for x in 0..count_x {
                    let i = x + y * count_x;
                    self.push_if_different(&mut queue, (x, y, i), (x, y + 1, i + count_x));
                }
            }
            let mut updated = false;
            while let Some(task) = queue.pop_front() {
                let Some(current) = self.cells[task.cell] else {
                    continue;
                };
                if current == task.generator {
                    continue;
                }
                let cell = Vec2::new(task.x as f32, task.y as f32);
                let a2 = (self.generators[current].center - cell).length_squared();
                let b2 = (self.generators[task.generator].center - cell).length_squared();
                if a2 > b2 {
                    self.cells[task.cell] = Some(task.generator);
                    self.push_neighbours(&mut queue, task);
                    updated = true;
                }
            }
            if !updated {
                break;
            }
        }
    }

    fn push_if_different(
        &self,
        queue: &mut VecDeque<Task>,
        (ax, ay, ai): (usize, usize, usize),
        (bx, by, bi): (usize, usize, usize),
    ) {
        let (Some(a), Some(b)) = (self.cells[ai], self.cells[bi]) else {
            return;
        };
        if a != b {
            queue.push_back(Task { x: ax, y: ay, cell: ai, generator: b });
            queue.push_back(Task { x: bx, y: by, cell: bi, generator: a });
        }
    }

    fn push_neighbours(&self, queue: &mut VecDeque<Task>, task: Task) {
        let Task { x, y, cell, generator } = task;
        if x > 0 {
            queue.push_back(Task { x: x - 1, y, cell: cell - 1, generator });
        }
        if y > 0 {
            queue.push_back(Task { x, y: y - 1, cell: cell - self.count_x, generator });
        }
        if x + 1 < self.count_x {
            queue.push_back(Task { x: x + 1, y, cell: cell + 1, generator });
        }
        if y + 1 < self.count_y {
            queue.push_back(Task { x, y: y + 1, cell: cell + self.count_x, generator });
        }
    }

    /// Reports the tags of every triangle of the dual triangulation.
    pub fn nodes(&self, mut callback: impl FnMut(u32, u32, u32)) {
        if self.cells.is_empty() {
            return;
        }
        let count_x = self.count_x;
        for y in 0..self.count_y - 1 {
            for x in 0..count_x - 1 {
                let i = x + y * count_x;
                let (Some(a), Some(b), Some(c), Some(d)) = (
                    self.cells[i],
                    self.cells[i + 1],
                    self.cells[i + count_x],
                    self.cells[i + 1 + count_x],
                ) else {
                    continue;
                };
                if b == c {
                    continue;
                }
                if a != b && a != c {
                    callback(self.generators[a].tag, self.generators[b].tag, self.generators[c].tag);
                }
                if d != b && d != c {
                    callback(self.generators[b].tag, self.generators[d].tag, self.generators[c].tag);
                }
            }
        }
    }
}
