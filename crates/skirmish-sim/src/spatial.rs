//! Uniform spatial grid for broad-phase queries.
//!
//! An entry occupies every cell its bounds overlap, so objects larger than a
//! cell are still found from any cell they touch. The grid is bounded: once
//! `capacity` entries are indexed, inserting a new id evicts the oldest one.

use std::collections::{HashMap, VecDeque};

use glam::Vec3;
use smallvec::SmallVec;

use skirmish_core::types::{Aabb, EntityId};

type CellKey = (i32, i32, i32);

/// Entries spanning more cells than this are kept out of the buckets and
/// tested on every query instead.
const MAX_CELLS_PER_ENTRY: i64 = 4096;

#[derive(Debug, Clone, Copy)]
struct GridEntry {
    bounds: Aabb,
    cells: Option<(CellKey, CellKey)>,
    seq: u64,
}

#[derive(Debug, Clone)]
pub struct SpatialGrid {
    cell_size: f32,
    inv_cell: f32,
    capacity: usize,
    cells: HashMap<CellKey, SmallVec<[EntityId; 4]>>,
    entries: HashMap<EntityId, GridEntry>,
    /// Oversized entries, see `MAX_CELLS_PER_ENTRY`.
    oversized: Vec<EntityId>,
    /// Insertion order for eviction. May hold stale (id, seq) pairs.
    order: VecDeque<(EntityId, u64)>,
    next_seq: u64,
}

impl SpatialGrid {
    /// `cell_size` must be positive; it is fixed for the grid's lifetime.
    pub fn new(cell_size: f32, capacity: usize) -> Self {
        let cell_size = if cell_size > 0.0 { cell_size } else { 1.0 };
        Self {
            cell_size,
            inv_cell: 1.0 / cell_size,
            capacity: capacity.max(1),
            cells: HashMap::new(),
            entries: HashMap::new(),
            oversized: Vec::new(),
            order: VecDeque::new(),
            next_seq: 0,
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Bounds an entry was last indexed with.
    pub fn bounds(&self, id: EntityId) -> Option<Aabb> {
        self.entries.get(&id).map(|e| e.bounds)
    }

    /// All indexed ids in ascending order.
    pub fn ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.entries.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Number of non-empty cells.
    pub fn occupied_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.entries.clear();
        self.oversized.clear();
        self.order.clear();
    }

    /// Insert or move an entry. Returns the id evicted to make room, if any.
    /// Non-finite bounds remove the entry instead.
    pub fn insert(&mut self, id: EntityId, bounds: Aabb) -> Option<EntityId> {
        if !bounds.is_finite() {
            self.remove(id);
            return None;
        }
        let cells = self.cell_range(&bounds);

        if let Some(existing) = self.entries.get(&id).copied() {
            if existing.cells != cells {
                self.unlink(id, existing.cells);
                self.link(id, cells);
            }
            if let Some(entry) = self.entries.get_mut(&id) {
                entry.bounds = bounds;
                entry.cells = cells;
            }
            return None;
        }

        let evicted = if self.entries.len() >= self.capacity {
            self.evict_oldest()
        } else {
            None
        };

        let seq = self.next_seq;
        self.next_seq += 1;
        self.link(id, cells);
        self.entries.insert(id, GridEntry { bounds, cells, seq });
        self.order.push_back((id, seq));
        self.compact_order();
        evicted
    }

    /// Alias of `insert` for entries that are already indexed.
    pub fn update(&mut self, id: EntityId, bounds: Aabb) -> Option<EntityId> {
        self.insert(id, bounds)
    }

    pub fn remove(&mut self, id: EntityId) -> bool {
        match self.entries.remove(&id) {
            Some(entry) => {
                self.unlink(id, entry.cells);
                true
            }
            None => false,
        }
    }

    /// Ids whose bounds overlap `query`, ascending.
    pub fn query_box(&self, query: &Aabb) -> Vec<EntityId> {
        self.collect(query, |b| b.intersects(query))
    }

    /// Ids whose bounds touch the sphere, ascending.
    pub fn query_radius(&self, center: Vec3, radius: f32) -> Vec<EntityId> {
        let radius = radius.max(0.0);
        let query = Aabb::around_sphere(center, radius);
        self.collect(&query, |b| b.intersects_sphere(center, radius))
    }

    /// Ids whose bounds contain `p`, ascending.
    pub fn query_point(&self, p: Vec3) -> Vec<EntityId> {
        self.collect(&Aabb::point(p), |b| b.contains_point(p))
    }

    fn collect(&self, query: &Aabb, keep: impl Fn(&Aabb) -> bool) -> Vec<EntityId> {
        if !query.is_finite() {
            return Vec::new();
        }
        let mut out: Vec<EntityId> = match self.cell_range(query) {
            // Small query: walk the buckets.
            Some((lo, hi)) if cell_count(lo, hi) <= self.entries.len().max(1) as i64 => {
                let mut candidates: SmallVec<[EntityId; 32]> = SmallVec::new();
                for x in lo.0..=hi.0 {
                    for y in lo.1..=hi.1 {
                        for z in lo.2..=hi.2 {
                            if let Some(bucket) = self.cells.get(&(x, y, z)) {
                                candidates.extend_from_slice(bucket);
                            }
                        }
                    }
                }
                candidates.extend_from_slice(&self.oversized);
                candidates.sort_unstable();
                candidates.dedup();
                candidates
                    .into_iter()
                    .filter(|id| self.entries.get(id).is_some_and(|e| keep(&e.bounds)))
                    .collect()
            }
            // Query spans more cells than there are entries: scan entries.
            _ => self
                .entries
                .iter()
                .filter(|(_, e)| keep(&e.bounds))
                .map(|(id, _)| *id)
                .collect(),
        };
        out.sort_unstable();
        out
    }

    fn cell_of(&self, p: Vec3) -> CellKey {
        (
            (p.x * self.inv_cell).floor() as i32,
            (p.y * self.inv_cell).floor() as i32,
            (p.z * self.inv_cell).floor() as i32,
        )
    }

    /// Inclusive cell range covered by `bounds`, or None if it is oversized.
    fn cell_range(&self, bounds: &Aabb) -> Option<(CellKey, CellKey)> {
        let lo = self.cell_of(bounds.min);
        let hi = self.cell_of(bounds.max);
        (cell_count(lo, hi) <= MAX_CELLS_PER_ENTRY).then_some((lo, hi))
    }

    fn link(&mut self, id: EntityId, cells: Option<(CellKey, CellKey)>) {
        let Some((lo, hi)) = cells else {
            self.oversized.push(id);
            return;
        };
        for x in lo.0..=hi.0 {
            for y in lo.1..=hi.1 {
                for z in lo.2..=hi.2 {
                    self.cells.entry((x, y, z)).or_default().push(id);
                }
            }
        }
    }

    fn unlink(&mut self, id: EntityId, cells: Option<(CellKey, CellKey)>) {
        let Some((lo, hi)) = cells else {
            self.oversized.retain(|e| *e != id);
            return;
        };
        for x in lo.0..=hi.0 {
            for y in lo.1..=hi.1 {
                for z in lo.2..=hi.2 {
                    let key = (x, y, z);
                    if let Some(bucket) = self.cells.get_mut(&key) {
                        bucket.retain(|e| *e != id);
                        if bucket.is_empty() {
                            self.cells.remove(&key);
                        }
                    }
                }
            }
        }
    }

    fn evict_oldest(&mut self) -> Option<EntityId> {
        while let Some((id, seq)) = self.order.pop_front() {
            let live = self.entries.get(&id).is_some_and(|e| e.seq == seq);
            if live {
                self.remove(id);
                log::warn!(
                    "spatial grid at capacity ({}), evicted oldest entry {id}",
                    self.capacity
                );
                return Some(id);
            }
        }
        None
    }

    /// Drop stale order records once they dominate the queue.
    fn compact_order(&mut self) {
        if self.order.len() > self.entries.len() * 2 + 64 {
            let entries = &self.entries;
            self.order
                .retain(|(id, seq)| entries.get(id).is_some_and(|e| e.seq == *seq));
        }
    }
}

fn cell_count(lo: CellKey, hi: CellKey) -> i64 {
    let span = |a: i32, b: i32| (b as i64 - a as i64 + 1).max(0);
    span(lo.0, hi.0)
        .saturating_mul(span(lo.1, hi.1))
        .saturating_mul(span(lo.2, hi.2))
}
