//! Uniform grid spatial index.
//!
//! Shapes are bucketed by the grid cells their bounding box covers (broad
//! phase); a query then runs exact polygon overlap tests only against the
//! shapes sharing a cell with the query region (narrow phase).
//!
//! Shapes whose bounding box would cover more than
//! [`GridConfig::max_cells_per_shape`] cells (long roads, world borders) are
//! kept in a separate list that every query checks, so a single huge shape
//! cannot blow up the bucket table.
//!
//! # Example
//!
//! ```
//! use glam::Vec2;
//! use polygrid::{GridIndex, Polygon, QueryRegion};
//!
//! let mut grid = GridIndex::default();
//! grid.insert(1u64, vec![Polygon::rectangle(Vec2::ZERO, Vec2::splat(10.0))]);
//! grid.insert(2u64, vec![Polygon::rectangle(Vec2::splat(500.0), Vec2::splat(510.0))]);
//!
//! let hits = grid.query(&QueryRegion::rect(Vec2::splat(5.0), Vec2::splat(20.0)));
//! assert_eq!(hits, vec![1]);
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Debug;
use std::hash::Hash;

use glam::Vec2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::polygon::Polygon;
use crate::query::QueryRegion;
use crate::Aabb;

/// Errors raised when building a grid.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GridError {
    /// Cell size must be a positive, finite number.
    #[error("grid cell size must be positive and finite, got {0}")]
    InvalidCellSize(f32),
}

/// Grid tuning parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Edge length of a square cell in world units.
    pub cell_size: f32,
    /// Shapes covering more cells than this go to the oversized list.
    pub max_cells_per_shape: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            cell_size: 128.0,
            max_cells_per_shape: 256,
        }
    }
}

type Cell = (i32, i32);

#[derive(Debug, Clone)]
struct Entry {
    polygons: Vec<Polygon>,
    aabb: Option<Aabb>,
    oversized: bool,
}

/// Spatial index keyed by `K`.
///
/// Query results are always returned sorted by key, so callers that hand out
/// monotonically increasing keys get insertion order back.
#[derive(Debug, Clone)]
pub struct GridIndex<K> {
    config: GridConfig,
    entries: BTreeMap<K, Entry>,
    cells: HashMap<Cell, Vec<K>>,
    oversized: BTreeSet<K>,
}

impl<K> GridIndex<K>
where
    K: Copy + Ord + Hash + Debug + Send + Sync,
{
    /// Creates an empty index.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::InvalidCellSize`] if the cell size is not a
    /// positive finite number.
    pub fn new(config: GridConfig) -> Result<Self, GridError> {
        if !(config.cell_size.is_finite() && config.cell_size > 0.0) {
            return Err(GridError::InvalidCellSize(config.cell_size));
        }
        Ok(Self {
            config,
            entries: BTreeMap::new(),
            cells: HashMap::new(),
            oversized: BTreeSet::new(),
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Inserts or replaces the shapes stored under `key`.
    ///
    /// Keys with no non-empty polygon are remembered but never match a query.
    pub fn insert(&mut self, key: K, polygons: Vec<Polygon>) {
        self.remove(key);

        let aabb = polygons
            .iter()
            .filter_map(Polygon::aabb)
            .reduce(|a, b| a.union(&b));

        let mut oversized = false;
        if let Some(aabb) = aabb {
            let (lo, hi) = self.cell_span(&aabb);
            if span_len(lo, hi) > self.config.max_cells_per_shape {
                oversized = true;
                self.oversized.insert(key);
            } else {
                for cell in cells_in(lo, hi) {
                    self.cells.entry(cell).or_default().push(key);
                }
            }
        }

        self.entries.insert(
            key,
            Entry {
                polygons,
                aabb,
                oversized,
            },
        );
    }

    /// Removes `key`. Returns `true` if it was present.
    pub fn remove(&mut self, key: K) -> bool {
        let Some(entry) = self.entries.remove(&key) else {
            return false;
        };
        if entry.oversized {
            self.oversized.remove(&key);
        } else if let Some(aabb) = entry.aabb {
            let (lo, hi) = self.cell_span(&aabb);
            for cell in cells_in(lo, hi) {
                if let Some(bucket) = self.cells.get_mut(&cell) {
                    bucket.retain(|k| *k != key);
                    if bucket.is_empty() {
                        self.cells.remove(&cell);
                    }
                }
            }
        }
        true
    }

    /// Returns the stored shapes for `key`.
    #[must_use]
    pub fn shapes(&self, key: K) -> Option<&[Polygon]> {
        self.entries.get(&key).map(|e| e.polygons.as_slice())
    }

    /// Returns `true` if `key` is stored.
    #[must_use]
    pub fn contains_key(&self, key: K) -> bool {
        self.entries.contains_key(&key)
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of non-empty buckets.
    #[must_use]
    pub fn occupied_cells(&self) -> usize {
        self.cells.len()
    }

    /// Returns every key whose shapes overlap `region`, sorted by key.
    #[must_use]
    pub fn query(&self, region: &QueryRegion) -> Vec<K> {
        let Some(region_box) = region.aabb() else {
            return Vec::new();
        };

        let (lo, hi) = self.cell_span(&region_box);
        let candidates: Vec<K> = if span_len(lo, hi) > self.cells.len() {
            // Region larger than the populated grid: walking buckets is slower.
            self.entries.keys().copied().collect()
        } else {
            let mut set: BTreeSet<K> = self.oversized.clone();
            for cell in cells_in(lo, hi) {
                if let Some(bucket) = self.cells.get(&cell) {
                    set.extend(bucket.iter().copied());
                }
            }
            set.into_iter().collect()
        };

        tracing::trace!(candidates = candidates.len(), "grid broad phase");
        self.narrow_phase(&candidates, region, &region_box)
    }

    /// Reference implementation: tests every stored shape.
    #[must_use]
    pub fn query_linear(&self, region: &QueryRegion) -> Vec<K> {
        let Some(region_box) = region.aabb() else {
            return Vec::new();
        };
        let candidates: Vec<K> = self.entries.keys().copied().collect();
        self.narrow_phase(&candidates, region, &region_box)
    }

    fn narrow_phase(&self, candidates: &[K], region: &QueryRegion, region_box: &Aabb) -> Vec<K> {
        let region_poly = region.to_polygon();
        let mut hits: Vec<K> = candidates
            .par_iter()
            .filter(|key| {
                let Some(entry) = self.entries.get(*key) else {
                    return false;
                };
                match entry.aabb {
                    Some(aabb) if aabb.intersects(region_box) => entry
                        .polygons
                        .iter()
                        .any(|poly| poly.intersects(&region_poly)),
                    _ => false,
                }
            })
            .copied()
            .collect();

        // Keep results deterministic regardless of thread scheduling.
        hits.sort_unstable();
        hits
    }

    fn cell_of(&self, point: Vec2) -> Cell {
        let size = self.config.cell_size;
        #[allow(clippy::cast_possible_truncation)]
        let cell = ((point.x / size).floor() as i32, (point.y / size).floor() as i32);
        cell
    }

    fn cell_span(&self, aabb: &Aabb) -> (Cell, Cell) {
        (self.cell_of(aabb.min), self.cell_of(aabb.max))
    }
}

impl<K> Default for GridIndex<K> {
    fn default() -> Self {
        Self {
            config: GridConfig::default(),
            entries: BTreeMap::new(),
            cells: HashMap::new(),
            oversized: BTreeSet::new(),
        }
    }
}

fn span_len(lo: Cell, hi: Cell) -> usize {
    let w = i64::from(hi.0) - i64::from(lo.0) + 1;
    let h = i64::from(hi.1) - i64::from(lo.1) + 1;
    usize::try_from(w.saturating_mul(h)).unwrap_or(usize::MAX)
}

fn cells_in(lo: Cell, hi: Cell) -> impl Iterator<Item = Cell> {
    (lo.0..=hi.0).flat_map(move |x| (lo.1..=hi.1).map(move |y| (x, y)))
}
