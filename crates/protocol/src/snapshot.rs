use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::symbol::Symbol;

/// One laid-out node of a sealed flame graph.
///
/// Entries are self-contained: a renderer can draw a bar from a single entry
/// without walking the tree. `x_offset` and `width` are in the units of the
/// layout width the graph was computed with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub name: Symbol,
    /// 0 for root categories.
    pub depth: u32,
    pub cumulative: Duration,
    pub self_duration: Duration,
    pub x_offset: f64,
    pub width: f64,
    pub sample_count: u64,
    /// Index of the parent entry within the same snapshot.
    pub parent: Option<usize>,
    /// Position among siblings after ordering, heaviest first.
    pub sibling_index: usize,
}

impl SnapshotEntry {
    pub fn end(&self) -> f64 {
        self.x_offset + self.width
    }

    /// Whether `x` falls inside this bar. The right edge is exclusive so
    /// adjacent siblings never both claim a point.
    pub fn contains(&self, x: f64) -> bool {
        x >= self.x_offset && x < self.end()
    }
}
