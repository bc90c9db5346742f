use std::time::Duration;

use log::{trace, warn};
use traceflame_protocol::{SnapshotEntry, Symbol};

use super::node::{FlameNode, NodeId};

/// Immutable, laid-out view of a sealed flame graph.
///
/// Entries are ordered by depth, then by x offset. Each depth forms one
/// contiguous row, so a row can be binary searched by offset.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutSnapshot {
    entries: Vec<SnapshotEntry>,
    /// `rows[d]..rows[d + 1]` is the range of depth `d`.
    rows: Vec<usize>,
    width: f64,
    total: Duration,
}

impl LayoutSnapshot {
    pub fn entries(&self) -> &[SnapshotEntry] {
        &self.entries
    }

    pub fn entry(&self, index: usize) -> Option<&SnapshotEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Width the graph was laid out in.
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Sum of all root categories.
    pub fn total(&self) -> Duration {
        self.total
    }

    /// Number of rows, i.e. the deepest depth plus one.
    pub fn depth_count(&self) -> usize {
        self.rows.len().saturating_sub(1)
    }

    /// All entries at `depth`, left to right.
    pub fn row(&self, depth: usize) -> &[SnapshotEntry] {
        let end = depth.checked_add(1).and_then(|d| self.rows.get(d));
        match (self.rows.get(depth), end) {
            (Some(&start), Some(&end)) => &self.entries[start..end],
            _ => &[],
        }
    }

    /// The entry at `depth` whose bar covers `x`, with its index.
    pub fn hit_test(&self, depth: usize, x: f64) -> Option<(usize, &SnapshotEntry)> {
        let row = self.row(depth);
        let i = row.partition_point(|e| e.x_offset <= x);
        let candidate = row.get(i.checked_sub(1)?)?;
        candidate
            .contains(x)
            .then(|| (self.rows[depth] + i - 1, candidate))
    }

    pub fn parent(&self, index: usize) -> Option<(usize, &SnapshotEntry)> {
        let parent = self.entries.get(index)?.parent?;
        Some((parent, &self.entries[parent]))
    }

    /// Children of the entry at `index`, heaviest first.
    pub fn children(&self, index: usize) -> impl Iterator<Item = (usize, &SnapshotEntry)> {
        // An unknown index has no row below it.
        let below = self.entries.get(index).map(|e| e.depth as usize + 1);
        let start = below.and_then(|d| self.rows.get(d)).copied().unwrap_or(0);
        below
            .map_or(&[][..], |d| self.row(d))
            .iter()
            .enumerate()
            .filter(move |(_, e)| e.parent == Some(index))
            .map(move |(i, e)| (start + i, e))
    }

    /// Names from the root category down to the entry at `index`.
    pub fn path(&self, index: usize) -> Vec<Symbol> {
        let mut path = Vec::new();
        let mut cur = self.entries.get(index).map(|_| index);
        while let Some(i) = cur {
            let entry = &self.entries[i];
            path.push(entry.name.clone());
            cur = entry.parent;
        }
        path.reverse();
        path
    }
}

/// Heaviest first. The sort is stable, so ties keep insertion order.
fn ordered(nodes: &[FlameNode], ids: &[NodeId]) -> Vec<NodeId> {
    let mut ids = ids.to_vec();
    ids.sort_by(|a, b| nodes[b.0].cumulative().cmp(&nodes[a.0].cumulative()));
    ids
}

/// Lay out the tree level by level.
///
/// Every node gets `cumulative * width / total`. That is the same as scaling
/// children into their parent's width, without compounding rounding error
/// down deep stacks.
pub(crate) fn layout(nodes: &[FlameNode], roots: &[NodeId], width: f64) -> LayoutSnapshot {
    let total: Duration = roots.iter().map(|id| nodes[id.0].cumulative()).sum();
    if total.is_zero() && !roots.is_empty() {
        warn!("flame graph has {} categories but no duration", roots.len());
    }
    let total_nanos = total.as_nanos() as f64;
    let width_of = |id: NodeId| {
        if total_nanos == 0.0 {
            0.0
        } else {
            nodes[id.0].cumulative().as_nanos() as f64 * width / total_nanos
        }
    };

    let mut entries = Vec::with_capacity(nodes.len());
    let mut rows = vec![0];

    // (node, parent entry, x offset, sibling index)
    let mut level: Vec<(NodeId, Option<usize>, f64, usize)> = Vec::new();
    let mut x = 0.0;
    for (i, id) in ordered(nodes, roots).into_iter().enumerate() {
        level.push((id, None, x, i));
        x += width_of(id);
    }

    let mut depth = 0u32;
    let mut next = Vec::new();
    while !level.is_empty() {
        for (id, parent, x_offset, sibling_index) in level.drain(..) {
            let node = &nodes[id.0];
            let index = entries.len();
            let w = width_of(id);
            trace!("{depth}:{} x={x_offset} w={w}", node.name());

            let mut child_x = x_offset;
            for (i, child) in ordered(nodes, node.children()).into_iter().enumerate() {
                next.push((child, Some(index), child_x, i));
                child_x += width_of(child);
            }

            entries.push(SnapshotEntry {
                name: node.name().clone(),
                depth,
                cumulative: node.cumulative(),
                self_duration: node.self_duration(),
                x_offset,
                width: w,
                sample_count: node.sample_count(),
                parent,
                sibling_index,
            });
        }
        debug_assert!(
            entries[rows[rows.len() - 1]..]
                .windows(2)
                .all(|pair| pair[0].x_offset <= pair[1].x_offset),
            "row {depth} is not ordered by offset"
        );
        rows.push(entries.len());
        std::mem::swap(&mut level, &mut next);
        depth += 1;
    }

    LayoutSnapshot {
        entries,
        rows,
        width,
        total,
    }
}
