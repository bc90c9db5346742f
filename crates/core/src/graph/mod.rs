//! The flame graph aggregate: merges samples into a weighted call tree and
//! seals it into a [`LayoutSnapshot`].

mod layout;
mod node;

use std::collections::HashMap;
use std::time::Duration;

use log::debug;
use thiserror::Error;
use traceflame_protocol::{Oklch, Symbol};

use crate::color::Palette;
use crate::config::LayoutConfig;
use crate::model::Sample;

pub use layout::LayoutSnapshot;
pub use node::{FlameNode, NodeId};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FlameGraphError {
    #[error("flame graph is sealed; no more samples can be added")]
    Sealed,
    #[error("flame graph layout was already computed")]
    AlreadyComputed,
    #[error("flame graph layout has not been computed yet")]
    NotComputed,
    #[error("frame {frame:?} of a {category:?} sample is longer than its caller")]
    InvalidSample { category: Symbol, frame: Symbol },
    #[error("snapshot has no entry {0}")]
    EntryOutOfRange(usize),
}

/// A weighted call tree built from samples.
///
/// Starts empty, grows through [`FlameGraph::add_sample`], and is sealed by
/// a single [`FlameGraph::compute`]. Insertion is not synchronized; callers
/// feeding it from several threads must collect samples first.
#[derive(Debug, Clone, Default)]
pub struct FlameGraph {
    nodes: Vec<FlameNode>,
    roots: Vec<NodeId>,
    root_by_name: HashMap<Symbol, NodeId>,
    config: LayoutConfig,
    snapshot: Option<LayoutSnapshot>,
}

impl FlameGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: LayoutConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Merge one sample into the tree.
    ///
    /// Frame durations are inclusive: each node is credited with its frame's
    /// duration, and the difference to the next frame's duration becomes its
    /// self time. Samples whose frames get longer with depth are rejected
    /// without touching the tree.
    pub fn add_sample(&mut self, sample: &Sample) -> Result<(), FlameGraphError> {
        if self.snapshot.is_some() {
            return Err(FlameGraphError::Sealed);
        }
        let mut caller = sample.duration;
        for frame in &sample.frames {
            if frame.duration > caller {
                return Err(FlameGraphError::InvalidSample {
                    category: sample.category.clone(),
                    frame: frame.name.clone(),
                });
            }
            caller = frame.duration;
        }

        let mut cur = self.root_or_insert(&sample.category);
        let first = sample.frames.first().map_or(Duration::ZERO, |f| f.duration);
        self.nodes[cur.0].credit(sample.duration, first);

        for (i, frame) in sample.frames.iter().enumerate() {
            cur = self.child_or_insert(cur, &frame.name);
            let passed_on = sample
                .frames
                .get(i + 1)
                .map_or(Duration::ZERO, |f| f.duration);
            self.nodes[cur.0].credit(frame.duration, passed_on);
        }
        Ok(())
    }

    /// Add every sample, stopping at the first error. Returns how many were
    /// added.
    pub fn add_samples<'a, I>(&mut self, samples: I) -> Result<usize, FlameGraphError>
    where
        I: IntoIterator<Item = &'a Sample>,
    {
        let mut n = 0;
        for sample in samples {
            self.add_sample(sample)?;
            n += 1;
        }
        Ok(n)
    }

    fn root_or_insert(&mut self, category: &Symbol) -> NodeId {
        if let Some(&id) = self.root_by_name.get(category.as_str()) {
            return id;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(FlameNode::new(category.clone(), 0, None));
        self.roots.push(id);
        self.root_by_name.insert(category.clone(), id);
        id
    }

    fn child_or_insert(&mut self, parent: NodeId, name: &Symbol) -> NodeId {
        if let Some(id) = self.nodes[parent.0].child(name) {
            return id;
        }
        let id = NodeId(self.nodes.len());
        let depth = self.nodes[parent.0].depth() + 1;
        self.nodes.push(FlameNode::new(name.clone(), depth, Some(parent)));
        self.nodes[parent.0].adopt(name.clone(), id);
        id
    }

    /// Seal the graph and lay it out. Can only be called once.
    pub fn compute(&mut self) -> Result<&LayoutSnapshot, FlameGraphError> {
        if self.snapshot.is_some() {
            return Err(FlameGraphError::AlreadyComputed);
        }
        let snapshot = layout::layout(&self.nodes, &self.roots, self.config.width);
        debug!(
            "laid out {} nodes in {} rows, total {:?}",
            snapshot.len(),
            snapshot.depth_count(),
            snapshot.total()
        );
        Ok(self.snapshot.insert(snapshot))
    }

    pub fn snapshot(&self) -> Result<&LayoutSnapshot, FlameGraphError> {
        self.snapshot.as_ref().ok_or(FlameGraphError::NotComputed)
    }

    pub fn is_sealed(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Color of a snapshot entry, taking its depth and sibling position
    /// into account.
    pub fn entry_color(
        &self,
        index: usize,
        hovered: bool,
        palette: &Palette,
    ) -> Result<Oklch, FlameGraphError> {
        let entry = self
            .snapshot()?
            .entry(index)
            .ok_or(FlameGraphError::EntryOutOfRange(index))?;
        Ok(palette.color(entry.depth, &entry.name, entry.sibling_index, hovered))
    }

    pub fn node(&self, id: NodeId) -> Option<&FlameNode> {
        self.nodes.get(id.0)
    }

    /// Root categories in insertion order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn root(&self, category: &str) -> Option<&FlameNode> {
        self.root_by_name.get(category).map(|id| &self.nodes[id.0])
    }

    /// Follow `path` from the root category down.
    pub fn find(&self, category: &str, path: &[&str]) -> Option<&FlameNode> {
        let mut cur = *self.root_by_name.get(category)?;
        for name in path {
            cur = self.nodes[cur.0].child(name)?;
        }
        self.nodes.get(cur.0)
    }

    /// Sum over all root categories.
    pub fn total_duration(&self) -> Duration {
        self.roots.iter().map(|id| self.nodes[id.0].cumulative()).sum()
    }

    pub fn total_samples(&self) -> u64 {
        self.roots.iter().map(|id| self.nodes[id.0].sample_count()).sum()
    }

    /// Number of nodes, root categories included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
