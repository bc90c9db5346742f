use std::collections::HashMap;
use std::time::Duration;

use traceflame_protocol::Symbol;

/// Index of a node in its graph's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One distinct call path prefix. Frames with the same name under the same
/// parent are merged into one node.
#[derive(Debug, Clone)]
pub struct FlameNode {
    name: Symbol,
    depth: u32,
    self_duration: Duration,
    cumulative: Duration,
    sample_count: u64,
    parent: Option<NodeId>,
    /// In insertion order.
    children: Vec<NodeId>,
    by_name: HashMap<Symbol, NodeId>,
}

impl FlameNode {
    pub(crate) fn new(name: Symbol, depth: u32, parent: Option<NodeId>) -> Self {
        Self {
            name,
            depth,
            self_duration: Duration::ZERO,
            cumulative: Duration::ZERO,
            sample_count: 0,
            parent,
            children: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    pub fn name(&self) -> &Symbol {
        &self.name
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Time attributed to this node but to none of its children.
    pub fn self_duration(&self) -> Duration {
        self.self_duration
    }

    /// Time attributed to this node and all its descendants.
    pub fn cumulative(&self) -> Duration {
        self.cumulative
    }

    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn child(&self, name: &str) -> Option<NodeId> {
        self.by_name.get(name).copied()
    }

    pub(crate) fn adopt(&mut self, name: Symbol, id: NodeId) {
        self.by_name.insert(name, id);
        self.children.push(id);
    }

    /// Record one sample passing through this node. `passed_on` is the part
    /// of `inclusive` that continues into a child.
    pub(crate) fn credit(&mut self, inclusive: Duration, passed_on: Duration) {
        self.cumulative += inclusive;
        self.self_duration += inclusive - passed_on;
        self.sample_count += 1;
    }
}
