use std::fmt;

use serde::{Deserialize, Serialize};

/// Synthetic top-level grouping a sample is attached under.
///
/// Depth-0 nodes of a flame graph are keyed by [`RootCategory::label`]. The
/// labels are what users see, so they follow the wording of the blocking
/// reason rather than the enum name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RootCategory {
    /// On-CPU time from the sampling profiler.
    Running,
    Blocked,
    Send,
    Recv,
    Select,
    Sync,
    SyncOnce,
    SyncCond,
    TriggeringGc,
    Io,
    Gc,
    BlockingSyscall,
    Ready,
    Stuck,
}

impl RootCategory {
    pub const ALL: [RootCategory; 14] = [
        Self::Running,
        Self::Blocked,
        Self::Send,
        Self::Recv,
        Self::Select,
        Self::Sync,
        Self::SyncOnce,
        Self::SyncCond,
        Self::TriggeringGc,
        Self::Io,
        Self::Gc,
        Self::BlockingSyscall,
        Self::Ready,
        Self::Stuck,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Running => "Running",
            Self::Blocked => "blocked",
            Self::Send => "send",
            Self::Recv => "recv",
            Self::Select => "select",
            Self::Sync => "sync",
            Self::SyncOnce => "sync.Once",
            Self::SyncCond => "sync.Cond",
            Self::TriggeringGc => "triggering GC",
            Self::Io => "I/O",
            Self::Gc => "GC",
            Self::BlockingSyscall => "blocking syscall",
            Self::Ready => "ready",
            Self::Stuck => "stuck",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.label() == label)
    }

    /// Whether samples in this category carry a call stack. Time spent
    /// waiting to be scheduled has none.
    pub const fn has_stack(self) -> bool {
        !matches!(self, Self::Ready)
    }
}

impl fmt::Display for RootCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
