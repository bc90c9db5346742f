use std::time::Duration;

use serde::{Deserialize, Serialize};
use traceflame_protocol::Symbol;

/// One frame of a sample, with the time observed at or below it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleFrame {
    pub name: Symbol,
    pub duration: Duration,
}

impl SampleFrame {
    pub fn new(name: impl Into<Symbol>, duration: Duration) -> Self {
        Self {
            name: name.into(),
            duration,
        }
    }
}

/// A weighted call stack attached under a root category.
///
/// Frames are ordered outermost first. `duration` is the time attributed to
/// the category itself; with no frames all of it is self time of the
/// category node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub category: Symbol,
    pub duration: Duration,
    pub frames: Vec<SampleFrame>,
}

impl Sample {
    pub fn new(category: impl Into<Symbol>, duration: Duration, frames: Vec<SampleFrame>) -> Self {
        Self {
            category: category.into(),
            duration,
            frames,
        }
    }

    /// A sample weighted by its outermost frame.
    pub fn from_frames(category: impl Into<Symbol>, frames: Vec<SampleFrame>) -> Self {
        let duration = frames.first().map_or(Duration::ZERO, |f| f.duration);
        Self::new(category, duration, frames)
    }

    /// A sample where every frame carries the full duration, which is what
    /// both sampling ticks and blocking spans look like.
    pub fn uniform<I>(category: impl Into<Symbol>, duration: Duration, names: I) -> Self
    where
        I: IntoIterator<Item = Symbol>,
    {
        let frames = names
            .into_iter()
            .map(|name| SampleFrame { name, duration })
            .collect();
        Self::new(category, duration, frames)
    }

    pub fn leaf(&self) -> Option<&SampleFrame> {
        self.frames.last()
    }
}
