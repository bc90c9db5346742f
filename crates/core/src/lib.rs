//! Flame graphs for execution traces.
//!
//! ```text
//!   CPU samples ─┐                  add_sample           compute
//!                ├─▶ extract ─▶ Vec<Sample> ─▶ FlameGraph ─▶ LayoutSnapshot ─▶ renderer
//!   state spans ─┘                                                 │
//!                                                     color() ◀────┘
//! ```

pub mod color;
pub mod config;
pub mod extract;
pub mod graph;
pub mod model;
pub mod pipeline;

pub use color::{Palette, color};
pub use config::{Config, LayoutConfig};
pub use graph::{FlameGraph, FlameGraphError, LayoutSnapshot};
pub use model::{Sample, SampleFrame};
pub use pipeline::{CancelToken, build_flame_graph};
