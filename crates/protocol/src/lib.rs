pub mod category;
pub mod color;
pub mod snapshot;
pub mod symbol;

pub use category::RootCategory;
pub use color::Oklch;
pub use snapshot::SnapshotEntry;
pub use symbol::Symbol;
