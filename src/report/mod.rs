//! Reporting utilities: summaries, table previews, worst-fit rankings.

pub mod format;

pub use format::*;
