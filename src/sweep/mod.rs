//! Sweep indexing: temperature bucketing and parameter pivot tables.

pub mod table;

pub use table::*;
