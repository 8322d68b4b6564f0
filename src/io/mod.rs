//! Input/output: file discovery, instrument-file parsing, exports.

pub mod agilent;
pub mod discover;
pub mod export;
pub mod results;
