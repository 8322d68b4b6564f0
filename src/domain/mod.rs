//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - resonator records parsed from instrument files (`ResonatorRecord`)
//! - fitted parameter sets and diagnostics (`ResonanceParams`, `FitQuality`)
//! - sweep configuration enums (`IndexMode`, `ParamKind`)

pub mod types;

pub use types::*;
