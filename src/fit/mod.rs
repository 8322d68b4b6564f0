//! Resonance fitting.
//!
//! Split into:
//! - `guess` — deterministic starting parameters from the raw sweep
//! - `lm` — the Levenberg–Marquardt core (model-agnostic)
//! - `fitter` — per-record and batch fitting on top of the two
//! - `mc` — residual-bootstrap Monte Carlo uncertainties

pub mod fitter;
pub mod guess;
pub mod lm;
pub mod mc;
