//! Mathematical utilities: the least-squares solver behind the fitter.

pub mod lsq;

pub use lsq::*;
