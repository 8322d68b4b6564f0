//! The complex I/Q transmission model.

pub mod s21;

pub use s21::*;
