//! # Utilities Module
//!
//! Random sampling primitives shared by every generator.

pub mod random;

pub use random::*;
