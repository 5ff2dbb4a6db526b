//! Common scalar, vector and identifier types shared by every Orbital crate.

pub mod errors;
pub mod fixed_point;
pub mod identifiers;
pub mod vector;
