//! # Orbital Types Library
//!
//! Shared numeric and identifier types for the Orbital AMM workspace.
//!
//! ## Design Philosophy
//!
//! - **No Floating Point**: every quantity is a 1e18-scaled integer ([`Wad`])
//! - **Deterministic Rounding**: multiply/divide truncate toward zero, square
//!   roots and n-th roots run fixed-cap Newton iterations
//! - **Type Safety**: tick handles and account identities are distinct types
//! - **Clear Boundaries**: explicit conversion points to and from `Decimal`
//!
//! ## Quick Start
//!
//! ```rust
//! use orbital_types::{fixed_point, vector, Wad};
//!
//! let r = Wad::from_int(10_000);
//! let r_squared = fixed_point::mul(r, r).unwrap();
//! assert_eq!(fixed_point::sqrt(r_squared).unwrap(), r);
//!
//! let reserves = vec![Wad::from_int(3), Wad::from_int(4)];
//! assert_eq!(vector::norm(&reserves).unwrap(), Wad::from_int(5));
//! ```

pub mod common;

pub use common::errors::FixedPointError;
pub use common::fixed_point::{self, Wad};
pub use common::identifiers::{AccountId, TickId};
pub use common::vector;
