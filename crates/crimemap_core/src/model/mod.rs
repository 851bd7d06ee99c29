//! Normalized record model for crime, population and boundary data.
//!
//! # Responsibility
//! - Define the canonical shapes stored by the record store.
//! - Define the process-wide observation window.
//!
//! # Invariants
//! - Region fields hold canonical keys produced by `normalize_region`.
//! - Crime records always carry a parsed instant.

pub mod geometry;
pub mod record;
pub mod window;
