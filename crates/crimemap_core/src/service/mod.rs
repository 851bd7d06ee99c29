//! Read-only query services over the record store.
//!
//! # Responsibility
//! - Turn stored records into the shapes the request layer returns.
//! - Keep query semantics independent of how sources were read.
//!
//! # Invariants
//! - Services never mutate the repository they hold.
//! - Data unavailability degrades to empty results; only boundary
//!   projection and chart reads surface errors.

pub mod aggregation_service;
pub mod boundary_service;
pub mod category_service;
pub mod chart_service;
