//! Read-only tools used by the scheduler.

pub mod revisit;
pub mod statistics;
pub mod visited;

pub use revisit::{RevisitParams, revisit_impl};
pub use statistics::statistics_impl;
pub use visited::{VisitedParams, visited_impl};
