//! Generative fallback: picks a tool for utterances the router could not place.

pub mod fallback;
pub mod parse;
pub mod types;

pub use fallback::{CommandPlanner, PlannerFallback};
pub use types::{PlannerResult, Tool};
