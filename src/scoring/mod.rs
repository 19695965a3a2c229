// Scoring — probabilities from a trained model, then tiers for reporting.

pub mod dispatcher;
pub mod tier;

pub use dispatcher::ScoringDispatcher;
pub use tier::{Tier, TierSet};
