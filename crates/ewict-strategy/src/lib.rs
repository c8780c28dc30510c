//! Signal generation: retracement entries gated by a configurable
//! filter set.

pub mod filters;
pub mod generator;

pub use filters::FilterSet;
pub use generator::SignalGenerator;
