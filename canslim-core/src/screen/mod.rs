//! CANSLIM screening: criteria, thresholds and the evaluation cascade.

pub mod criteria;
pub mod engine;

pub use criteria::{CriteriaConfig, Criterion};
pub use engine::{screen, ScreenError, ScreenOutcome, ScreeningEngine, SeriesRole};
