//! CANSLIM Core: domain types, growth metrics, chart patterns, the criteria
//! cascade and data providers.
//!
//! The screening path is pure: `screen::ScreeningEngine::screen` takes one
//! ticker's fundamentals, its price history and the benchmark history and
//! returns a pass record or the first failed criterion. Everything that
//! touches the network or disk lives under `data`.

pub mod data;
pub mod domain;
pub mod indicators;
pub mod metrics;
pub mod patterns;
pub mod screen;
