//! Domain types for the CANSLIM screener

pub mod bar;
pub mod fundamentals;
pub mod result;

pub use bar::Bar;
pub use fundamentals::{EarningsPoint, EarningsSeries, FundamentalSnapshot};
pub use result::ScreenResult;
