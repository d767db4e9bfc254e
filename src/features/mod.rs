//! Feature derivation stages: weather aggregation, calendar indicators and
//! production aggregates.

pub mod calendar;
pub mod holidays;
pub mod production;
pub mod weather;

pub use calendar::*;
pub use holidays::*;
pub use production::*;
pub use weather::*;
