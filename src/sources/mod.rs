//! Raw source readers.
//!
//! Each reader is configured with an explicit file or directory location and
//! turns its raw export into a parsed, timestamp-keyed structure.

pub mod coal;
pub mod files;
pub mod market;
pub mod production;
pub mod weather;

pub use coal::*;
pub use market::*;
pub use production::*;
pub use weather::*;
