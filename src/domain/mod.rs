pub mod frame;
pub mod series;
pub mod types;

pub use frame::*;
pub use series::*;
pub use types::*;
