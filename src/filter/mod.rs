pub mod types;
pub mod filter;
pub mod filter_where;
pub mod filter_order;
pub mod error;
pub mod search;

pub use types::*;
pub use filter::Filter;
pub use error::FilterError;
