pub mod auth;
pub mod response;

pub use auth::{authenticate, require_role};
pub use response::{ApiResponse, ApiResult};
