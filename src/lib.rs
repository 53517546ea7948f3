pub mod api;
pub mod auth;
pub mod clock;
pub mod config;
pub mod database;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;
pub mod storage;

pub use routes::app;
pub use state::AppState;
