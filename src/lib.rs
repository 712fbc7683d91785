// src/lib.rs

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod quiz;
pub mod repositories;
pub mod routes;
pub mod seed;
pub mod services;
pub mod state;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod utils;

pub use routes::create_router;
