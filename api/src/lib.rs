pub mod config;
pub mod errors;
mod helpers;
pub mod models;
pub mod routes;
pub mod services;
