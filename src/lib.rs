// Library exports for Carelink
// This allows integration tests and external code to use Carelink modules

pub mod auth;
pub mod boards;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod library;
pub mod pairing;
pub mod progress;
pub mod routes;
pub mod speech;
pub mod state;
