// Library exports for Picgram
// This allows integration tests and external code to use Picgram modules

pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod orchestrator;
pub mod platform;
pub mod routes;
pub mod state;
