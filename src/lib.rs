pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod logging;
pub mod rng;
pub mod score_store;
pub mod server_protocol;
pub mod ticker;
pub mod types;
pub mod world;
