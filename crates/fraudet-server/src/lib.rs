//! Fraudet Server
//!
//! HTTP serving layer for the fraud-detection text classifier: fetches a
//! versioned model bundle from remote object storage, loads it exactly
//! once per process, and serves `POST /predict` over the warm model.

pub mod cli;
pub mod config;
pub mod routes;
pub mod state;

pub use cli::Cli;
pub use config::{ServerConfig, StoreConfig};
pub use routes::create_router;
pub use state::AppState;
