//! HTTP gateway for Linko.
//!
//! Routes requests to the shortening and redirect pipelines and owns the
//! process lifecycle: store connections, the write-behind worker and
//! graceful shutdown.

pub mod app;
pub mod config;
pub mod error;
pub mod handlers;
pub mod model;
pub mod server;
pub mod state;

pub use app::App;
pub use config::Config;
pub use state::AppState;
