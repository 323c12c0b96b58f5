//! ui2code web UI and CLI: upload a screenshot, watch the four stages, download the HTML.

pub mod cli;
pub mod config;
pub mod server;

pub use config::AppConfig;
pub use server::{router, AppState, SharedState};
