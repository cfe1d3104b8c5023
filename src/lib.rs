pub mod app;
pub mod cli;
pub mod config;
pub mod journaling;
pub mod model;
pub mod storage;
pub mod store;
pub mod windows;

pub use app::Workspace;
pub use config::{AppConfig, ConfigLoader, ConfigPaths};
