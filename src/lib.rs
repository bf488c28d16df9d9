pub mod accept;
pub mod advisor;
pub mod browser;
pub mod config;
pub mod discovery;
pub mod error;
pub mod platform;
pub mod shutdown;
pub mod workflow;
pub mod workspace;
