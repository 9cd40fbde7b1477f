pub mod commands;
pub mod config;
pub mod output;
pub mod tracing_setup;

pub use commands::Session;
pub use config::CliConfig;
pub use tracing_setup::init_tracing;
