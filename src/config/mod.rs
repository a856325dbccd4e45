#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::{AgentCommand, CliConfig, Command};
pub use toml_config::AppConfig;
