pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{auth::AuthClient, auth::SessionContext, rest::RestBackend, storage::LocalStorage};
pub use config::AppConfig;
pub use core::{agents::AgentManager, dashboard::Dashboard, import::ImportService};
pub use utils::error::{AppError, Result};
