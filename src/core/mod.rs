pub mod agents;
pub mod dashboard;
pub mod distribution;
pub mod import;
pub mod parser;

pub use crate::domain::model::{Agent, ImportRecord, ListItem, NewListItem};
pub use crate::domain::ports::{AgentDirectory, AgentStore, ConfigProvider, ListItemSink, ListItemSource};
pub use crate::utils::error::Result;
