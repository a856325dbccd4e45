use crate::core::parser::HeaderMatching;
use crate::domain::model::{Agent, AgentChanges, ListItem, NewListItem, Session};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait ConfigProvider: Send + Sync {
    fn max_agents(&self) -> usize;
    fn header_matching(&self) -> HeaderMatching;
}

/// 目前的 agent 清單（唯讀），依建立時間新到舊排序
#[async_trait]
pub trait AgentDirectory: Send + Sync {
    async fn fetch_agents(&self, limit: usize) -> Result<Vec<Agent>>;
}

/// 批次寫入；失敗時整批視為未寫入
#[async_trait]
pub trait ListItemSink: Send + Sync {
    async fn insert_items(&self, items: &[NewListItem]) -> Result<()>;
}

#[async_trait]
pub trait AgentStore: Send + Sync {
    async fn list_agents(&self) -> Result<Vec<Agent>>;
    async fn create_agent(&self, changes: &AgentChanges) -> Result<()>;
    async fn update_agent(&self, id: &str, changes: &AgentChanges) -> Result<()>;
    async fn delete_agent(&self, id: &str) -> Result<()>;
}

#[async_trait]
pub trait ListItemSource: Send + Sync {
    async fn list_items(&self) -> Result<Vec<ListItem>>;
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session>;
    async fn sign_out(&self, session: &Session) -> Result<()>;
}

/// 上傳檔案的來源
pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
}
