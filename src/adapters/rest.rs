use crate::domain::model::{Agent, AgentChanges, ListItem, NewListItem, Session};
use crate::domain::ports::{AgentDirectory, AgentStore, ListItemSink, ListItemSource};
use crate::utils::error::{AppError, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;

const AGENTS_TABLE: &str = "agents";
const LIST_ITEMS_TABLE: &str = "list_items";

/// PostgREST 風格的後端（例如 Supabase）
#[derive(Debug, Clone)]
pub struct RestBackend {
    client: Client,
    base_url: String,
    api_key: String,
    access_token: Option<String>,
}

impl RestBackend {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            access_token: None,
        })
    }

    /// 之後的請求都帶上使用者的 access token
    pub fn with_session(mut self, session: &Session) -> Self {
        self.access_token = Some(session.access_token.clone());
        self
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let token = self.access_token.as_deref().unwrap_or(&self.api_key);
        request.header("apikey", &self.api_key).bearer_auth(token)
    }

    async fn select<T: serde::de::DeserializeOwned>(
        &self,
        table: &str,
        limit: Option<usize>,
    ) -> Result<Vec<T>> {
        let mut query = vec![
            ("select", "*".to_string()),
            ("order", "created_at.desc".to_string()),
        ];
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }

        tracing::debug!("GET {} {:?}", self.table_url(table), query);
        let response = self
            .authorize(self.client.get(self.table_url(table)))
            .query(&query)
            .send()
            .await?;

        let rows = check_status(response).await?.json::<Vec<T>>().await?;
        Ok(rows)
    }
}

/// 非 2xx 回應轉成 BackendError，訊息優先取後端回傳的說明
pub(crate) async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::debug!("Backend responded {}: {}", status, body);

    Err(AppError::BackendError {
        status: status.as_u16(),
        message: extract_error_message(&body),
    })
}

fn extract_error_message(body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|value| {
            ["message", "msg", "error_description", "error"]
                .iter()
                .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
        })
        .map(str::to_string)
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl AgentDirectory for RestBackend {
    async fn fetch_agents(&self, limit: usize) -> Result<Vec<Agent>> {
        self.select(AGENTS_TABLE, Some(limit)).await
    }
}

#[async_trait]
impl ListItemSink for RestBackend {
    async fn insert_items(&self, items: &[NewListItem]) -> Result<()> {
        tracing::debug!("POST {} ({} rows)", self.table_url(LIST_ITEMS_TABLE), items.len());
        let response = self
            .authorize(self.client.post(self.table_url(LIST_ITEMS_TABLE)))
            .header("Prefer", "return=minimal")
            .json(items)
            .send()
            .await?;

        check_status(response).await?;
        Ok(())
    }
}

#[async_trait]
impl ListItemSource for RestBackend {
    async fn list_items(&self) -> Result<Vec<ListItem>> {
        self.select(LIST_ITEMS_TABLE, None).await
    }
}

#[async_trait]
impl AgentStore for RestBackend {
    async fn list_agents(&self) -> Result<Vec<Agent>> {
        self.select(AGENTS_TABLE, None).await
    }

    async fn create_agent(&self, changes: &AgentChanges) -> Result<()> {
        let response = self
            .authorize(self.client.post(self.table_url(AGENTS_TABLE)))
            .header("Prefer", "return=minimal")
            .json(changes)
            .send()
            .await?;

        check_status(response).await?;
        Ok(())
    }

    async fn update_agent(&self, id: &str, changes: &AgentChanges) -> Result<()> {
        let response = self
            .authorize(self.client.patch(self.table_url(AGENTS_TABLE)))
            .query(&[("id", format!("eq.{}", id))])
            .header("Prefer", "return=minimal")
            .json(changes)
            .send()
            .await?;

        check_status(response).await?;
        Ok(())
    }

    async fn delete_agent(&self, id: &str) -> Result<()> {
        let response = self
            .authorize(self.client.delete(self.table_url(AGENTS_TABLE)))
            .query(&[("id", format!("eq.{}", id))])
            .send()
            .await?;

        check_status(response).await?;
        Ok(())
    }
}
