use crate::adapters::rest::check_status;
use crate::domain::model::Session;
use crate::domain::ports::Authenticator;
use crate::utils::error::{AppError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tokio::sync::watch;

/// GoTrue 風格的登入服務
#[derive(Debug, Clone)]
pub struct AuthClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl AuthClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl Authenticator for AuthClient {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let url = format!("{}/auth/v1/token", self.base_url);
        tracing::debug!("POST {} (password grant for {})", url, email);

        let response = self
            .client
            .post(&url)
            .query(&[("grant_type", "password")])
            .header("apikey", &self.api_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        // 帳密錯誤屬於驗證失敗，而不是後端故障
        let response = check_status(response).await.map_err(|e| match e {
            AppError::BackendError { status, message } if (400..500).contains(&status) => {
                AppError::NotAuthenticated { message }
            }
            other => other,
        })?;

        Ok(response.json::<Session>().await?)
    }

    async fn sign_out(&self, session: &Session) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/auth/v1/logout", self.base_url))
            .header("apikey", &self.api_key)
            .bearer_auth(&session.access_token)
            .send()
            .await?;

        check_status(response).await?;
        Ok(())
    }
}

/// 目前登入狀態，透過 watch channel 通知訂閱者
pub struct SessionContext<A: Authenticator> {
    auth: A,
    state: watch::Sender<Option<Session>>,
}

impl<A: Authenticator> SessionContext<A> {
    pub fn new(auth: A) -> Self {
        let (state, _) = watch::channel(None);
        Self { auth, state }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.state.subscribe()
    }

    pub fn current(&self) -> Option<Session> {
        self.state.borrow().clone()
    }

    /// 需要登入的操作先呼叫這個
    pub fn require(&self) -> Result<Session> {
        self.current().ok_or_else(|| AppError::NotAuthenticated {
            message: "login required".to_string(),
        })
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let session = self.auth.sign_in(email, password).await?;
        tracing::info!("🔐 Signed in as {}", email);
        self.state.send_replace(Some(session.clone()));
        Ok(session)
    }

    /// 本地狀態一定清除；後端登出失敗只記錄警告
    pub async fn logout(&self) {
        if let Some(session) = self.state.send_replace(None) {
            if let Err(e) = self.auth.sign_out(&session).await {
                tracing::warn!("Backend sign-out failed: {}", e);
            }
            tracing::info!("Signed out");
        }
    }
}

/// 等到工作階段結束（登出）為止
pub async fn session_ended(mut receiver: watch::Receiver<Option<Session>>) {
    // sender 被丟棄也視為結束
    let _ = receiver.wait_for(|session| session.is_none()).await;
}
