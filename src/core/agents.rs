use crate::domain::model::{Agent, AgentChanges};
use crate::domain::ports::AgentStore;
use crate::utils::error::{AppError, Result};
use crate::utils::validation::{validate_email, validate_form_field};
use argon2::password_hash::{PasswordHasher, SaltString};
use argon2::Argon2;

/// 新增 agent 的表單
#[derive(Debug, Clone, Default)]
pub struct NewAgentForm {
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub password: String,
}

/// 更新 agent 的表單；`None` 代表不修改
#[derive(Debug, Clone, Default)]
pub struct AgentUpdateForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub password: Option<String>,
}

/// 密碼只以雜湊形式送往後端（Argon2 PHC 字串）
pub fn hash_password(password: &str) -> Result<String> {
    let salt_bytes: [u8; 16] = rand::random();
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| AppError::ProcessingError {
        message: format!("Failed to encode password salt: {}", e),
    })?;

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::ProcessingError {
            message: format!("Failed to hash password: {}", e),
        })?;

    Ok(hash.to_string())
}

pub struct AgentManager<S: AgentStore> {
    store: S,
}

impl<S: AgentStore> AgentManager<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<Agent>> {
        self.store.list_agents().await
    }

    pub async fn create(&self, form: &NewAgentForm) -> Result<()> {
        validate_form_field("name", &form.name)?;
        validate_email("email", &form.email)?;
        validate_form_field("mobile", &form.mobile)?;
        validate_form_field("password", &form.password)?;

        let changes = AgentChanges {
            name: Some(form.name.trim().to_string()),
            email: Some(form.email.trim().to_string()),
            mobile: Some(form.mobile.trim().to_string()),
            password_hash: Some(hash_password(&form.password)?),
        };

        self.store.create_agent(&changes).await?;
        tracing::info!("Agent created successfully: {}", form.email.trim());
        Ok(())
    }

    pub async fn update(&self, id: &str, form: &AgentUpdateForm) -> Result<()> {
        validate_form_field("id", id)?;

        let mut changes = AgentChanges::default();
        if let Some(name) = &form.name {
            validate_form_field("name", name)?;
            changes.name = Some(name.trim().to_string());
        }
        if let Some(email) = &form.email {
            validate_email("email", email)?;
            changes.email = Some(email.trim().to_string());
        }
        if let Some(mobile) = &form.mobile {
            validate_form_field("mobile", mobile)?;
            changes.mobile = Some(mobile.trim().to_string());
        }
        // 空白密碼視為不修改
        if let Some(password) = form.password.as_deref().filter(|p| !p.is_empty()) {
            changes.password_hash = Some(hash_password(password)?);
        }

        if changes == AgentChanges::default() {
            return Err(AppError::ValidationError {
                message: "Nothing to update: provide at least one field".to_string(),
            });
        }

        self.store.update_agent(id, &changes).await?;
        tracing::info!("Agent updated successfully: {}", id);
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        validate_form_field("id", id)?;
        self.store.delete_agent(id).await?;
        tracing::info!("Agent deleted successfully: {}", id);
        Ok(())
    }
}
