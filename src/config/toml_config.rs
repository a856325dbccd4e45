use crate::core::parser::HeaderMatching;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{AppError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_range, validate_required_field, validate_url, Validate,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// 一次匯入最多分配給幾個 agent
pub const MAX_AGENTS_LIMIT: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub backend: BackendConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub url: String,
    pub api_key: String,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    #[serde(default = "default_max_agents")]
    pub max_agents: usize,
    #[serde(default)]
    pub header_matching: HeaderMatching,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            max_agents: default_max_agents(),
            header_matching: HeaderMatching::default(),
        }
    }
}

fn default_max_agents() -> usize {
    MAX_AGENTS_LIMIT
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
    #[serde(default)]
    pub format: LogFormat,
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(AppError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| AppError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${SUPABASE_KEY})；找不到的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| AppError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.backend.timeout_seconds.unwrap_or(30))
    }

    /// 登入用的帳密，缺少時回傳 MissingConfigError
    pub fn credentials(&self) -> Result<(&str, &str)> {
        let email = validate_required_field("auth.email", &self.auth.email)?;
        let password = validate_required_field("auth.password", &self.auth.password)?;
        Ok((email.as_str(), password.as_str()))
    }
}

fn reject_unresolved(field: &str, value: &str) -> Result<()> {
    if value.contains("${") {
        return Err(AppError::InvalidConfigValueError {
            field: field.to_string(),
            value: value.to_string(),
            reason: "Environment variable is not set".to_string(),
        });
    }
    Ok(())
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        validate_url("backend.url", &self.backend.url)?;
        validate_non_empty_string("backend.api_key", &self.backend.api_key)?;
        reject_unresolved("backend.api_key", &self.backend.api_key)?;

        if let Some(timeout) = self.backend.timeout_seconds {
            validate_range("backend.timeout_seconds", timeout, 1, 600)?;
        }

        validate_range("import.max_agents", self.import.max_agents, 1, MAX_AGENTS_LIMIT)?;

        if let Some(email) = &self.auth.email {
            reject_unresolved("auth.email", email)?;
        }
        if let Some(password) = &self.auth.password {
            reject_unresolved("auth.password", password)?;
        }

        tracing::debug!("✅ Configuration validation passed");
        Ok(())
    }
}

impl ConfigProvider for AppConfig {
    fn max_agents(&self) -> usize {
        self.import.max_agents
    }

    fn header_matching(&self) -> HeaderMatching {
        self.import.header_matching
    }
}
