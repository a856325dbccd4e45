use crate::config::toml_config::AppConfig;
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "list-distributor")]
#[command(about = "Manage agents and distribute uploaded contact lists across them")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "list-distributor.toml")]
    pub config: String,

    /// Override backend.url from config
    #[arg(long)]
    pub backend_url: Option<String>,

    /// Override auth.email from config
    #[arg(long)]
    pub email: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Upload a CSV/XLSX/XLS file and distribute its rows across agents
    Import {
        /// File to upload
        file: String,

        /// Show the distribution without writing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Show agents with their assigned records
    Dashboard {
        /// Case-insensitive filter on agent name or email
        #[arg(short, long, default_value = "")]
        search: String,

        /// List each agent's records
        #[arg(long)]
        show_items: bool,
    },

    /// Agent management
    #[command(subcommand)]
    Agents(AgentCommand),
}

#[derive(Debug, Clone, Subcommand)]
pub enum AgentCommand {
    /// List agents, newest first
    List,

    /// Create an agent
    Create(CreateAgentArgs),

    /// Update an agent; omitted fields stay unchanged
    Update(UpdateAgentArgs),

    /// Delete an agent
    Delete {
        id: String,
    },
}

#[derive(Debug, Clone, Args)]
pub struct CreateAgentArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub mobile: String,
    #[arg(long)]
    pub password: String,
}

#[derive(Debug, Clone, Args)]
pub struct UpdateAgentArgs {
    pub id: String,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub mobile: Option<String>,
    /// New password; leave out to keep the current one
    #[arg(long)]
    pub password: Option<String>,
}

impl CliConfig {
    /// 命令列參數優先於設定檔
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(url) = &self.backend_url {
            tracing::info!("🔧 backend.url overridden to: {}", url);
            config.backend.url = url.clone();
        }
        if let Some(email) = &self.email {
            config.auth.email = Some(email.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_import_command() {
        let cli = CliConfig::parse_from(["list-distributor", "import", "contacts.xlsx", "--dry-run"]);
        assert_eq!(cli.config, "list-distributor.toml");
        match cli.command {
            Command::Import { file, dry_run } => {
                assert_eq!(file, "contacts.xlsx");
                assert!(dry_run);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_agent_update() {
        let cli = CliConfig::parse_from([
            "list-distributor",
            "-c",
            "other.toml",
            "agents",
            "update",
            "agent-1",
            "--mobile",
            "+15550001",
        ]);
        assert_eq!(cli.config, "other.toml");
        match cli.command {
            Command::Agents(AgentCommand::Update(args)) => {
                assert_eq!(args.id, "agent-1");
                assert_eq!(args.mobile.as_deref(), Some("+15550001"));
                assert!(args.password.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_overrides() {
        let cli = CliConfig::parse_from([
            "list-distributor",
            "--backend-url",
            "http://localhost:54321",
            "--email",
            "ops@example.com",
            "dashboard",
        ]);
        let mut config = AppConfig::from_toml_str(
            "[backend]\nurl = \"https://project.supabase.co\"\napi_key = \"k\"\n\n[auth]\npassword = \"from-file\"\n",
        )
        .unwrap();

        cli.apply_overrides(&mut config);

        assert_eq!(config.backend.url, "http://localhost:54321");
        assert_eq!(config.auth.email.as_deref(), Some("ops@example.com"));
        // 密碼只來自設定檔（可用 ${VAR} 代入）
        assert_eq!(config.auth.password.as_deref(), Some("from-file"));
    }
}
