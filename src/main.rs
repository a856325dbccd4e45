use clap::Parser;
use list_distributor::adapters::auth::session_ended;
use list_distributor::config::toml_config::LogFormat;
use list_distributor::config::{AgentCommand, Command};
use list_distributor::core::agents::{AgentUpdateForm, NewAgentForm};
use list_distributor::core::dashboard::{filter_agents, render};
use list_distributor::domain::ports::Storage;
use list_distributor::utils::error::ErrorSeverity;
use list_distributor::utils::{logger, validation::Validate};
use list_distributor::{
    AgentManager, AppConfig, AppError, AuthClient, CliConfig, Dashboard, ImportService,
    LocalStorage, RestBackend, SessionContext,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 載入配置（日誌尚未初始化，錯誤直接輸出）
    let mut config = match AppConfig::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", cli.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 初始化日誌
    match config.logging.format {
        LogFormat::Compact => logger::init_cli_logger(cli.verbose, config.logging.level.as_deref()),
        LogFormat::Json => logger::init_json_logger(cli.verbose, config.logging.level.as_deref()),
    }

    tracing::info!("Starting list-distributor");
    cli.apply_overrides(&mut config);

    // 驗證配置
    if let Err(e) = config.validate() {
        report_and_exit(&e);
    }

    if let Err(e) = run(&cli, config).await {
        report_and_exit(&e);
    }

    Ok(())
}

fn report_and_exit(e: &AppError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}

async fn run(cli: &CliConfig, config: AppConfig) -> list_distributor::Result<()> {
    let timeout = config.request_timeout();

    // 所有管理操作都需要先登入
    let auth = AuthClient::new(&config.backend.url, &config.backend.api_key, timeout)?;
    let session_ctx = SessionContext::new(auth);

    let (email, password) = config.credentials()?;
    session_ctx.login(email, password).await?;
    let session = session_ctx.require()?;
    let watcher = tokio::spawn(session_ended(session_ctx.subscribe()));

    let backend =
        RestBackend::new(&config.backend.url, &config.backend.api_key, timeout)?.with_session(&session);

    let result = match &cli.command {
        Command::Import { file, dry_run } => run_import(backend, config.clone(), file, *dry_run).await,
        Command::Dashboard { search, show_items } => run_dashboard(backend, search, *show_items).await,
        Command::Agents(command) => run_agents(AgentManager::new(backend), command).await,
    };

    session_ctx.logout().await;
    if watcher.await.is_ok() {
        tracing::debug!("Session ended");
    }

    result
}

async fn run_import(
    backend: RestBackend,
    config: AppConfig,
    file: &str,
    dry_run: bool,
) -> list_distributor::Result<()> {
    let storage = LocalStorage::new(".".to_string());
    let data = storage.read_file(file).await?;
    let service = ImportService::new(backend.clone(), backend, config);

    let summary = if dry_run {
        tracing::info!("🔍 DRY RUN MODE - nothing will be written");
        service.plan(file, &data).await?
    } else {
        service.import_file(file, &data).await?
    };

    for warning in &summary.warnings {
        println!("⚠️  {}", warning);
    }
    if summary.skipped_rows > 0 {
        println!("ℹ️  {} rows skipped (missing FirstName or Phone)", summary.skipped_rows);
    }
    for share in &summary.shares {
        println!("  {:<24} {:>6} records", share.agent_name, share.count);
    }

    if summary.persisted {
        println!("✅ {}", summary.success_message());
    } else {
        println!(
            "📋 {} records would be distributed across {} agents",
            summary.record_count,
            summary.agent_count()
        );
    }
    Ok(())
}

async fn run_dashboard(
    backend: RestBackend,
    search: &str,
    show_items: bool,
) -> list_distributor::Result<()> {
    let dashboard = Dashboard::new(backend.clone(), backend);
    let rows = dashboard.load().await?;
    let filtered = filter_agents(&rows, search);
    println!("{}", render(&filtered, search, show_items).trim_end());
    Ok(())
}

async fn run_agents(
    manager: AgentManager<RestBackend>,
    command: &AgentCommand,
) -> list_distributor::Result<()> {
    match command {
        AgentCommand::List => {
            let agents = manager.list().await?;
            if agents.is_empty() {
                println!("No agents found.");
            }
            for agent in agents {
                println!("{}  {} <{}> • {}", agent.id, agent.name, agent.email, agent.mobile);
            }
        }
        AgentCommand::Create(args) => {
            manager
                .create(&NewAgentForm {
                    name: args.name.clone(),
                    email: args.email.clone(),
                    mobile: args.mobile.clone(),
                    password: args.password.clone(),
                })
                .await?;
            println!("✅ Agent created successfully");
        }
        AgentCommand::Update(args) => {
            manager
                .update(
                    &args.id,
                    &AgentUpdateForm {
                        name: args.name.clone(),
                        email: args.email.clone(),
                        mobile: args.mobile.clone(),
                        password: args.password.clone(),
                    },
                )
                .await?;
            println!("✅ Agent updated successfully");
        }
        AgentCommand::Delete { id } => {
            manager.delete(id).await?;
            println!("✅ Agent deleted successfully");
        }
    }
    Ok(())
}
