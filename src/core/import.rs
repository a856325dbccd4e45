use crate::core::distribution::{distribute, quota_sizes};
use crate::core::parser::parse_records;
use crate::domain::model::NewListItem;
use crate::domain::ports::{AgentDirectory, ConfigProvider, ListItemSink};
use crate::utils::error::{AppError, Result};
use std::fmt;
use tokio::sync::Mutex;

/// 匯入可繼續，但需要提醒使用者的狀況
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportWarning {
    ReducedFanOut { available: usize, requested: usize },
}

impl fmt::Display for ImportWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportWarning::ReducedFanOut { available, .. } => write!(
                f,
                "Only {} agents available. Records will be distributed among them.",
                available
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentShare {
    pub agent_id: String,
    pub agent_name: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub record_count: usize,
    pub skipped_rows: usize,
    pub shares: Vec<AgentShare>,
    pub warnings: Vec<ImportWarning>,
    /// dry run 時為 false
    pub persisted: bool,
}

impl ImportSummary {
    pub fn agent_count(&self) -> usize {
        self.shares.len()
    }

    pub fn success_message(&self) -> String {
        format!(
            "Successfully uploaded {} records and distributed them across {} agents",
            self.record_count,
            self.agent_count()
        )
    }
}

/// 上傳流程：解析 → 取得 agent → 分配 → 批次寫入
///
/// 同一個 service 同時間只允許一個匯入在進行，第二個會直接得到
/// `ImportInProgress`。
pub struct ImportService<D: AgentDirectory, S: ListItemSink, C: ConfigProvider> {
    directory: D,
    sink: S,
    config: C,
    in_flight: Mutex<()>,
}

impl<D: AgentDirectory, S: ListItemSink, C: ConfigProvider> ImportService<D, S, C> {
    pub fn new(directory: D, sink: S, config: C) -> Self {
        Self {
            directory,
            sink,
            config,
            in_flight: Mutex::new(()),
        }
    }

    pub async fn import_file(&self, file_name: &str, data: &[u8]) -> Result<ImportSummary> {
        let _guard = self
            .in_flight
            .try_lock()
            .map_err(|_| AppError::ImportInProgress)?;

        let (mut summary, items) = self.prepare(file_name, data).await?;

        tracing::info!("Writing {} list items", items.len());
        self.sink.insert_items(&items).await?;
        summary.persisted = true;

        tracing::info!("✅ {}", summary.success_message());
        Ok(summary)
    }

    /// 只計算分配結果，不寫入
    pub async fn plan(&self, file_name: &str, data: &[u8]) -> Result<ImportSummary> {
        let _guard = self
            .in_flight
            .try_lock()
            .map_err(|_| AppError::ImportInProgress)?;

        let (summary, _) = self.prepare(file_name, data).await?;
        Ok(summary)
    }

    async fn prepare(&self, file_name: &str, data: &[u8]) -> Result<(ImportSummary, Vec<NewListItem>)> {
        tracing::info!("Parsing {}", file_name);
        let parsed = parse_records(file_name, data, self.config.header_matching())?;
        tracing::info!(
            "Parsed {} valid records ({} rows skipped)",
            parsed.records.len(),
            parsed.skipped_rows
        );

        let requested = self.config.max_agents();
        let agents = self.directory.fetch_agents(requested).await?;
        // 後端若沒遵守 limit，這裡再截一次
        let agents = &agents[..agents.len().min(requested)];

        if agents.is_empty() {
            tracing::warn!("No agents available, aborting import before write");
            return Err(AppError::NoAgentsAvailable);
        }

        let mut warnings = Vec::new();
        if agents.len() < requested {
            let warning = ImportWarning::ReducedFanOut {
                available: agents.len(),
                requested,
            };
            tracing::warn!("{}", warning);
            warnings.push(warning);
        }

        let items = distribute(&parsed.records, agents)?;
        let shares = agents
            .iter()
            .zip(quota_sizes(parsed.records.len(), agents.len()))
            .map(|(agent, count)| AgentShare {
                agent_id: agent.id.clone(),
                agent_name: agent.name.clone(),
                count,
            })
            .collect::<Vec<_>>();

        for share in &shares {
            tracing::debug!("{} ({}) <- {} records", share.agent_name, share.agent_id, share.count);
        }

        let summary = ImportSummary {
            record_count: parsed.records.len(),
            skipped_rows: parsed.skipped_rows,
            shares,
            warnings,
            persisted: false,
        };

        Ok((summary, items))
    }
}
