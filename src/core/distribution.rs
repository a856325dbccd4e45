//! 將匯入資料平均分配給 agent。
//!
//! 採連續區塊切分：前 `n % m` 個 agent 各拿 `n / m + 1` 筆，其餘各拿 `n / m` 筆，
//! 依原始順序先填滿 agent 0，再 agent 1，以此類推。相同輸入永遠得到相同結果。

use crate::domain::model::{Agent, ImportRecord, NewListItem};
use crate::utils::error::{AppError, Result};

/// 單筆資料的分配結果：第 `record_index` 筆交給第 `agent_index` 個 agent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    pub record_index: usize,
    pub agent_index: usize,
}

/// 每個 agent 應分得的筆數，長度為 `agent_count`
pub fn quota_sizes(record_count: usize, agent_count: usize) -> Vec<usize> {
    if agent_count == 0 {
        return Vec::new();
    }

    let base = record_count / agent_count;
    let remainder = record_count % agent_count;

    (0..agent_count)
        .map(|i| if i < remainder { base + 1 } else { base })
        .collect()
}

/// 計算每筆資料對應的 agent 索引
pub fn assign(record_count: usize, agent_count: usize) -> Result<Vec<Assignment>> {
    if agent_count == 0 {
        return Err(AppError::NoAgentsAvailable);
    }

    let mut assignments = Vec::with_capacity(record_count);
    let mut record_index = 0;
    for (agent_index, quota) in quota_sizes(record_count, agent_count).into_iter().enumerate() {
        for _ in 0..quota {
            assignments.push(Assignment {
                record_index,
                agent_index,
            });
            record_index += 1;
        }
    }

    Ok(assignments)
}

/// 依分配結果產生要寫入的 list item，順序與輸入資料相同
pub fn distribute(records: &[ImportRecord], agents: &[Agent]) -> Result<Vec<NewListItem>> {
    let assignments = assign(records.len(), agents.len())?;

    Ok(assignments
        .into_iter()
        .map(|assignment| {
            let record = &records[assignment.record_index];
            NewListItem {
                agent_id: agents[assignment.agent_index].id.clone(),
                first_name: record.first_name.clone(),
                phone: record.phone.clone(),
                notes: record.notes.clone(),
            }
        })
        .collect())
}
