use crate::domain::model::{Agent, ListItem};
use crate::domain::ports::{AgentStore, ListItemSource};
use crate::utils::error::Result;
use std::collections::HashMap;

/// 備註為空時顯示的符號
pub const EMPTY_NOTES: &str = "—";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentWithItems {
    pub agent: Agent,
    pub items: Vec<ListItem>,
}

impl AgentWithItems {
    pub fn item_count(&self) -> usize {
        self.items.len()
    }
}

/// 將 agent 與其 list item 合併；兩邊都保留輸入的排序
pub fn join_agents_with_items(agents: Vec<Agent>, items: Vec<ListItem>) -> Vec<AgentWithItems> {
    let mut by_agent: HashMap<String, Vec<ListItem>> = HashMap::new();
    for item in items {
        by_agent.entry(item.agent_id.clone()).or_default().push(item);
    }

    agents
        .into_iter()
        .map(|agent| {
            let items = by_agent.remove(&agent.id).unwrap_or_default();
            AgentWithItems { agent, items }
        })
        .collect()
}

/// 名稱或 email 包含搜尋字串（不分大小寫）；空字串不過濾
pub fn filter_agents<'a>(rows: &'a [AgentWithItems], search: &str) -> Vec<&'a AgentWithItems> {
    let needle = search.to_lowercase();
    rows.iter()
        .filter(|row| {
            row.agent.name.to_lowercase().contains(&needle)
                || row.agent.email.to_lowercase().contains(&needle)
        })
        .collect()
}

pub struct Dashboard<A: AgentStore, L: ListItemSource> {
    agents: A,
    items: L,
}

impl<A: AgentStore, L: ListItemSource> Dashboard<A, L> {
    pub fn new(agents: A, items: L) -> Self {
        Self { agents, items }
    }

    pub async fn load(&self) -> Result<Vec<AgentWithItems>> {
        let agents = self.agents.list_agents().await?;
        let items = self.items.list_items().await?;
        tracing::debug!("Dashboard loaded {} agents, {} items", agents.len(), items.len());
        Ok(join_agents_with_items(agents, items))
    }
}

/// 純文字呈現，給 CLI 使用
pub fn render(rows: &[&AgentWithItems], search: &str, show_items: bool) -> String {
    if rows.is_empty() {
        return if search.is_empty() {
            "No agents found.".to_string()
        } else {
            "No agents found matching your search.".to_string()
        };
    }

    let mut out = String::new();
    for row in rows {
        out.push_str(&format!(
            "{} <{}> • {}\n  Assigned Records: {}\n",
            row.agent.name,
            row.agent.email,
            row.agent.mobile,
            row.item_count()
        ));

        if show_items && !row.items.is_empty() {
            out.push_str(&format!("  {:<20} {:<16} {}\n", "First Name", "Phone", "Notes"));
            for item in &row.items {
                out.push_str(&format!(
                    "  {:<20} {:<16} {}\n",
                    item.first_name,
                    item.phone,
                    item.notes.as_deref().unwrap_or(EMPTY_NOTES)
                ));
            }
        }
    }
    out
}
