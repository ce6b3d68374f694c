use std::collections::{BTreeMap, HashMap};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

/// Row persistence for the clinic's own tables (doctors, chairs,
/// appointments, notifications). Rows are JSON objects keyed by `id`.
#[async_trait]
pub trait TableStore: Send + Sync {
    async fn load(&self, table: &str) -> Result<Vec<Value>>;

    /// Insert or replace rows by `id`. All rows are written or none are.
    async fn upsert(&self, table: &str, rows: Vec<Value>) -> Result<()>;
}

/// Process-local table store, used by tests and by a server started
/// without a record store.
#[derive(Default)]
pub struct MemoryTableStore {
    tables: RwLock<HashMap<String, BTreeMap<String, Value>>>,
}

impl MemoryTableStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TableStore for MemoryTableStore {
    async fn load(&self, table: &str) -> Result<Vec<Value>> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(table)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn upsert(&self, table: &str, rows: Vec<Value>) -> Result<()> {
        let keyed = rows
            .into_iter()
            .map(|row| row_key(&row).map(|key| (key, row)))
            .collect::<Result<Vec<_>>>()?;

        let mut tables = self.tables.write().await;
        tables.entry(table.to_string()).or_default().extend(keyed);
        Ok(())
    }
}

fn row_key(row: &Value) -> Result<String> {
    match row.get("id") {
        Some(Value::String(id)) => Ok(id.clone()),
        Some(Value::Number(id)) => Ok(id.to_string()),
        _ => Err(anyhow!("Row has no id column: {}", row)),
    }
}
