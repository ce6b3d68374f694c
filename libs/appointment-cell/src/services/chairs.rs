// libs/appointment-cell/src/services/chairs.rs
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use shared_database::TableStore;

use crate::models::ChairId;

pub const CHAIRS_TABLE: &str = "chairs";

#[derive(Deserialize)]
struct ChairRow {
    id: ChairId,
}

/// The clinic's treatment chairs. Holds identities only; whether a chair
/// is free at a slot is answered from the ledger.
#[derive(Debug, Clone)]
pub struct ChairPool {
    chairs: Vec<ChairId>,
}

impl ChairPool {
    /// Chairs numbered `1..=count`.
    pub fn new(count: u32) -> Self {
        Self {
            chairs: (1..=count).collect(),
        }
    }

    /// Chairs recorded in the store. An empty table is seeded with
    /// `1..=default_count`.
    pub async fn load(store: &dyn TableStore, default_count: u32) -> anyhow::Result<Self> {
        let rows = store.load(CHAIRS_TABLE).await?;

        if rows.is_empty() {
            let pool = Self::new(default_count);
            let seed = pool.chairs.iter().map(|id| json!({ "id": id })).collect();
            store.upsert(CHAIRS_TABLE, seed).await?;
            info!("Seeded {} chairs", pool.len());
            return Ok(pool);
        }

        let ids = rows
            .into_iter()
            .map(|row| serde_json::from_value::<ChairRow>(row).map(|chair| chair.id))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::with_ids(ids))
    }

    pub fn with_ids(ids: impl IntoIterator<Item = ChairId>) -> Self {
        let mut chairs: Vec<ChairId> = ids.into_iter().collect();
        chairs.sort_unstable();
        chairs.dedup();
        Self { chairs }
    }

    pub fn ids(&self) -> &[ChairId] {
        &self.chairs
    }

    pub fn len(&self) -> usize {
        self.chairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chairs.is_empty()
    }

    pub fn contains(&self, chair_id: ChairId) -> bool {
        self.chairs.binary_search(&chair_id).is_ok()
    }

    /// Lowest-id chair for which `is_taken` is false.
    pub fn first_available<F>(&self, is_taken: F) -> Option<ChairId>
    where
        F: Fn(ChairId) -> bool,
    {
        self.chairs.iter().copied().find(|&chair_id| !is_taken(chair_id))
    }
}
