//! In-memory store: useful for testing and throwaway sessions.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use fieldrep_core::error::StoreError;
use fieldrep_core::record::{
    Hcp, Interaction, InteractionPatch, NewHcp, NewInteraction, strip_honorific,
};
use fieldrep_core::store::RecordStore;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    hcps: Vec<Hcp>,
    interactions: Vec<Interaction>,
    last_hcp_id: i64,
    last_interaction_id: i64,
}

/// A store holding both tables in `Vec`s behind one lock.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(a: &Interaction, b: &Interaction) -> std::cmp::Ordering {
    b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id))
}

#[async_trait]
impl RecordStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn create_hcp(&self, hcp: NewHcp) -> Result<Hcp, StoreError> {
        hcp.validate().map_err(StoreError::Constraint)?;
        let mut tables = self.tables.write().await;
        tables.last_hcp_id += 1;
        let record = Hcp {
            id: tables.last_hcp_id,
            name: hcp.name,
            specialty: hcp.specialty,
            hospital: hcp.hospital,
            email: hcp.email,
            phone: hcp.phone,
            created_at: Utc::now(),
        };
        tables.hcps.push(record.clone());
        Ok(record)
    }

    async fn list_hcps(&self) -> Result<Vec<Hcp>, StoreError> {
        Ok(self.tables.read().await.hcps.clone())
    }

    async fn get_hcp(&self, id: i64) -> Result<Option<Hcp>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.hcps.iter().find(|h| h.id == id).cloned())
    }

    async fn find_hcp_by_name(&self, name: &str) -> Result<Option<Hcp>, StoreError> {
        let needle = strip_honorific(name).to_lowercase();
        if needle.is_empty() {
            return Ok(None);
        }
        let tables = self.tables.read().await;
        Ok(tables
            .hcps
            .iter()
            .find(|h| h.name_contains(&needle))
            .cloned())
    }

    async fn search_hcps(&self, query: &str, limit: usize) -> Result<Vec<Hcp>, StoreError> {
        let needle = query.trim().to_lowercase();
        let tables = self.tables.read().await;
        Ok(tables
            .hcps
            .iter()
            .filter(|h| h.matches_query(&needle))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn create_interaction(&self, new: NewInteraction) -> Result<Interaction, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.hcps.iter().any(|h| h.id == new.hcp_id) {
            return Err(StoreError::Constraint(format!(
                "HCP {} does not exist",
                new.hcp_id
            )));
        }
        tables.last_interaction_id += 1;
        let created_at = new.created_at.unwrap_or_else(Utc::now);
        let record = Interaction {
            id: tables.last_interaction_id,
            hcp_id: new.hcp_id,
            kind: new.kind,
            notes: new.notes,
            products_discussed: new.products_discussed,
            materials_shared: new.materials_shared,
            sentiment: new.sentiment,
            follow_up_required: new.follow_up_required,
            followup_date: None,
            created_at,
            updated_at: created_at,
        };
        tables.interactions.push(record.clone());
        Ok(record)
    }

    async fn get_interaction(&self, id: i64) -> Result<Option<Interaction>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.interactions.iter().find(|i| i.id == id).cloned())
    }

    async fn list_interactions(&self) -> Result<Vec<Interaction>, StoreError> {
        let mut all = self.tables.read().await.interactions.clone();
        all.sort_by(newest_first);
        Ok(all)
    }

    async fn recent_interactions(
        &self,
        hcp_id: i64,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Interaction>, StoreError> {
        let tables = self.tables.read().await;
        let mut recent: Vec<Interaction> = tables
            .interactions
            .iter()
            .filter(|i| i.hcp_id == hcp_id && i.created_at >= since)
            .cloned()
            .collect();
        recent.sort_by(newest_first);
        recent.truncate(limit);
        Ok(recent)
    }

    async fn update_interaction(
        &self,
        id: i64,
        patch: InteractionPatch,
    ) -> Result<Option<Interaction>, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(record) = tables.interactions.iter_mut().find(|i| i.id == id) else {
            return Ok(None);
        };
        patch.apply_to(record);
        record.updated_at = Utc::now();
        Ok(Some(record.clone()))
    }

    async fn schedule_follow_up(
        &self,
        id: i64,
        date: NaiveDate,
    ) -> Result<Option<Interaction>, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(record) = tables.interactions.iter_mut().find(|i| i.id == id) else {
            return Ok(None);
        };
        record.follow_up_required = true;
        record.followup_date = Some(date);
        record.updated_at = Utc::now();
        Ok(Some(record.clone()))
    }

    async fn delete_interaction(&self, id: i64) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let before = tables.interactions.len();
        tables.interactions.retain(|i| i.id != id);
        Ok(tables.interactions.len() < before)
    }

    async fn count_hcps(&self) -> Result<usize, StoreError> {
        Ok(self.tables.read().await.hcps.len())
    }

    async fn count_interactions(&self) -> Result<usize, StoreError> {
        Ok(self.tables.read().await.interactions.len())
    }
}
