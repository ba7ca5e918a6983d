//! RecordStore trait: create/read/update/delete over HCPs and interactions.
//!
//! A store handle is constructed once and shared as `Arc<dyn RecordStore>`
//! by the tools and the HTTP surface. Every write is a single statement;
//! consistency beyond that is whatever the backing store provides.

use crate::error::StoreError;
use crate::record::{Hcp, Interaction, InteractionPatch, NewHcp, NewInteraction};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

/// The core RecordStore trait.
///
/// Implementations: SQLite, in-memory (for testing).
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "in_memory").
    fn name(&self) -> &str;

    async fn create_hcp(&self, hcp: NewHcp) -> Result<Hcp, StoreError>;

    /// All HCPs, ascending id.
    async fn list_hcps(&self) -> Result<Vec<Hcp>, StoreError>;

    async fn get_hcp(&self, id: i64) -> Result<Option<Hcp>, StoreError>;

    /// Resolve a free-text reference such as "Dr. Smith" to one HCP.
    ///
    /// The title is stripped, then the rest is matched case-insensitively as
    /// a substring of the stored name. The lowest id wins.
    async fn find_hcp_by_name(&self, name: &str) -> Result<Option<Hcp>, StoreError>;

    /// Case-insensitive substring search over name, specialty and hospital,
    /// ascending id, at most `limit` rows.
    async fn search_hcps(&self, query: &str, limit: usize) -> Result<Vec<Hcp>, StoreError>;

    /// Insert an interaction. Fails with [`StoreError::Constraint`] if the
    /// referenced HCP does not exist.
    async fn create_interaction(&self, new: NewInteraction) -> Result<Interaction, StoreError>;

    async fn get_interaction(&self, id: i64) -> Result<Option<Interaction>, StoreError>;

    /// All interactions, newest first.
    async fn list_interactions(&self) -> Result<Vec<Interaction>, StoreError>;

    /// Interactions for one HCP created at or after `since`, newest first.
    async fn recent_interactions(
        &self,
        hcp_id: i64,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Interaction>, StoreError>;

    /// Apply a partial update and bump `updated_at`. `None` if absent.
    async fn update_interaction(
        &self,
        id: i64,
        patch: InteractionPatch,
    ) -> Result<Option<Interaction>, StoreError>;

    /// Mark an interaction as needing follow-up on `date`. `None` if absent.
    async fn schedule_follow_up(
        &self,
        id: i64,
        date: NaiveDate,
    ) -> Result<Option<Interaction>, StoreError>;

    /// Returns whether a row was removed.
    async fn delete_interaction(&self, id: i64) -> Result<bool, StoreError>;

    async fn count_hcps(&self) -> Result<usize, StoreError>;

    async fn count_interactions(&self) -> Result<usize, StoreError>;
}
