// src/store/mod.rs
// Remote record store boundary. The rest of the engine works against this
// trait and its typed property structures; only the backend module knows
// the collaborator's wire schema.

pub mod notion;

use chrono::{DateTime, Utc};

use crate::error::StoreError;

/// One existing record, reduced to its match-key source fields. Normalized
/// match keys are derived by the index, not stored here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRecord {
    pub id: String,
    /// Designated display/title field, if the record has one.
    pub title: Option<String>,
    /// Designated tag/symbol field, if the record has one.
    pub tag: Option<String>,
    /// Remaining text-bearing fields, considered only when their content
    /// coincides with a configured display key.
    pub other_text: Vec<String>,
}

/// One page of a cursor-paginated scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordPage {
    pub records: Vec<RemoteRecord>,
    /// Continuation cursor; `None` means the scan is complete.
    pub next_cursor: Option<String>,
}

/// Typed payload for updating an existing record.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyUpdate {
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

/// Typed payload for creating a new record.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecordProps {
    pub display_key: String,
    pub external_id: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch one page of existing records, continuing from `cursor`.
    async fn query_page(
        &self,
        cursor: Option<&str>,
        page_size: u32,
    ) -> Result<RecordPage, StoreError>;

    async fn update_record(
        &self,
        record_id: &str,
        props: PropertyUpdate,
    ) -> Result<(), StoreError>;

    async fn create_record(&self, props: NewRecordProps) -> Result<(), StoreError>;
}
