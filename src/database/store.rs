use async_trait::async_trait;
use crate::database::models::{NewRecord, RecordQuery, RecordView, ZoneId, ZoneSummary};
use crate::error::StoreError;

/// Transaction-scoped access to the zone and record tables.
///
/// Every call runs inside one open transaction. Nothing becomes visible to
/// the DNS server until [`ZoneStore::commit`] returns.
#[async_trait]
pub trait ZoneStore: Send {
    async fn zone_id(&mut self, name: &str) -> Result<Option<ZoneId>, StoreError>;

    /// All zones ordered by name.
    async fn list_zones(&mut self) -> Result<Vec<ZoneSummary>, StoreError>;

    async fn insert_zone(&mut self, name: &str, master: &str) -> Result<ZoneId, StoreError>;

    /// Removes the zone row. Records must be deleted first.
    async fn delete_zone(&mut self, zone: ZoneId) -> Result<(), StoreError>;

    /// Matching records sorted by owner name, type and content.
    async fn fetch_records(
        &mut self,
        zone: ZoneId,
        query: &RecordQuery,
    ) -> Result<Vec<RecordView>, StoreError>;

    async fn insert_record(&mut self, zone: ZoneId, record: &NewRecord) -> Result<(), StoreError>;

    /// Returns the number of rows removed.
    async fn delete_records(&mut self, zone: ZoneId, query: &RecordQuery) -> Result<u64, StoreError>;

    async fn soa_content(&mut self, zone: ZoneId) -> Result<Option<String>, StoreError>;

    async fn update_soa(&mut self, zone: ZoneId, content: &str) -> Result<(), StoreError>;

    async fn commit(&mut self) -> Result<(), StoreError>;

    async fn rollback(&mut self) -> Result<(), StoreError>;
}
