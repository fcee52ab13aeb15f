// In-memory store with the same transaction semantics as PgStore
use async_trait::async_trait;
use crate::database::models::{NewRecord, RecordQuery, RecordView, ZoneId, ZoneSummary};
use crate::database::store::ZoneStore;
use crate::error::StoreError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneRow {
    pub id: ZoneId,
    pub name: String,
    pub master: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordRow {
    pub zone: ZoneId,
    pub view: RecordView,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tables {
    pub zones: Vec<ZoneRow>,
    pub records: Vec<RecordRow>,
    next_id: i32,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    committed: Tables,
    working: Tables,
    /// Inserts of a record with this content fail, to exercise rollback.
    pub fail_on_content: Option<String>,
    pub commits: usize,
    pub rollbacks: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed state, as another client would see it.
    pub fn committed(&self) -> &Tables {
        &self.committed
    }

    /// Seeds a committed zone and returns its id.
    pub fn seed_zone(&mut self, name: &str) -> ZoneId {
        let id = self.working.allocate();
        self.working.zones.push(ZoneRow {
            id,
            name: name.to_string(),
            master: "ns1.example.com".to_string(),
        });
        self.committed = self.working.clone();
        id
    }

    /// Seeds a committed record.
    pub fn seed_record(&mut self, zone: ZoneId, name: &str, rtype: &str, content: &str, ttl: Option<u32>) {
        self.working.records.push(RecordRow {
            zone,
            view: RecordView {
                name: name.to_string(),
                rtype: rtype.to_string(),
                ttl,
                priority: None,
                content: content.to_string(),
            },
        });
        self.committed = self.working.clone();
    }
}

impl Tables {
    fn allocate(&mut self) -> ZoneId {
        self.next_id += 1;
        ZoneId(self.next_id)
    }

    pub fn records_of(&self, zone: ZoneId) -> Vec<&RecordView> {
        self.records
            .iter()
            .filter(|row| row.zone == zone)
            .map(|row| &row.view)
            .collect()
    }

    pub fn zone_named(&self, name: &str) -> Option<&ZoneRow> {
        self.zones.iter().find(|zone| zone.name == name)
    }
}

#[async_trait]
impl ZoneStore for MemoryStore {
    async fn zone_id(&mut self, name: &str) -> Result<Option<ZoneId>, StoreError> {
        Ok(self.working.zone_named(name).map(|zone| zone.id))
    }

    async fn list_zones(&mut self) -> Result<Vec<ZoneSummary>, StoreError> {
        let mut zones: Vec<ZoneSummary> = self
            .working
            .zones
            .iter()
            .map(|zone| ZoneSummary {
                name: zone.name.clone(),
                kind: "MASTER".to_string(),
                notified_serial: Some(0),
            })
            .collect();
        zones.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(zones)
    }

    async fn insert_zone(&mut self, name: &str, master: &str) -> Result<ZoneId, StoreError> {
        if self.working.zone_named(name).is_some() {
            return Err(StoreError::Rejected {
                message: format!("duplicate zone {}", name),
            });
        }
        let id = self.working.allocate();
        self.working.zones.push(ZoneRow {
            id,
            name: name.to_string(),
            master: master.to_string(),
        });
        Ok(id)
    }

    async fn delete_zone(&mut self, zone: ZoneId) -> Result<(), StoreError> {
        self.working.zones.retain(|row| row.id != zone);
        Ok(())
    }

    async fn fetch_records(
        &mut self,
        zone: ZoneId,
        query: &RecordQuery,
    ) -> Result<Vec<RecordView>, StoreError> {
        let mut views: Vec<RecordView> = self
            .working
            .records
            .iter()
            .filter(|row| row.zone == zone && query.matches(&row.view))
            .map(|row| row.view.clone())
            .collect();
        views.sort_by(|a, b| {
            (&a.name, &a.rtype, &a.content).cmp(&(&b.name, &b.rtype, &b.content))
        });
        Ok(views)
    }

    async fn insert_record(&mut self, zone: ZoneId, record: &NewRecord) -> Result<(), StoreError> {
        if self.fail_on_content.as_deref() == Some(record.content.as_str()) {
            return Err(StoreError::Rejected {
                message: format!("injected failure for {}", record.content),
            });
        }
        self.working.records.push(RecordRow {
            zone,
            view: RecordView {
                name: record.name.clone(),
                rtype: record.rtype.to_string(),
                ttl: record.ttl,
                priority: record.priority,
                content: record.content.clone(),
            },
        });
        Ok(())
    }

    async fn delete_records(&mut self, zone: ZoneId, query: &RecordQuery) -> Result<u64, StoreError> {
        let before = self.working.records.len();
        self.working
            .records
            .retain(|row| !(row.zone == zone && query.matches(&row.view)));
        Ok((before - self.working.records.len()) as u64)
    }

    async fn soa_content(&mut self, zone: ZoneId) -> Result<Option<String>, StoreError> {
        Ok(self
            .working
            .records
            .iter()
            .find(|row| row.zone == zone && row.view.rtype == "SOA")
            .map(|row| row.view.content.clone()))
    }

    async fn update_soa(&mut self, zone: ZoneId, content: &str) -> Result<(), StoreError> {
        for row in self
            .working
            .records
            .iter_mut()
            .filter(|row| row.zone == zone && row.view.rtype == "SOA")
        {
            row.view.content = content.to_string();
        }
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        self.committed = self.working.clone();
        self.commits += 1;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        self.working = self.committed.clone();
        self.rollbacks += 1;
        Ok(())
    }
}
