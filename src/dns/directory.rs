use std::collections::HashMap;
use chrono::NaiveDate;
use tracing::{debug, info};
use crate::config::ZoneConfig;
use crate::database::models::{NewRecord, RecordQuery, RecordView, ZoneId, ZoneSummary};
use crate::database::store::ZoneStore;
use crate::dns::record_types::{RecordKind, RecordType};
use crate::dns::serial::seed_serial;
use crate::dns::zone::{normalize_zone_name, Zone};
use crate::error::StoreError;

#[derive(Debug, Default)]
struct ZoneEntry {
    id: Option<ZoneId>,
    records: Option<Vec<RecordView>>,
}

/// Single source of truth for zones during a session.
///
/// Entries are keyed by normalized name. Identifiers and record sets are
/// loaded lazily from the store and cached until invalidated.
pub struct ZoneDirectory<S> {
    store: S,
    entries: HashMap<String, ZoneEntry>,
}

impl<S: ZoneStore> ZoneDirectory<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            entries: HashMap::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Look a zone up by name. `None` when the store has no such zone.
    pub async fn resolve(&mut self, name: &str) -> Result<Option<Zone>, StoreError> {
        let mut zone = Zone::new(name);
        zone.id = self.zone_id(&zone.name).await?;
        Ok(zone.exists().then_some(zone))
    }

    /// Like [`resolve`](Self::resolve) but returns a not-yet-created zone
    /// instead of `None`.
    pub async fn lookup(&mut self, name: &str) -> Result<Zone, StoreError> {
        let mut zone = Zone::new(name);
        zone.id = self.zone_id(&zone.name).await?;
        Ok(zone)
    }

    async fn zone_id(&mut self, name: &str) -> Result<Option<ZoneId>, StoreError> {
        if let Some(id) = self.entries.get(name).and_then(|entry| entry.id) {
            return Ok(Some(id));
        }
        let id = self.store.zone_id(name).await?;
        if id.is_some() {
            self.entries.entry(name.to_string()).or_default().id = id;
        }
        Ok(id)
    }

    /// Identifier of a zone that must exist by now, e.g. because a queued
    /// creation already ran.
    pub async fn require_id(&mut self, name: &str) -> Result<ZoneId, StoreError> {
        self.zone_id(name)
            .await?
            .ok_or_else(|| StoreError::ZoneNotCreated { zone: name.to_string() })
    }

    /// All records of a zone sorted by owner, type and content. Empty for a
    /// zone that does not exist yet.
    pub async fn records(&mut self, zone_name: &str) -> Result<&[RecordView], StoreError> {
        let name = normalize_zone_name(zone_name);
        let cached = self
            .entries
            .get(&name)
            .is_some_and(|entry| entry.records.is_some());

        if !cached {
            let records = match self.zone_id(&name).await? {
                Some(id) => self.store.fetch_records(id, &RecordQuery::default()).await?,
                None => Vec::new(),
            };
            debug!("Loaded {} records for {}", records.len(), name);
            self.entries.entry(name.clone()).or_default().records = Some(records);
        }

        Ok(self
            .entries
            .get(&name)
            .and_then(|entry| entry.records.as_deref())
            .unwrap_or_default())
    }

    /// Drop the cached record set of one zone.
    pub fn invalidate(&mut self, zone_name: &str) {
        if let Some(entry) = self.entries.get_mut(zone_name) {
            entry.records = None;
        }
    }

    /// Forget every cached identifier and record set.
    pub fn reset(&mut self) {
        self.entries.clear();
    }

    /// True when a cached record matches every field set on `query`.
    pub async fn exists_record(&mut self, zone: &Zone, query: &RecordQuery) -> Result<bool, StoreError> {
        let records = self.records(&zone.name).await?;
        Ok(records.iter().any(|record| query.matches(record)))
    }

    /// Records at one owner name, optionally of a single type, read straight
    /// from the store.
    pub async fn find_records(
        &mut self,
        zone: &Zone,
        key: &str,
        rtype: Option<RecordKind>,
    ) -> Result<Vec<RecordView>, StoreError> {
        let Some(id) = self.zone_id(&zone.name).await? else {
            return Ok(Vec::new());
        };
        let mut query = RecordQuery::owner(zone.fqdn(key));
        query.rtype = rtype;
        self.store.fetch_records(id, &query).await
    }

    pub async fn list_zones(&mut self) -> Result<Vec<ZoneSummary>, StoreError> {
        self.store.list_zones().await
    }

    /// Create a zone with its SOA and NS records. No-op when the zone
    /// already exists.
    pub async fn create(
        &mut self,
        zone: &Zone,
        config: &ZoneConfig,
        today: NaiveDate,
    ) -> Result<ZoneId, StoreError> {
        if let Some(id) = self.zone_id(&zone.name).await? {
            debug!("Zone {} already exists", zone.name);
            return Ok(id);
        }

        let id = self.store.insert_zone(&zone.name, &config.master_dns).await?;
        self.entries.insert(zone.name.clone(), ZoneEntry { id: Some(id), records: None });

        let soa = format!(
            "{} {} {} 3600 900 1209600 86400",
            config.master_dns,
            config.admin_contact,
            seed_serial(today)
        );
        self.store.insert_record(id, &apex_record(zone, RecordType::SOA, soa, config)).await?;

        for server in config.name_servers() {
            self.store
                .insert_record(id, &apex_record(zone, RecordType::NS, server.to_string(), config))
                .await?;
        }

        info!("Created zone {} ({})", zone.name, id);
        Ok(id)
    }

    /// Remove every record of the zone, then the zone itself. No-op when the
    /// zone does not exist.
    pub async fn delete(&mut self, zone: &Zone) -> Result<(), StoreError> {
        let Some(id) = self.zone_id(&zone.name).await? else {
            debug!("Zone {} does not exist, nothing to delete", zone.name);
            return Ok(());
        };

        let removed = self.store.delete_records(id, &RecordQuery::default()).await?;
        self.store.delete_zone(id).await?;
        self.entries.remove(&zone.name);

        info!("Deleted zone {} and {} records", zone.name, removed);
        Ok(())
    }
}

fn apex_record(zone: &Zone, rtype: RecordType, content: String, config: &ZoneConfig) -> NewRecord {
    NewRecord {
        name: zone.name.clone(),
        rtype: rtype.into(),
        content,
        ttl: Some(config.default_ttl),
        priority: Some(0),
    }
}
