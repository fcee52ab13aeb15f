// Edit session: staged mutations applied in one store transaction
use chrono::{Local, NaiveDate};
use tracing::{debug, error, info, warn};
use crate::config::{TtlMatch, ZoneConfig};
use crate::database::models::{RecordQuery, RecordView, ZoneSummary};
use crate::database::store::ZoneStore;
use crate::dns::directory::ZoneDirectory;
use crate::dns::notify::Notifier;
use crate::dns::parser::parse_record;
use crate::dns::queue::{MutationQueue, Task, ZoneAction, ZoneTask};
use crate::dns::record_types::{RecordKind, RecordType};
use crate::dns::reverse::{reverse_delete, synthesize_reverse};
use crate::dns::serial;
use crate::dns::zone::{Record, RecordAction, Zone};
use crate::error::{EngineError, EngineResult, ParseError, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Staging,
    Committing,
    Committed,
    RolledBack,
}

/// What happened to the PTR twin of an address record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReverseOutcome {
    /// Not an address record, or no reverse record to remove.
    None,
    Queued(String),
    Skipped { address: String, reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReport {
    pub executed: usize,
    /// New serial of every bumped zone, in first-touched order.
    pub serials: Vec<(String, u64)>,
    pub notified: Vec<String>,
}

pub struct Session<S, N> {
    directory: ZoneDirectory<S>,
    notifier: N,
    config: ZoneConfig,
    current: Option<Zone>,
    queue: MutationQueue,
    bump_serial: bool,
    state: SessionState,
}

impl<S: ZoneStore, N: Notifier> Session<S, N> {
    pub fn new(store: S, notifier: N, config: ZoneConfig) -> Self {
        Self {
            directory: ZoneDirectory::new(store),
            notifier,
            config,
            current: None,
            queue: MutationQueue::new(),
            bump_serial: false,
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn current_zone(&self) -> Option<&Zone> {
        self.current.as_ref()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn pending(&self) -> impl Iterator<Item = &Task> {
        self.queue.iter()
    }

    pub fn store(&self) -> &S {
        self.directory.store()
    }

    fn selected(&self) -> Result<Zone, ValidationError> {
        self.current.clone().ok_or(ValidationError::NoZoneSelected)
    }

    fn stage(&mut self, task: Task) {
        debug!("Staging {}", task);
        self.directory.invalidate(task.zone_name());
        self.queue.push(task);
        self.state = SessionState::Staging;
    }

    /// ttl a delete task carries: the given one under required ttl
    /// matching, none otherwise.
    fn delete_ttl(&self, ttl: Option<u32>) -> Option<u32> {
        match self.config.delete_ttl_match {
            TtlMatch::Require => ttl,
            TtlMatch::Ignore => None,
        }
    }

    /// Reverse delete for an address record, with the ttl policy applied.
    async fn reverse_delete_task(&mut self, ip: &str, owner: &str) -> EngineResult<Option<Record>> {
        let ptr = reverse_delete(&mut self.directory, ip, owner, None).await?;
        Ok(ptr.map(|mut ptr| {
            ptr.ttl = self.delete_ttl(ptr.ttl);
            ptr
        }))
    }

    fn reset(&mut self) {
        self.queue.clear();
        self.current = None;
        self.bump_serial = false;
        self.directory.reset();
    }

    /// Select a zone, staging its creation when the store does not have it.
    pub async fn select_zone(&mut self, name: &str) -> EngineResult<Zone> {
        let candidate = Zone::new(name);
        candidate.validate()?;

        let zone = self.directory.lookup(&candidate.name).await?;
        if !zone.exists() && !self.queue.creates(&zone.name) {
            info!("Zone {} does not exist, staging creation", zone.name);
            self.stage(Task::create_zone(zone.clone()));
        }

        self.current = Some(zone.clone());
        Ok(zone)
    }

    /// Drop the zone selection.
    pub fn leave_zone(&mut self) -> EngineResult<()> {
        if !self.queue.is_empty() {
            return Err(ValidationError::PendingChanges.into());
        }
        self.current = None;
        Ok(())
    }

    /// Stage a record insert from an edit line. Address records also stage
    /// their PTR; when that is impossible the forward record is still staged.
    pub async fn add_record(&mut self, line: &str) -> EngineResult<ReverseOutcome> {
        let parsed = parse_record(line, self.current.as_ref())?;
        let zone = self.selected()?;

        let query = RecordQuery::owner(zone.fqdn(&parsed.key))
            .with_type(parsed.rtype)
            .with_content(parsed.value.clone())
            .with_priority(parsed.priority);
        if self.directory.exists_record(&zone, &query).await? {
            return Err(ValidationError::RecordExists.into());
        }

        let record = Record::insert(
            &zone,
            &parsed.key,
            parsed.rtype,
            parsed.value.clone(),
            parsed.ttl,
            parsed.priority,
            self.config.default_ttl,
        );

        let reverse = if parsed.rtype.is_address() {
            match synthesize_reverse(&mut self.directory, &parsed.value, &record.name, None, self.config.default_ttl).await {
                Ok(ptr) => Some(Ok(ptr)),
                Err(EngineError::Store(err)) => return Err(err.into()),
                Err(err) => Some(Err(err.to_string())),
            }
        } else {
            None
        };

        self.stage(Task::Record(record));
        self.bump_serial = true;

        Ok(match reverse {
            Some(Ok(ptr)) => {
                let shown = ptr.to_string();
                self.stage(Task::Record(ptr));
                ReverseOutcome::Queued(shown)
            }
            Some(Err(reason)) => {
                warn!("Not generating reverse for {}: {}", parsed.value, reason);
                ReverseOutcome::Skipped { address: parsed.value, reason }
            }
            None => ReverseOutcome::None,
        })
    }

    /// Stage a PTR for `ip` in the selected zone.
    pub async fn add_reverse(&mut self, ip: &str, name: &str) -> EngineResult<String> {
        let zone = self.selected()?;
        let ptr = synthesize_reverse(&mut self.directory, ip, name, Some(&zone), self.config.default_ttl).await?;
        let shown = ptr.to_string();
        self.stage(Task::Record(ptr));
        self.bump_serial = true;
        Ok(shown)
    }

    /// Stage PTRs for every address record at `name` in the selected zone.
    pub async fn generate_reverse(&mut self, name: &str) -> EngineResult<Vec<ReverseOutcome>> {
        let zone = self.selected()?;
        if name.trim().is_empty() {
            return Err(ParseError::NameRequired.into());
        }
        let owner = zone.fqdn(name);

        let addresses: Vec<RecordView> = self
            .directory
            .records(&zone.name)
            .await?
            .iter()
            .filter(|record| {
                record.name == owner && record.record_type().is_some_and(RecordType::is_address)
            })
            .cloned()
            .collect();

        let mut outcomes = Vec::with_capacity(addresses.len());
        for address in addresses {
            match synthesize_reverse(&mut self.directory, &address.content, &owner, None, self.config.default_ttl).await {
                Ok(ptr) => {
                    outcomes.push(ReverseOutcome::Queued(ptr.to_string()));
                    self.stage(Task::Record(ptr));
                    self.bump_serial = true;
                }
                Err(EngineError::Store(err)) => return Err(err.into()),
                Err(err) => {
                    info!("Not doing reverse for {}: {}", address.content, err);
                    outcomes.push(ReverseOutcome::Skipped {
                        address: address.content,
                        reason: err.to_string(),
                    });
                }
            }
        }

        Ok(outcomes)
    }

    /// Stage a record delete from an edit line. Address records also stage
    /// the removal of their PTR when one exists.
    pub async fn delete_record(&mut self, line: &str) -> EngineResult<ReverseOutcome> {
        if line.split_whitespace().count() < 3 {
            return Err(ParseError::UseDeleteAll.into());
        }
        let parsed = parse_record(line, self.current.as_ref())?;
        let zone = self.selected()?;

        let ttl = self.delete_ttl(parsed.ttl);
        let base = RecordQuery::owner(zone.fqdn(&parsed.key))
            .with_type(parsed.rtype)
            .with_ttl(ttl);

        let exact = base
            .clone()
            .with_content(parsed.value.clone())
            .with_priority(parsed.priority);
        let (content, priority) = if self.directory.exists_record(&zone, &exact).await? {
            (parsed.value.clone(), parsed.priority)
        } else {
            // Older rows carry the priority inside the content.
            let Some(priority) = parsed.priority else {
                return Err(ValidationError::RecordMissing.into());
            };
            let embedded = format!("{} {}", priority, parsed.value);
            if !self
                .directory
                .exists_record(&zone, &base.with_content(embedded.clone()))
                .await?
            {
                return Err(ValidationError::RecordMissing.into());
            }
            (embedded, None)
        };

        let record = Record::delete(&zone, &parsed.key, parsed.rtype, content, ttl, priority);
        let reverse = if parsed.rtype.is_address() {
            self.reverse_delete_task(&parsed.value, &record.name).await?
        } else {
            None
        };

        self.stage(Task::Record(record));
        self.bump_serial = true;

        Ok(match reverse {
            Some(ptr) => {
                let shown = ptr.to_string();
                self.stage(Task::Record(ptr));
                ReverseOutcome::Queued(shown)
            }
            None => ReverseOutcome::None,
        })
    }

    /// Stage deletes for every record at `key`, optionally of one type. Rows
    /// of any stored type are removed, SOA records are never touched.
    /// Returns the number of staged tasks.
    pub async fn delete_all(&mut self, key: &str, rtype: Option<&str>) -> EngineResult<usize> {
        let zone = self.selected()?;
        let rtype = rtype.map(|rtype| RecordKind::from_stored(&rtype.trim().to_uppercase()));

        let key = zone.relative(key);
        if key == "@" {
            return Err(ValidationError::RootDeleteAll.into());
        }

        let rows = self.directory.find_records(&zone, &key, rtype).await?;
        let mut tasks = Vec::with_capacity(rows.len());
        for row in rows {
            let kind = row.kind();
            if kind == RecordType::SOA {
                info!("Skipping SOA record");
                continue;
            }

            let reverse = if kind.known().is_some_and(RecordType::is_address) {
                self.reverse_delete_task(&row.content, &row.name).await?
            } else {
                None
            };
            let ttl = self.delete_ttl(row.ttl);
            tasks.push(Task::Record(Record::delete(
                &zone,
                &row.name,
                kind,
                row.content,
                ttl,
                row.priority,
            )));
            tasks.extend(reverse.map(Task::Record));
        }

        let staged = tasks.len();
        for task in tasks {
            self.stage(task);
        }
        if staged > 0 {
            self.bump_serial = true;
        }
        Ok(staged)
    }

    /// Stage the removal of a whole zone. Only allowed outside a zone
    /// context and with an empty queue.
    pub async fn delete_zone(&mut self, name: &str) -> EngineResult<()> {
        if self.current.is_some() {
            return Err(ValidationError::ZoneSelected.into());
        }
        if !self.queue.is_empty() {
            return Err(ValidationError::PendingChanges.into());
        }

        let candidate = Zone::new(name);
        candidate.validate()?;
        let zone = self
            .directory
            .resolve(&candidate.name)
            .await?
            .ok_or(ValidationError::ZoneMissing { name: candidate.name })?;

        self.stage(Task::delete_zone(zone));
        Ok(())
    }

    /// Records of the selected zone. With keywords, only rows where some
    /// keyword occurs in the owner, type or content.
    pub async fn list_records(&mut self, keywords: &[&str]) -> EngineResult<Vec<RecordView>> {
        let zone = self.selected()?;
        let records = self.directory.records(&zone.name).await?;

        Ok(records
            .iter()
            .filter(|record| {
                keywords.is_empty()
                    || keywords.iter().any(|keyword| {
                        record.name.contains(keyword)
                            || record.rtype.contains(keyword)
                            || record.content.contains(keyword)
                    })
            })
            .cloned()
            .collect())
    }

    pub async fn list_zones(&mut self) -> EngineResult<Vec<ZoneSummary>> {
        Ok(self.directory.list_zones().await?)
    }

    /// Apply every staged task in one store transaction.
    ///
    /// On failure the transaction is rolled back, the batch is discarded and
    /// the error is returned. Notification failures after a successful
    /// commit are only logged.
    pub async fn commit(&mut self) -> EngineResult<CommitReport> {
        self.state = SessionState::Committing;
        let tasks = self.queue.take();
        let today = Local::now().date_naive();

        let serials = match self.apply(&tasks, today).await {
            Ok(serials) => serials,
            Err(err) => {
                error!("Commit failed, rolling back {} tasks: {}", tasks.len(), err);
                if let Err(rollback) = self.directory.store_mut().rollback().await {
                    error!("Rollback failed: {}", rollback);
                }
                self.reset();
                self.state = SessionState::RolledBack;
                return Err(err);
            }
        };

        self.reset();
        self.state = SessionState::Committed;
        info!("Committed {} tasks", tasks.len());

        let mut notified = Vec::with_capacity(serials.len());
        for (zone, _) in &serials {
            match self.notifier.notify(zone).await {
                Ok(()) => notified.push(zone.clone()),
                Err(err) => warn!("Notification for {} failed: {}", zone, err),
            }
        }

        Ok(CommitReport {
            executed: tasks.len(),
            serials,
            notified,
        })
    }

    async fn apply(&mut self, tasks: &[Task], today: NaiveDate) -> EngineResult<Vec<(String, u64)>> {
        let mut touched: Vec<String> = Vec::new();
        for task in tasks {
            self.execute(task, today).await?;
            if let Task::Record(record) = task {
                if !touched.contains(&record.zone) {
                    touched.push(record.zone.clone());
                }
            }
        }

        let mut serials = Vec::new();
        if self.bump_serial {
            for zone in touched {
                let id = self.directory.require_id(&zone).await?;
                let serial = serial::bump(self.directory.store_mut(), id, &zone, today).await?;
                serials.push((zone, serial));
            }
        }

        self.directory.store_mut().commit().await?;
        Ok(serials)
    }

    async fn execute(&mut self, task: &Task, today: NaiveDate) -> EngineResult<()> {
        debug!("Executing {}", task);
        match task {
            Task::Zone(ZoneTask { zone, action: ZoneAction::Create }) => {
                self.directory.create(zone, &self.config, today).await?;
            }
            Task::Zone(ZoneTask { zone, action: ZoneAction::Delete }) => {
                self.directory.delete(zone).await?;
            }
            Task::Record(record) => {
                let id = self.directory.require_id(&record.zone).await?;
                self.directory.invalidate(&record.zone);
                match record.action {
                    RecordAction::Insert => {
                        self.directory.store_mut().insert_record(id, &record.to_new_record()).await?;
                    }
                    RecordAction::Delete => {
                        let removed = self
                            .directory
                            .store_mut()
                            .delete_records(id, &record.delete_query())
                            .await?;
                        if removed == 0 {
                            warn!("{} matched no rows", record);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Discard every staged task and roll the store transaction back.
    pub async fn revert(&mut self) -> EngineResult<()> {
        let discarded = self.queue.len();
        let result = self.directory.store_mut().rollback().await;
        self.reset();
        self.state = SessionState::Idle;
        info!("Reverted {} staged tasks", discarded);
        Ok(result?)
    }
}
