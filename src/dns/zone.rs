use std::fmt;
use std::sync::OnceLock;
use regex::Regex;
use crate::database::models::{NewRecord, RecordQuery, ZoneId};
use crate::dns::record_types::RecordKind;
use crate::error::ValidationError;

fn label_pattern() -> &'static Regex {
    static LABEL: OnceLock<Regex> = OnceLock::new();
    LABEL.get_or_init(|| {
        Regex::new(r"^[a-z0-9_]([a-z0-9_\-]{0,61}[a-z0-9_])?$").expect("valid label pattern")
    })
}

/// Lower-cased zone name without surrounding whitespace or trailing dot.
pub fn normalize_zone_name(name: &str) -> String {
    name.trim().trim_end_matches('.').to_lowercase()
}

/// True when `name` equals `zone` or ends with `.zone`.
pub fn in_zone(name: &str, zone: &str) -> bool {
    name == zone
        || name
            .strip_suffix(zone)
            .is_some_and(|head| head.ends_with('.'))
}

/// A zone as seen by the session. `id` is absent while the zone only exists
/// as a queued creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    pub name: String,
    pub id: Option<ZoneId>,
}

impl Zone {
    pub fn new(name: &str) -> Self {
        Self {
            name: normalize_zone_name(name),
            id: None,
        }
    }

    pub fn exists(&self) -> bool {
        self.id.is_some()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let invalid = || ValidationError::InvalidZone { name: self.name.clone() };

        if !self.name.contains('.') || self.name.chars().any(char::is_whitespace) {
            return Err(invalid());
        }
        if !self.name.split('.').all(|label| label_pattern().is_match(label)) {
            return Err(invalid());
        }
        Ok(())
    }

    /// Fully qualified owner name for a key that may be relative, apex `@`,
    /// or already inside this zone.
    pub fn fqdn(&self, key: &str) -> String {
        let key = key.trim().trim_matches('.').to_lowercase();
        if key.is_empty() || key == "@" {
            self.name.clone()
        } else if in_zone(&key, &self.name) {
            key
        } else {
            format!("{}.{}", key, self.name)
        }
    }

    /// Key relative to this zone, `@` for the apex.
    pub fn relative(&self, name: &str) -> String {
        let name = name.trim().trim_end_matches('.').to_lowercase();
        if name == self.name || name.is_empty() {
            return "@".to_string();
        }
        match name.strip_suffix(&self.name).and_then(|head| head.strip_suffix('.')) {
            Some(head) => head.to_string(),
            None => name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordAction {
    Insert,
    Delete,
}

/// A staged record mutation. The owning zone is referenced by name and
/// resolved against the directory when the task executes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub name: String,
    pub rtype: RecordKind,
    pub content: String,
    pub ttl: Option<u32>,
    pub priority: Option<u16>,
    pub zone: String,
    pub action: RecordAction,
}

impl Record {
    /// Insert task; a missing ttl falls back to `default_ttl`.
    pub fn insert(
        zone: &Zone,
        key: &str,
        rtype: impl Into<RecordKind>,
        content: impl Into<String>,
        ttl: Option<u32>,
        priority: Option<u16>,
        default_ttl: u32,
    ) -> Self {
        Self {
            name: zone.fqdn(key),
            rtype: rtype.into(),
            content: content.into(),
            ttl: Some(ttl.unwrap_or(default_ttl)),
            priority,
            zone: zone.name.clone(),
            action: RecordAction::Insert,
        }
    }

    pub fn delete(
        zone: &Zone,
        key: &str,
        rtype: impl Into<RecordKind>,
        content: impl Into<String>,
        ttl: Option<u32>,
        priority: Option<u16>,
    ) -> Self {
        Self {
            name: zone.fqdn(key),
            rtype: rtype.into(),
            content: content.into(),
            ttl,
            priority,
            zone: zone.name.clone(),
            action: RecordAction::Delete,
        }
    }

    pub fn to_new_record(&self) -> NewRecord {
        NewRecord {
            name: self.name.clone(),
            rtype: self.rtype.clone(),
            content: self.content.clone(),
            ttl: self.ttl,
            priority: self.priority,
        }
    }

    /// Predicate selecting the rows a delete removes. A ttl on the task
    /// narrows the match; the session leaves it unset unless ttl matching is
    /// required.
    pub fn delete_query(&self) -> RecordQuery {
        RecordQuery::owner(self.name.clone())
            .with_type(self.rtype.clone())
            .with_content(self.content.clone())
            .with_priority(self.priority)
            .with_ttl(self.ttl)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.action {
            RecordAction::Insert => "ADD",
            RecordAction::Delete => "DELETE",
        };
        write!(
            f,
            "{} record name={} and type={} and content={}",
            verb, self.name, self.rtype, self.content
        )?;
        if let Some(ttl) = self.ttl {
            write!(f, " and ttl={}", ttl)?;
        }
        if let Some(priority) = self.priority {
            write!(f, " and prio={}", priority)?;
        }
        Ok(())
    }
}
