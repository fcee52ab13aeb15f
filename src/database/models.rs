use serde::Serialize;
use std::fmt;
use crate::dns::record_types::{RecordKind, RecordType};

/// Identifier the store assigns to a zone row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ZoneId(pub i32);

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneSummary {
    pub name: String,
    pub kind: String,
    pub notified_serial: Option<i64>,
}

/// A record row as read back from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordView {
    pub name: String,
    pub rtype: String,
    pub ttl: Option<u32>,
    pub priority: Option<u16>,
    pub content: String,
}

impl RecordView {
    pub fn record_type(&self) -> Option<RecordType> {
        self.rtype.parse().ok()
    }

    pub fn kind(&self) -> RecordKind {
        RecordKind::from_stored(&self.rtype)
    }
}

/// Column values for a record insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub name: String,
    pub rtype: RecordKind,
    pub content: String,
    pub ttl: Option<u32>,
    pub priority: Option<u16>,
}

/// Equality filter over record columns. Unset fields do not constrain the
/// match; the zone is always part of the predicate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordQuery {
    pub name: Option<String>,
    pub rtype: Option<RecordKind>,
    pub content: Option<String>,
    pub ttl: Option<u32>,
    pub priority: Option<u16>,
}

impl RecordQuery {
    pub fn owner(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_type(mut self, rtype: impl Into<RecordKind>) -> Self {
        self.rtype = Some(rtype.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_ttl(mut self, ttl: Option<u32>) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_priority(mut self, priority: Option<u16>) -> Self {
        self.priority = priority;
        self
    }

    pub fn matches(&self, view: &RecordView) -> bool {
        self.name.as_deref().map_or(true, |name| view.name == name)
            && self.rtype.as_ref().map_or(true, |rtype| view.rtype == rtype.as_str())
            && self.content.as_deref().map_or(true, |content| view.content == content)
            && self.ttl.map_or(true, |ttl| view.ttl == Some(ttl))
            && self.priority.map_or(true, |priority| view.priority == Some(priority))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view() -> RecordView {
        RecordView {
            name: "mail.example.com".to_string(),
            rtype: "MX".to_string(),
            ttl: Some(360),
            priority: Some(10),
            content: "mx1.example.com".to_string(),
        }
    }

    #[test]
    fn test_query_matches_only_given_fields() {
        assert!(RecordQuery::owner("mail.example.com").matches(&view()));
        assert!(RecordQuery::owner("mail.example.com")
            .with_type(RecordType::MX)
            .with_priority(Some(10))
            .matches(&view()));
        assert!(!RecordQuery::owner("mail.example.com")
            .with_priority(Some(20))
            .matches(&view()));
        assert!(!RecordQuery::owner("mail.example.com")
            .with_ttl(Some(60))
            .matches(&view()));
        assert!(!RecordQuery::owner("www.example.com").matches(&view()));
        assert!(!RecordQuery::owner("mail.example.com")
            .with_type(RecordKind::Other("HINFO".to_string()))
            .matches(&view()));
    }
}
