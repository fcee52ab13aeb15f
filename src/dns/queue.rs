use std::fmt;
use crate::dns::zone::{Record, Zone};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneAction {
    Create,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneTask {
    pub zone: Zone,
    pub action: ZoneAction,
}

/// One staged mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    Zone(ZoneTask),
    Record(Record),
}

impl Task {
    pub fn create_zone(zone: Zone) -> Self {
        Task::Zone(ZoneTask { zone, action: ZoneAction::Create })
    }

    pub fn delete_zone(zone: Zone) -> Self {
        Task::Zone(ZoneTask { zone, action: ZoneAction::Delete })
    }

    /// Name of the zone this task mutates.
    pub fn zone_name(&self) -> &str {
        match self {
            Task::Zone(task) => &task.zone.name,
            Task::Record(record) => &record.zone,
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::Zone(ZoneTask { zone, action: ZoneAction::Create }) => {
                write!(f, "ADD domain {}", zone.name)
            }
            Task::Zone(ZoneTask { zone, action: ZoneAction::Delete }) => {
                write!(f, "DELETE domain {}", zone.name)
            }
            Task::Record(record) => fmt::Display::fmt(record, f),
        }
    }
}

/// Ordered list of staged tasks. Admission order is execution order.
#[derive(Debug, Default)]
pub struct MutationQueue {
    tasks: Vec<Task>,
}

impl MutationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, task: Task) {
        self.tasks.push(task);
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    /// True when a creation of `zone_name` is already staged.
    pub fn creates(&self, zone_name: &str) -> bool {
        self.tasks.iter().any(|task| {
            matches!(task, Task::Zone(ZoneTask { zone, action: ZoneAction::Create }) if zone.name == zone_name)
        })
    }

    pub fn take(&mut self) -> Vec<Task> {
        std::mem::take(&mut self.tasks)
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::record_types::RecordType;

    #[test]
    fn test_queue_preserves_order_and_renders() {
        let zone = Zone::new("example.com");
        let mut queue = MutationQueue::new();
        queue.push(Task::create_zone(zone.clone()));
        queue.push(Task::Record(Record::delete(&zone, "www", RecordType::A, "10.0.0.1", None, None)));
        queue.push(Task::Record(Record::insert(&zone, "www", RecordType::A, "10.0.0.1", None, None, 360)));

        let shown: Vec<String> = queue.iter().map(ToString::to_string).collect();
        assert_eq!(
            shown,
            vec![
                "ADD domain example.com",
                "DELETE record name=www.example.com and type=A and content=10.0.0.1",
                "ADD record name=www.example.com and type=A and content=10.0.0.1 and ttl=360",
            ]
        );
        assert!(queue.creates("example.com"));
        assert!(!queue.creates("example.net"));

        let tasks = queue.take();
        assert_eq!(tasks.len(), 3);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_delete_zone_task() {
        let task = Task::delete_zone(Zone::new("example.com"));
        assert_eq!(task.to_string(), "DELETE domain example.com");
        assert_eq!(task.zone_name(), "example.com");
        assert!(matches!(task, Task::Zone(ZoneTask { action: ZoneAction::Delete, .. })));
    }
}
