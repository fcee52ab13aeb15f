pub mod directory;
pub mod notify;
pub mod parser;
pub mod queue;
pub mod record_types;
pub mod reverse;
pub mod serial;
pub mod session;
pub mod zone;

pub use directory::ZoneDirectory;
pub use notify::Notifier;
pub use record_types::RecordType;
pub use session::{CommitReport, ReverseOutcome, Session, SessionState};
pub use zone::{Record, Zone};
