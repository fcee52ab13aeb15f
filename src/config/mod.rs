pub mod settings;

pub use settings::{DatabaseConfig, NotifyConfig, Settings, TtlMatch, ZoneConfig};
