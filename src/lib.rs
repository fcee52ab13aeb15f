pub mod config;
pub mod database;
pub mod dns;
pub mod error;
pub mod shell;

pub use config::Settings;
pub use error::{EngineError, EngineResult};
