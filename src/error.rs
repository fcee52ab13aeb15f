// Error types for the zone edit engine
use std::net::AddrParseError;
use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Malformed command input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Cannot parse {line}")]
    CannotParse { line: String },

    #[error("Invalid ttl {value}")]
    InvalidTtl { value: String },

    #[error("Invalid priority {value}")]
    InvalidPriority { value: String },

    #[error("Invalid IPv4 address: {reason}")]
    InvalidIpv4 { reason: String },

    #[error("Invalid IPv6 address: {reason}")]
    InvalidIpv6 { reason: String },

    #[error("Unknown record type {value}")]
    UnknownRecordType { value: String },

    #[error("Invalid arguments")]
    InvalidArguments,

    #[error("Name required!")]
    NameRequired,

    #[error("Use deleteall to delete multiple records")]
    UseDeleteAll,

    #[error("Unknown syntax: {line}")]
    UnknownCommand { line: String },
}

impl ParseError {
    pub fn ipv4(err: AddrParseError) -> Self {
        ParseError::InvalidIpv4 { reason: err.to_string() }
    }

    pub fn ipv6(err: AddrParseError) -> Self {
        ParseError::InvalidIpv6 { reason: err.to_string() }
    }
}

/// Input that parsed but conflicts with session or zone state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Select domain first!")]
    NoZoneSelected,

    #[error("Invalid domain {name}")]
    InvalidZone { name: String },

    #[error("Domain {name} does not exist")]
    ZoneMissing { name: String },

    #[error("Record already exists!")]
    RecordExists,

    #[error("Record does not exist!")]
    RecordMissing,

    #[error("No such domain for {reverse}")]
    NoReverseZone { reverse: String },

    #[error("Reverse record for key {key} already exists with value {value}")]
    ReverseExists { key: String, value: String },

    #[error("Wrong zone for this record!")]
    WrongZone,

    #[error("Removing all from root level is not allowed.")]
    RootDeleteAll,

    #[error("Commit or revert first")]
    PendingChanges,

    #[error("Get out of domain context first")]
    ZoneSelected,
}

/// Failures raised while talking to the record store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Zone {zone} has no SOA record")]
    MissingSoa { zone: String },

    #[error("Malformed SOA record for {zone}: {content}")]
    MalformedSoa { zone: String, content: String },

    #[error("Zone {zone} does not exist in the store")]
    ZoneNotCreated { zone: String },

    #[error("Store rejected the operation: {message}")]
    Rejected { message: String },
}

/// Secondary notification failures. These are logged, never propagated.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} timed out after {seconds}s")]
    Timeout { command: String, seconds: u64 },

    #[error("{command} exited with {status}")]
    Failed { command: String, status: std::process::ExitStatus },
}
