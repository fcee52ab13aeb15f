// Line-oriented command shell over a Session
use std::io::{self, Write};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};
use crate::database::models::{RecordView, ZoneSummary};
use crate::database::store::ZoneStore;
use crate::dns::notify::Notifier;
use crate::dns::session::{ReverseOutcome, Session};
use crate::error::{EngineError, ParseError, ValidationError};

const HELP: &str = "\
domain <name>               select a zone, staging its creation if needed
add <key> <type> [ttl] [priority] <value>
                            stage a record insert
addrev <ip> <name>          stage a PTR in the selected reverse zone
genrev <name>               stage PTRs for the address records of a name
delete <key> <type> [ttl] [priority] <value>
                            stage a record delete
deleteall <key> [type]      stage deletes for every record at a key
deletedomain <name>         stage the removal of a zone
show                        list staged changes
list|ls [filter...]         list records of the selected zone, or all zones
commit                      apply staged changes
revert                      discard staged changes
exit                        leave the zone, or quit outside a zone";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Empty,
    Domain(String),
    Add(String),
    AddReverse { ip: String, name: String },
    GenReverse(String),
    Delete(String),
    DeleteAll { key: String, rtype: Option<String> },
    DeleteDomain(String),
    Show,
    List(Vec<String>),
    Commit,
    Revert,
    Exit,
    Help,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };
        let args: Vec<&str> = rest.split_whitespace().collect();

        let command = match verb {
            "" => Command::Empty,
            "domain" => Command::Domain(rest.to_string()),
            "add" => Command::Add(rest.to_string()),
            "addrev" => match args.as_slice() {
                [ip, name] => Command::AddReverse {
                    ip: ip.to_string(),
                    name: name.to_string(),
                },
                _ => return Err(ParseError::InvalidArguments),
            },
            "genrev" => Command::GenReverse(rest.to_string()),
            "delete" => Command::Delete(rest.to_string()),
            "deleteall" => match args.as_slice() {
                [key] => Command::DeleteAll {
                    key: key.to_string(),
                    rtype: None,
                },
                [key, rtype] => Command::DeleteAll {
                    key: key.to_string(),
                    rtype: Some(rtype.to_string()),
                },
                _ => return Err(ParseError::InvalidArguments),
            },
            "deletedomain" => Command::DeleteDomain(rest.to_string()),
            "show" => Command::Show,
            "list" | "ls" => Command::List(args.iter().map(|arg| arg.to_string()).collect()),
            "commit" => Command::Commit,
            "revert" => Command::Revert,
            "exit" | "quit" | "EOF" => Command::Exit,
            "help" | "?" => Command::Help,
            _ => {
                return Err(ParseError::UnknownCommand {
                    line: line.to_string(),
                })
            }
        };
        Ok(command)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

#[derive(Error, Debug)]
pub enum ShellError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Output failed: {0}")]
    Io(#[from] io::Error),
}

impl From<ParseError> for ShellError {
    fn from(err: ParseError) -> Self {
        ShellError::Engine(err.into())
    }
}

impl From<ValidationError> for ShellError {
    fn from(err: ValidationError) -> Self {
        ShellError::Engine(err.into())
    }
}

pub struct Shell<S, N> {
    session: Session<S, N>,
}

impl<S: ZoneStore, N: Notifier> Shell<S, N> {
    pub fn new(session: Session<S, N>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Session<S, N> {
        &self.session
    }

    pub fn prompt(&self) -> String {
        match self.session.current_zone() {
            Some(zone) => format!("{}> ", zone.name),
            None => "> ".to_string(),
        }
    }

    /// Read commands until `exit` outside a zone or end of input. Command
    /// errors are printed and the loop goes on; only output failures end it.
    pub async fn run<R, W>(&mut self, input: R, out: &mut W) -> Result<(), ShellError>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let mut lines = input.lines();
        loop {
            write!(out, "{}", self.prompt())?;
            out.flush()?;

            let Some(line) = lines.next_line().await? else {
                writeln!(out)?;
                self.finish().await?;
                return Ok(());
            };

            match self.dispatch(&line, out).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Quit) => return Ok(()),
                Err(ShellError::Engine(err)) => writeln!(out, "Error: {}", err)?,
                Err(err) => return Err(err),
            }
        }
    }

    async fn finish(&mut self) -> Result<(), EngineError> {
        let pending = self.session.queue_len();
        if pending > 0 {
            warn!("End of input with {} staged changes, reverting", pending);
            self.session.revert().await?;
        }
        Ok(())
    }

    pub async fn dispatch<W: Write>(&mut self, line: &str, out: &mut W) -> Result<Flow, ShellError> {
        let command = Command::parse(line)?;
        debug!("Dispatching {:?}", command);

        match command {
            Command::Empty => {}
            Command::Domain(name) => {
                let zone = self.session.select_zone(&name).await?;
                writeln!(out, "Domain: {}", zone.name)?;
            }
            Command::Add(line) => match self.session.add_record(&line).await? {
                ReverseOutcome::Queued(_) => writeln!(out, "Generating reverse record also")?,
                ReverseOutcome::Skipped { address, reason } => {
                    writeln!(out, "Not doing reverse for {}: {}", address, reason)?
                }
                ReverseOutcome::None => {}
            },
            Command::AddReverse { ip, name } => {
                self.session.add_reverse(&ip, &name).await?;
            }
            Command::GenReverse(name) => {
                for outcome in self.session.generate_reverse(&name).await? {
                    match outcome {
                        ReverseOutcome::Queued(task) => writeln!(out, "{}", task)?,
                        ReverseOutcome::Skipped { address, reason } => {
                            writeln!(out, "Not doing reverse for {}: {}", address, reason)?
                        }
                        ReverseOutcome::None => {}
                    }
                }
            }
            Command::Delete(line) => {
                if let ReverseOutcome::Queued(task) = self.session.delete_record(&line).await? {
                    writeln!(out, "Removing reverse record: {}", task)?;
                }
            }
            Command::DeleteAll { key, rtype } => {
                let staged = self.session.delete_all(&key, rtype.as_deref()).await?;
                if staged == 0 {
                    writeln!(out, "Nothing to delete at {}", key)?;
                }
            }
            Command::DeleteDomain(name) => self.session.delete_zone(&name).await?,
            Command::Show => {
                if self.session.queue_len() == 0 {
                    writeln!(out, "Nothing changed, did you mean list?")?;
                }
                for task in self.session.pending() {
                    writeln!(out, "{}", task)?;
                }
            }
            Command::List(keywords) => {
                if self.session.current_zone().is_some() {
                    let keywords: Vec<&str> = keywords.iter().map(String::as_str).collect();
                    let records = self.session.list_records(&keywords).await?;
                    write_records(out, &records)?;
                } else {
                    let zones = self.session.list_zones().await?;
                    write_zones(out, &zones)?;
                }
            }
            Command::Commit => {
                let report = self.session.commit().await?;
                writeln!(out, "Committed {} changes", report.executed)?;
                for (zone, serial) in &report.serials {
                    writeln!(out, "{} serial {}", zone, serial)?;
                }
            }
            Command::Revert => {
                self.session.revert().await?;
                writeln!(out, "Reverted")?;
            }
            Command::Exit => {
                if self.session.queue_len() > 0 {
                    return Err(ValidationError::PendingChanges.into());
                }
                if self.session.current_zone().is_none() {
                    return Ok(Flow::Quit);
                }
                self.session.leave_zone()?;
            }
            Command::Help => writeln!(out, "{}", HELP)?,
        }

        Ok(Flow::Continue)
    }
}

fn dash<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |value| value.to_string())
}

fn write_records<W: Write>(out: &mut W, records: &[RecordView]) -> io::Result<()> {
    writeln!(out, "{:<40} {:<6} {:<5} {:>8} {}", "key", "ttl", "type", "priority", "value")?;
    for record in records {
        writeln!(
            out,
            "{:<40} {:<6} {:<5} {:>8} {}",
            record.name,
            dash(record.ttl),
            record.rtype,
            dash(record.priority),
            record.content
        )?;
    }
    writeln!(out)
}

fn write_zones<W: Write>(out: &mut W, zones: &[ZoneSummary]) -> io::Result<()> {
    writeln!(out, "{:<40} {:<10} {:>15}", "name", "type", "notified serial")?;
    for zone in zones {
        writeln!(out, "{:<40} {:<10} {:>15}", zone.name, zone.kind, dash(zone.notified_serial))?;
    }
    writeln!(out)
}
