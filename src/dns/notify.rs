use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;
use crate::config::NotifyConfig;
use crate::error::NotifyError;

/// Tells secondaries that a zone changed. Runs only after the store commit.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, zone: &str) -> Result<(), NotifyError>;
}

/// Runs `pdns_control notify <zone>` (or the configured equivalent).
pub struct PdnsControl {
    command: String,
    args: Vec<String>,
    timeout: Duration,
}

impl PdnsControl {
    pub fn new(config: &NotifyConfig) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
            timeout: config.timeout(),
        }
    }
}

#[async_trait]
impl Notifier for PdnsControl {
    async fn notify(&self, zone: &str) -> Result<(), NotifyError> {
        debug!("Running {} {:?} {}", self.command, self.args, zone);

        let mut child = Command::new(&self.command)
            .args(&self.args)
            .arg(zone)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| NotifyError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        let status = match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(status) => status.map_err(|source| NotifyError::Spawn {
                command: self.command.clone(),
                source,
            })?,
            Err(_) => {
                return Err(NotifyError::Timeout {
                    command: self.command.clone(),
                    seconds: self.timeout.as_secs(),
                })
            }
        };

        if status.success() {
            Ok(())
        } else {
            Err(NotifyError::Failed {
                command: self.command.clone(),
                status,
            })
        }
    }
}

/// Notifier for setups without secondaries.
pub struct Disabled;

#[async_trait]
impl Notifier for Disabled {
    async fn notify(&self, zone: &str) -> Result<(), NotifyError> {
        debug!("Notification disabled, skipping {}", zone);
        Ok(())
    }
}

/// Build the notifier selected by configuration.
pub fn from_config(config: &NotifyConfig) -> Box<dyn Notifier> {
    if config.enabled {
        Box::new(PdnsControl::new(config))
    } else {
        Box::new(Disabled)
    }
}

#[async_trait]
impl<N: Notifier + ?Sized> Notifier for Box<N> {
    async fn notify(&self, zone: &str) -> Result<(), NotifyError> {
        (**self).notify(zone).await
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn config(command: &str, args: &[&str], timeout_secs: u64) -> NotifyConfig {
        NotifyConfig {
            enabled: true,
            command: command.to_string(),
            args: args.iter().map(|arg| arg.to_string()).collect(),
            timeout_secs,
        }
    }

    #[tokio::test]
    async fn test_successful_command() {
        let notifier = PdnsControl::new(&config("true", &[], 5));
        assert!(notifier.notify("example.com").await.is_ok());
    }

    #[tokio::test]
    async fn test_failing_command() {
        let notifier = PdnsControl::new(&config("false", &[], 5));
        let err = notifier.notify("example.com").await.unwrap_err();
        assert!(matches!(err, NotifyError::Failed { .. }));
    }

    #[tokio::test]
    async fn test_missing_command() {
        let notifier = PdnsControl::new(&config("/nonexistent/pdns_control", &["notify"], 5));
        let err = notifier.notify("example.com").await.unwrap_err();
        assert!(matches!(err, NotifyError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_timeout() {
        let notifier = PdnsControl::new(&config("sleep", &["5"], 0));
        let err = notifier.notify("1").await.unwrap_err();
        assert!(matches!(err, NotifyError::Timeout { .. }));
    }
}
