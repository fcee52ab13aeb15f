use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use anyhow::{Context, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database: DatabaseConfig,
    pub zones: ZoneConfig,
    pub notify: NotifyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Full connection URL. Takes precedence over the discrete fields.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub name: String,
    pub password: Option<String>,
    /// PowerDNS backend config consulted when no password is configured.
    pub password_file: PathBuf,
    pub max_connections: u32,
    pub connect_timeout: u64,
}

/// How a staged delete compares ttl against stored rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TtlMatch {
    /// ttl never takes part in delete matching.
    #[default]
    Ignore,
    /// A ttl given on the delete line must match the stored ttl.
    Require,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneConfig {
    pub master_dns: String,
    pub slaves: Vec<String>,
    pub admin_contact: String,
    pub default_ttl: u32,
    pub delete_ttl_match: TtlMatch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    pub enabled: bool,
    pub command: String,
    pub args: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "127.0.0.1".to_string(),
            port: 5432,
            user: "powerdns".to_string(),
            name: "postgres".to_string(),
            password: None,
            password_file: PathBuf::from("/etc/powerdns/pdns.d/pdns.local.gpgsql"),
            max_connections: 2,
            connect_timeout: 10,
        }
    }
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            master_dns: "example.com".to_string(),
            slaves: vec!["ns2.example.com".to_string()],
            admin_contact: "hostmaster.example.com".to_string(),
            default_ttl: 360,
            delete_ttl_match: TtlMatch::Ignore,
        }
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: "pdns_control".to_string(),
            args: vec!["notify".to_string()],
            timeout_secs: 5,
        }
    }
}

impl ZoneConfig {
    /// Authoritative servers in NS order: master first, then secondaries.
    pub fn name_servers(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.master_dns.as_str()).chain(self.slaves.iter().map(String::as_str))
    }
}

impl NotifyConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl DatabaseConfig {
    /// Configured password, or the `gpgsql-password=` line of the PowerDNS
    /// backend config.
    pub fn resolve_password(&self) -> Result<String> {
        if let Some(password) = &self.password {
            return Ok(password.clone());
        }

        let contents = fs::read_to_string(&self.password_file)
            .with_context(|| format!("Cannot read {}", self.password_file.display()))?;

        contents
            .lines()
            .filter_map(|line| line.strip_prefix("gpgsql-password="))
            .map(|password| password.trim().to_string())
            .last()
            .filter(|password| !password.is_empty())
            .context("Cannot find postgres password")
    }
}

impl Settings {
    pub fn load(config_path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("PDNSCMD")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("zones.slaves")
                    .with_list_parse_key("notify.args")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.zones.master_dns.trim().is_empty() {
            anyhow::bail!("zones.master_dns is required");
        }

        if self.zones.default_ttl == 0 || self.zones.default_ttl >= 65535 {
            anyhow::bail!("zones.default_ttl must be between 1 and 65534");
        }

        if self.notify.enabled && self.notify.command.trim().is_empty() {
            anyhow::bail!("notify.command is required when notifications are enabled");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_file() {
        let settings = Settings::load("/nonexistent/pdnscmd").unwrap();
        assert_eq!(settings.zones.default_ttl, 360);
        assert_eq!(settings.zones.delete_ttl_match, TtlMatch::Ignore);
        assert_eq!(settings.notify.timeout(), Duration::from_secs(5));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_load_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[zones]
master_dns = "ns1.example.net"
slaves = ["ns2.example.net", "ns3.example.net"]
delete_ttl_match = "require"

[database]
host = "db.internal"
password = "secret"
"#
        )
        .unwrap();

        let settings = Settings::load(file.path().to_str().unwrap()).unwrap();
        let servers: Vec<&str> = settings.zones.name_servers().collect();
        assert_eq!(servers, vec!["ns1.example.net", "ns2.example.net", "ns3.example.net"]);
        assert_eq!(settings.zones.delete_ttl_match, TtlMatch::Require);
        assert_eq!(settings.database.host, "db.internal");
        assert_eq!(settings.database.user, "powerdns");
        assert_eq!(settings.database.resolve_password().unwrap(), "secret");
    }

    #[test]
    fn test_password_from_backend_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "launch+=gpgsql").unwrap();
        writeln!(file, "gpgsql-password=hunter2").unwrap();

        let config = DatabaseConfig {
            password_file: file.path().to_path_buf(),
            ..DatabaseConfig::default()
        };
        assert_eq!(config.resolve_password().unwrap(), "hunter2");
    }

    #[test]
    fn test_missing_password_is_an_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let config = DatabaseConfig {
            password_file: file.path().to_path_buf(),
            ..DatabaseConfig::default()
        };
        assert!(config.resolve_password().is_err());
    }
}
