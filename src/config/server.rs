// ABOUTME: Deployment target servers and their SSH settings.
// ABOUTME: Parses shorthand like "host", "user@host", "user@host:port".

use super::env_value::{EnvValue, resolve_optional};
use crate::error::Result;
use crate::ssh::SessionConfig;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_user")]
    pub user: String,
    /// Private key file; `~/` is expanded.
    #[serde(default)]
    pub key_path: Option<String>,
    #[serde(default)]
    pub key_passphrase: Option<EnvValue>,
    #[serde(default)]
    pub trust_first_connection: bool,
}

fn default_port() -> u16 {
    22
}

fn default_user() -> String {
    "root".to_string()
}

impl ServerConfig {
    pub fn parse(s: &str) -> std::result::Result<Self, String> {
        let s = s.trim();
        if s.is_empty() {
            return Err("server address cannot be empty".to_string());
        }

        let (user, rest) = match s.split_once('@') {
            Some((user, _)) if user.is_empty() => {
                return Err(format!("empty user in {s}"));
            }
            Some((user, rest)) => (user.to_string(), rest),
            None => (default_user(), s),
        };

        let (host, port) = match rest.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| format!("invalid port: {port}"))?;
                (host, port)
            }
            None => (rest, default_port()),
        };

        if host.is_empty() {
            return Err("hostname cannot be empty".to_string());
        }

        Ok(ServerConfig {
            host: host.to_string(),
            port,
            user,
            key_path: None,
            key_passphrase: None,
            trust_first_connection: false,
        })
    }

    /// How this server is shown in output and status reports.
    pub fn label(&self) -> String {
        if self.port == default_port() {
            self.host.clone()
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    pub fn key_path_expanded(&self) -> Option<PathBuf> {
        let path = self.key_path.as_deref()?;
        match (path.strip_prefix("~/"), std::env::var_os("HOME")) {
            (Some(rest), Some(home)) => Some(PathBuf::from(home).join(rest)),
            _ => Some(PathBuf::from(path)),
        }
    }

    pub fn session_config(&self) -> Result<SessionConfig> {
        let mut config = SessionConfig::new(&self.host, &self.user)
            .port(self.port)
            .trust_on_first_use(self.trust_first_connection);
        if let Some(path) = self.key_path_expanded() {
            config = config.key_path(path);
        }
        if let Some(passphrase) = resolve_optional(self.key_passphrase.as_ref())? {
            config = config.key_passphrase(passphrase);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_shorthand_forms() {
        let s = ServerConfig::parse("203.0.113.10").unwrap();
        assert_eq!((s.host.as_str(), s.port, s.user.as_str()), ("203.0.113.10", 22, "root"));

        let s = ServerConfig::parse("deploy@example.com:2222").unwrap();
        assert_eq!((s.host.as_str(), s.port, s.user.as_str()), ("example.com", 2222, "deploy"));
        assert_eq!(s.label(), "example.com:2222");
    }

    #[test]
    fn rejects_bad_shorthand() {
        assert!(ServerConfig::parse("").is_err());
        assert!(ServerConfig::parse("@host").is_err());
        assert!(ServerConfig::parse("host:http").is_err());
        assert!(ServerConfig::parse("user@:22").is_err());
    }

    #[test]
    fn expands_home_in_key_path() {
        let mut s = ServerConfig::parse("host").unwrap();
        s.key_path = Some("~/.ssh/deploy".to_string());
        temp_env::with_var("HOME", Some("/home/ci"), || {
            assert_eq!(
                s.key_path_expanded(),
                Some(PathBuf::from("/home/ci/.ssh/deploy"))
            );
        });
    }
}
