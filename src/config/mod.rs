// ABOUTME: Configuration types and parsing for bondi.yml.
// ABOUTME: Builds deploy requests and settings with env var interpolation.

mod deserialize;
mod env_value;
mod init;
mod server;

pub use env_value::{EnvValue, resolve_env_map};
pub use init::init_config;
pub use server::ServerConfig;

use crate::deploy::{DeployRequest, DeploySettings, ReadinessPolicy};
use crate::error::{Error, Result};
use deserialize::{deserialize_image_name, deserialize_servers};
use env_value::resolve_optional;
use nonempty::NonEmpty;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "bondi.yml";
pub const CONFIG_FILENAME_ALT: &str = "bondi.yaml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceSection,

    #[serde(default)]
    pub proxy: Option<ProxySection>,

    #[serde(deserialize_with = "deserialize_servers")]
    pub servers: NonEmpty<ServerConfig>,

    #[serde(default)]
    pub engine: EngineSection,

    #[serde(default)]
    pub agent: AgentSection,
}

/// The application being deployed.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceSection {
    #[serde(deserialize_with = "deserialize_image_name")]
    pub image_name: String,

    pub port: u16,

    #[serde(default)]
    pub registry_user: Option<EnvValue>,

    #[serde(default)]
    pub registry_pass: Option<EnvValue>,

    #[serde(default)]
    pub env_vars: BTreeMap<String, EnvValue>,
}

/// The TLS reverse proxy. Present means enabled.
#[derive(Debug, Clone, Deserialize)]
pub struct ProxySection {
    pub domain_name: String,
    pub acme_email: String,
    /// Defaults to the settings' proxy image.
    #[serde(default)]
    pub image: Option<String>,
}

/// Overrides for engine-side defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineSection {
    #[serde(default)]
    pub socket: Option<String>,

    #[serde(default)]
    pub acme_path: Option<String>,

    #[serde(default = "default_stop_timeout", with = "humantime_serde")]
    pub stop_timeout: Duration,

    #[serde(default = "default_readiness_attempts")]
    pub readiness_attempts: u32,

    #[serde(default = "default_readiness_interval", with = "humantime_serde")]
    pub readiness_interval: Duration,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            socket: None,
            acme_path: None,
            stop_timeout: default_stop_timeout(),
            readiness_attempts: default_readiness_attempts(),
            readiness_interval: default_readiness_interval(),
        }
    }
}

/// The agent started on every host by `setup`.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentSection {
    /// Image repository without tag.
    #[serde(default = "default_agent_image", deserialize_with = "deserialize_image_name")]
    pub image: String,

    /// Image tag; defaults to the CLI's own version.
    #[serde(default = "default_agent_version")]
    pub version: String,

    #[serde(default = "default_agent_port")]
    pub port: u16,

    /// How long the CLI waits for one host's deployment.
    #[serde(default = "default_deploy_timeout", with = "humantime_serde")]
    pub deploy_timeout: Duration,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            image: default_agent_image(),
            version: default_agent_version(),
            port: default_agent_port(),
            deploy_timeout: default_deploy_timeout(),
        }
    }
}

impl AgentSection {
    /// Full image reference of the agent.
    pub fn image_ref(&self) -> String {
        format!("{}:{}", self.image, self.version)
    }
}

fn default_agent_image() -> String {
    "ghcr.io/bondi-deploy/bondi-agent".to_string()
}

fn default_agent_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_agent_port() -> u16 {
    crate::agent::DEFAULT_PORT
}

fn default_deploy_timeout() -> Duration {
    Duration::from_secs(600)
}

fn default_stop_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_readiness_attempts() -> u32 {
    30
}

fn default_readiness_interval() -> Duration {
    Duration::from_secs(1)
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        [CONFIG_FILENAME, CONFIG_FILENAME_ALT]
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.exists())
            .ok_or_else(|| Error::ConfigNotFound(dir.to_path_buf()))
            .and_then(|path| Self::load(&path))
    }

    fn validate(&self) -> Result<()> {
        if self.service.port == 0 {
            return Err(Error::InvalidConfig("service.port must be non-zero".into()));
        }
        if self.agent.port == 0 {
            return Err(Error::InvalidConfig("agent.port must be non-zero".into()));
        }
        if self.agent.version.trim().is_empty() || self.agent.version.contains(':') {
            return Err(Error::InvalidConfig(format!(
                "agent.version {:?} is not a valid tag",
                self.agent.version
            )));
        }
        if self.engine.readiness_attempts == 0 {
            return Err(Error::InvalidConfig(
                "engine.readiness_attempts must be at least 1".into(),
            ));
        }
        if let Some(proxy) = &self.proxy {
            if proxy.domain_name.trim().is_empty() || proxy.acme_email.trim().is_empty() {
                return Err(Error::InvalidConfig(
                    "proxy.domain_name and proxy.acme_email are required".into(),
                ));
            }
        }
        Ok(())
    }

    /// Engine-side settings, defaults overridden by the `engine` section.
    pub fn settings(&self) -> DeploySettings {
        let defaults = DeploySettings::default();
        DeploySettings {
            engine_socket: self.engine.socket.clone().unwrap_or(defaults.engine_socket),
            acme_host_path: self
                .engine
                .acme_path
                .clone()
                .unwrap_or(defaults.acme_host_path),
            stop_grace: self.engine.stop_timeout,
            readiness: ReadinessPolicy {
                max_attempts: self.engine.readiness_attempts,
                interval: self.engine.readiness_interval,
            },
            ..defaults
        }
    }

    /// The request to deploy `tag`, with env references resolved.
    pub fn deploy_request(&self, tag: &str) -> Result<DeployRequest> {
        let service = &self.service;
        let settings = self.settings();

        Ok(DeployRequest {
            image_name: service.image_name.clone(),
            tag: tag.to_string(),
            port: service.port,
            env_vars: resolve_env_map(&service.env_vars)?,
            registry_user: resolve_optional(service.registry_user.as_ref())?,
            registry_pass: resolve_optional(service.registry_pass.as_ref())?,
            proxy_domain_name: self.proxy.as_ref().map(|p| p.domain_name.clone()),
            proxy_image: self.proxy.as_ref().map(|p| {
                p.image
                    .clone()
                    .unwrap_or_else(|| settings.default_proxy_image.clone())
            }),
            proxy_acme_email: self.proxy.as_ref().map(|p| p.acme_email.clone()),
        })
    }
}
