// ABOUTME: Command-line flags of the agent binary.
// ABOUTME: Carries the deploy settings from bondi.yml to the host.

use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

use super::DEFAULT_PORT;
use crate::deploy::{DeploySettings, ReadinessPolicy};

#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(name = "bondi-agent")]
#[command(about = "Deploys containers on this host on behalf of the bondi CLI")]
#[command(version)]
pub struct AgentArgs {
    /// Address to listen on
    #[arg(long, default_value_t = SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)))]
    pub listen: SocketAddr,

    /// Container engine socket
    #[arg(long, default_value = "/var/run/docker.sock")]
    pub socket: String,

    /// ACME credential file on the host
    #[arg(long, default_value = "/etc/traefik/acme/acme.json")]
    pub acme_path: String,

    /// Seconds a container gets to stop before it is killed
    #[arg(long, default_value_t = 10)]
    pub stop_timeout_secs: u64,

    /// How often to check that the proxy is running
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u32).range(1..))]
    pub readiness_attempts: u32,

    /// Milliseconds between readiness checks
    #[arg(long, default_value_t = 1000)]
    pub readiness_interval_ms: u64,

    /// Show debug logs
    #[arg(short, long)]
    pub verbose: bool,
}

impl AgentArgs {
    /// Flags reproducing `settings` on an agent listening on `port`.
    pub fn from_settings(settings: &DeploySettings, port: u16) -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], port)),
            socket: settings.engine_socket.clone(),
            acme_path: settings.acme_host_path.clone(),
            stop_timeout_secs: settings.stop_grace.as_secs(),
            readiness_attempts: settings.readiness.max_attempts,
            readiness_interval_ms: u64::try_from(settings.readiness.interval.as_millis())
                .unwrap_or(u64::MAX),
            verbose: false,
        }
    }

    pub fn settings(&self) -> DeploySettings {
        DeploySettings {
            engine_socket: self.socket.clone(),
            acme_host_path: self.acme_path.clone(),
            stop_grace: Duration::from_secs(self.stop_timeout_secs),
            readiness: ReadinessPolicy {
                max_attempts: self.readiness_attempts,
                interval: Duration::from_millis(self.readiness_interval_ms),
            },
            ..DeploySettings::default()
        }
    }

    /// The flags as passed on a command line.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            format!("--listen={}", self.listen),
            format!("--socket={}", self.socket),
            format!("--acme-path={}", self.acme_path),
            format!("--stop-timeout-secs={}", self.stop_timeout_secs),
            format!("--readiness-attempts={}", self.readiness_attempts),
            format!("--readiness-interval-ms={}", self.readiness_interval_ms),
        ];
        if self.verbose {
            args.push("--verbose".to_string());
        }
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_deploy_settings() {
        let args = AgentArgs::try_parse_from(["bondi-agent"]).unwrap();
        assert_eq!(args.listen.port(), DEFAULT_PORT);
        assert_eq!(args.settings(), DeploySettings::default());
    }

    #[test]
    fn settings_survive_the_command_line() {
        let settings = DeploySettings {
            engine_socket: "/run/user/1000/docker.sock".to_string(),
            acme_host_path: "/srv/acme.json".to_string(),
            stop_grace: Duration::from_secs(25),
            readiness: ReadinessPolicy {
                max_attempts: 5,
                interval: Duration::from_millis(250),
            },
            ..DeploySettings::default()
        };

        let args = AgentArgs::from_settings(&settings, 4040);
        let parsed = AgentArgs::try_parse_from(
            std::iter::once("bondi-agent".to_string()).chain(args.to_args()),
        )
        .unwrap();

        assert_eq!(parsed, args);
        assert_eq!(parsed.listen.port(), 4040);
        assert_eq!(parsed.settings(), settings);
    }

    #[test]
    fn zero_readiness_attempts_are_rejected() {
        assert!(AgentArgs::try_parse_from(["bondi-agent", "--readiness-attempts=0"]).is_err());
    }
}
