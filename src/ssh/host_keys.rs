// ABOUTME: Server host key verification against known_hosts.
// ABOUTME: Optionally records unknown hosts on first connect.

use russh::client;
use russh::keys::known_hosts::{
    check_known_hosts, check_known_hosts_path, learn_known_hosts, learn_known_hosts_path,
};
use russh::keys::ssh_key::PublicKey;
use std::path::PathBuf;

/// Decides whether a server's host key is acceptable.
pub(crate) struct HostKeyPolicy {
    host: String,
    port: u16,
    trust_on_first_use: bool,
    known_hosts: Option<PathBuf>,
}

impl HostKeyPolicy {
    pub(crate) fn new(
        host: String,
        port: u16,
        trust_on_first_use: bool,
        known_hosts: Option<PathBuf>,
    ) -> Self {
        Self {
            host,
            port,
            trust_on_first_use,
            known_hosts,
        }
    }

    fn lookup(&self, key: &PublicKey) -> Result<bool, russh::keys::Error> {
        match &self.known_hosts {
            Some(path) => check_known_hosts_path(&self.host, self.port, key, path),
            None => check_known_hosts(&self.host, self.port, key),
        }
    }

    fn remember(&self, key: &PublicKey) {
        let learned = match &self.known_hosts {
            Some(path) => learn_known_hosts_path(&self.host, self.port, key, path),
            None => learn_known_hosts(&self.host, self.port, key),
        };
        if let Err(e) = learned {
            tracing::warn!(host = %self.host, error = %e, "could not record host key");
        }
    }
}

impl client::Handler for HostKeyPolicy {
    type Error = russh::Error;

    async fn check_server_key(&mut self, key: &PublicKey) -> Result<bool, Self::Error> {
        match self.lookup(key) {
            Ok(true) => Ok(true),
            // A changed key is never accepted, even with trust-on-first-use.
            Err(russh::keys::Error::KeyChanged { line }) => {
                tracing::error!(
                    host = %self.host,
                    line,
                    "host key differs from known_hosts entry"
                );
                Ok(false)
            }
            Ok(false) | Err(_) if self.trust_on_first_use => {
                tracing::warn!(host = %self.host, port = self.port, "trusting unknown host key");
                self.remember(key);
                Ok(true)
            }
            Ok(false) | Err(_) => {
                tracing::warn!(host = %self.host, "host key not in known_hosts");
                Ok(false)
            }
        }
    }
}
