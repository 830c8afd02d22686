// ABOUTME: Host-independent knobs for a deployment run.
// ABOUTME: Names, paths, proxy defaults, grace period, and readiness policy.

use std::time::Duration;

/// How long to wait for a freshly started container to report `running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            interval: Duration::from_secs(1),
        }
    }
}

/// Settings shared by every host in a deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploySettings {
    /// Network shared by the proxy and the service.
    pub network: String,
    pub service_container: String,
    pub proxy_container: String,
    /// Proxy image used when the configuration names none.
    pub default_proxy_image: String,
    /// Engine control socket on the host, also mounted into the proxy.
    pub engine_socket: String,
    /// ACME credential file on the host.
    pub acme_host_path: String,
    /// Where the proxy sees the ACME credential file.
    pub acme_storage_path: String,
    pub cert_resolver: String,
    /// How long a container gets to exit before it is killed.
    pub stop_grace: Duration,
    pub readiness: ReadinessPolicy,
}

impl Default for DeploySettings {
    fn default() -> Self {
        Self {
            network: "bondi-network".to_string(),
            service_container: "bondi-service".to_string(),
            proxy_container: "bondi-proxy".to_string(),
            default_proxy_image: "traefik:v3.3.0".to_string(),
            engine_socket: "/var/run/docker.sock".to_string(),
            acme_host_path: "/etc/traefik/acme/acme.json".to_string(),
            acme_storage_path: "/acme/acme.json".to_string(),
            cert_resolver: "bondi_resolver".to_string(),
            stop_grace: Duration::from_secs(10),
            readiness: ReadinessPolicy::default(),
        }
    }
}
