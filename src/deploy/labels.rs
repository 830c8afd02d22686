// ABOUTME: Container labels written and read by the orchestrator.
// ABOUTME: Identity labels for discovery and Traefik routing labels.

use crate::runtime::ContainerFilters;
use std::collections::HashMap;

pub const MANAGED: &str = "bondi.managed";
pub const SERVICE: &str = "bondi.service";
pub const ROLE: &str = "bondi.role";
pub const ROLE_PROXY: &str = "proxy";

/// Router name used in the Traefik routing labels.
const ROUTER: &str = "bondi";

/// Identity labels for the service container running `image_name`.
pub fn service_identity(image_name: &str) -> HashMap<String, String> {
    HashMap::from([
        (MANAGED.to_string(), "true".to_string()),
        (SERVICE.to_string(), image_name.to_string()),
    ])
}

pub fn proxy_identity() -> HashMap<String, String> {
    HashMap::from([
        (MANAGED.to_string(), "true".to_string()),
        (ROLE.to_string(), ROLE_PROXY.to_string()),
    ])
}

/// Labels that make Traefik route `domain` and `www.domain` to the container.
pub fn routing(domain: &str, resolver: &str) -> HashMap<String, String> {
    let router = format!("traefik.http.routers.{ROUTER}");
    HashMap::from([
        ("traefik.enable".to_string(), "true".to_string()),
        (
            format!("{router}.rule"),
            format!("Host(`{domain}`) || Host(`www.{domain}`)"),
        ),
        (format!("{router}.entrypoints"), "websecure".to_string()),
        (format!("{router}.tls"), "true".to_string()),
        (format!("{router}.tls.certresolver"), resolver.to_string()),
    ])
}

/// Every container bondi created for `image_name`, running or not.
pub fn service_filter(image_name: &str) -> ContainerFilters {
    service_identity(image_name)
        .into_iter()
        .fold(ContainerFilters::default(), |filters, (k, v)| {
            filters.with_label(k, v)
        })
        .include_stopped()
}

/// Every container carrying the proxy role label, running or not.
pub fn proxy_filter() -> ContainerFilters {
    ContainerFilters::default()
        .with_label(ROLE, ROLE_PROXY)
        .include_stopped()
}

/// Whether `labels` mark a reverse proxy container.
pub fn is_proxy(labels: &HashMap<String, String>) -> bool {
    labels.get(ROLE).map(String::as_str) == Some(ROLE_PROXY)
}
