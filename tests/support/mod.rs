// ABOUTME: Test support utilities.
// ABOUTME: Provides the fake engine and request builders for integration tests.

use bondi::deploy::{DeployRequest, labels};
use std::collections::HashMap;
use std::sync::Once;

// Each test binary only uses some of these helpers, so allow dead_code.
#[allow(dead_code)]
pub mod fake_engine;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env().add_directive("bondi=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub const APP: &str = "ghcr.io/acme/app";

/// A request for `APP:tag` without the reverse proxy.
#[allow(dead_code)]
pub fn request(tag: &str) -> DeployRequest {
    DeployRequest {
        image_name: APP.to_string(),
        tag: tag.to_string(),
        port: 8080,
        env_vars: [("ENV".to_string(), "prod".to_string())].into(),
        ..Default::default()
    }
}

/// A request for `APP:tag` behind a proxy running `proxy_image`.
#[allow(dead_code)]
pub fn request_with_proxy(tag: &str, proxy_image: &str) -> DeployRequest {
    DeployRequest {
        proxy_domain_name: Some("example.com".to_string()),
        proxy_image: Some(proxy_image.to_string()),
        proxy_acme_email: Some("ops@example.com".to_string()),
        ..request(tag)
    }
}

/// Identity labels of a service container for `APP`.
#[allow(dead_code)]
pub fn service_labels() -> HashMap<String, String> {
    labels::service_identity(APP)
}

#[allow(dead_code)]
pub fn proxy_labels() -> HashMap<String, String> {
    labels::proxy_identity()
}
