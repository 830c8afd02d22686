// ABOUTME: The deploy request as received and its validated form.
// ABOUTME: Validation enforces the all-or-nothing reverse proxy triple.

use serde::{Deserialize, Serialize};
use snafu::{ResultExt, ensure};
use std::collections::BTreeMap;
use std::fmt;

use super::error::{
    DeployError, IncompleteProxySnafu, InvalidProxyImageSnafu, InvalidRequestSnafu,
    UntaggedProxyImageSnafu,
};
use crate::runtime::RegistryAuth;
use crate::types::ImageRef;

/// What to deploy on a host.
///
/// This is also the body of the agent's `POST /deploy`. The proxy fields
/// accept the older `traefik_*` names.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployRequest {
    pub image_name: String,
    pub tag: String,
    pub port: u16,
    #[serde(default)]
    pub env_vars: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_pass: Option<String>,
    #[serde(
        default,
        alias = "traefik_domain_name",
        skip_serializing_if = "Option::is_none"
    )]
    pub proxy_domain_name: Option<String>,
    #[serde(default, alias = "traefik_image", skip_serializing_if = "Option::is_none")]
    pub proxy_image: Option<String>,
    #[serde(
        default,
        alias = "traefik_acme_email",
        skip_serializing_if = "Option::is_none"
    )]
    pub proxy_acme_email: Option<String>,
}

impl fmt::Debug for DeployRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeployRequest")
            .field("image_name", &self.image_name)
            .field("tag", &self.tag)
            .field("port", &self.port)
            .field("env_vars", &self.env_vars.keys().collect::<Vec<_>>())
            .field("registry_user", &self.registry_user)
            .field("registry_pass", &self.registry_pass.as_ref().map(|_| "<redacted>"))
            .field("proxy_domain_name", &self.proxy_domain_name)
            .field("proxy_image", &self.proxy_image)
            .field("proxy_acme_email", &self.proxy_acme_email)
            .finish()
    }
}

/// Reverse proxy parameters that passed validation.
///
/// Only [`DeployRequest::validate`] produces these, so holding one means all
/// three values are present and the image carries a tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyParams {
    domain: String,
    image: ImageRef,
    acme_email: String,
}

impl ProxyParams {
    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn image(&self) -> &ImageRef {
        &self.image
    }

    pub fn acme_email(&self) -> &str {
        &self.acme_email
    }
}

/// A request that is safe to hand to the engine.
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    image: ImageRef,
    port: u16,
    env: Vec<String>,
    auth: Option<RegistryAuth>,
    proxy: Option<ProxyParams>,
}

impl ValidatedRequest {
    pub fn image(&self) -> &ImageRef {
        &self.image
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Environment as `KEY=VALUE` entries, sorted by key.
    pub fn env(&self) -> &[String] {
        &self.env
    }

    pub fn auth(&self) -> Option<&RegistryAuth> {
        self.auth.as_ref()
    }

    pub fn proxy(&self) -> Option<&ProxyParams> {
        self.proxy.as_ref()
    }
}

/// Treats empty strings as absent.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl DeployRequest {
    /// Whether any reverse proxy parameter is set.
    pub fn wants_proxy(&self) -> bool {
        present(&self.proxy_domain_name).is_some()
            || present(&self.proxy_image).is_some()
            || present(&self.proxy_acme_email).is_some()
    }

    pub fn validate(&self) -> Result<ValidatedRequest, DeployError> {
        let image_name = self.image_name.trim();
        let tag = self.tag.trim();
        ensure!(
            !image_name.is_empty(),
            InvalidRequestSnafu {
                reason: "image_name is empty"
            }
        );
        ensure!(
            !image_name.contains(':'),
            InvalidRequestSnafu {
                reason: format!("image_name {image_name} must not contain a tag or port")
            }
        );
        ensure!(
            !tag.is_empty() && !tag.contains(':'),
            InvalidRequestSnafu {
                reason: format!("invalid tag {tag:?}")
            }
        );
        ensure!(
            self.port != 0,
            InvalidRequestSnafu {
                reason: "port must be non-zero"
            }
        );

        let auth = match (present(&self.registry_user), present(&self.registry_pass)) {
            (Some(username), Some(password)) => Some(RegistryAuth {
                username: username.to_string(),
                password: password.to_string(),
                server: None,
            }),
            (None, None) => None,
            _ => {
                return InvalidRequestSnafu {
                    reason: "registry_user and registry_pass must be set together",
                }
                .fail();
            }
        };

        Ok(ValidatedRequest {
            image: ImageRef::new(image_name, tag),
            port: self.port,
            env: self
                .env_vars
                .iter()
                .map(|(key, value)| format!("{key}={value}"))
                .collect(),
            auth,
            proxy: self.proxy_params()?,
        })
    }

    fn proxy_params(&self) -> Result<Option<ProxyParams>, DeployError> {
        let fields = [
            ("proxy_domain_name", present(&self.proxy_domain_name)),
            ("proxy_image", present(&self.proxy_image)),
            ("proxy_acme_email", present(&self.proxy_acme_email)),
        ];

        let missing: Vec<&'static str> = fields
            .iter()
            .filter(|(_, value)| value.is_none())
            .map(|(name, _)| *name)
            .collect();

        match (missing.len(), fields) {
            (3, _) => Ok(None),
            (0, [(_, Some(domain)), (_, Some(image)), (_, Some(acme_email))]) => {
                let parsed = ImageRef::parse(image).context(InvalidProxyImageSnafu { image })?;
                ensure!(parsed.has_tag(), UntaggedProxyImageSnafu { image });
                Ok(Some(ProxyParams {
                    domain: domain.to_string(),
                    image: parsed,
                    acme_email: acme_email.to_string(),
                }))
            }
            _ => IncompleteProxySnafu { missing }.fail(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deploy::DeployErrorKind;

    fn request() -> DeployRequest {
        DeployRequest {
            image_name: "ghcr.io/acme/app".to_string(),
            tag: "v1".to_string(),
            port: 8080,
            ..Default::default()
        }
    }

    fn with_proxy(mut req: DeployRequest) -> DeployRequest {
        req.proxy_domain_name = Some("example.com".to_string());
        req.proxy_image = Some("traefik:v3.3.0".to_string());
        req.proxy_acme_email = Some("ops@example.com".to_string());
        req
    }

    #[test]
    fn env_entries_are_sorted_key_value_pairs() {
        let mut req = request();
        req.env_vars.insert("B".to_string(), "2".to_string());
        req.env_vars.insert("A".to_string(), "x=y".to_string());

        let validated = req.validate().unwrap();
        assert_eq!(validated.env(), ["A=x=y", "B=2"]);
        assert_eq!(validated.image().to_string(), "ghcr.io/acme/app:v1");
        assert!(validated.proxy().is_none());
        assert!(validated.auth().is_none());
    }

    #[test]
    fn full_proxy_triple_is_accepted() {
        let validated = with_proxy(request()).validate().unwrap();
        let proxy = validated.proxy().unwrap();
        assert_eq!(proxy.domain(), "example.com");
        assert_eq!(proxy.image().name(), "traefik");
        assert_eq!(proxy.image().tag(), "v3.3.0");
    }

    #[test]
    fn partial_proxy_triple_is_rejected() {
        let mut req = with_proxy(request());
        req.proxy_acme_email = None;
        req.proxy_image = Some("  ".to_string());

        let err = req.validate().unwrap_err();
        assert_eq!(err.kind(), DeployErrorKind::Precondition);
        match err {
            DeployError::IncompleteProxy { missing } => {
                assert_eq!(missing, vec!["proxy_image", "proxy_acme_email"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn untagged_proxy_image_is_rejected() {
        let mut req = with_proxy(request());
        req.proxy_image = Some("traefik".to_string());
        assert!(matches!(
            req.validate(),
            Err(DeployError::UntaggedProxyImage { .. })
        ));
    }

    #[test]
    fn proxy_image_with_registry_port_is_rejected() {
        let mut req = with_proxy(request());
        req.proxy_image = Some("registry:5000/traefik:v3".to_string());
        assert!(matches!(
            req.validate(),
            Err(DeployError::InvalidProxyImage { .. })
        ));
    }

    #[test]
    fn half_credentials_are_rejected() {
        let mut req = request();
        req.registry_user = Some("deploy".to_string());
        assert!(matches!(
            req.validate(),
            Err(DeployError::InvalidRequest { .. })
        ));

        req.registry_pass = Some("secret".to_string());
        let auth = req.validate().unwrap().auth().cloned().unwrap();
        assert_eq!(auth.username, "deploy");
    }

    #[test]
    fn missing_tag_is_rejected() {
        let mut req = request();
        req.tag = String::new();
        assert_eq!(
            req.validate().unwrap_err().kind(),
            DeployErrorKind::Precondition
        );
    }

    #[test]
    fn deserializes_wire_field_names() {
        let req: DeployRequest = serde_json::from_str(
            r#"{
                "image_name": "app",
                "tag": "v2",
                "port": 3000,
                "env_vars": {"ENV": "prod"},
                "proxy_domain_name": "example.com"
            }"#,
        )
        .unwrap();
        assert_eq!(req.env_vars["ENV"], "prod");
        assert!(req.wants_proxy());
        assert!(req.registry_user.is_none());
    }

    #[test]
    fn accepts_traefik_field_names() {
        let req: DeployRequest = serde_json::from_str(
            r#"{
                "image_name": "app",
                "tag": "v2",
                "port": 3000,
                "traefik_domain_name": "example.com",
                "traefik_image": "traefik:v3.3.0",
                "traefik_acme_email": "ops@example.com"
            }"#,
        )
        .unwrap();
        assert_eq!(req.proxy_domain_name.as_deref(), Some("example.com"));
        assert_eq!(req.proxy_image.as_deref(), Some("traefik:v3.3.0"));
        assert_eq!(req.proxy_acme_email.as_deref(), Some("ops@example.com"));
        assert!(req.validate().unwrap().proxy().is_some());
    }

    #[test]
    fn credentials_reach_the_agent_but_not_the_logs() {
        let mut req = request();
        req.registry_user = Some("deploy".to_string());
        req.registry_pass = Some("secret".to_string());

        let json = serde_json::to_string(&req).unwrap();
        let back: DeployRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back.registry_pass.as_deref(), Some("secret"));

        assert!(!format!("{req:?}").contains("secret"));
    }
}
