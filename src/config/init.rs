// ABOUTME: Config scaffolding for new projects.
// ABOUTME: Writes a bondi.yml template named after the project directory.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

use super::CONFIG_FILENAME;

/// Write a template config into `dir`, returning its path.
pub fn init_config(dir: &Path, force: bool) -> Result<PathBuf> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let project = dir
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .unwrap_or("my-app");

    std::fs::write(&config_path, template_yaml(project))?;
    Ok(config_path)
}

fn template_yaml(project: &str) -> String {
    format!(
        r#"service:
  image_name: {project}
  port: 8080
  # registry_user: {{env: REGISTRY_USER}}
  # registry_pass: {{env: REGISTRY_PASS}}
  env_vars:
    ENV: prod

# Remove this section to run without the TLS reverse proxy.
proxy:
  domain_name: example.com
  acme_email: ops@example.com
  # image: traefik:v3.3.0

servers:
  - host: 55.55.55.55
    user: root
    # key_path: ~/.ssh/id_ed25519
    # Accept and record the host key on first connect
    # trust_first_connection: true

# The agent `bondi setup` runs on every server; deploys go through it.
# agent:
#   version: 0.1.0
#   port: 3030
#   deploy_timeout: 10m
"#
    )
}
