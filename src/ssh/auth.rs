// ABOUTME: SSH credential discovery and public key authentication.
// ABOUTME: Explicit key file first, then the agent, then the usual ~/.ssh keys.

use super::error::{Error, Result};
use super::host_keys::HostKeyPolicy;
use russh::client::Handle;
use russh::keys::agent::client::AgentClient;
use russh::keys::{PrivateKey, PrivateKeyWithHashAlg, load_secret_key};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::UnixStream;

const DEFAULT_KEYS: [&str; 3] = ["id_ed25519", "id_ecdsa", "id_rsa"];

pub(crate) enum Credential {
    Agent(AgentClient<UnixStream>),
    Key(Arc<PrivateKey>),
}

fn load_key(path: &Path, passphrase: Option<&str>) -> Result<Arc<PrivateKey>> {
    load_secret_key(path, passphrase)
        .map(Arc::new)
        .map_err(|source| Error::KeyLoad {
            path: path.to_path_buf(),
            source,
        })
}

/// Pick the credential to authenticate with.
pub(crate) async fn resolve(
    key_path: Option<&Path>,
    passphrase: Option<&str>,
) -> Result<Credential> {
    if let Some(path) = key_path {
        return load_key(path, passphrase).map(Credential::Key);
    }

    if let Ok(agent) = AgentClient::connect_env().await {
        tracing::debug!("using SSH agent");
        return Ok(Credential::Agent(agent));
    }

    let home = std::env::var_os("HOME")
        .map(PathBuf::from)
        .ok_or_else(|| Error::NoCredentials("no agent and HOME is not set".to_string()))?;

    DEFAULT_KEYS
        .iter()
        .map(|name| home.join(".ssh").join(name))
        .find_map(|path| load_key(&path, passphrase).ok())
        .map(Credential::Key)
        .ok_or_else(|| Error::NoCredentials("no agent and no key in ~/.ssh".to_string()))
}

/// Authenticate `user`, returning whether the server accepted a key.
pub(crate) async fn authenticate(
    handle: &mut Handle<HostKeyPolicy>,
    user: &str,
    credential: Credential,
) -> Result<bool> {
    match credential {
        Credential::Agent(mut agent) => {
            let identities = agent
                .request_identities()
                .await
                .map_err(|e| Error::NoCredentials(format!("agent: {e}")))?;

            for identity in identities {
                let accepted = handle
                    .authenticate_publickey_with(user, identity, None, &mut agent)
                    .await
                    .is_ok_and(|result| result.success());
                if accepted {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Credential::Key(key) => {
            let hash_alg = handle.best_supported_rsa_hash().await?.flatten();
            let result = handle
                .authenticate_publickey(user, PrivateKeyWithHashAlg::new(key, hash_alg))
                .await?;
            Ok(result.success())
        }
    }
}
