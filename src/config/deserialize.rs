// ABOUTME: Custom serde deserializers for config types.
// ABOUTME: Handles the server list and bare image names.

use nonempty::NonEmpty;
use serde::Deserialize;

use super::ServerConfig;

pub fn deserialize_servers<'de, D>(deserializer: D) -> Result<NonEmpty<ServerConfig>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let values: Vec<ServerEntry> = Vec::deserialize(deserializer)?;
    let servers = values
        .into_iter()
        .map(ServerEntry::into_server_config)
        .collect::<Result<Vec<_>, _>>()
        .map_err(serde::de::Error::custom)?;

    NonEmpty::from_vec(servers)
        .ok_or_else(|| serde::de::Error::custom("at least one server is required"))
}

/// An image name without tag; the tag is given at deploy time.
pub fn deserialize_image_name<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let name = String::deserialize(deserializer)?;
    let name = name.trim();
    if name.is_empty() {
        return Err(serde::de::Error::custom("image_name cannot be empty"));
    }
    if name.contains(':') {
        return Err(serde::de::Error::custom(format!(
            "image_name must not contain a tag: {name}"
        )));
    }
    Ok(name.to_string())
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ServerEntry {
    Simple(String),
    Detailed(ServerConfig),
}

impl ServerEntry {
    fn into_server_config(self) -> Result<ServerConfig, String> {
        match self {
            ServerEntry::Simple(s) => ServerConfig::parse(&s),
            ServerEntry::Detailed(c) => Ok(c),
        }
    }
}
