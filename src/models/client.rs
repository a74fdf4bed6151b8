// Remote agent directory models (GET /api/clients)

use serde::{Deserialize, Serialize};

use super::MetricSnapshot;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientStatus {
    Online,
    #[default]
    #[serde(other)]
    Offline,
}

/// A remote monitoring agent known to the dashboard server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteClient {
    /// Opaque, server-assigned id.
    pub server_id: String,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub arch: String,
    #[serde(default)]
    pub status: ClientStatus,
    /// Unix seconds.
    #[serde(default)]
    pub last_seen: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricSnapshot>,
}

impl RemoteClient {
    pub fn is_online(&self) -> bool {
        self.status == ClientStatus::Online
    }
}

/// Body of GET /api/clients.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientDirectory {
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub clients: Vec<RemoteClient>,
}
