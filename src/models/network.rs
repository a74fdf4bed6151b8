// Network interface models

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkInterface {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Link speed in Mbit/s, when the OS reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv4: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv6: Option<String>,
    #[serde(default)]
    pub bytes_sent: u64,
    #[serde(default)]
    pub bytes_recv: u64,
    #[serde(default)]
    pub packets_sent: u64,
    #[serde(default)]
    pub packets_recv: u64,
    #[serde(default)]
    pub errors_in: i64,
    #[serde(default)]
    pub errors_out: i64,
    #[serde(default)]
    pub drops_in: i64,
    #[serde(default)]
    pub drops_out: i64,
    /// Upload rate in bytes/sec (computed by the collector between samples).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_up: Option<f64>,
    /// Download rate in bytes/sec.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_down: Option<f64>,
}

impl NetworkInterface {
    pub fn upload_rate(&self) -> f64 {
        self.speed_up.unwrap_or(0.0)
    }

    pub fn download_rate(&self) -> f64 {
        self.speed_down.unwrap_or(0.0)
    }
}
