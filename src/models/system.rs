// CPU, memory, disk, GPU and full snapshot models (as served by /api/system)

use serde::{Deserialize, Serialize};

use super::NetworkInterface;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuInfo {
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub percent: f64,
    #[serde(default)]
    pub cores: u32,
    #[serde(default)]
    pub threads: u32,
    /// One entry per hardware thread; absent when the collector could not sample.
    #[serde(default)]
    pub per_core_percent: Option<Vec<f64>>,
}

impl CpuInfo {
    /// Thread count used to size core series: the reported count, or the
    /// per-thread sample length when the collector reports zero threads.
    pub fn series_count(&self) -> usize {
        if self.threads > 0 {
            self.threads as usize
        } else {
            self.per_core_percent.as_ref().map_or(0, Vec::len)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryInfo {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub used: u64,
    #[serde(default)]
    pub free: u64,
    #[serde(default)]
    pub percent: f64,
    #[serde(default)]
    pub total_human: String,
    #[serde(default)]
    pub used_human: String,
    #[serde(default)]
    pub free_human: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiskInfo {
    pub name: String,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub used: u64,
    #[serde(default)]
    pub free: u64,
    #[serde(default)]
    pub percent: f64,
    #[serde(default)]
    pub total_human: String,
    #[serde(default)]
    pub used_human: String,
    #[serde(default)]
    pub free_human: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GpuMemory {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub used: u64,
    #[serde(default)]
    pub free: u64,
    #[serde(default)]
    pub percent: f64,
    #[serde(default)]
    pub total_human: String,
    #[serde(default)]
    pub used_human: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GpuInfo {
    pub name: String,
    #[serde(default)]
    pub memory: GpuMemory,
    #[serde(default)]
    pub utilization: f64,
    /// Degrees Celsius.
    #[serde(default)]
    pub temperature: i32,
    /// Watts.
    #[serde(default)]
    pub power_usage: i32,
    #[serde(default)]
    pub power_limit: i32,
    #[serde(default)]
    pub enforced_power_limit: i32,
    #[serde(default)]
    pub power_default_limit: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DistroInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// One complete point-in-time reading from a host.
///
/// Every section is optional on decode: a collector that fails to sample one
/// area still produces a usable snapshot, and the aggregator simply skips the
/// series for whatever is missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub os: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distro: Option<DistroInfo>,
    /// Seconds since boot.
    #[serde(default)]
    pub uptime: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<CpuInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemoryInfo>,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub disks: Vec<DiskInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu: Option<Vec<GpuInfo>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<Vec<NetworkInterface>>,
    /// Connected dashboard viewers; only present on push frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ws_clients: Option<u32>,
}

impl MetricSnapshot {
    /// Human label for the OS: distro name when known, otherwise the raw `os` string.
    pub fn os_label(&self) -> &str {
        self.distro
            .as_ref()
            .and_then(|d| d.name.as_deref())
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.os)
    }
}
