// Domain models (mirror the dashboard server's JSON)

mod client;
mod container;
mod network;
mod system;

pub use client::{ClientDirectory, ClientStatus, RemoteClient};
pub use container::{ContainerAction, ContainerState, DockerContainer};
pub use network::NetworkInterface;
pub use system::{CpuInfo, DiskInfo, DistroInfo, GpuInfo, GpuMemory, MemoryInfo, MetricSnapshot};

use serde::{Deserialize, Deserializer};

/// The server encodes a nil slice as `null`; read it as the empty value.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
