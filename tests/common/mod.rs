// Shared test helpers

#![allow(dead_code)]

use dashsync::models::*;

pub fn cpu(per_core: &[f64]) -> CpuInfo {
    CpuInfo {
        brand: "Test CPU".into(),
        percent: per_core.iter().sum::<f64>() / per_core.len().max(1) as f64,
        cores: per_core.len() as u32,
        threads: per_core.len() as u32,
        per_core_percent: Some(per_core.to_vec()),
    }
}

pub fn memory(percent: f64) -> MemoryInfo {
    MemoryInfo {
        total: 16 * 1024 * 1024 * 1024,
        percent,
        ..MemoryInfo::default()
    }
}

pub fn iface(name: &str, up: f64, down: f64) -> NetworkInterface {
    NetworkInterface {
        name: name.into(),
        speed_up: Some(up),
        speed_down: Some(down),
        ..NetworkInterface::default()
    }
}

pub fn minimal_snapshot(hostname: &str) -> MetricSnapshot {
    MetricSnapshot {
        hostname: hostname.into(),
        os: "linux".into(),
        ..MetricSnapshot::default()
    }
}

pub fn snapshot(per_core: &[f64], mem_percent: f64, interfaces: Vec<NetworkInterface>) -> MetricSnapshot {
    MetricSnapshot {
        cpu: Some(cpu(per_core)),
        memory: Some(memory(mem_percent)),
        network: Some(interfaces),
        ..minimal_snapshot("local")
    }
}

pub fn remote(server_id: &str, status: ClientStatus) -> RemoteClient {
    RemoteClient {
        server_id: server_id.into(),
        hostname: format!("{}-host", server_id),
        platform: "linux".into(),
        arch: "x86_64".into(),
        status,
        last_seen: 0,
        metrics: None,
    }
}

pub fn container(id: &str, name: &str, state: ContainerState) -> DockerContainer {
    DockerContainer {
        id: id.into(),
        name: name.into(),
        image: format!("{}:latest", name),
        status: String::new(),
        state,
        ports: String::new(),
    }
}
