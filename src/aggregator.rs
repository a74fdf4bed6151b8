// Single writer of dashboard state. Pull results and push frames both arrive here as
// tagged messages, so update logic exists once regardless of delivery path.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::debug;

use crate::history::{Direction, SeriesKey, TimeSeriesStore};
use crate::models::{ClientStatus, DockerContainer, MetricSnapshot, RemoteClient};

/// Delivery path a message came from; informational only (last write wins).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Pull,
    Push,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    SystemSnapshot(MetricSnapshot),
    DockerSnapshot(Vec<DockerContainer>),
    ClientPatch {
        server_id: String,
        metrics: MetricSnapshot,
    },
    /// Authoritative remote-agent list from the directory pull.
    Directory(Vec<RemoteClient>),
}

impl Message {
    pub fn kind(&self) -> &'static str {
        match self {
            Message::SystemSnapshot(_) => "system-snapshot",
            Message::DockerSnapshot(_) => "docker-snapshot",
            Message::ClientPatch { .. } => "client-patch",
            Message::Directory(_) => "directory",
        }
    }
}

/// What a single `apply` changed; lets callers skip republishing on no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Updated,
    Dropped,
}

/// Local snapshot, series, containers and the remote directory.
#[derive(Debug, Clone)]
pub struct DashboardState {
    store: TimeSeriesStore,
    local: Option<MetricSnapshot>,
    containers: Vec<DockerContainer>,
    clients: Vec<RemoteClient>,
    ws_clients: Option<u32>,
    last_updated: Option<DateTime<Utc>>,
}

impl DashboardState {
    pub fn new(window: usize) -> Self {
        Self {
            store: TimeSeriesStore::new(window),
            local: None,
            containers: Vec::new(),
            clients: Vec::new(),
            ws_clients: None,
            last_updated: None,
        }
    }

    pub fn apply(&mut self, message: Message, source: Source) -> Applied {
        self.apply_at(message, source, Utc::now())
    }

    /// `apply` with an explicit clock, for deterministic `last_seen`/`last_updated`.
    pub fn apply_at(&mut self, message: Message, source: Source, now: DateTime<Utc>) -> Applied {
        debug!(kind = message.kind(), ?source, "apply");
        match message {
            Message::SystemSnapshot(snapshot) => {
                self.apply_system(snapshot, now);
                Applied::Updated
            }
            Message::DockerSnapshot(containers) => {
                self.containers = containers;
                Applied::Updated
            }
            Message::ClientPatch { server_id, metrics } => {
                self.apply_client_patch(&server_id, metrics, now)
            }
            Message::Directory(clients) => {
                self.merge_directory(clients);
                Applied::Updated
            }
        }
    }

    fn apply_system(&mut self, snapshot: MetricSnapshot, now: DateTime<Utc>) {
        if let Some(cpu) = &snapshot.cpu
            && let Some(per_core) = &cpu.per_core_percent
        {
            self.store.initialize_core_series(cpu.series_count());
            for index in 0..self.store.core_count() {
                let value = per_core.get(index).copied().unwrap_or(0.0);
                self.store.append_sample(SeriesKey::Core(index), value);
            }
        }

        if let Some(memory) = &snapshot.memory {
            self.store.append_sample(SeriesKey::Memory, memory.percent);
        }

        if let Some(interfaces) = &snapshot.network {
            let mut active = HashSet::with_capacity(interfaces.len() * 2);
            for iface in interfaces {
                let up = SeriesKey::network(iface.name.as_str(), Direction::Up);
                let down = SeriesKey::network(iface.name.as_str(), Direction::Down);
                self.store.append_sample(up.clone(), iface.upload_rate());
                self.store.append_sample(down.clone(), iface.download_rate());
                active.insert(up);
                active.insert(down);
            }
            self.store.prune_stale_series(&active);
        }

        if let Some(count) = snapshot.ws_clients {
            self.ws_clients = Some(count);
        }
        self.local = Some(snapshot);
        self.last_updated = Some(now);
    }

    fn apply_client_patch(
        &mut self,
        server_id: &str,
        metrics: MetricSnapshot,
        now: DateTime<Utc>,
    ) -> Applied {
        let Some(client) = self.clients.iter_mut().find(|c| c.server_id == server_id) else {
            debug!(server_id, "client patch for unknown agent dropped");
            return Applied::Dropped;
        };
        client.metrics = Some(metrics);
        client.status = ClientStatus::Online;
        client.last_seen = now.timestamp();
        self.last_updated = Some(now);
        Applied::Updated
    }

    /// Replace the directory wholesale, keeping metrics the push channel already
    /// delivered for agents the fetched record carries none for.
    fn merge_directory(&mut self, fetched: Vec<RemoteClient>) {
        let mut previous = std::mem::take(&mut self.clients);
        self.clients = fetched
            .into_iter()
            .map(|mut incoming| {
                if let Some(pos) = previous
                    .iter()
                    .position(|c| c.server_id == incoming.server_id)
                {
                    let known = previous.swap_remove(pos);
                    if incoming.metrics.is_none() {
                        incoming.metrics = known.metrics;
                    }
                    incoming.last_seen = incoming.last_seen.max(known.last_seen);
                }
                incoming
            })
            .collect();
    }

    pub fn store(&self) -> &TimeSeriesStore {
        &self.store
    }

    pub fn local_snapshot(&self) -> Option<&MetricSnapshot> {
        self.local.as_ref()
    }

    pub fn containers(&self) -> &[DockerContainer] {
        &self.containers
    }

    pub fn clients(&self) -> &[RemoteClient] {
        &self.clients
    }

    pub fn client(&self, server_id: &str) -> Option<&RemoteClient> {
        self.clients.iter().find(|c| c.server_id == server_id)
    }

    /// Connected dashboard viewers as last reported by a push frame.
    pub fn ws_clients(&self) -> Option<u32> {
        self.ws_clients
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }
}
