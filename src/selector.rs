// Which host is on screen, and the snapshot that implies. Read-side only.

use crate::aggregator::DashboardState;
use crate::models::{MetricSnapshot, RemoteClient};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DisplayTarget {
    #[default]
    Local,
    Remote(String),
}

/// Outcome of resolving the display target against current state.
#[derive(Debug, Clone, Copy)]
pub struct Resolved<'a> {
    pub is_local: bool,
    /// `None` for a remote agent that has not pushed metrics yet.
    pub snapshot: Option<&'a MetricSnapshot>,
    pub client: Option<&'a RemoteClient>,
}

#[derive(Debug, Clone, Default)]
pub struct SourceSelector {
    target: DisplayTarget,
}

impl SourceSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(&mut self, target: DisplayTarget) {
        self.target = target;
    }

    pub fn target(&self) -> &DisplayTarget {
        &self.target
    }

    pub fn resolve<'a>(&self, state: &'a DashboardState) -> Resolved<'a> {
        match &self.target {
            DisplayTarget::Local => Resolved {
                is_local: true,
                snapshot: state.local_snapshot(),
                client: None,
            },
            DisplayTarget::Remote(id) => {
                let client = state.client(id);
                Resolved {
                    is_local: false,
                    snapshot: client.and_then(|c| c.metrics.as_ref()),
                    client,
                }
            }
        }
    }

    /// Snapshot to render: the resolved one, or the local snapshot while a selected
    /// remote agent has nothing cached yet.
    pub fn display_snapshot<'a>(&self, state: &'a DashboardState) -> Option<&'a MetricSnapshot> {
        self.resolve(state).snapshot.or_else(|| state.local_snapshot())
    }

    /// Offline agents are listed but not selectable.
    pub fn can_select(state: &DashboardState, target: &DisplayTarget) -> bool {
        match target {
            DisplayTarget::Local => true,
            DisplayTarget::Remote(id) => state.client(id).is_some_and(RemoteClient::is_online),
        }
    }
}
