// HTTP pull client for the dashboard REST endpoints (reqwest).

use std::time::Duration;
use tracing::instrument;
use url::Url;

use crate::models::{ClientDirectory, ContainerAction, DockerContainer, MetricSnapshot, RemoteClient};
use crate::version;

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
}

impl ApiClient {
    pub fn new(base: Url, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(version::user_agent())
            .build()?;
        Ok(Self { http, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Absolute URL for `/<segments...>` on the dashboard origin.
    fn endpoint(&self, segments: &[&str]) -> anyhow::Result<Url> {
        let mut url = self.base.clone();
        url.set_query(None);
        url.set_fragment(None);
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("base URL {} cannot carry a path", self.base))?
            .clear()
            .extend(segments);
        Ok(url)
    }

    /// GET /api/system
    #[instrument(skip(self), fields(client = "api", operation = "fetch_system"))]
    pub async fn fetch_system(&self) -> anyhow::Result<MetricSnapshot> {
        let url = self.endpoint(&["api", "system"])?;
        let snapshot = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<MetricSnapshot>()
            .await?;
        Ok(snapshot)
    }

    /// GET /api/docker. A `null` body (nothing running) reads as an empty list.
    #[instrument(skip(self), fields(client = "api", operation = "fetch_docker"))]
    pub async fn fetch_docker(&self) -> anyhow::Result<Vec<DockerContainer>> {
        let url = self.endpoint(&["api", "docker"])?;
        let containers = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<Option<Vec<DockerContainer>>>()
            .await?;
        Ok(containers.unwrap_or_default())
    }

    /// GET /api/clients
    #[instrument(skip(self), fields(client = "api", operation = "fetch_clients"))]
    pub async fn fetch_clients(&self) -> anyhow::Result<Vec<RemoteClient>> {
        let url = self.endpoint(&["api", "clients"])?;
        let directory = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<ClientDirectory>()
            .await?;
        Ok(directory.clients)
    }

    /// POST /api/docker/{id}/action?action=... The response body is not consumed.
    #[instrument(skip(self), fields(client = "api", operation = "docker_action"))]
    pub async fn docker_action(&self, id: &str, action: ContainerAction) -> anyhow::Result<()> {
        let url = self.endpoint(&["api", "docker", id, "action"])?;
        self.http
            .post(url)
            .query(&[("action", action.as_str())])
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
