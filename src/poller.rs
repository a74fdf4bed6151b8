// Periodic HTTP pulls. Independent of each other and of the push channel's cadence.
// Results are sent into the event loop as tagged messages; failures are logged and the
// next tick simply tries again.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, MissedTickBehavior, interval, interval_at};
use tracing::{debug, warn};

use crate::aggregator::Message;
use crate::api_client::ApiClient;

/// Startup pull of /api/system and /api/docker, fetched concurrently. Returns whatever
/// succeeded; the push channel is opened only after this completes.
pub async fn warm_pull(api: &ApiClient) -> Vec<Message> {
    let (system, docker) = tokio::join!(api.fetch_system(), api.fetch_docker());
    let mut out = Vec::with_capacity(2);
    match system {
        Ok(snapshot) => out.push(Message::SystemSnapshot(snapshot)),
        Err(e) => warn!(error = %e, operation = "fetch_system", "system pull failed"),
    }
    match docker {
        Ok(containers) => out.push(Message::DockerSnapshot(containers)),
        Err(e) => warn!(error = %e, operation = "fetch_docker", "docker pull failed"),
    }
    out
}

/// Remote-agent directory refresh: first pull immediately, then every `period`.
pub fn spawn_directory_poller<T>(api: ApiClient, period: Duration, tx: mpsc::Sender<T>) -> JoinHandle<()>
where
    T: From<Message> + Send + 'static,
{
    tokio::spawn(async move {
        let mut tick = interval(period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tick.tick().await;
            match api.fetch_clients().await {
                Ok(clients) => {
                    debug!(clients = clients.len(), "directory refreshed");
                    if tx.send(T::from(Message::Directory(clients))).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(error = %e, operation = "fetch_clients", "directory pull failed");
                }
            }
        }
        debug!("directory poller stopped");
    })
}

/// Fallback re-pull of system + docker every `period`, first tick one period out
/// (the warm pull already covered t=0).
pub fn spawn_snapshot_poller<T>(api: ApiClient, period: Duration, tx: mpsc::Sender<T>) -> JoinHandle<()>
where
    T: From<Message> + Send + 'static,
{
    tokio::spawn(async move {
        let mut tick = interval_at(Instant::now() + period, period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tick.tick().await;
            for message in warm_pull(&api).await {
                if tx.send(T::from(message)).await.is_err() {
                    debug!("snapshot poller stopped");
                    return;
                }
            }
        }
    })
}
