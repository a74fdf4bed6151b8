// The engine's single control flow. One task owns DashboardState, the ConnectionManager
// and the SourceSelector; pollers, the socket driver and the retry timer only send events
// into its queue. No locks: every mutation happens between two `recv`s of this loop.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::aggregator::{Applied, DashboardState, Message, Source};
use crate::api_client::ApiClient;
use crate::config::AppConfig;
use crate::connection::{
    self, ConnectionManager, ConnectionSignal, ConnectionState, Effect, Generation,
    ReconnectPolicy, RetryTimer, SocketEvent, SocketHandle,
};
use crate::history::TimeSeriesStore;
use crate::models::{ContainerAction, DockerContainer, MetricSnapshot, RemoteClient};
use crate::poller;
use crate::protocol;
use crate::selector::{DisplayTarget, SourceSelector};

/// Capacity of the event queue shared by all producers.
const EVENT_QUEUE_CAPACITY: usize = 256;

/// Events applied back-to-back before one view is published.
const MAX_EVENT_BATCH: usize = 64;

#[derive(Debug)]
pub enum Event {
    Pulled(Message),
    Socket {
        generation: Generation,
        event: SocketEvent,
    },
    RetryDue {
        generation: Generation,
    },
}

impl From<Message> for Event {
    fn from(message: Message) -> Self {
        Event::Pulled(message)
    }
}

impl From<(Generation, SocketEvent)> for Event {
    fn from((generation, event): (Generation, SocketEvent)) -> Self {
        Event::Socket { generation, event }
    }
}

#[derive(Debug)]
enum Command {
    Select {
        target: DisplayTarget,
        reply: oneshot::Sender<anyhow::Result<()>>,
    },
    Reconnect,
    Shutdown,
}

/// Immutable picture of the engine after one step, published latest-wins.
#[derive(Debug, Clone)]
pub struct DashboardView {
    pub connection: ConnectionState,
    pub connected: bool,
    /// True until there is something to show or the push channel settled (open or given up).
    pub loading: bool,
    pub ws_clients: Option<u32>,
    pub last_updated: Option<DateTime<Utc>>,
    pub target: DisplayTarget,
    pub is_local: bool,
    /// Snapshot to render; falls back to the local one while a remote agent has none.
    pub display: Option<MetricSnapshot>,
    pub client: Option<RemoteClient>,
    pub containers: Arc<[DockerContainer]>,
    pub clients: Arc<[RemoteClient]>,
    /// Shared with earlier views until the next system snapshot lands.
    pub series: Arc<TimeSeriesStore>,
}

impl DashboardView {
    fn initial(window: usize) -> Self {
        Self {
            connection: ConnectionState::Idle,
            connected: false,
            loading: true,
            ws_clients: None,
            last_updated: None,
            target: DisplayTarget::Local,
            is_local: true,
            display: None,
            client: None,
            containers: Vec::new().into(),
            clients: Vec::new().into(),
            series: Arc::new(TimeSeriesStore::new(window)),
        }
    }
}

/// Last published copies of the bulky view parts; dropped when a message touches them.
#[derive(Default)]
struct ViewCache {
    series: Option<Arc<TimeSeriesStore>>,
    containers: Option<Arc<[DockerContainer]>>,
    clients: Option<Arc<[RemoteClient]>>,
}

impl ViewCache {
    fn invalidate(&mut self, message: &Message) {
        match message {
            Message::SystemSnapshot(_) => self.series = None,
            Message::DockerSnapshot(_) => self.containers = None,
            Message::ClientPatch { .. } | Message::Directory(_) => self.clients = None,
        }
    }
}

pub struct Engine {
    api: ApiClient,
    push_url: Url,
    connect_timeout: Duration,
    directory_interval: Duration,
    snapshot_interval: Option<Duration>,

    state: DashboardState,
    connection: ConnectionManager,
    selector: SourceSelector,
    loading: bool,
    cache: ViewCache,

    retry_timer: RetryTimer,
    socket: Option<SocketHandle>,
    pollers: Vec<JoinHandle<()>>,

    events_tx: mpsc::Sender<Event>,
    events_rx: mpsc::Receiver<Event>,
    commands_rx: mpsc::Receiver<Command>,
    view_tx: watch::Sender<Arc<DashboardView>>,
}

/// Caller side of a running engine. Dropping it tears the engine down.
pub struct EngineHandle {
    commands: mpsc::Sender<Command>,
    view_rx: watch::Receiver<Arc<DashboardView>>,
    api: ApiClient,
    task: JoinHandle<()>,
}

impl Engine {
    /// Validate config, build the engine and run it on a new task.
    pub fn spawn(config: &AppConfig) -> anyhow::Result<EngineHandle> {
        config.validate()?;
        let base = config.base_url()?;
        let api = ApiClient::new(
            base.clone(),
            Duration::from_millis(config.polling.request_timeout_ms),
        )?;
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let (commands_tx, commands_rx) = mpsc::channel(16);
        let window = config.history.window_size;
        let (view_tx, view_rx) = watch::channel(Arc::new(DashboardView::initial(window)));

        let engine = Engine {
            api: api.clone(),
            push_url: connection::push_url(&base)?,
            connect_timeout: Duration::from_millis(config.connection.connect_timeout_ms),
            directory_interval: Duration::from_millis(config.polling.directory_interval_ms),
            snapshot_interval: (config.polling.snapshot_interval_ms > 0)
                .then(|| Duration::from_millis(config.polling.snapshot_interval_ms)),
            state: DashboardState::new(window),
            connection: ConnectionManager::new(ReconnectPolicy::from_config(&config.connection)),
            selector: SourceSelector::new(),
            loading: true,
            cache: ViewCache::default(),
            retry_timer: RetryTimer::new(),
            socket: None,
            pollers: Vec::new(),
            events_tx,
            events_rx,
            commands_rx,
            view_tx,
        };
        let task = tokio::spawn(engine.run());
        Ok(EngineHandle {
            commands: commands_tx,
            view_rx,
            api,
            task,
        })
    }

    async fn run(mut self) {
        info!(base = %self.api.base_url(), push = %self.push_url, "engine starting");

        // Shutdown must not wait for a slow startup pull
        let api = self.api.clone();
        let warm = async move { poller::warm_pull(&api).await };
        tokio::pin!(warm);
        let pulled = loop {
            tokio::select! {
                messages = &mut warm => break messages,
                command = self.commands_rx.recv() => match command {
                    Some(Command::Reconnect) => {
                        debug!("reconnect before startup finished ignored");
                    }
                    other => {
                        if !self.on_command(other) {
                            self.teardown().await;
                            return;
                        }
                    }
                },
            }
        };
        for message in pulled {
            self.apply(message, Source::Pull);
        }
        self.loading = self.state.local_snapshot().is_none();
        self.publish();

        self.pollers.push(poller::spawn_directory_poller(
            self.api.clone(),
            self.directory_interval,
            self.events_tx.clone(),
        ));
        if let Some(period) = self.snapshot_interval {
            self.pollers.push(poller::spawn_snapshot_poller(
                self.api.clone(),
                period,
                self.events_tx.clone(),
            ));
        }

        let effects = self.connection.connect();
        self.execute(effects);
        self.publish();

        loop {
            tokio::select! {
                command = self.commands_rx.recv() => {
                    if !self.on_command(command) {
                        break;
                    }
                }
                Some(event) = self.events_rx.recv() => {
                    let mut changed = self.handle(event);
                    for _ in 1..MAX_EVENT_BATCH {
                        match self.events_rx.try_recv() {
                            Ok(event) => changed |= self.handle(event),
                            Err(_) => break,
                        }
                    }
                    if changed {
                        self.publish();
                    }
                }
            }
        }

        self.teardown().await;
    }

    /// Returns false once the engine should stop.
    fn on_command(&mut self, command: Option<Command>) -> bool {
        match command {
            Some(Command::Select { target, reply }) => {
                let result = if SourceSelector::can_select(&self.state, &target) {
                    debug!(?target, "display target selected");
                    self.selector.select(target);
                    self.publish();
                    Ok(())
                } else {
                    warn!(?target, "display target is offline or unknown");
                    Err(anyhow::anyhow!("{:?} is offline or unknown", target))
                };
                let _ = reply.send(result);
                true
            }
            Some(Command::Reconnect) => {
                let effects = self.connection.connect();
                self.execute(effects);
                self.publish();
                true
            }
            Some(Command::Shutdown) | None => false,
        }
    }

    fn apply(&mut self, message: Message, source: Source) -> bool {
        self.cache.invalidate(&message);
        self.state.apply(message, source) == Applied::Updated
    }

    /// One event; returns whether anything observable changed.
    fn handle(&mut self, event: Event) -> bool {
        match event {
            Event::Pulled(message) => self.apply(message, Source::Pull),
            Event::Socket { generation, event } => self.handle_socket(generation, event),
            Event::RetryDue { generation } => {
                let effects = self.connection.on_retry_due(generation);
                let changed = !effects.is_empty();
                self.execute(effects);
                changed
            }
        }
    }

    fn handle_socket(&mut self, generation: Generation, event: SocketEvent) -> bool {
        match event {
            SocketEvent::Opened => {
                let effects = self.connection.on_open(generation);
                let changed = !effects.is_empty();
                self.execute(effects);
                changed
            }
            SocketEvent::Frame(text) => {
                if !self.connection.accepts_frame(generation) {
                    debug!(%generation, "frame from stale socket ignored");
                    return false;
                }
                match protocol::decode_frame(&text) {
                    Ok(message) => self.apply(message, Source::Push),
                    Err(e) => {
                        warn!(error = %e, operation = "decode_frame", "dropping push frame");
                        false
                    }
                }
            }
            SocketEvent::Closed(reason) => {
                if self
                    .socket
                    .as_ref()
                    .is_some_and(|s| s.generation() == generation)
                {
                    self.socket = None;
                }
                let effects = self.connection.on_closed(generation);
                if !effects.is_empty() {
                    debug!(%generation, %reason, "push channel lost");
                }
                let changed = !effects.is_empty();
                self.execute(effects);
                changed
            }
        }
    }

    fn execute(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::OpenChannel { generation } => {
                    if let Some(old) = self.socket.take() {
                        old.close();
                    }
                    debug!(%generation, url = %self.push_url, "opening push channel");
                    self.socket = Some(connection::socket::spawn(
                        self.push_url.clone(),
                        generation,
                        self.connect_timeout,
                        self.events_tx.clone(),
                    ));
                }
                Effect::ScheduleRetry { generation, delay } => {
                    info!(
                        attempt = self.connection.attempts(),
                        max_attempts = self.connection.policy().max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "push channel reconnect scheduled"
                    );
                    self.retry_timer.schedule(
                        generation,
                        delay,
                        self.events_tx.clone(),
                        Event::RetryDue { generation },
                    );
                }
                Effect::CancelRetry => {
                    if self.retry_timer.cancel() {
                        debug!("pending reconnect cancelled");
                    }
                }
                Effect::CloseChannel => {
                    if let Some(socket) = self.socket.take() {
                        socket.close();
                    }
                }
                Effect::Notify(signal) => match signal {
                    ConnectionSignal::Connected => {
                        self.loading = false;
                        info!("push channel connected");
                    }
                    ConnectionSignal::Disconnected => {
                        warn!("push channel disconnected");
                    }
                    ConnectionSignal::GivenUp => {
                        self.loading = false;
                        error!(
                            max_attempts = self.connection.policy().max_attempts,
                            "push channel gave up reconnecting"
                        );
                    }
                },
            }
        }
    }

    async fn teardown(&mut self) {
        let effects = self.connection.teardown();
        let closing = self.socket.take();
        self.execute(effects);
        for poller in self.pollers.drain(..) {
            poller.abort();
        }
        self.publish();
        if let Some(socket) = closing {
            let task = socket.close();
            if tokio::time::timeout(Duration::from_secs(1), task).await.is_err() {
                debug!("push channel did not close within 1s");
            }
        }
        info!("engine stopped");
    }

    fn publish(&mut self) {
        let state = &self.state;
        let series = self
            .cache
            .series
            .get_or_insert_with(|| Arc::new(state.store().clone()))
            .clone();
        let containers = self
            .cache
            .containers
            .get_or_insert_with(|| state.containers().into())
            .clone();
        let clients = self
            .cache
            .clients
            .get_or_insert_with(|| state.clients().into())
            .clone();
        let resolved = self.selector.resolve(&self.state);
        let view = DashboardView {
            connection: self.connection.state(),
            connected: self.connection.is_open(),
            loading: self.loading,
            ws_clients: self.state.ws_clients(),
            last_updated: self.state.last_updated(),
            target: self.selector.target().clone(),
            is_local: resolved.is_local,
            display: self.selector.display_snapshot(&self.state).cloned(),
            client: resolved.client.cloned(),
            containers,
            clients,
            series,
        };
        self.view_tx.send_replace(Arc::new(view));
    }
}

impl EngineHandle {
    /// Receiver of the latest published view.
    pub fn subscribe(&self) -> watch::Receiver<Arc<DashboardView>> {
        self.view_rx.clone()
    }

    pub fn view(&self) -> Arc<DashboardView> {
        self.view_rx.borrow().clone()
    }

    /// Switch the displayed host. Offline or unknown agents are rejected.
    pub async fn select(&self, target: DisplayTarget) -> anyhow::Result<()> {
        let (reply, result) = oneshot::channel();
        self.send(Command::Select { target, reply }).await?;
        result
            .await
            .map_err(|_| anyhow::anyhow!("engine is not running"))?
    }

    /// Manual reconnect, e.g. after the push channel gave up.
    pub async fn reconnect(&self) -> anyhow::Result<()> {
        self.send(Command::Reconnect).await
    }

    /// Fire-and-forget container action; failures are only logged.
    pub fn docker_action(&self, id: impl Into<String>, action: ContainerAction) -> JoinHandle<()> {
        let api = self.api.clone();
        let id = id.into();
        tokio::spawn(async move {
            if let Err(e) = api.docker_action(&id, action).await {
                warn!(error = %e, container = %id, %action, "docker action failed");
            }
        })
    }

    /// Tear down (cancel retry, close socket, stop pollers) and wait for the loop to exit.
    pub async fn shutdown(self) -> anyhow::Result<()> {
        let _ = self.commands.send(Command::Shutdown).await;
        self.task.await?;
        Ok(())
    }

    async fn send(&self, command: Command) -> anyhow::Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| anyhow::anyhow!("engine is not running"))
    }
}
