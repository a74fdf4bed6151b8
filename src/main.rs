use anyhow::Result;
use dashsync::engine::{DashboardView, Engine};
use dashsync::history::{Direction, SeriesKey};
use dashsync::*;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

/// One INFO line summarizing what a dashboard would currently render.
fn log_view(view: &DashboardView) {
    let Some(snapshot) = view.display.as_ref() else {
        tracing::info!(
            connection = ?view.connection,
            loading = view.loading,
            clients = view.clients.len(),
            "waiting for first snapshot"
        );
        return;
    };
    let cpu = snapshot.cpu.as_ref().map(|c| c.percent).unwrap_or_default();
    let memory = view.series.latest(&SeriesKey::Memory).unwrap_or_default();
    let (up, down) = view
        .series
        .network_interfaces()
        .into_iter()
        .fold((0.0, 0.0), |(up, down), name| {
            (
                up + view
                    .series
                    .latest(&SeriesKey::network(name, Direction::Up))
                    .unwrap_or_default(),
                down + view
                    .series
                    .latest(&SeriesKey::network(name, Direction::Down))
                    .unwrap_or_default(),
            )
        });
    let running = view.containers.iter().filter(|c| c.state.is_running()).count();
    tracing::info!(
        host = %snapshot.hostname,
        local = view.is_local,
        connection = ?view.connection,
        cpu_percent = %format!("{:.1}", cpu),
        mem_percent = %format!("{:.1}", memory),
        net_up = %format!("{:.0}", up),
        net_down = %format!("{:.0}", down),
        containers = view.containers.len(),
        running,
        clients = view.clients.len(),
        ws_clients = ?view.ws_clients,
        "dashboard"
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;
    tracing::info!(
        "{} starting, syncing from {}",
        version::user_agent(),
        app_config.server.base_url
    );

    let engine = Engine::spawn(&app_config)?;
    let mut view_rx = engine.subscribe();
    let mut status = tokio::time::interval(Duration::from_secs(
        app_config.display.status_log_interval_secs,
    ));
    status.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let shutdown = async {
        #[cfg(unix)]
        {
            let mut sigterm = match tokio::signal::unix::signal(
                tokio::signal::unix::SignalKind::terminate(),
            ) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
        }
    };
    tokio::pin!(shutdown);

    let mut last_connection = view_rx.borrow().connection;
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("Received shutdown signal");
                break;
            }
            _ = status.tick() => log_view(&view_rx.borrow()),
            changed = view_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let connection = view_rx.borrow_and_update().connection;
                if connection != last_connection {
                    tracing::info!(from = ?last_connection, to = ?connection, "connection state changed");
                    last_connection = connection;
                }
            }
        }
    }

    engine.shutdown().await?;
    Ok(())
}
