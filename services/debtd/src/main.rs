use std::{
    future,
    net::SocketAddr,
    sync::{Arc, RwLock},
    time::Duration,
};

use admin_ipc::{run_server, AdminRequest, AdminResponse, DaemonStatus, DEFAULT_SOCKET_PATH};
use clap::Parser;
use counter::{Counter, Tick};
use metrics::MetricsHandle;
use tokio::task;
use tokio::time;
use tracing::{info, warn, Level};
use treasury::TreasuryClient;
use uuid::Uuid;

#[derive(Parser, Debug)]
struct Args {
    #[arg(long, env = "ADMIN_SOCKET", default_value = DEFAULT_SOCKET_PATH)]
    admin_socket: String,

    #[arg(long, env = "METRICS_ADDR", default_value = "127.0.0.1:9109")]
    metrics_addr: SocketAddr,
}

fn log_startup(args: &Args, run_id: &str) {
    info!(socket = %args.admin_socket, "admin socket bind planned");
    info!(addr = %args.metrics_addr, "metrics bind planned");
    info!(url = treasury::DEBT_OUTSTANDING_URL, "debt endpoint configured");
    info!(%run_id, "run initialized");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let run_id = Uuid::new_v4().to_string();
    log_startup(&args, &run_id);

    let debt_counter = Counter::new();
    let record_date: Arc<RwLock<Option<String>>> = Arc::new(RwLock::new(None));

    let run_id_clone = run_id.clone();
    let counter_clone = debt_counter.clone();
    let date_clone = record_date.clone();
    let socket_path = args.admin_socket.clone();
    task::spawn(async move {
        let handler = move |req: AdminRequest| -> anyhow::Result<AdminResponse> {
            match req {
                AdminRequest::Status => {
                    let debt = counter_clone.current();
                    let phase = if debt.is_some() { "counting" } else { "loading" };
                    Ok(AdminResponse::Status(DaemonStatus {
                        run_id: run_id_clone.clone(),
                        phase: phase.to_string(),
                        debt,
                        record_date: date_clone.read().ok().and_then(|guard| guard.clone()),
                    }))
                }
            }
        };
        if let Err(err) = run_server(&socket_path, handler).await {
            tracing::error!(error = ?err, "admin ipc server failed");
        }
    });

    let metrics = MetricsHandle::new()?;
    let metrics_addr = args.metrics_addr;
    let metrics_task = metrics.clone();
    task::spawn(async move {
        if let Err(err) = metrics_task.serve(metrics_addr).await {
            tracing::error!(error = ?err, "metrics server error");
        }
    });

    info!(
        run_id = %run_id,
        admin_socket = %args.admin_socket,
        metrics_addr = %args.metrics_addr,
        "ready"
    );

    // One fetch at startup, no retries. On failure the daemon stays up in
    // the loading phase indefinitely.
    let client = TreasuryClient::new();
    match client.fetch().await {
        Ok(snapshot) => {
            info!(
                amount = snapshot.amount(),
                record_date = ?snapshot.record_date(),
                "debt snapshot fetched"
            );
            if let Ok(mut guard) = record_date.write() {
                *guard = snapshot.record_date().map(str::to_owned);
            }
            debt_counter.seed(snapshot.amount());
            metrics.debt_gauge().set(snapshot.amount());

            let tick_counter = metrics.tick_counter();
            let debt_gauge = metrics.debt_gauge();
            let ticking = debt_counter.clone();
            task::spawn(async move {
                let mut ticker = time::interval(Duration::from_secs(1));
                // an interval's first tick completes immediately; the first
                // increment belongs one full second after the seed
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    ticking.apply(Tick);
                    tick_counter.inc();
                    if let Some(value) = ticking.current() {
                        debt_gauge.set(value);
                    }
                }
            });
        }
        Err(err) => {
            metrics.fetch_failure_counter().inc();
            warn!(error = %err, "debt fetch failed; staying in loading state");
        }
    }

    // keep running
    future::pending::<()>().await;
    Ok(())
}
