//! Process supervisor.
//!
//! Owns the lifecycle of both protocol adapters: a single first-of-N wait
//! across OS signals and the adapters' fatal-error channels, then a
//! coordinated shutdown. The first trigger wins and both adapters are shut
//! down regardless of which one fired; each gets a bounded grace period for
//! in-flight work before its task is aborted. Shutdown problems are logged,
//! never escalated, so one adapter can never block the other's exit.

use anyhow::anyhow;
use std::time::Duration;
use tokio::{
    signal,
    sync::{oneshot, watch},
    task::JoinHandle,
    time::timeout,
};
use tracing::{error, info};

pub const DEFAULT_GRACE_TIMEOUT: Duration = Duration::from_secs(10);

/// What woke the supervisor up.
#[derive(Debug)]
pub enum Trigger {
    Interrupt,
    HttpError(anyhow::Error),
    RpcError(anyhow::Error),
}

/// A running adapter as seen by the supervisor: its task plus the oneshot
/// carrying at most one fatal error.
pub struct Adapter {
    name: &'static str,
    task: JoinHandle<()>,
    error: oneshot::Receiver<anyhow::Error>,
}

impl Adapter {
    #[must_use]
    pub fn new(
        name: &'static str,
        task: JoinHandle<()>,
        error: oneshot::Receiver<anyhow::Error>,
    ) -> Self {
        Self { name, task, error }
    }
}

/// Supervise both adapters until the first terminating signal, then drive
/// both shutdowns to completion.
pub async fn run(shutdown: watch::Sender<bool>, http: Adapter, rpc: Adapter, grace: Duration) {
    let mut http = http;
    let mut rpc = rpc;

    match wait_for_trigger(&mut http.error, &mut rpc.error).await {
        Trigger::Interrupt => info!("Received shutdown signal"),
        Trigger::HttpError(err) => error!("HTTP server failed: {err}"),
        Trigger::RpcError(err) => error!("RPC server failed: {err}"),
    }

    // First signal wins: both adapters stop no matter which one fired.
    let _ = shutdown.send(true);

    tokio::join!(
        shutdown_adapter(http, grace),
        shutdown_adapter(rpc, grace)
    );
}

/// Block on the first of: interrupt/terminate signal, HTTP fatal error,
/// RPC fatal error.
async fn wait_for_trigger(
    http_error: &mut oneshot::Receiver<anyhow::Error>,
    rpc_error: &mut oneshot::Receiver<anyhow::Error>,
) -> Trigger {
    tokio::select! {
        () = interrupt() => Trigger::Interrupt,
        result = http_error => Trigger::HttpError(task_error(result)),
        result = rpc_error => Trigger::RpcError(task_error(result)),
    }
}

fn task_error(result: Result<anyhow::Error, oneshot::error::RecvError>) -> anyhow::Error {
    // A dropped sender means the serve task ended without reporting; treat
    // that as a fatal error too, the accept loop is gone either way.
    result.unwrap_or_else(|_| anyhow!("server task ended unexpectedly"))
}

async fn interrupt() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("Failed to install interrupt handler: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                error!("Failed to install SIGTERM handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

async fn shutdown_adapter(adapter: Adapter, grace: Duration) {
    let Adapter { name, task, .. } = adapter;
    let abort = task.abort_handle();

    match timeout(grace, task).await {
        Ok(Ok(())) => info!("{name} server stopped"),
        Ok(Err(err)) => error!("{name} server task failed during shutdown: {err}"),
        Err(_) => {
            // Grace period elapsed; force the listener and its connections
            // closed.
            abort.abort();
            error!("{name} server did not stop within {grace:?}, aborting");
        }
    }
}
