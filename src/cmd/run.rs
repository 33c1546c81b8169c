//! `studio-operator run` — host adapter feeding events to the driver.
//!
//! Reads newline-delimited JSON [`Event`]s from stdin or a file and hands
//! them to the [`Driver`] one at a time. Events the driver defers are
//! delivered again, in order, before the next new event, which is the
//! redelivery contract the driver relies on. One JSON [`Outcome`] line is
//! written to stdout per dispatch.

use std::collections::VecDeque;
use std::future::Future;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::cli::RunArgs;
use crate::config;
use crate::driver::{Driver, Event, Outcome, UnitContext};
use crate::error::OperatorError;
use crate::logging;
use crate::state::RelationStore;
use crate::workload::local::LocalSupervisor;
use crate::workload::pebble::PebbleClient;
use crate::workload::{Supervisor, WorkloadController, CONTAINER_NAME};

pub async fn execute(args: RunArgs) -> Result<(), OperatorError> {
    let log_format = logging::resolve_format(args.pretty, args.json);
    logging::init(&args.log_level, log_format);

    #[cfg(feature = "sentry-integration")]
    let _sentry_guard = args
        .sentry_dsn
        .as_ref()
        .map(|dsn| crate::sentry_integration::init(dsn, args.sentry_environment.as_deref()));

    let options = config::load_or_default(args.config.as_deref()).await?;

    let store = match args.state_file {
        Some(ref path) => RelationStore::open(path)?,
        None => {
            tracing::warn!("no state file given, relation data will not survive a restart");
            RelationStore::in_memory()
        }
    };

    let supervisor: Box<dyn Supervisor> = match (args.container_root, args.pebble_socket) {
        (Some(root), _) => Box::new(LocalSupervisor::new(root)),
        (None, Some(socket)) => Box::new(PebbleClient::new(socket)),
        (None, None) => Box::new(PebbleClient::for_container(CONTAINER_NAME)),
    };

    let unit = UnitContext {
        app_name: args.app_name,
        unit_address: args.unit_address,
    };

    tracing::info!(
        app = %unit.app_name,
        supervisor = supervisor.name(),
        "studio operator started"
    );

    let mut driver = Driver::new(options, unit, store, WorkloadController::new(supervisor));

    let pending = match args.events {
        Some(ref path) => {
            let file = tokio::fs::File::open(path).await?;
            dispatch_stream(
                &mut driver,
                BufReader::new(file),
                tokio::io::stdout(),
                shutdown_signal(),
            )
            .await?
        }
        None => {
            dispatch_stream(
                &mut driver,
                BufReader::new(tokio::io::stdin()),
                tokio::io::stdout(),
                shutdown_signal(),
            )
            .await?
        }
    };

    if pending > 0 {
        tracing::warn!(pending, "input ended with events still deferred");
    }
    tracing::info!(status = %driver.status(), "studio operator stopped");
    Ok(())
}

/// Dispatch every event read from `reader`, writing outcomes to `writer`.
/// Blank lines and lines starting with `#` are skipped; unparsable lines
/// are logged and skipped. At most one change per relation id is held
/// back: a newer change or a departure replaces it. Returns the number of events still deferred
/// when the input ends or `shutdown` resolves.
pub async fn dispatch_stream<R, W>(
    driver: &mut Driver,
    reader: R,
    mut writer: W,
    shutdown: impl Future<Output = ()>,
) -> Result<usize, OperatorError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut deferred: VecDeque<Event> = VecDeque::new();
    let mut line_no = 0usize;
    tokio::pin!(shutdown);

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            () = &mut shutdown => {
                tracing::debug!("event loop shutting down");
                break;
            }
        };
        let Some(line) = line else {
            break;
        };
        line_no += 1;

        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let event: Event = match serde_json::from_str(trimmed) {
            Ok(event) => event,
            Err(source) => {
                let err = OperatorError::EventParse {
                    line: line_no,
                    source,
                };
                tracing::error!(error = %err, "skipping event");
                continue;
            }
        };

        // Newer data or a departure for the same relation supersedes a
        // deferred change.
        if matches!(event, Event::RelationChanged { .. } | Event::RelationBroken { .. }) {
            let key = event.relation_key();
            let before = deferred.len();
            deferred.retain(|pending| pending.relation_key() != key);
            if deferred.len() < before {
                tracing::debug!(relation = ?key, "dropped superseded deferred event");
            }
        }

        // Deferred events go first, in the order they were deferred.
        let batch: Vec<Event> = deferred.drain(..).chain(std::iter::once(event)).collect();
        for event in batch {
            let outcome = driver.handle(event.clone()).await;
            if outcome.deferred {
                deferred.push_back(event);
            }
            write_outcome(&mut writer, &outcome).await?;
        }
    }

    Ok(deferred.len())
}

async fn write_outcome<W: AsyncWrite + Unpin>(
    writer: &mut W,
    outcome: &Outcome,
) -> Result<(), OperatorError> {
    let mut line = serde_json::to_vec(outcome)?;
    line.push(b'\n');
    writer.write_all(&line).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}
