//! Preparer stage: loads the attributes the current filter will read.
//!
//! Loading is the slow part of the pipeline, so the version is checked again
//! after every step and a package that has been overtaken is handed back to
//! the coordinator untouched by the remaining steps.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;
use vista_core::Record;

use crate::package::{Completion, Package, Prepared};
use crate::state::Shared;

/// Prepare one package.
///
/// A panic in a record load or a hook is caught and reported as
/// [`Prepared::Failed`] so the package still makes it back to the
/// coordinator.
pub fn process(package: Package, shared: &Shared) -> Prepared {
    match panic::catch_unwind(AssertUnwindSafe(|| load(&package, shared))) {
        Ok(true) => Prepared::Ready(package),
        Ok(false) => Prepared::Discarded(package),
        Err(payload) => {
            tracing::error!(
                version = package.version,
                records = package.len(),
                reason = panic_message(payload.as_ref()),
                "Preparation panicked"
            );
            Prepared::Failed(package)
        }
    }
}

/// Run every needed step. Returns `false` once the package is overtaken.
fn load(package: &Package, shared: &Shared) -> bool {
    let snapshot = shared.snapshot();
    if package.version != snapshot.version {
        return false;
    }

    let settings = &snapshot.settings;
    let steps: [(&str, bool, fn(&Record)); 4] = [
        ("info", true, |r: &Record| {
            r.info();
        }),
        ("comments", settings.needs_comments(), |r: &Record| {
            r.comment();
        }),
        ("tags", settings.needs_tags(), |r: &Record| {
            r.tags();
        }),
        ("grouping", settings.needs_grouping(), |r: &Record| {
            r.grouping();
        }),
    ];

    for (step, needed, load_one) in steps {
        if !needed {
            continue;
        }
        package.records.iter().for_each(load_one);
        if shared.is_stale(package.version) {
            tracing::trace!(version = package.version, step, "Package overtaken while preparing");
            return false;
        }
    }

    for hook in snapshot.hooks.iter() {
        hook.prepare(&package.records);
        if shared.is_stale(package.version) {
            tracing::trace!(version = package.version, "Package overtaken in prepare hook");
            return false;
        }
    }

    true
}

/// Best-effort text of a caught panic.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown")
}

/// Run the preparer until cancelled or until its input closes.
pub(crate) async fn run(
    shared: Arc<Shared>,
    mut rx: UnboundedReceiver<Package>,
    filter_tx: UnboundedSender<Package>,
    completion_tx: UnboundedSender<Completion>,
    cancel: CancellationToken,
) {
    tracing::debug!("Preparer started");

    loop {
        let package = tokio::select! {
            _ = cancel.cancelled() => break,
            package = rx.recv() => match package {
                Some(package) => package,
                None => break,
            },
        };

        let shared = Arc::clone(&shared);
        let prepared = match tokio::task::spawn_blocking(move || process(package, &shared)).await {
            Ok(prepared) => prepared,
            Err(e) => {
                tracing::error!(error = %e, "Preparer task failed; package lost");
                continue;
            }
        };

        let sent = match prepared {
            Prepared::Ready(package) => filter_tx.send(package).is_ok(),
            Prepared::Discarded(package) => {
                completion_tx.send(Completion::Discarded(package)).is_ok()
            }
            Prepared::Failed(package) => completion_tx.send(Completion::Failed(package)).is_ok(),
        };
        if !sent {
            tracing::warn!("Preparer output channel closed");
            break;
        }
    }

    tracing::debug!("Preparer stopped");
}
