//! [`FilterModel`]: a [`Coordinator`] wired to running worker tasks.

use std::ops::Deref;
use std::sync::{Arc, Weak};

use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio_util::sync::CancellationToken;
use vista_core::config::PipelineConfig;

use crate::coordinator::{Coordinator, Dispatcher};
use crate::package::Completion;
use crate::{filterer, preparer};

/// Filter model backed by three tokio tasks: the preparer, the filterer and
/// the collector that merges finished packages.
///
/// Every coordinator operation is available through `Deref`. Dropping the
/// model stops the tasks.
pub struct FilterModel {
    coordinator: Arc<Coordinator>,
    cancel: CancellationToken,
}

impl FilterModel {
    /// Build the model and spawn its workers.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn new(config: PipelineConfig) -> Self {
        let (prepare_tx, prepare_rx) = mpsc::unbounded_channel();
        let (filter_tx, filter_rx) = mpsc::unbounded_channel();
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();

        let coordinator = Arc::new(Coordinator::new(
            config,
            Dispatcher::new(prepare_tx, filter_tx.clone()),
        ));
        let cancel = CancellationToken::new();

        tokio::spawn(preparer::run(
            coordinator.shared(),
            prepare_rx,
            filter_tx,
            completion_tx.clone(),
            cancel.clone(),
        ));
        tokio::spawn(filterer::run(
            coordinator.shared(),
            filter_rx,
            completion_tx,
            cancel.clone(),
        ));
        tokio::spawn(collect(
            Arc::downgrade(&coordinator),
            completion_rx,
            cancel.clone(),
        ));

        tracing::debug!(
            chunk_size = config.chunk_size_for(false),
            prepare_chunk_size = config.chunk_size_for(true),
            "Filter model started"
        );

        Self {
            coordinator,
            cancel,
        }
    }

    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.coordinator
    }

    /// Stop the worker tasks. Packages still queued are abandoned and
    /// anyone waiting for the model to settle is released.
    pub fn shutdown(&self) {
        self.cancel.cancel();
        self.coordinator.close();
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Deref for FilterModel {
    type Target = Coordinator;

    fn deref(&self) -> &Coordinator {
        &self.coordinator
    }
}

impl Drop for FilterModel {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Hand finished packages back to the coordinator.
async fn collect(
    coordinator: Weak<Coordinator>,
    mut rx: UnboundedReceiver<Completion>,
    cancel: CancellationToken,
) {
    loop {
        let completion = tokio::select! {
            _ = cancel.cancelled() => break,
            completion = rx.recv() => match completion {
                Some(completion) => completion,
                None => break,
            },
        };

        let Some(coordinator) = coordinator.upgrade() else {
            break;
        };
        coordinator.finish(completion);
    }

    tracing::debug!("Collector stopped");
}
