//! Filterer stage: evaluates the filter predicate for every record of a
//! package and records the per-record verdicts.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;

use crate::package::{Completion, Package};
use crate::preparer::panic_message;
use crate::state::Shared;

/// Filter one package.
///
/// A panic while evaluating is caught and reported as
/// [`Completion::Failed`]; the package then carries no verdicts.
pub fn process(mut package: Package, shared: &Shared) -> Completion {
    let snapshot = shared.snapshot();
    if package.version != snapshot.version {
        return Completion::Discarded(package);
    }

    let evaluated = panic::catch_unwind(AssertUnwindSafe(|| {
        let mut results = HashMap::with_capacity(package.records.len());
        let (mut has_match, mut has_text_match) = (false, false);
        for record in &package.records {
            let verdict = snapshot.settings.evaluate(record);
            results.insert(record.id(), verdict.accepted);
            has_match |= verdict.accepted;
            has_text_match |= verdict.by_text;
        }
        (results, has_match, has_text_match)
    }));

    match evaluated {
        Ok((results, has_match, has_text_match)) => {
            package.filter_results = results;
            package.has_match = has_match;
            package.has_text_match = has_text_match;
            Completion::Filtered(package)
        }
        Err(payload) => {
            tracing::error!(
                version = package.version,
                records = package.len(),
                reason = panic_message(payload.as_ref()),
                "Filter evaluation panicked"
            );
            Completion::Failed(package)
        }
    }
}

/// Run the filterer until cancelled or until its input closes.
pub(crate) async fn run(
    shared: Arc<Shared>,
    mut rx: UnboundedReceiver<Package>,
    completion_tx: UnboundedSender<Completion>,
    cancel: CancellationToken,
) {
    tracing::debug!("Filterer started");

    loop {
        let package = tokio::select! {
            _ = cancel.cancelled() => break,
            package = rx.recv() => match package {
                Some(package) => package,
                None => break,
            },
        };

        let shared = Arc::clone(&shared);
        let task = tokio::task::spawn_blocking(move || process(package, &shared));
        let completion = match task.await {
            Ok(completion) => completion,
            Err(e) => {
                tracing::error!(error = %e, "Filterer task failed; package lost");
                continue;
            }
        };

        if completion_tx.send(completion).is_err() {
            tracing::warn!("Completion channel closed");
            break;
        }
    }

    tracing::debug!("Filterer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{catalog, set_settings};
    use assert_matches::assert_matches;
    use vista_core::RecordId;
    use vista_filter::{FilterSettings, GroupFilterSettings, RatingFilter, TextFilter};

    fn open() -> FilterSettings {
        FilterSettings {
            group: GroupFilterSettings::all_open(),
            ..Default::default()
        }
    }

    #[test]
    fn records_a_verdict_per_record() {
        let shared = Shared::new();
        let mut settings = open();
        settings.content.text = TextFilter::new("img_00002");
        set_settings(&shared, settings);

        let package = Package::new(catalog(3).records(), 1);
        let package = assert_matches!(process(package, &shared), Completion::Filtered(p) => p);

        assert_eq!(package.filter_results.len(), 3);
        assert!(package.filter_results[&RecordId::new(2)]);
        assert!(!package.filter_results[&RecordId::new(1)]);
        assert!(package.has_match);
        assert!(package.has_text_match);
    }

    #[test]
    fn text_match_without_acceptance() {
        let shared = Shared::new();
        let mut settings = open();
        settings.content.text = TextFilter::new("img");
        settings.content.rating = Some(RatingFilter::at_least(5));
        set_settings(&shared, settings);

        let package = Package::new(catalog(2).records(), 1);
        let package = assert_matches!(process(package, &shared), Completion::Filtered(p) => p);
        assert!(!package.has_match);
        assert!(package.has_text_match);
    }

    #[test]
    fn inactive_text_filter_never_sets_text_flag() {
        let shared = Shared::new();
        set_settings(&shared, open());

        let package = Package::new(catalog(2).records(), 1);
        let package = assert_matches!(process(package, &shared), Completion::Filtered(p) => p);
        assert!(package.has_match);
        assert!(!package.has_text_match);
    }

    #[test]
    fn stale_package_is_discarded() {
        let shared = Shared::new();
        let package = Package::new(catalog(2).records(), 7);
        let package = assert_matches!(process(package, &shared), Completion::Discarded(p) => p);
        assert!(package.filter_results.is_empty());
    }
}
