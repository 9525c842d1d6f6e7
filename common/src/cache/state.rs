use std::{fmt, str::FromStr, sync::Arc};

use state_machines::state_machine;
use tracing::{info, warn};

use crate::error::AppError;

use super::{keys, store::CacheStore};

const PROCESSING: &str = "PROCESSING";
const DONE: &str = "DONE";
const FAILED_PREFIX: &str = "FAILED:";

/// Ingestion status of one document. Absence of a state means "unknown".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestionState {
    Processing,
    Done,
    Failed { reason: String },
}

impl IngestionState {
    pub fn as_label(&self) -> &'static str {
        match self {
            IngestionState::Processing => PROCESSING,
            IngestionState::Done => DONE,
            IngestionState::Failed { .. } => "FAILED",
        }
    }
}

impl fmt::Display for IngestionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestionState::Failed { reason } => write!(f, "{FAILED_PREFIX}{reason}"),
            other => f.write_str(other.as_label()),
        }
    }
}

impl FromStr for IngestionState {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            PROCESSING => Ok(IngestionState::Processing),
            DONE => Ok(IngestionState::Done),
            other => other
                .strip_prefix(FAILED_PREFIX)
                .map(|reason| IngestionState::Failed {
                    reason: reason.to_string(),
                })
                .ok_or_else(|| {
                    AppError::Validation(format!("Unrecognized ingestion state: {other}"))
                }),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum StateTransition {
    Start,
    Complete,
    Fail,
}

impl StateTransition {
    fn as_str(self) -> &'static str {
        match self {
            StateTransition::Start => "start",
            StateTransition::Complete => "complete",
            StateTransition::Fail => "fail",
        }
    }
}

mod lifecycle {
    use super::state_machine;

    state_machine! {
        name: DocumentLifecycleMachine,
        initial: Unknown,
        states: [Unknown, Processing, Done, Failed],
        events {
            start {
                transition: { from: Unknown, to: Processing }
            }
            complete {
                transition: { from: Processing, to: Done }
            }
            fail {
                transition: { from: Processing, to: Failed }
            }
        }
    }

    pub(super) fn unknown() -> DocumentLifecycleMachine<(), Unknown> {
        DocumentLifecycleMachine::new(())
    }
}

fn invalid_transition(current: Option<&IngestionState>, event: StateTransition) -> AppError {
    AppError::Validation(format!(
        "Invalid ingestion transition: {} -> {}",
        current.map_or("UNKNOWN", IngestionState::as_label),
        event.as_str()
    ))
}

fn compute_next_state(
    current: Option<&IngestionState>,
    event: StateTransition,
    reason: Option<&str>,
) -> Result<IngestionState, AppError> {
    use lifecycle::unknown;

    let invalid = || invalid_transition(current, event);
    match (current, event) {
        (None, StateTransition::Start) => unknown()
            .start()
            .map(|_| IngestionState::Processing)
            .map_err(|_| invalid()),
        (Some(IngestionState::Processing), StateTransition::Complete) => unknown()
            .start()
            .map_err(|_| invalid())?
            .complete()
            .map(|_| IngestionState::Done)
            .map_err(|_| invalid()),
        (Some(IngestionState::Processing), StateTransition::Fail) => unknown()
            .start()
            .map_err(|_| invalid())?
            .fail()
            .map(|_| IngestionState::Failed {
                reason: reason.unwrap_or_default().to_string(),
            })
            .map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

/// Persists and validates per-document ingestion status.
///
/// State writes are never best-effort: a store failure is returned to the caller.
#[derive(Clone)]
pub struct PipelineStateTracker {
    store: Arc<dyn CacheStore>,
}

impl PipelineStateTracker {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    pub async fn get_state(&self, document_id: &str) -> Result<Option<IngestionState>, AppError> {
        self.store
            .get(&keys::ingestion_state(document_id))
            .await?
            .map(|raw| raw.parse())
            .transpose()
    }

    pub async fn mark_processing(&self, document_id: &str) -> Result<(), AppError> {
        self.transition(document_id, StateTransition::Start, None)
            .await
    }

    pub async fn mark_done(&self, document_id: &str) -> Result<(), AppError> {
        self.transition(document_id, StateTransition::Complete, None)
            .await
    }

    pub async fn mark_failed(&self, document_id: &str, reason: &str) -> Result<(), AppError> {
        self.transition(document_id, StateTransition::Fail, Some(reason))
            .await
    }

    async fn transition(
        &self,
        document_id: &str,
        event: StateTransition,
        reason: Option<&str>,
    ) -> Result<(), AppError> {
        let current = self.get_state(document_id).await?;
        let next = compute_next_state(current.as_ref(), event, reason).inspect_err(|err| {
            warn!(document_id, error = %err, "Rejected ingestion state transition");
        })?;

        self.store
            .set_forever(&keys::ingestion_state(document_id), &next.to_string())
            .await?;
        info!(document_id, state = next.as_label(), "Ingestion state updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::memory_store::InMemoryCacheStore;

    fn tracker() -> (Arc<InMemoryCacheStore>, PipelineStateTracker) {
        let store = Arc::new(InMemoryCacheStore::new());
        let tracker = PipelineStateTracker::new(store.clone());
        (store, tracker)
    }

    #[test]
    fn state_values_round_trip_through_wire_format() {
        let failed = IngestionState::Failed {
            reason: "extract: no text: page 2".into(),
        };
        assert_eq!(failed.to_string(), "FAILED:extract: no text: page 2");
        assert_eq!(
            "FAILED:extract: no text: page 2"
                .parse::<IngestionState>()
                .expect("parses"),
            failed
        );
        assert_eq!("DONE".parse::<IngestionState>().expect("parses"), IngestionState::Done);
        assert!("WAITING".parse::<IngestionState>().is_err());
    }

    #[tokio::test]
    async fn processing_then_done() {
        let (store, tracker) = tracker();
        assert_eq!(tracker.get_state("doc-1").await.expect("state"), None);

        tracker.mark_processing("doc-1").await.expect("processing");
        assert_eq!(
            store.get("ingest:doc-1").await.expect("get").as_deref(),
            Some("PROCESSING")
        );

        tracker.mark_done("doc-1").await.expect("done");
        assert_eq!(
            tracker.get_state("doc-1").await.expect("state"),
            Some(IngestionState::Done)
        );
    }

    #[tokio::test]
    async fn terminal_states_reject_further_transitions() {
        let (_, tracker) = tracker();
        tracker.mark_processing("doc-1").await.expect("processing");
        tracker
            .mark_failed("doc-1", "embedding service down")
            .await
            .expect("failed");

        assert!(matches!(
            tracker.mark_done("doc-1").await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            tracker.mark_processing("doc-1").await,
            Err(AppError::Validation(_))
        ));
        assert_eq!(
            tracker.get_state("doc-1").await.expect("state"),
            Some(IngestionState::Failed {
                reason: "embedding service down".into()
            })
        );
    }

    #[tokio::test]
    async fn done_requires_processing() {
        let (_, tracker) = tracker();
        assert!(tracker.mark_done("doc-unknown").await.is_err());
        assert_eq!(tracker.get_state("doc-unknown").await.expect("state"), None);
    }

    #[tokio::test]
    async fn store_outage_is_loud() {
        let (store, tracker) = tracker();
        store.set_unavailable(true);
        assert!(matches!(
            tracker.get_state("doc-1").await,
            Err(AppError::Store(_))
        ));
        assert!(tracker.mark_processing("doc-1").await.is_err());
    }
}
