//! The query interaction controller.
//!
//! [`QueryController`] owns the question text and the [`InteractionState`],
//! issues at most one query at a time, and folds the outcome back into state.
//!
//! # Lifecycle
//!
//! ```text
//!            begin(q)                    resolve(Ok)
//!   Idle ──────────────▶ Loading ─────────────────────▶ Succeeded
//!     ▲                   │   ▲                               │
//!     │                   │   └──────── begin(q) ─────────────┤
//!     │                   │ resolve(Err)                      │
//!     │                   ▼                                   │
//!     └── clear() ──── Failed ◀───────────────────────────────┘
//! ```
//!
//! `begin` is the synchronous half of a submission: it validates the
//! question, flips the state to `Loading` and hands back a [`PendingQuery`]
//! ticket. The ticket is move-only and is consumed by [`QueryController::resolve`],
//! so each accepted submission settles exactly once. While a ticket is
//! outstanding `begin` returns `None`, which is the single-flight rule.
//!
//! [`QueryController::submit`] does both halves around the service call and
//! guards the await: if its future is dropped mid-call, the ticket resolves
//! as [`QueryError::Interrupted`].

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::client::AnswerService;
use crate::error::QueryError;
use crate::models::{QueryRequest, QueryResult};

/// What the presentation layer sees. Exactly one variant is active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum InteractionState {
    Idle,
    Loading,
    Succeeded(QueryResult),
    Failed { message: String },
}

impl InteractionState {
    pub fn result(&self) -> Option<&QueryResult> {
        match self {
            InteractionState::Succeeded(result) => Some(result),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            InteractionState::Failed { message } => Some(message),
            _ => None,
        }
    }
}

/// Ticket for the one in-flight request.
#[derive(Debug)]
#[must_use = "a pending query must be resolved or the controller stays loading"]
pub struct PendingQuery {
    id: u64,
    request: QueryRequest,
}

impl PendingQuery {
    pub fn request(&self) -> &QueryRequest {
        &self.request
    }
}

pub struct QueryController<S: AnswerService + ?Sized = dyn AnswerService> {
    service: Arc<S>,
    query: String,
    state: InteractionState,
    in_flight: Option<u64>,
    next_id: u64,
}

impl<S: AnswerService + ?Sized> QueryController<S> {
    pub fn new(service: Arc<S>) -> Self {
        Self {
            service,
            query: String::new(),
            state: InteractionState::Idle,
            in_flight: None,
            next_id: 1,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn service(&self) -> Arc<S> {
        Arc::clone(&self.service)
    }

    /// Record an input change. The text survives every state transition.
    pub fn set_query(&mut self, text: impl Into<String>) {
        self.query = text.into();
    }

    /// Drop any shown result or error and return to the call-to-action.
    ///
    /// Ignored while loading.
    pub fn clear(&mut self) {
        if !self.is_loading() {
            self.state = InteractionState::Idle;
        }
    }

    /// Validate and start a submission.
    ///
    /// Returns `None` without touching state when the trimmed question is
    /// empty or a request is already in flight.
    pub fn begin(&mut self, question: &str) -> Option<PendingQuery> {
        let question = question.trim();
        if question.is_empty() {
            return None;
        }
        if let Some(id) = self.in_flight {
            debug!(in_flight = id, "submission rejected: request already in flight");
            return None;
        }

        let id = self.next_id;
        self.next_id += 1;
        self.in_flight = Some(id);
        self.state = InteractionState::Loading;

        debug!(id, "query started");
        Some(PendingQuery {
            id,
            request: QueryRequest::new(question),
        })
    }

    /// Settle the in-flight request.
    ///
    /// Returns `false` (and changes nothing) if `pending` is not the ticket
    /// this controller is waiting on.
    pub fn resolve(&mut self, pending: PendingQuery, outcome: Result<QueryResult, QueryError>) -> bool {
        if self.in_flight != Some(pending.id) {
            warn!(id = pending.id, "ignoring outcome for a request that is not in flight");
            return false;
        }
        self.in_flight = None;

        self.state = match outcome {
            Ok(result) => {
                info!(id = pending.id, sources = result.sources.len(), "query answered");
                InteractionState::Succeeded(result)
            }
            Err(err) => {
                warn!(id = pending.id, error = %err, "query failed");
                InteractionState::Failed {
                    message: err.user_message(),
                }
            }
        };
        true
    }

    /// Submit `question`, await the service, and resolve.
    ///
    /// Returns whether the submission was accepted. Rejected submissions
    /// issue no request.
    pub async fn submit(&mut self, question: &str) -> bool {
        let Some(pending) = self.begin(question) else {
            return false;
        };
        let service = Arc::clone(&self.service);
        let request = pending.request().clone();

        let mut guard = ResolveGuard {
            controller: self,
            pending: Some(pending),
        };
        let outcome = service.query(&request).await;
        guard.settle(outcome);
        true
    }

    /// Submit the current query text.
    pub async fn submit_query(&mut self) -> bool {
        let question = self.query.clone();
        self.submit(&question).await
    }
}

/// Resolves the held ticket as interrupted if it is dropped unsettled.
struct ResolveGuard<'a, S: AnswerService + ?Sized> {
    controller: &'a mut QueryController<S>,
    pending: Option<PendingQuery>,
}

impl<S: AnswerService + ?Sized> ResolveGuard<'_, S> {
    fn settle(&mut self, outcome: Result<QueryResult, QueryError>) {
        if let Some(pending) = self.pending.take() {
            self.controller.resolve(pending, outcome);
        }
    }
}

impl<S: AnswerService + ?Sized> Drop for ResolveGuard<'_, S> {
    fn drop(&mut self) {
        self.settle(Err(QueryError::Interrupted));
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::Source;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned outcomes and records every request it receives.
    #[derive(Default)]
    pub(crate) struct ScriptedService {
        pub outcomes: Mutex<VecDeque<Result<QueryResult, QueryError>>>,
        pub requests: Mutex<Vec<QueryRequest>>,
    }

    impl ScriptedService {
        pub fn with(outcomes: Vec<Result<QueryResult, QueryError>>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(outcomes.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        pub fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl AnswerService for ScriptedService {
        async fn query(&self, request: &QueryRequest) -> Result<QueryResult, QueryError> {
            self.requests.lock().unwrap().push(request.clone());
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(QueryError::Transport("no scripted outcome".into())))
        }
    }

    /// Never completes; used to hold a submission in flight.
    struct StalledService;

    #[async_trait]
    impl AnswerService for StalledService {
        async fn query(&self, _request: &QueryRequest) -> Result<QueryResult, QueryError> {
            std::future::pending().await
        }
    }

    pub(crate) fn refund_result() -> QueryResult {
        QueryResult {
            answer: "Refunds are available within 30 days.".to_string(),
            sources: vec![Source {
                document_name: "policy.pdf".to_string(),
                chunk_id: "c1".to_string(),
                text_content: "...".to_string(),
                document_type: "pdf".to_string(),
                page_number: Some(2),
            }],
        }
    }

    #[test]
    fn starts_idle_with_empty_query() {
        let controller = QueryController::new(ScriptedService::with(vec![]));
        assert_eq!(controller.state(), &InteractionState::Idle);
        assert_eq!(controller.query(), "");
        assert!(!controller.is_loading());
    }

    #[test]
    fn blank_question_is_a_noop() {
        let service = ScriptedService::with(vec![]);
        let mut controller = QueryController::new(service.clone());
        for q in ["", "   ", "\t\n"] {
            assert!(controller.begin(q).is_none());
            assert_eq!(controller.state(), &InteractionState::Idle);
        }
        assert_eq!(service.request_count(), 0);
    }

    #[test]
    fn begin_is_synchronous_and_trims() {
        let mut controller = QueryController::new(ScriptedService::with(vec![]));
        let pending = controller.begin("  What is the refund policy?  ").unwrap();
        assert_eq!(controller.state(), &InteractionState::Loading);
        assert_eq!(pending.request().question, "What is the refund policy?");
        assert_eq!(pending.request().top_k, 5);
        assert!(controller.resolve(pending, Ok(refund_result())));
    }

    #[test]
    fn second_begin_while_loading_is_rejected() {
        let mut controller = QueryController::new(ScriptedService::with(vec![]));
        let first = controller.begin("first").unwrap();
        assert!(controller.begin("second").is_none());
        assert_eq!(controller.state(), &InteractionState::Loading);

        assert!(controller.resolve(first, Ok(refund_result())));
        assert!(!controller.is_loading());
        assert!(controller.begin("third").is_some());
    }

    #[test]
    fn foreign_ticket_is_ignored() {
        let mut a = QueryController::new(ScriptedService::with(vec![]));
        let mut b = QueryController::new(ScriptedService::with(vec![]));
        let ticket_a = a.begin("a").unwrap();
        let ticket_b = b.begin("b").unwrap();
        // Both controllers hand out id 1; resolve the wrong one after b settles.
        assert!(b.resolve(ticket_b, Ok(refund_result())));
        assert!(!b.resolve(ticket_a, Err(QueryError::Timeout)));
        assert_eq!(b.state().result(), Some(&refund_result()));
    }

    #[test]
    fn failure_then_success_replaces_error() {
        let mut controller = QueryController::new(ScriptedService::with(vec![]));
        let p = controller.begin("q").unwrap();
        controller.resolve(
            p,
            Err(QueryError::Remote {
                status: 500,
                detail: Some("index unavailable".into()),
            }),
        );
        assert_eq!(controller.state().error_message(), Some("Error: index unavailable"));

        let p = controller.begin("q").unwrap();
        assert_eq!(controller.state(), &InteractionState::Loading);
        controller.resolve(p, Ok(refund_result()));
        assert!(controller.state().error_message().is_none());
        assert!(controller.state().result().is_some());
    }

    #[test]
    fn query_text_persists_across_transitions() {
        let mut controller = QueryController::new(ScriptedService::with(vec![]));
        controller.set_query("What is the refund policy?");
        let p = controller.begin("What is the refund policy?").unwrap();
        controller.resolve(p, Err(QueryError::Timeout));
        assert_eq!(controller.query(), "What is the refund policy?");
    }

    #[test]
    fn clear_returns_to_idle_but_not_while_loading() {
        let mut controller = QueryController::new(ScriptedService::with(vec![]));
        let p = controller.begin("q").unwrap();
        controller.clear();
        assert_eq!(controller.state(), &InteractionState::Loading);
        controller.resolve(p, Err(QueryError::Timeout));
        controller.clear();
        assert_eq!(controller.state(), &InteractionState::Idle);
    }

    #[tokio::test]
    async fn submit_success() {
        let service = ScriptedService::with(vec![Ok(refund_result())]);
        let mut controller = QueryController::new(service.clone());
        assert!(controller.submit("What is the refund policy?").await);
        assert_eq!(controller.state(), &InteractionState::Succeeded(refund_result()));
        assert_eq!(service.request_count(), 1);
    }

    #[tokio::test]
    async fn submit_transport_failure_clears_loading() {
        let service = ScriptedService::with(vec![Err(QueryError::Transport(
            "connection refused".into(),
        ))]);
        let mut controller = QueryController::new(service);
        assert!(controller.submit("q").await);
        assert!(!controller.is_loading());
        assert_eq!(
            controller.state().error_message(),
            Some("Query failed: connection refused")
        );
    }

    #[tokio::test]
    async fn submit_blank_issues_nothing() {
        let service = ScriptedService::with(vec![Ok(refund_result())]);
        let mut controller = QueryController::new(service.clone());
        controller.set_query("   ");
        assert!(!controller.submit_query().await);
        assert_eq!(controller.state(), &InteractionState::Idle);
        assert_eq!(service.request_count(), 0);
    }

    #[tokio::test]
    async fn dropped_submit_does_not_stay_loading() {
        let service: Arc<dyn AnswerService> = Arc::new(StalledService);
        let mut controller = QueryController::new(service);
        let timed_out = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            controller.submit("stuck?"),
        )
        .await;
        assert!(timed_out.is_err());
        assert!(!controller.is_loading());
        assert_eq!(
            controller.state().error_message(),
            Some("Query failed: request interrupted before completion")
        );
    }

    #[test]
    fn state_serializes_with_tag() {
        let json = serde_json::to_value(InteractionState::Failed {
            message: "Error: x".into(),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"state": "failed", "message": "Error: x"}));

        let json = serde_json::to_value(InteractionState::Succeeded(refund_result())).unwrap();
        assert_eq!(json["state"], "succeeded");
        assert_eq!(json["sources"][0]["document_name"], "policy.pdf");
    }
}
