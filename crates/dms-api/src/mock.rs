//! Mock gateway for testing.
//!
//! A programmable [`Communication`] that replays queued outcomes in order
//! and records every request it receives, so tests can assert the exact
//! wire traffic a domain operation produced.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::communication::Communication;
use crate::error::Error;
use crate::messages::{Request, Response};

/// A queued outcome for the next request.
#[derive(Debug)]
pub enum MockOutcome {
    /// Return these responses.
    Responses(Vec<Response>),
    /// Fail with this error.
    Error(Error),
}

struct MockInner {
    outcomes: VecDeque<MockOutcome>,
    requests: Vec<Request>,
}

/// Scriptable in-memory gateway.
///
/// Cheap to clone; clones share the same queue and request log.
///
/// ```rust
/// use dms_api::mock::MockCommunication;
/// use dms_api::{Response, messages::BuildInfo};
///
/// let mock = MockCommunication::new();
/// mock.queue_response(Response::BuildInfo(BuildInfo {
///     agent_id: 400,
///     version: "10.2.0.0-12345".into(),
/// }));
/// mock.queue_not_found();
/// assert_eq!(mock.pending(), 2);
/// ```
#[derive(Clone)]
pub struct MockCommunication {
    inner: Arc<Mutex<MockInner>>,
}

impl Default for MockCommunication {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCommunication {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockInner {
                outcomes: VecDeque::new(),
                requests: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a single response for the next request.
    pub fn queue_response(&self, response: Response) {
        self.queue_responses(vec![response]);
    }

    /// Queue a batch of responses for the next request.
    pub fn queue_responses(&self, responses: Vec<Response>) {
        self.lock()
            .outcomes
            .push_back(MockOutcome::Responses(responses));
    }

    /// Queue an empty reply (the remote side returned nothing).
    pub fn queue_empty(&self) {
        self.queue_responses(Vec::new());
    }

    /// Queue an error for the next request.
    pub fn queue_error(&self, error: Error) {
        self.lock().outcomes.push_back(MockOutcome::Error(error));
    }

    /// Queue the remote "not found" error.
    pub fn queue_not_found(&self) {
        self.queue_error(Error::not_found("entity is unavailable"));
    }

    /// Every request received so far, oldest first.
    pub fn requests(&self) -> Vec<Request> {
        self.lock().requests.clone()
    }

    /// Number of requests received so far.
    pub fn request_count(&self) -> usize {
        self.lock().requests.len()
    }

    /// The most recent request, if any.
    pub fn last_request(&self) -> Option<Request> {
        self.lock().requests.last().cloned()
    }

    /// Clear recorded requests.
    pub fn clear_requests(&self) {
        self.lock().requests.clear();
    }

    /// Outcomes still waiting to be consumed.
    pub fn pending(&self) -> usize {
        self.lock().outcomes.len()
    }
}

#[async_trait]
impl Communication for MockCommunication {
    async fn send_message(&self, request: Request) -> Result<Vec<Response>, Error> {
        let mut inner = self.lock();
        let name = request.name();
        inner.requests.push(request);
        match inner.outcomes.pop_front() {
            Some(MockOutcome::Responses(responses)) => Ok(responses),
            Some(MockOutcome::Error(error)) => Err(error),
            None => Err(Error::NoResponse { request: name }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_in_order_and_records() {
        let mock = MockCommunication::new();
        mock.queue_response(Response::Ack);
        mock.queue_not_found();

        let first = mock.send_message(Request::GetViews).await.unwrap();
        assert_eq!(first, vec![Response::Ack]);

        let second = mock.send_message(Request::GetProtocols).await;
        assert!(second.unwrap_err().is_not_found());

        assert_eq!(mock.request_count(), 2);
        assert_eq!(mock.last_request(), Some(Request::GetProtocols));
    }

    #[tokio::test]
    async fn exhausted_queue_reports_no_response() {
        let mock = MockCommunication::new();
        let err = mock.send_message(Request::GetViews).await.unwrap_err();
        assert!(matches!(err, Error::NoResponse { request: "GetViews" }));
    }
}
