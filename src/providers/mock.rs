/*!
 * Mock backend implementations for testing.
 *
 * This module provides deterministic backends that simulate different behaviors:
 * - `MockBackend::uppercase()` - Always succeeds, uppercasing the text
 * - `MockBackend::failing_on(marker)` - Fails for requests containing a marker
 * - `MockBackend::failing()` - Always fails with an error
 * - `MockBackend::rate_limited(n)` - Refuses the first n requests as rate limited
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::errors::BackendError;
use crate::translation::backend::{TranslationBackend, TranslationRequest};

/// Behavior mode for the mock backend
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Uppercases the text; placeholder tokens have no letters and survive
    Uppercase,
    /// Returns the text unchanged
    Echo,
    /// Fails every request whose text contains the marker, uppercases the rest
    FailingOn { marker: &'static str },
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Always fails with an error
    Failing,
    /// Reports rate limiting for the first `until` requests, then uppercases
    RateLimited { until: usize },
    /// Returns empty response
    Empty,
    /// Removes placeholder tokens from the answer
    DropPlaceholders,
    /// Simulates slow response (for timeout and cancellation testing)
    Slow { delay_ms: u64 },
}

/// Mock backend for testing translation behavior
#[derive(Debug)]
pub struct MockBackend {
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter for intermittent failures
    request_count: Arc<AtomicUsize>,
    /// Every request received, in arrival order
    requests: Arc<Mutex<Vec<TranslationRequest>>>,
    /// Custom response generator (optional)
    custom_response: Option<fn(&TranslationRequest) -> String>,
}

impl MockBackend {
    /// Create a new mock backend with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
            custom_response: None,
        }
    }

    pub fn uppercase() -> Self {
        Self::new(MockBehavior::Uppercase)
    }

    pub fn echo() -> Self {
        Self::new(MockBehavior::Echo)
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    pub fn failing_on(marker: &'static str) -> Self {
        Self::new(MockBehavior::FailingOn { marker })
    }

    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent {
            fail_every: fail_every.max(1),
        })
    }

    pub fn rate_limited(until: usize) -> Self {
        Self::new(MockBehavior::RateLimited { until })
    }

    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Set a custom response generator, used instead of uppercasing
    pub fn with_custom_response(mut self, generator: fn(&TranslationRequest) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Number of requests received so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Copy of the requests received so far
    pub fn requests(&self) -> Vec<TranslationRequest> {
        self.requests.lock().clone()
    }

    fn respond(&self, request: &TranslationRequest) -> String {
        match self.custom_response {
            Some(generator) => generator(request),
            None => request.text.to_uppercase(),
        }
    }
}

impl Clone for MockBackend {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior,
            request_count: Arc::clone(&self.request_count),
            requests: Arc::clone(&self.requests),
            custom_response: self.custom_response,
        }
    }
}

#[async_trait]
impl TranslationBackend for MockBackend {
    async fn translate(&self, request: &TranslationRequest) -> Result<String, BackendError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());

        match self.behavior {
            MockBehavior::Uppercase => Ok(self.respond(request)),

            MockBehavior::Echo => Ok(request.text.clone()),

            MockBehavior::FailingOn { marker } => {
                if request.text.contains(marker) {
                    Err(BackendError::RequestFailed(format!(
                        "Simulated failure for text containing {:?}",
                        marker
                    )))
                } else {
                    Ok(self.respond(request))
                }
            }

            MockBehavior::Intermittent { fail_every } => {
                if count % fail_every == fail_every - 1 {
                    Err(BackendError::RequestFailed(format!(
                        "Simulated intermittent failure (request #{})",
                        count + 1
                    )))
                } else {
                    Ok(self.respond(request))
                }
            }

            MockBehavior::Failing => Err(BackendError::RequestFailed(
                "Simulated backend failure".to_string(),
            )),

            MockBehavior::RateLimited { until } => {
                if count < until {
                    Err(BackendError::RateLimited(format!(
                        "Simulated rate limit (request #{})",
                        count + 1
                    )))
                } else {
                    Ok(self.respond(request))
                }
            }

            MockBehavior::Empty => Ok(String::new()),

            MockBehavior::DropPlaceholders => {
                let mut text = self.respond(request);
                while let (Some(start), Some(end)) = (text.find('⟦'), text.find('⟧')) {
                    if end < start {
                        break;
                    }
                    text.replace_range(start..end + '⟧'.len_utf8(), "");
                }
                Ok(text)
            }

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
                Ok(self.respond(request))
            }
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
