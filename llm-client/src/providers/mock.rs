//! Mock LLM provider for testing
//!
//! Answers from a fixed reply, a failure, a script of replies, or a
//! closure over the request. Every request is recorded for inspection.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::{LlmError, Result};
use crate::provider::{LlmProvider, LlmRequest, LlmResponse};

type Handler = Box<dyn Fn(&LlmRequest) -> Result<String> + Send + Sync>;

enum Behavior {
    Reply(String),
    Fail(LlmError),
    Script(Mutex<VecDeque<Result<String>>>),
    Handler(Handler),
}

pub struct MockProvider {
    behavior: Behavior,
    requests: Mutex<Vec<LlmRequest>>,
    name: &'static str,
}

impl MockProvider {
    fn with_behavior(behavior: Behavior) -> Self {
        Self {
            behavior,
            requests: Mutex::new(Vec::new()),
            name: "mock",
        }
    }

    pub fn always_succeeds(response: &str) -> Self {
        Self::with_behavior(Behavior::Reply(response.to_string()))
    }

    pub fn always_fails(error: LlmError) -> Self {
        Self::with_behavior(Behavior::Fail(error))
    }

    /// Return the scripted results in order; calls past the end fail.
    pub fn scripted(responses: Vec<Result<String>>) -> Self {
        Self::with_behavior(Behavior::Script(Mutex::new(responses.into())))
    }

    /// Compute each reply from the request
    pub fn from_fn<F>(handler: F) -> Self
    where
        F: Fn(&LlmRequest) -> Result<String> + Send + Sync + 'static,
    {
        Self::with_behavior(Behavior::Handler(Box::new(handler)))
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// Requests received so far, oldest first
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse> {
        let content = match &self.behavior {
            Behavior::Reply(reply) => Ok(reply.clone()),
            Behavior::Fail(err) => Err(clone_error(err)),
            Behavior::Script(queue) => queue
                .lock()
                .ok()
                .and_then(|mut q| q.pop_front())
                .unwrap_or_else(|| {
                    Err(LlmError::ApiError {
                        message: "mock script exhausted".to_string(),
                        status_code: None,
                    })
                }),
            Behavior::Handler(handler) => handler(&request),
        };

        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }

        Ok(LlmResponse {
            content: content?,
            model: "mock-model".to_string(),
            usage: None,
        })
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// LlmError is not Clone; rebuild it variant by variant.
fn clone_error(err: &LlmError) -> LlmError {
    match err {
        LlmError::ServerOverloaded { message } => LlmError::ServerOverloaded {
            message: message.clone(),
        },
        LlmError::MissingApiKey { provider, env_var } => LlmError::MissingApiKey {
            provider: provider.clone(),
            env_var: env_var.clone(),
        },
        LlmError::RateLimited { retry_after } => LlmError::RateLimited {
            retry_after: *retry_after,
        },
        LlmError::ApiError {
            message,
            status_code,
        } => LlmError::ApiError {
            message: message.clone(),
            status_code: *status_code,
        },
        LlmError::ConfigError(s) => LlmError::ConfigError(s.clone()),
        LlmError::InvalidPreset(s) => LlmError::InvalidPreset(s.clone()),
        LlmError::Io(_) => LlmError::ConfigError("IO error (mock)".to_string()),
        LlmError::TomlParse(_) => LlmError::ConfigError("TOML parse error (mock)".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_always_succeeds() {
        let provider = MockProvider::always_succeeds("success");
        let result = provider.complete(LlmRequest::new("test", "system")).await;
        assert_eq!(result.unwrap().content, "success");
        assert_eq!(provider.call_count(), 1);
        assert_eq!(provider.requests()[0].prompt, "test");
    }

    #[tokio::test]
    async fn test_always_fails() {
        let provider = MockProvider::always_fails(LlmError::ServerOverloaded {
            message: "overloaded".to_string(),
        });
        for _ in 0..3 {
            let result = provider.complete(LlmRequest::new("test", "system")).await;
            assert!(matches!(result, Err(LlmError::ServerOverloaded { .. })));
        }
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn test_scripted_then_exhausted() {
        let provider = MockProvider::scripted(vec![
            Err(LlmError::RateLimited { retry_after: None }),
            Ok("second".to_string()),
        ]);
        let request = LlmRequest::new("p", "s");

        assert!(provider.complete(request.clone()).await.is_err());
        assert_eq!(provider.complete(request.clone()).await.unwrap().content, "second");
        assert!(matches!(
            provider.complete(request).await,
            Err(LlmError::ApiError { .. })
        ));
    }

    #[tokio::test]
    async fn test_from_fn_sees_request() {
        let provider = MockProvider::from_fn(|req| Ok(req.prompt.to_uppercase()));
        let reply = provider.complete(LlmRequest::new("abc", "s")).await.unwrap();
        assert_eq!(reply.content, "ABC");
    }
}
