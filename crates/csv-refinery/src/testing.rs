//! Test-only scripted LLM provider.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;

use crate::error::{Error, Result};
use crate::providers::{BatchRequest, LlmProvider};

/// Owned copy of a request the fake received
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub rules: String,
    pub prompt: String,
    pub csv: String,
    pub want_header: bool,
}

enum Behavior {
    /// Return the payload unchanged, header included even when not wanted
    Echo,
    /// Uppercase the payload and drop the header when not wanted
    EchoUppercase,
    /// Pop one prepared answer per call
    Scripted(Mutex<VecDeque<Result<String>>>),
    /// Fail every call
    Failing(Box<dyn Fn() -> Error + Send + Sync>),
}

pub struct FakeLlm {
    behavior: Behavior,
    calls: Mutex<Vec<RecordedRequest>>,
}

impl FakeLlm {
    fn with(behavior: Behavior) -> Self {
        Self {
            behavior,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn echo() -> Self {
        Self::with(Behavior::Echo)
    }

    pub fn echo_uppercase() -> Self {
        Self::with(Behavior::EchoUppercase)
    }

    pub fn scripted(answers: Vec<Result<String>>) -> Self {
        Self::with(Behavior::Scripted(Mutex::new(answers.into())))
    }

    pub fn failing(make_error: impl Fn() -> Error + Send + Sync + 'static) -> Self {
        Self::with(Behavior::Failing(Box::new(make_error)))
    }

    pub fn calls(&self) -> Vec<RecordedRequest> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl LlmProvider for FakeLlm {
    async fn generate(&self, request: &BatchRequest<'_>) -> Result<String> {
        self.calls.lock().push(RecordedRequest {
            rules: request.rules.to_string(),
            prompt: request.prompt.to_string(),
            csv: request.csv.to_string(),
            want_header: request.want_header,
        });

        match &self.behavior {
            Behavior::Echo => Ok(request.csv.to_string()),
            Behavior::EchoUppercase => {
                let upper = request.csv.to_uppercase();
                if request.want_header {
                    Ok(upper)
                } else {
                    Ok(upper.lines().skip(1).collect::<Vec<_>>().join("\n"))
                }
            }
            Behavior::Scripted(answers) => answers
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(Error::internal("fake script exhausted"))),
            Behavior::Failing(make_error) => Err(make_error()),
        }
    }

    fn name(&self) -> &str {
        "fake"
    }

    fn model(&self) -> &str {
        "scripted"
    }
}
