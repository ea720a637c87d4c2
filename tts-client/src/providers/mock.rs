//! Mock synthesizer for testing
//!
//! Echoes the request text back as the "audio" bytes so callers can tell which
//! chunk a response belongs to. Can simulate failures and hold responses until
//! the test releases them.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::error::{Result, SynthesisError};
use crate::provider::{SpeechSynthesizer, SynthesisRequest, SynthesizedAudio};

/// A mock synthesizer for exercising playback sequencing and failure paths
pub struct MockSynthesizer {
    /// Zero-based call numbers that fail
    fail_on: HashSet<usize>,
    /// Fail every call regardless of `fail_on`
    always_fail: bool,
    /// Current call count
    call_count: AtomicUsize,
    /// Text of every request, in arrival order
    requests: Mutex<Vec<String>>,
    /// When set, each call waits for a permit before answering
    gate: Option<Semaphore>,
    /// Artificial latency per call
    delay: Option<Duration>,
}

impl MockSynthesizer {
    /// Create a synthesizer that always succeeds
    pub fn always_succeeds() -> Self {
        Self {
            fail_on: HashSet::new(),
            always_fail: false,
            call_count: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            gate: None,
            delay: None,
        }
    }

    /// Create a synthesizer that always fails with HTTP 500
    pub fn always_fails() -> Self {
        Self {
            always_fail: true,
            ..Self::always_succeeds()
        }
    }

    /// Create a synthesizer that fails on the given zero-based call numbers
    pub fn fails_on_calls(calls: &[usize]) -> Self {
        Self {
            fail_on: calls.iter().copied().collect(),
            ..Self::always_succeeds()
        }
    }

    /// Hold every response until [`MockSynthesizer::release`] grants a permit
    pub fn gated(mut self) -> Self {
        self.gate = Some(Semaphore::new(0));
        self
    }

    /// Sleep this long before answering each call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Let `n` held calls answer
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    /// Get the number of times synthesize() was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Texts received so far, in order
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    async fn synthesize(&self, request: SynthesisRequest) -> Result<SynthesizedAudio> {
        let call_num = self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.text.clone());
        }

        if let Some(gate) = &self.gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|e| SynthesisError::Request(e.to_string()))?;
            permit.forget();
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.always_fail || self.fail_on.contains(&call_num) {
            return Err(SynthesisError::Status { status_code: 500 });
        }

        Ok(SynthesizedAudio::new(
            request.text.into_bytes(),
            "audio/mpeg",
        ))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
