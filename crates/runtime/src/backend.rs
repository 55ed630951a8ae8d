//! Synthesis backends available to the runtime.

use std::time::Duration;

use dialog_core::{AudioBuffer, SynthesisBackend, SynthesisError, SynthesisRequest};
use parking_lot::Mutex;
use tracing::debug;

/// Sample rate of the mock backend unless configured otherwise.
pub const MOCK_SAMPLE_RATE: u32 = 24000;

/// Audio produced per character of input at speed 1.0.
const SECONDS_PER_CHAR: f32 = 0.04;

#[derive(Debug, Default)]
struct MockState {
    calls: usize,
    requests: Vec<SynthesisRequest>,
}

/// A deterministic backend for tests and dry runs.
///
/// Produces a sine tone whose pitch depends on the slot and whose length
/// scales with the text and the speed. Can be scripted to reject input as
/// too long.
#[derive(Debug)]
pub struct MockBackend {
    sample_rate: u32,
    delay: Option<Duration>,
    overflow_first_calls: usize,
    max_input_chars: Option<usize>,
    fail_on_call: Option<usize>,
    state: Mutex<MockState>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new(MOCK_SAMPLE_RATE)
    }
}

impl MockBackend {
    /// Create a mock backend producing audio at `sample_rate`.
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            delay: None,
            overflow_first_calls: 0,
            max_input_chars: None,
            fail_on_call: None,
            state: Mutex::new(MockState::default()),
        }
    }

    /// Block for `delay` on every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Reject the first `n` calls as too long.
    pub fn with_overflow_on_first_calls(mut self, n: usize) -> Self {
        self.overflow_first_calls = n;
        self
    }

    /// Reject any text longer than `chars` characters as too long.
    pub fn with_max_input_chars(mut self, chars: usize) -> Self {
        self.max_input_chars = Some(chars);
        self
    }

    /// Fail call number `call` (1-based) with a generic backend error.
    pub fn with_failure_on_call(mut self, call: usize) -> Self {
        self.fail_on_call = Some(call);
        self
    }

    /// Every request received so far, rejected ones included.
    pub fn requests(&self) -> Vec<SynthesisRequest> {
        self.state.lock().requests.clone()
    }

    /// Number of calls received so far.
    pub fn calls(&self) -> usize {
        self.state.lock().calls
    }

    fn tone(&self, request: &SynthesisRequest) -> Vec<f32> {
        let chars = request.text.chars().count().max(1) as f32;
        let speed = if request.speed > 0.0 { request.speed } else { 1.0 };
        let len = ((chars * SECONDS_PER_CHAR / speed) * self.sample_rate as f32)
            .round()
            .max(1.0) as usize;
        let freq = 180.0 + 20.0 * request.slot as f32;

        (0..len)
            .map(|i| {
                let t = i as f32 / self.sample_rate as f32;
                0.3 * (2.0 * std::f32::consts::PI * freq * t).sin()
            })
            .collect()
    }
}

impl SynthesisBackend for MockBackend {
    fn synthesize(&self, request: &SynthesisRequest) -> Result<AudioBuffer, SynthesisError> {
        let call = {
            let mut state = self.state.lock();
            state.calls += 1;
            state.requests.push(request.clone());
            state.calls
        };

        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        if call <= self.overflow_first_calls {
            debug!(call, "Mock backend rejecting input as too long");
            return Err(SynthesisError::input_too_long(format!(
                "scripted overflow on call {call}"
            )));
        }

        let chars = request.text.chars().count();
        if self.max_input_chars.is_some_and(|max| chars > max) {
            return Err(SynthesisError::input_too_long(format!(
                "{chars} characters exceed the encoder limit"
            )));
        }

        if self.fail_on_call == Some(call) {
            return Err(SynthesisError::backend(format!(
                "scripted failure on call {call}"
            )));
        }

        Ok(AudioBuffer::new(self.tone(request), self.sample_rate))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tone_scales_with_text_and_speed() {
        let backend = MockBackend::new(1000);
        let slow = backend
            .synthesize(&SynthesisRequest::new("abcde").with_speed(0.5))
            .unwrap();
        let normal = backend
            .synthesize(&SynthesisRequest::new("abcde"))
            .unwrap();

        assert_eq!(normal.sample_rate, 1000);
        assert_eq!(normal.num_samples(), 200);
        assert_eq!(slow.num_samples(), 400);
        assert!(normal.samples.iter().all(|s| s.abs() <= 0.3 + 1e-6));
    }

    #[test]
    fn test_scripted_overflow() {
        let backend = MockBackend::default().with_overflow_on_first_calls(1);
        let req = SynthesisRequest::new("текст");

        assert!(backend.synthesize(&req).unwrap_err().is_overflow());
        assert!(backend.synthesize(&req).is_ok());
        assert_eq!(backend.calls(), 2);
        assert_eq!(backend.requests().len(), 2);
    }

    #[test]
    fn test_max_input_chars() {
        let backend = MockBackend::default().with_max_input_chars(3);
        assert!(backend.synthesize(&SynthesisRequest::new("abc")).is_ok());
        assert!(
            backend
                .synthesize(&SynthesisRequest::new("abcd"))
                .unwrap_err()
                .is_overflow()
        );
    }

    #[test]
    fn test_scripted_failure() {
        let backend = MockBackend::default().with_failure_on_call(2);
        let req = SynthesisRequest::new("a");
        assert!(backend.synthesize(&req).is_ok());
        let err = backend.synthesize(&req).unwrap_err();
        assert!(!err.is_overflow());
    }
}
