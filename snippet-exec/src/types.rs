use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Code execution request as it arrives from the bridge
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// Source code to execute
    #[serde(default)]
    pub code: String,
    /// Language identifier, matched case-insensitively
    #[serde(default)]
    pub language: String,
}

impl ExecutionRequest {
    pub fn new(code: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            language: language.into(),
        }
    }
}

/// Uniform result of every execution request.
///
/// Both text fields are always present; `error` is empty on success and
/// `output` is empty on failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEnvelope {
    /// Captured program output
    pub output: String,
    /// Error text, empty when the execution succeeded
    pub error: String,
    /// Wall-clock time spent in the backend
    pub execution_time_ms: u64,
}

impl ResultEnvelope {
    pub fn success(output: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            output: output.into(),
            error: String::new(),
            execution_time_ms: millis(elapsed),
        }
    }

    pub fn failure(error: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            output: String::new(),
            error: error.into(),
            execution_time_ms: millis(elapsed),
        }
    }

    /// Envelope for a language with no registered backend
    pub fn unsupported(language: &str) -> Self {
        Self::failure(
            format!("Language '{}' not supported", language),
            Duration::ZERO,
        )
    }

    /// Envelope for a fault raised inside a backend
    pub fn execution_failed(message: impl fmt::Display) -> Self {
        Self::failure(format!("Execution failed: {}", message), Duration::ZERO)
    }

    pub fn is_success(&self) -> bool {
        self.error.is_empty()
    }
}

fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

/// Execution strategy behind a language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// External interpreter or compiler spawned per request
    Process,
    /// In-process script engine
    Embedded,
    /// Static pattern extraction, nothing is executed
    Simulated,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Process => f.write_str("process"),
            BackendKind::Embedded => f.write_str("embedded"),
            BackendKind::Simulated => f.write_str("simulated"),
        }
    }
}

/// A registered language and the backend that serves it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageInfo {
    pub name: String,
    pub aliases: Vec<String>,
    pub backend: BackendKind,
    pub simulated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_serializes_camel_case() {
        let envelope = ResultEnvelope::success("Hi", Duration::from_millis(12));
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "output": "Hi", "error": "", "executionTimeMs": 12 })
        );
    }

    #[test]
    fn test_unsupported_envelope() {
        let envelope = ResultEnvelope::unsupported("Cobol");
        assert_eq!(envelope.output, "");
        assert_eq!(envelope.error, "Language 'Cobol' not supported");
        assert_eq!(envelope.execution_time_ms, 0);
        assert!(!envelope.is_success());
    }

    #[test]
    fn test_request_fields_default_to_empty() {
        let request: ExecutionRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request, ExecutionRequest::new("", ""));
    }
}
