//! Error context for enriched error information.

use chrono::{DateTime, Utc};

/// Context attached to errors for debugging.
///
/// Records which operation failed, for which model and which request, so a
/// log line can be matched to the server-side `request-id`.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorContext {
    /// Operation that failed (e.g. `generate_stream`).
    pub operation: String,

    /// Model the request targeted.
    pub model: Option<String>,

    /// Request identifier sent in the `request-id` header.
    pub request_id: Option<String>,

    /// Timestamp when the error occurred.
    pub timestamp: DateTime<Utc>,

    /// Component where the error originated.
    pub component: Option<String>,
}

impl ErrorContext {
    /// Create a new ErrorContext for an operation.
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            model: None,
            request_id: None,
            timestamp: Utc::now(),
            component: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    /// Formatted `key=value` string for structured logs.
    pub fn to_log_string(&self) -> String {
        let mut parts = vec![format!("operation={}", self.operation)];

        if let Some(ref model) = self.model {
            parts.push(format!("model={}", model));
        }
        if let Some(ref request_id) = self.request_id {
            parts.push(format!("request_id={}", request_id));
        }
        if let Some(ref component) = self.component {
            parts.push(format!("component={}", component));
        }

        parts.push(format!("timestamp={}", self.timestamp.to_rfc3339()));
        parts.join(" ")
    }
}

impl std::fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.operation)?;

        if let Some(ref model) = self.model {
            write!(f, " model={}", model)?;
        }
        if let Some(ref request_id) = self.request_id {
            write!(f, " request={}", request_id)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_builder_pattern() {
        let ctx = ErrorContext::new("generate_stream")
            .with_model("llama3.2")
            .with_request_id("req-456")
            .with_component("ollama_client");

        assert_eq!(ctx.operation, "generate_stream");
        assert_eq!(ctx.model.as_deref(), Some("llama3.2"));
        assert_eq!(ctx.request_id.as_deref(), Some("req-456"));
        assert_eq!(ctx.component.as_deref(), Some("ollama_client"));
    }

    #[test]
    fn test_context_display() {
        let ctx = ErrorContext::new("chat_stream").with_model("qwen2.5");
        let display = ctx.to_string();
        assert!(display.contains("chat_stream"));
        assert!(display.contains("model=qwen2.5"));
        assert!(!display.contains("request="));
    }

    #[test]
    fn test_context_to_log_string() {
        let ctx = ErrorContext::new("tokenize").with_request_id("abc");
        let log = ctx.to_log_string();
        assert!(log.contains("operation=tokenize"));
        assert!(log.contains("request_id=abc"));
        assert!(log.contains("timestamp="));
    }
}
