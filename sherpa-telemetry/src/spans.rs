//! Span helpers for live session operations
//!
//! Provides pre-configured spans for instrumenting sessions, transports,
//! and playback.

use tracing::Span;

/// Create a span covering one voice session
///
/// # Arguments
/// * `model` - Remote model identifier
/// * `voice` - Prebuilt voice the model speaks with
///
/// # Example
/// ```
/// use sherpa_telemetry::session_span;
/// let span = session_span("models/gemini-live", "Fenrir");
/// let _enter = span.enter();
/// ```
pub fn session_span(model: &str, voice: &str) -> Span {
    tracing::info_span!(
        "live.session",
        model.name = model,
        voice.name = voice,
        session.id = tracing::field::Empty,
        otel.kind = "internal"
    )
}

/// Create a span for a transport connection
///
/// # Arguments
/// * `provider` - Provider name, e.g. "gemini"
pub fn transport_span(provider: &str) -> Span {
    tracing::info_span!("live.transport", provider = provider, otel.kind = "client")
}

/// Create a span for a playback flush
pub fn flush_span(dropped: usize) -> Span {
    tracing::debug_span!("live.flush", units.dropped = dropped)
}

/// Record the session id on the current span
pub fn record_session_id(session_id: &str) {
    Span::current().record("session.id", session_id);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_span_is_constructible() {
        let span = session_span("models/test", "Fenrir");
        let _enter = span.enter();
        record_session_id("abc");
    }

    #[test]
    fn test_other_spans() {
        let _ = transport_span("gemini");
        let _ = flush_span(3);
    }
}
