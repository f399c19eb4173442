use tokio_util::sync::CancellationToken;
use tracing::Span;

/// Runtime context threaded through a single chat request
///
/// Carries the cancellation token every suspension point must observe
/// and the span adapters log into.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Identifier attached to every log line of this request
    pub request_id: String,
    /// Fired when the caller goes away
    pub cancellation: CancellationToken,
    /// Span that scopes this request's logs
    pub span: Span,
}

impl RequestContext {
    /// Create a context bound to an existing cancellation token
    pub fn new(cancellation: CancellationToken) -> Self {
        let request_id = uuid::Uuid::new_v4().simple().to_string();
        let span = tracing::info_span!("chat_request", request_id = %request_id);

        Self {
            request_id,
            cancellation,
            span,
        }
    }

    /// Create a minimal context for embedded (non-HTTP) use
    ///
    /// Uses a fresh token that nobody else holds and a disabled span
    pub fn empty() -> Self {
        Self {
            request_id: String::new(),
            cancellation: CancellationToken::new(),
            span: Span::none(),
        }
    }

    /// Whether the caller has cancelled this request
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_context_is_not_cancelled() {
        let ctx = RequestContext::empty();
        assert!(!ctx.is_cancelled());
        assert!(ctx.request_id.is_empty());
    }

    #[test]
    fn new_context_gets_unique_id() {
        let a = RequestContext::new(CancellationToken::new());
        let b = RequestContext::new(CancellationToken::new());
        assert_eq!(a.request_id.len(), 32);
        assert_ne!(a.request_id, b.request_id);
    }

    #[tokio::test]
    async fn clones_share_cancellation() {
        let ctx = RequestContext::new(CancellationToken::new());
        let clone = ctx.clone();
        ctx.cancellation.cancel();
        clone.cancellation.cancelled().await;
        assert!(clone.is_cancelled());
    }
}
