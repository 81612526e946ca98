//! Per-request context scoped on the handling task

use std::future::Future;
use uuid::Uuid;

tokio::task_local! {
    static REQUEST_CONTEXT: RequestContext;
}

#[derive(Debug, Clone, Copy)]
pub struct RequestContext {
    pub request_id: Uuid,
    /// Whether error bodies may carry internal details
    pub expose_details: bool,
}

impl RequestContext {
    pub fn new(expose_details: bool) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            expose_details,
        }
    }
}

/// Scope `context` for the lifetime of `fut`
pub async fn with_request_context<F, T>(context: RequestContext, fut: F) -> T
where
    F: Future<Output = T>,
{
    REQUEST_CONTEXT.scope(context, fut).await
}

/// Context of the current request. Outside a request a fresh id is used and
/// details are withheld.
pub fn current_request_context() -> RequestContext {
    REQUEST_CONTEXT
        .try_with(|context| *context)
        .unwrap_or_else(|_| RequestContext::new(false))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_context_visible_inside_scope() {
        let context = RequestContext::new(true);
        let seen = with_request_context(context, async { current_request_context() }).await;
        assert_eq!(seen.request_id, context.request_id);
        assert!(seen.expose_details);
    }

    #[tokio::test]
    async fn test_fallback_outside_scope_hides_details() {
        assert!(!current_request_context().expose_details);
    }
}
