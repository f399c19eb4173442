use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use ember_core::RequestContext;
use http::HeaderValue;
use tokio_util::sync::CancellationToken;

/// Header echoing the id every log line of the request carries
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Middleware that gives each request a fresh `RequestContext`
///
/// Handlers own the cancellation token from here on and fire it when the
/// client goes away.
pub async fn request_context_middleware(mut request: Request, next: Next) -> Response {
    let context = RequestContext::new(CancellationToken::new());
    let request_id = HeaderValue::from_str(&context.request_id).ok();

    tracing::debug!(
        parent: &context.span,
        method = %request.method(),
        path = %request.uri().path(),
        "request received"
    );

    request.extensions_mut().insert(context);
    let mut response = next.run(request).await;

    if let Some(request_id) = request_id {
        response.headers_mut().insert(REQUEST_ID_HEADER, request_id);
    }

    response
}
