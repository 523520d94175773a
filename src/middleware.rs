use std::cell::RefCell;
use std::future::Future;

use axum::{
    extract::Request,
    http::{header::HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

/// Header name for the request ID
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request ID tracking information
#[derive(Clone, Debug)]
pub struct RequestId(pub String);

impl Default for RequestId {
    fn default() -> Self {
        RequestId(Uuid::new_v4().to_string())
    }
}

impl RequestId {
    pub fn new(value: impl Into<String>) -> Self {
        RequestId(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

tokio::task_local! {
    static CURRENT_REQUEST_ID: RefCell<Option<RequestId>>;
}

/// Runs `future` with the given request id installed as the task-local id.
pub async fn scope_request_id<Fut, R>(request_id: RequestId, future: Fut) -> R
where
    Fut: Future<Output = R>,
{
    CURRENT_REQUEST_ID
        .scope(RefCell::new(Some(request_id)), future)
        .await
}

/// Returns the request id of the current task, if one is in scope.
pub fn current_request_id() -> Option<RequestId> {
    CURRENT_REQUEST_ID
        .try_with(|cell| cell.borrow().clone())
        .ok()
        .flatten()
}

/// Middleware that ensures every request carries a request id, propagates it
/// to handlers via extensions and the task-local scope, and echoes it on the
/// response.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(RequestId::new)
        .unwrap_or_default();

    // Request IDs are validated ASCII, so the header conversions won't fail
    if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
        request
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }

    request.extensions_mut().insert(request_id.clone());

    let span = tracing::info_span!(
        "request",
        request_id = %request_id.as_str(),
        method = %request.method(),
        uri = %request.uri(),
    );
    let _guard = span.enter();

    let mut response =
        scope_request_id(request_id.clone(), async move { next.run(request).await }).await;

    if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }

    response
}
