use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Assigns a UUID v4 request ID to every incoming request, makes it
/// available to handlers via `Extension<RequestId>`, logs entry/exit at
/// `info`, and echoes it back on the response header.
pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let method = req.method().clone();
    let uri = req.uri().clone();

    req.extensions_mut().insert(RequestId(request_id.clone()));
    tracing::info!(request_id = %request_id, method = %method, uri = %uri, "request started");

    let mut response = next.run(req).await;

    tracing::info!(request_id = %request_id, status = %response.status(), "request finished");
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

#[derive(Debug, Clone)]
pub struct RequestId(pub String);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
