use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};

/// Baseline response headers. JSON under `/api/` is marked `no-store`; the CSV download is not.
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let is_api = request.uri().path().starts_with("/api/");
    let is_download = request.uri().path() == "/api/csv";

    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert("x-content-type-options", HeaderValue::from_static("nosniff"));
    headers.insert("referrer-policy", HeaderValue::from_static("no-referrer"));
    if is_api && !is_download {
        headers.insert("cache-control", HeaderValue::from_static("no-store"));
    }

    response
}
