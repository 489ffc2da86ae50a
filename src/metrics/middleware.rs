// src/metrics/middleware.rs

use axum::{extract::Request, middleware::Next, response::Response};
use metrics::{counter, histogram};
use std::time::Instant;

pub const HTTP_REQUESTS_TOTAL: &str = "healthd_http_requests_total";
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "healthd_http_request_duration_seconds";

/// Counts probe requests and their latency, labelled by path and status code.
pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;
    let status = response.status().as_u16().to_string();

    counter!(HTTP_REQUESTS_TOTAL, "path" => path.clone(), "status" => status).increment(1);
    histogram!(HTTP_REQUEST_DURATION_SECONDS, "path" => path).record(start.elapsed().as_secs_f64());

    response
}
