//! Scrape target serving the exposition of the running test case.

use axum::{extract::State, http::header, response::IntoResponse};
use time::OffsetDateTime;

use crate::cases::Exposition;

/// Content type of the Prometheus text exposition format.
pub const TEXT_FORMAT: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Serve the current case's exposition to the sender's scraper.
///
/// # Parameters
///
/// - `exposition` - Exposition of the running case
///
/// # Returns
///
/// Returns the exposition text, rendered at request time.
pub async fn metrics(State(exposition): State<Exposition>) -> impl IntoResponse {
    let body = exposition.render(OffsetDateTime::now_utc());
    ([(header::CONTENT_TYPE, TEXT_FORMAT)], body)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test that static text is served unchanged with the text format content type.
    #[tokio::test]
    async fn test_metrics_static() {
        let response = metrics(State(Exposition::Text("test{a=\"1\"} 1\n"))).await.into_response();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()),
            Some(TEXT_FORMAT)
        );

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("read body");
        assert_eq!(&body[..], b"test{a=\"1\"} 1\n");
    }

    /// Test that generated expositions are rendered per request.
    #[tokio::test]
    async fn test_metrics_generated() {
        fn year(now: OffsetDateTime) -> String {
            format!("year {}\n", now.year())
        }

        let response = metrics(State(Exposition::Generated(year))).await.into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("read body");
        let text = String::from_utf8(body.to_vec()).expect("utf-8");
        assert_eq!(text, format!("year {}\n", OffsetDateTime::now_utc().year()));
    }
}
