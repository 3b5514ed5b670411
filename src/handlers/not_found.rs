use axum::http::{StatusCode, Uri};
use tracing::debug;

/// 404 handler for requests that match no route.
pub async fn not_found(uri: Uri) -> (StatusCode, &'static str) {
    debug!("No route for {path}", path = uri.path());
    (StatusCode::NOT_FOUND, "Not Found")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn status_code() {
        let (status, _) = not_found(Uri::from_static("/unknown/path")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
