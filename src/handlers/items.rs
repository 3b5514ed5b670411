//! Contains the `/items/{id}` endpoint.

use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use tracing::{info, warn};

/// The highest item ID in the demo catalogue.
const MAX_ITEM_ID: u64 = 999;

pub trait ItemRoutes {
    /// Provides read access to the demo catalogue.
    ///
    /// ```http
    /// GET /items/42 HTTP/1.1
    /// ```
    fn map_item_endpoints(self) -> Self;
}

impl<S> ItemRoutes for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn map_item_endpoints(self) -> Self {
        self.route("/items/{id}", get(get_item))
    }
}

async fn get_item(Path(id): Path<String>) -> (StatusCode, String) {
    match id.parse::<u64>() {
        Ok(id) if id <= MAX_ITEM_ID => {
            info!("Serving item {id}");
            (StatusCode::OK, format!("Item {id}"))
        }
        _ => {
            warn!("Requested unknown item {id:?}");
            (StatusCode::NOT_FOUND, format!("No item {id}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn known_items_are_found() {
        let (status, body) = get_item(Path("42".to_string())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "Item 42");
    }

    #[tokio::test]
    async fn unknown_items_are_not_found() {
        let (status, _) = get_item(Path("1000".to_string())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = get_item(Path("abc".to_string())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
