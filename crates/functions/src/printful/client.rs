//! Printful HTTP client.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;

use reform_shop_core::{CatalogVariantId, PrintfulProductId};

use super::PrintfulError;
use super::types::{
    CatalogVariant, CatalogVariantResult, Envelope, SyncProduct, SyncProductDetail,
};
use crate::config::PrintfulConfig;

/// Printful API base URL.
const BASE_URL: &str = "https://api.printful.com";

/// Pause after every request: about 100 requests/minute against a limit of 120.
pub const REQUEST_DELAY: Duration = Duration::from_millis(600);

/// Page size for store product listings (Printful's maximum).
const PAGE_LIMIT: u32 = 100;

/// Printful API client.
#[derive(Clone)]
pub struct PrintfulClient {
    client: reqwest::Client,
    base_url: String,
    delay: Duration,
}

impl PrintfulClient {
    /// Create a new Printful API client.
    ///
    /// # Errors
    ///
    /// Returns error if the token or store id cannot be used as header values.
    pub fn new(config: &PrintfulConfig) -> Result<Self, PrintfulError> {
        Self::with_base_url(config, BASE_URL, REQUEST_DELAY)
    }

    /// Create a client against another host with a custom delay (tests).
    ///
    /// # Errors
    ///
    /// Returns error if the token or store id cannot be used as header values.
    pub fn with_base_url(
        config: &PrintfulConfig,
        base_url: &str,
        delay: Duration,
    ) -> Result<Self, PrintfulError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", config.token.expose_secret());
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&auth_value)
                .map_err(|e| PrintfulError::Parse(format!("Invalid token format: {e}")))?,
        );

        if let Some(store_id) = &config.store_id {
            headers.insert(
                "X-PF-Store-Id",
                HeaderValue::from_str(store_id)
                    .map_err(|e| PrintfulError::Parse(format!("Invalid store id: {e}")))?,
            );
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!("reform-shop/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            delay,
        })
    }

    /// GET a path and unwrap the response envelope.
    ///
    /// The rate-limit pause runs whether or not the request succeeded.
    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Envelope<T>, PrintfulError> {
        let url = format!("{}{path}", self.base_url);
        let result = self.fetch(&url, query).await;
        tokio::time::sleep(self.delay).await;
        result
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<Envelope<T>, PrintfulError> {
        let response = self.client.get(url).query(query).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PrintfulError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| PrintfulError::Parse(e.to_string()))
    }

    /// List every product in the store, following pagination.
    ///
    /// # Errors
    ///
    /// Returns error if any page request fails.
    pub async fn store_products(&self) -> Result<Vec<SyncProduct>, PrintfulError> {
        let mut products = Vec::new();
        let mut offset = 0;

        loop {
            let page: Envelope<Vec<SyncProduct>> = self
                .get(
                    "/store/products",
                    &[
                        ("offset", offset.to_string()),
                        ("limit", PAGE_LIMIT.to_string()),
                    ],
                )
                .await?;

            let fetched = u32::try_from(page.result.len()).unwrap_or(u32::MAX);
            products.extend(page.result);

            match page.paging {
                Some(paging) if fetched > 0 && paging.offset + paging.limit < paging.total => {
                    offset = paging.offset + paging.limit;
                }
                _ => break,
            }
        }

        tracing::info!(count = products.len(), "Fetched Printful store products");
        Ok(products)
    }

    /// Fetch one sync product with all its variants.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the product does not exist.
    #[tracing::instrument(skip(self))]
    pub async fn store_product(
        &self,
        id: PrintfulProductId,
    ) -> Result<SyncProductDetail, PrintfulError> {
        let envelope: Envelope<SyncProductDetail> =
            self.get(&format!("/store/products/{id}"), &[]).await?;
        Ok(envelope.result)
    }

    /// Fetch a catalog variant (color, color code, size, stock).
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the variant does not exist.
    #[tracing::instrument(skip(self))]
    pub async fn catalog_variant(
        &self,
        id: CatalogVariantId,
    ) -> Result<CatalogVariant, PrintfulError> {
        let envelope: Envelope<CatalogVariantResult> =
            self.get(&format!("/products/variant/{id}"), &[]).await?;
        Ok(envelope.result.variant)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Instant;

    use axum::extract::{Query, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::get;
    use axum::{Json, Router};
    use secrecy::SecretString;
    use serde_json::{Value, json};
    use tokio::sync::Mutex;

    use super::*;

    #[derive(Clone, Default)]
    struct Seen {
        offsets: Arc<Mutex<Vec<String>>>,
        headers: Arc<Mutex<Vec<(String, String)>>>,
    }

    async fn products(
        State(seen): State<Seen>,
        headers: HeaderMap,
        Query(query): Query<HashMap<String, String>>,
    ) -> Json<Value> {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string()
        };
        seen.headers
            .lock()
            .await
            .push((header("authorization"), header("x-pf-store-id")));

        let offset = query.get("offset").cloned().unwrap_or_default();
        seen.offsets.lock().await.push(offset.clone());

        let (ids, offset): (Vec<i64>, u32) = if offset == "2" {
            (vec![303], 2)
        } else {
            (vec![301, 302], 0)
        };
        let result: Vec<Value> = ids
            .into_iter()
            .map(|id| json!({ "id": id, "name": format!("Product {id}") }))
            .collect();
        Json(json!({
            "code": 200,
            "result": result,
            "paging": { "total": 3, "offset": offset, "limit": 2 }
        }))
    }

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}")
    }

    fn config(store_id: Option<&str>) -> PrintfulConfig {
        PrintfulConfig {
            token: SecretString::from("pf-test-token"),
            store_id: store_id.map(String::from),
        }
    }

    #[tokio::test]
    async fn store_products_follows_paging_with_auth_headers() {
        let seen = Seen::default();
        let app = Router::new()
            .route("/store/products", get(products))
            .with_state(seen.clone());
        let base = serve(app).await;
        let client =
            PrintfulClient::with_base_url(&config(Some("store-9")), &base, Duration::ZERO).unwrap();

        let products = client.store_products().await.unwrap();

        let ids: Vec<i64> = products.iter().map(|p| p.id.as_i64()).collect();
        assert_eq!(ids, vec![301, 302, 303]);
        assert_eq!(*seen.offsets.lock().await, vec!["0", "2"]);
        for (auth, store) in seen.headers.lock().await.iter() {
            assert_eq!(auth, "Bearer pf-test-token");
            assert_eq!(store, "store-9");
        }
    }

    #[tokio::test]
    async fn error_statuses_map_to_api_errors() {
        let app = Router::new()
            .route(
                "/store/products/{id}",
                get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "upstream down") }),
            )
            .route(
                "/products/variant/{id}",
                get(|| async { (StatusCode::NOT_FOUND, "Not found") }),
            );
        let base = serve(app).await;
        let client = PrintfulClient::with_base_url(&config(None), &base, Duration::ZERO).unwrap();

        let err = client
            .store_product(PrintfulProductId::new(301))
            .await
            .unwrap_err();
        assert!(
            matches!(err, PrintfulError::Api { status: 500, ref message } if message == "upstream down")
        );
        assert!(!err.is_not_found());

        let err = client
            .catalog_variant(CatalogVariantId::new(5530))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn delay_applies_after_failed_requests() {
        let app = Router::new().route(
            "/products/variant/{id}",
            get(|| async { StatusCode::NOT_FOUND }),
        );
        let base = serve(app).await;
        let delay = Duration::from_millis(150);
        let client = PrintfulClient::with_base_url(&config(None), &base, delay).unwrap();

        let started = Instant::now();
        let result = client.catalog_variant(CatalogVariantId::new(1)).await;

        assert!(result.is_err());
        assert!(started.elapsed() >= delay);
    }
}
