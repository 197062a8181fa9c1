use crate::menu::api::{ItemQuery, MenuApi};
use crate::menu::model::{payload_array, payload_list, MealKind, RawCategory, RawMenuItem};
use crate::utils::error::ApiError;
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;
use tracing::{debug, error};

pub const BACKEND_NOT_CONFIGURED: &str = "BACKEND_URL is not configured.";

/// Raw upstream answer: status plus the parsed body (`None` when the body
/// was not valid JSON).
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: Option<Value>,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// `message`, then `error`, from the body.
    pub fn message(&self) -> Option<String> {
        let body = self.body.as_ref()?;
        ["message", "error"]
            .iter()
            .find_map(|key| body.get(*key).and_then(Value::as_str))
            .map(str::to_string)
    }
}

/// Thin client for the menu backend.
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: Option<String>,
}

impl BackendClient {
    pub fn new(client: Client, base_url: Option<String>) -> Self {
        Self { client, base_url }
    }

    pub fn is_configured(&self) -> bool {
        self.base_url.is_some()
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let base = self
            .base_url
            .as_deref()
            .ok_or_else(|| ApiError::Configuration(BACKEND_NOT_CONFIGURED.to_string()))?;

        let mut url = Url::parse(base)
            .map_err(|e| ApiError::Configuration(format!("Invalid BACKEND_URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::Configuration(format!("BACKEND_URL cannot be a base: {}", base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get(&self, url: Url) -> Result<UpstreamResponse, ApiError> {
        debug!("GET {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| {
                error!("Backend request to {} failed: {}", url, e);
                ApiError::Unreachable(format!("Failed to call backend: {}", e))
            })?;

        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::Unreachable(format!("Failed to read backend response: {}", e)))?;

        let body = serde_json::from_slice::<Value>(&bytes).ok();
        if body.is_none() {
            debug!("Backend answered {} with a non-JSON body", url);
        }

        Ok(UpstreamResponse { status, body })
    }

    // ===== PROXY CALLS =====

    pub async fn restaurants(&self) -> Result<UpstreamResponse, ApiError> {
        self.get(self.endpoint(&["api", "restaurants"])?).await
    }

    pub async fn restaurant(&self, restaurant_id: &str) -> Result<UpstreamResponse, ApiError> {
        self.get(self.endpoint(&["api", "restaurants", restaurant_id])?).await
    }

    pub async fn categories(
        &self,
        restaurant_id: &str,
        kind: Option<&str>,
    ) -> Result<UpstreamResponse, ApiError> {
        let mut url = self.endpoint(&["api", "restaurants", restaurant_id, "categories"])?;
        if let Some(kind) = kind.filter(|k| !k.is_empty()) {
            url.query_pairs_mut().append_pair("kind", kind);
        }
        self.get(url).await
    }

    /// Forwards `raw_query` (everything after `?`) untouched.
    pub async fn menu_items(
        &self,
        restaurant_id: &str,
        raw_query: Option<&str>,
    ) -> Result<UpstreamResponse, ApiError> {
        let mut url = self.endpoint(&["api", "menuItems", restaurant_id, "menu-items"])?;
        url.set_query(raw_query.filter(|q| !q.is_empty()));
        self.get(url).await
    }

    pub async fn menu_item(
        &self,
        restaurant_id: &str,
        item_id: &str,
        kind: Option<&str>,
    ) -> Result<UpstreamResponse, ApiError> {
        let mut url = self.endpoint(&["api", "menuItems", restaurant_id, "menu-items", item_id])?;
        if let Some(kind) = kind.filter(|k| !k.is_empty()) {
            url.query_pairs_mut().append_pair("kind", kind);
        }
        self.get(url).await
    }
}

fn list_or_error<T: serde::de::DeserializeOwned>(
    response: UpstreamResponse,
    what: &str,
) -> Result<Vec<T>, ApiError> {
    if !response.is_success() {
        return Err(ApiError::Upstream {
            status: response.status,
            message: response
                .message()
                .unwrap_or_else(|| format!("Failed to load {}", what)),
        });
    }
    if payload_array(response.body.as_ref()).is_none() {
        return Err(ApiError::MalformedPayload(format!("{} payload is not a list", what)));
    }
    Ok(payload_list(response.body.as_ref()))
}

#[async_trait]
impl MenuApi for BackendClient {
    async fn fetch_categories(
        &self,
        restaurant_id: &str,
        meal: MealKind,
    ) -> Result<Vec<RawCategory>, ApiError> {
        let response = self.categories(restaurant_id, Some(meal.as_str())).await?;
        list_or_error(response, "categories")
    }

    async fn fetch_items(&self, query: &ItemQuery) -> Result<Vec<RawMenuItem>, ApiError> {
        let mut url = self.endpoint(&["api", "menuItems", query.restaurant_id.as_str(), "menu-items"])?;
        url.query_pairs_mut().extend_pairs(query.query_pairs());
        let response = self.get(url).await?;
        list_or_error(response, "menu items")
    }
}
