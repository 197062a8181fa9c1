use crate::config::AiRouterConfig;
use crate::i18n::{build_localized_path, LabelResolver, Locale, LocalizedText};
use crate::utils::error::ApiError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error};

pub const AI_ROUTER_FAILED: &str = "AI router service failed";
pub const AI_ROUTER_UNREACHABLE: &str = "Unable to reach AI router service";
const CANDIDATE_IMAGE_FALLBACK: &str = "/images/menu-item-placeholder.png";

// ===== REQUEST MODELS =====

/// Body accepted by `POST /api/ai/router`. Fields stay optional so the
/// handler can answer missing ones with its own 400.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiRouterRequest {
    #[serde(default)]
    pub restaurant_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl AiRouterRequest {
    /// Trimmed `(restaurantId, message)`, both non-empty.
    pub fn validated(&self) -> Result<(String, String), ApiError> {
        let restaurant_id = self.restaurant_id.as_deref().map(str::trim).unwrap_or_default();
        let message = self.message.as_deref().map(str::trim).unwrap_or_default();
        if restaurant_id.is_empty() || message.is_empty() {
            return Err(ApiError::BadRequest(
                "Both restaurantId and message are required".to_string(),
            ));
        }
        Ok((restaurant_id.to_string(), message.to_string()))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpstreamRouterRequest<'a> {
    restaurant_id: &'a str,
    message: &'a str,
}

// ===== SERVICE =====

#[derive(Clone)]
pub struct AiRouterService {
    client: Client,
    config: AiRouterConfig,
}

impl AiRouterService {
    pub fn new(client: Client, config: AiRouterConfig) -> Self {
        Self { client, config }
    }

    /// Forwards one prompt and returns the upstream payload (`null` when the
    /// body was not JSON).
    pub async fn route(&self, restaurant_id: &str, message: &str) -> Result<Value, ApiError> {
        let target = self.config.service_url.trim();
        debug!("Routing assistant prompt for {} to {}", restaurant_id, target);

        let mut request = self
            .client
            .post(target)
            .json(&UpstreamRouterRequest { restaurant_id, message });
        if let Some(token) = self.config.service_token.as_deref().filter(|t| !t.is_empty()) {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            error!("AI router proxy error: {}", e);
            ApiError::Unreachable(AI_ROUTER_UNREACHABLE.to_string())
        })?;

        let status = response.status();
        let payload = response
            .bytes()
            .await
            .ok()
            .and_then(|bytes| serde_json::from_slice::<Value>(&bytes).ok())
            .unwrap_or(Value::Null);

        if !status.is_success() {
            let message = ["message", "error"]
                .iter()
                .find_map(|key| payload.get(*key).and_then(Value::as_str))
                .unwrap_or(AI_ROUTER_FAILED)
                .to_string();
            return Err(ApiError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        Ok(payload)
    }
}

// ===== RESPONSE MODELS =====

/// Assistant answer extracted from a router response. The router may put
/// `router`/`candidates` at the top level or inside `data`, and `data` may
/// itself be the candidate list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssistantReply {
    pub assistant_text: String,
    pub language: Option<Locale>,
    pub candidates: Vec<Value>,
}

impl AssistantReply {
    pub fn from_payload(payload: &Value) -> Self {
        let data = payload.get("data");
        let nested = data.filter(|d| d.is_object());
        let nested_candidates = match data {
            Some(Value::Array(_)) => data,
            _ => nested.and_then(|d| d.get("candidates")),
        };

        let router_field = |field: &str| {
            [Some(payload), nested]
                .into_iter()
                .flatten()
                .find_map(|block| block.get("router").and_then(|r| r.get(field)).filter(|v| !v.is_null()))
        };

        let candidates = payload
            .get("candidates")
            .filter(|v| !v.is_null())
            .or(nested_candidates)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        Self {
            assistant_text: router_field("assistantText")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            language: router_field("language")
                .and_then(Value::as_str)
                .and_then(Locale::from_code),
            candidates,
        }
    }

    /// Cards rendered in the router's language (falling back to the page's).
    pub fn cards(&self, restaurant_id: &str, page_locale: Locale, default_locale: Locale) -> Vec<CandidateCard> {
        let display = self.language.unwrap_or(page_locale);
        let resolver = LabelResolver::new(display, default_locale);
        self.candidates
            .iter()
            .map(|candidate| CandidateCard::new(candidate, restaurant_id, page_locale, &resolver))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateCard {
    pub id: String,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub image_alt: String,
    pub href: String,
}

impl CandidateCard {
    fn new(candidate: &Value, restaurant_id: &str, page_locale: Locale, resolver: &LabelResolver) -> Self {
        let display = resolver.locale();
        let localized = |value: Option<&Value>| {
            value
                .map(LocalizedText::from_value)
                .map(|text| resolver.resolve(Some(&text), ""))
                .filter(|s| !s.is_empty())
        };

        let id = candidate.get("_id").and_then(Value::as_str).unwrap_or_default().to_string();
        let title = localized(candidate.get("name")).unwrap_or_else(|| fallback_title(display).to_string());
        let image = candidate.get("image");
        let image_alt = localized(image.and_then(|i| i.get("alt")))
            .or_else(|| {
                let image = image?;
                let alt = [(Locale::Mk, "altMk"), (Locale::Sq, "altSq"), (Locale::En, "altEn")]
                    .into_iter()
                    .filter_map(|(locale, key)| image.get(key).and_then(Value::as_str).map(|v| (locale, v)))
                    .fold(LocalizedText::new(), |text, (locale, v)| text.with(locale, v));
                Some(resolver.resolve(Some(&alt), "")).filter(|s| !s.is_empty())
            })
            .unwrap_or_else(|| title.clone());

        let href = if id.is_empty() {
            build_localized_path(&format!("/restaurant/{restaurant_id}"), page_locale)
        } else {
            build_localized_path(&format!("/restaurant/{restaurant_id}/menuItem/{id}"), page_locale)
        };

        Self {
            description: localized(candidate.get("description"))
                .unwrap_or_else(|| fallback_description(display).to_string()),
            image_url: image
                .and_then(|i| i.get("url"))
                .and_then(Value::as_str)
                .unwrap_or(CANDIDATE_IMAGE_FALLBACK)
                .to_string(),
            id,
            title,
            image_alt,
            href,
        }
    }
}

fn fallback_title(locale: Locale) -> &'static str {
    match locale {
        Locale::Mk => "Предлог",
        Locale::Sq => "Sugjerim",
        Locale::En => "Suggestion",
    }
}

fn fallback_description(locale: Locale) -> &'static str {
    match locale {
        Locale::Mk => "Пробај го овој специјалитет.",
        Locale::Sq => "Provo këtë specialitet.",
        Locale::En => "Give this special a try.",
    }
}
