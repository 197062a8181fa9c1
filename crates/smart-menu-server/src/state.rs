use std::sync::Arc;
use axum::extract::FromRef;
use reqwest::Client;
use tracing::info;

use crate::config::Settings;
use crate::menu::MenuApi;
use crate::services::{AiRouterService, BackendClient, PushService, StorefrontPages};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub backend: Arc<BackendClient>,
    pub ai_router: Arc<AiRouterService>,
    pub push: Arc<PushService>,
    pub pages: Arc<StorefrontPages>,
}

impl AppState {
    pub async fn new(settings: Settings) -> anyhow::Result<Self> {
        // One connection pool for the backend, the AI router and the push relay
        let client = Client::builder().build()?;

        let base_url = settings.backend.base_url();
        if base_url.is_none() {
            tracing::warn!("BACKEND_URL is not configured; proxy routes will answer 500");
        }
        let backend = Arc::new(BackendClient::new(client.clone(), base_url));
        let menu_api: Arc<dyn MenuApi> = backend.clone();

        let ai_router = Arc::new(AiRouterService::new(
            client.clone(),
            settings.ai_router.clone(),
        ));

        let store = PushService::open_store(&settings.push).await?;
        let push = Arc::new(PushService::new(store, client, settings.push.clone()));
        info!("✅ Push subscription store ready");

        let pages = Arc::new(StorefrontPages::new(
            backend.clone(),
            menu_api,
            ai_router.clone(),
            settings.i18n.default_locale,
        )?);

        Ok(Self {
            settings: Arc::new(settings),
            backend,
            ai_router,
            push,
            pages,
        })
    }
}

impl FromRef<AppState> for Arc<Settings> {
    fn from_ref(state: &AppState) -> Self {
        state.settings.clone()
    }
}

impl FromRef<AppState> for Arc<BackendClient> {
    fn from_ref(state: &AppState) -> Self {
        state.backend.clone()
    }
}

impl FromRef<AppState> for Arc<AiRouterService> {
    fn from_ref(state: &AppState) -> Self {
        state.ai_router.clone()
    }
}

impl FromRef<AppState> for Arc<PushService> {
    fn from_ref(state: &AppState) -> Self {
        state.push.clone()
    }
}

impl FromRef<AppState> for Arc<StorefrontPages> {
    fn from_ref(state: &AppState) -> Self {
        state.pages.clone()
    }
}
