use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::i18n::Locale;

pub const DEFAULT_AI_ROUTER_URL: &str = "http://localhost:5000/api/ai/router";
pub const DEFAULT_PUSH_SUBJECT: &str = "mailto:your-email@example.com";
pub const DEFAULT_APP_URL: &str = "https://www.smartmenumk.com";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    pub ai_router: AiRouterConfig,
    pub push: PushConfig,
    pub i18n: I18nConfig,
    pub site: SiteConfig,
    pub prefetch: PrefetchConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct BackendConfig {
    /// Menu backend origin (`BACKEND_URL`). Every proxy route needs it.
    pub url: Option<String>,
}

impl BackendConfig {
    /// Configured origin without a trailing `/`; blank counts as missing.
    pub fn base_url(&self) -> Option<String> {
        self.url
            .as_deref()
            .map(|url| url.trim().trim_end_matches('/'))
            .filter(|url| !url.is_empty())
            .map(str::to_string)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AiRouterConfig {
    pub service_url: String,
    pub service_token: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PushConfig {
    pub vapid_public_key: Option<String>,
    pub vapid_private_key: Option<String>,
    pub subject: String,
    /// Delivery relay that performs the actual web-push send.
    pub relay_url: Option<String>,
    /// JSON file holding subscriptions; empty keeps them in memory.
    pub store_path: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct I18nConfig {
    pub default_locale: Locale,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SiteConfig {
    pub app_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PrefetchConfig {
    pub revalidate_seconds: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            backend: BackendConfig::default(),
            ai_router: AiRouterConfig {
                service_url: DEFAULT_AI_ROUTER_URL.to_string(),
                service_token: None,
            },
            push: PushConfig {
                vapid_public_key: None,
                vapid_private_key: None,
                subject: DEFAULT_PUSH_SUBJECT.to_string(),
                relay_url: None,
                store_path: "data/push-subscriptions.json".to_string(),
            },
            i18n: I18nConfig {
                default_locale: Locale::Mk,
            },
            site: SiteConfig {
                app_url: DEFAULT_APP_URL.to_string(),
            },
            prefetch: PrefetchConfig {
                revalidate_seconds: 120,
            },
        }
    }
}

/// First non-blank value among `names`.
fn env_var(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| !value.trim().is_empty())
}

impl Settings {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::load_from(Path::new("config/settings.toml"))
    }

    /// Defaults, then the optional TOML file, then `APP__SECTION__KEY`, then
    /// the bare deployment variables.
    pub fn load_from(path: &Path) -> Result<Self> {
        let defaults = Settings::default();

        let config = Config::builder()
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", i64::from(defaults.server.port))?
            .set_default("ai_router.service_url", defaults.ai_router.service_url)?
            .set_default("push.subject", defaults.push.subject)?
            .set_default("push.store_path", defaults.push.store_path)?
            .set_default("i18n.default_locale", defaults.i18n.default_locale.code())?
            .set_default("site.app_url", defaults.site.app_url)?
            .set_default(
                "prefetch.revalidate_seconds",
                defaults.prefetch.revalidate_seconds,
            )?
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("backend.url", env_var(&["BACKEND_URL"]))?
            .set_override_option("ai_router.service_url", env_var(&["AI_ROUTER_SERVICE_URL"]))?
            .set_override_option("ai_router.service_token", env_var(&["AI_ROUTER_SERVICE_TOKEN"]))?
            .set_override_option(
                "push.vapid_public_key",
                env_var(&["VAPID_PUBLIC_KEY", "NEXT_PUBLIC_VAPID_PUBLIC_KEY"]),
            )?
            .set_override_option("push.vapid_private_key", env_var(&["VAPID_PRIVATE_KEY"]))?
            .set_override_option("push.relay_url", env_var(&["PUSH_RELAY_URL"]))?
            .set_override_option("site.app_url", env_var(&["APP_URL", "NEXT_PUBLIC_APP_URL"]))?
            .set_override_option(
                "server.port",
                env_var(&["PORT"]).and_then(|port| port.trim().parse::<i64>().ok()),
            )?
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        Ok(settings)
    }
}
