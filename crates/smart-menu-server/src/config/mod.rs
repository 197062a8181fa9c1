pub mod settings;

pub use settings::{
    AiRouterConfig, BackendConfig, I18nConfig, PrefetchConfig, PushConfig, ServerConfig, Settings,
    SiteConfig,
};
