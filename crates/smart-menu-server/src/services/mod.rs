pub mod ai_router;
pub mod backend;
pub mod pages;
pub mod push;
pub mod session;

pub use ai_router::AiRouterService;
pub use backend::BackendClient;
pub use pages::StorefrontPages;
pub use push::PushService;
pub use session::MenuSession;
