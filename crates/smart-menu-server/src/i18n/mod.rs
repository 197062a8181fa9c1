pub mod locale;
pub mod routing;

pub use locale::{LabelResolver, Locale, LocalizedText};
pub use routing::{build_localized_path, resolve_route_locale};
