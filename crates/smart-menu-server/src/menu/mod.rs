pub mod allergens;
pub mod api;
pub mod browser;
pub mod details;
pub mod mapper;
pub mod model;
pub mod prefetch;
pub mod query;
pub mod selection;
pub mod storage;

pub use api::{ItemQuery, MenuApi};
pub use browser::{BrowserInit, BrowserView, Effect, FetchSlot, MenuBrowser, RequestTicket};
pub use model::{Category, MealKind, MenuItem, RawCategory, RawMenuItem, Selection, SubcategoryId};
pub use prefetch::{fetch_initial_menu_data, PrefetchedMenuData};
