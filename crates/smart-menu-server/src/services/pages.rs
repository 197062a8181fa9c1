//! Server-rendered storefront pages.
//!
//! The restaurant page runs the same [`MenuSession`] the browser would, seeded
//! with prefetched data, and renders whatever view it settles on.

use crate::i18n::{build_localized_path, resolve_route_locale, LabelResolver, Locale, LocalizedText};
use crate::menu::api::{ItemQuery, MenuApi};
use crate::menu::browser::{BrowserInit, BrowserView, ItemCard};
use crate::menu::details::{map_item_details, ItemDetails};
use crate::menu::mapper::map_items;
use crate::menu::model::{MealKind, SubcategoryId};
use crate::menu::prefetch::fetch_initial_menu_data;
use crate::menu::query::{read_meal_kind, read_selection_candidate, sync_meal_kind_query, PageLocation};
use crate::menu::storage::{Favorites, MemoryStorage, SelectionMemory};
use crate::services::ai_router::{AiRouterService, AssistantReply, CandidateCard};
use crate::services::backend::BackendClient;
use crate::services::session::MenuSession;
use crate::utils::error::ApiError;
use handlebars::Handlebars;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, warn};

const POPULAR_LIMIT: u32 = 5;
const DEFAULT_TITLE: &str = "Smart Menu";
const DEFAULT_ASSISTANT_NAME: &str = "Асистентот";

// ===== TEMPLATES =====

pub struct PageRenderer {
    registry: Handlebars<'static>,
}

impl PageRenderer {
    pub fn new() -> Result<Self, ApiError> {
        let mut registry = Handlebars::new();
        registry
            .register_partial("layout_head", include_str!("../../templates/layout_head.hbs"))
            .map_err(template_error)?;
        for (name, source) in [
            ("restaurant", include_str!("../../templates/restaurant.hbs")),
            ("menu_item", include_str!("../../templates/menu_item.hbs")),
            ("not_found", include_str!("../../templates/not_found.hbs")),
            ("ai_assistant", include_str!("../../templates/ai_assistant.hbs")),
        ] {
            registry
                .register_template_string(name, source)
                .map_err(template_error)?;
        }
        Ok(Self { registry })
    }

    pub fn render<T: Serialize>(&self, name: &str, context: &T) -> Result<String, ApiError> {
        self.registry.render(name, context).map_err(|e| {
            error!("Failed to render {} page: {}", name, e);
            ApiError::Internal(format!("Failed to render {} page", name))
        })
    }
}

fn template_error(e: handlebars::TemplateError) -> ApiError {
    ApiError::Internal(format!("Invalid page template: {}", e))
}

/// Rendered HTML and whether the requested resource existed.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub html: String,
    pub found: bool,
}

// ===== PAGE CONTEXTS =====

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PageLabels {
    popular: &'static str,
    empty: &'static str,
    back: &'static str,
    allergens: &'static str,
    home: &'static str,
    favorite_add: &'static str,
    favorite_remove: &'static str,
}

impl PageLabels {
    fn for_locale(locale: Locale) -> Self {
        match locale {
            Locale::Mk => Self {
                popular: "Најпопуларни",
                empty: "Нема производи во оваа категорија.",
                back: "Назад кон менито",
                allergens: "Алергени",
                home: "Почетна",
                favorite_add: "Додади во омилени",
                favorite_remove: "Отстрани од омилени",
            },
            Locale::Sq => Self {
                popular: "Më të popullarat",
                empty: "Nuk ka produkte në këtë kategori.",
                back: "Kthehu te menyja",
                allergens: "Alergjenë",
                home: "Ballina",
                favorite_add: "Shto te të preferuarat",
                favorite_remove: "Hiq nga të preferuarat",
            },
            Locale::En => Self {
                popular: "Most popular",
                empty: "No items in this category.",
                back: "Back to menu",
                allergens: "Allergens",
                home: "Home",
                favorite_add: "Add to favorites",
                favorite_remove: "Remove from favorites",
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AssistantLabels {
    intro_prefix: &'static str,
    intro_suffix: &'static str,
    placeholder: &'static str,
    submit: &'static str,
    no_results: &'static str,
    no_credits: &'static str,
    failed: &'static str,
    back: &'static str,
}

impl AssistantLabels {
    fn for_locale(locale: Locale) -> Self {
        match locale {
            Locale::Mk => Self {
                intro_prefix: "Здраво, јас сум",
                intro_suffix: "Кажи ми што ти се јаде и ќе ти предложам.",
                placeholder: "Што ти се јаде денес?",
                submit: "Прашај",
                no_results: "Нема препораки за ова барање. Пробај да побараш конкретна храна или пијалок.",
                no_credits: "Асистентот моментално не е достапен.",
                failed: "Асистентот не одговори. Обиди се повторно.",
                back: "Назад кон менито",
            },
            Locale::Sq => Self {
                intro_prefix: "Përshëndetje, unë jam",
                intro_suffix: "Më trego çfarë të pëlqen dhe do të të sugjeroj.",
                placeholder: "Çfarë dëshiron të hash sot?",
                submit: "Pyet",
                no_results: "Nuk ka sugjerime për këtë kërkesë. Provo të kërkosh një ushqim ose pije të caktuar.",
                no_credits: "Asistenti nuk është i disponueshëm për momentin.",
                failed: "Asistenti nuk u përgjigj. Provo përsëri.",
                back: "Kthehu te menyja",
            },
            Locale::En => Self {
                intro_prefix: "Hi, I am",
                intro_suffix: "Tell me what you feel like and I will suggest something.",
                placeholder: "What are you craving today?",
                submit: "Ask",
                no_results: "No suggestions for this request. Try asking for a specific dish or drink.",
                no_credits: "The assistant is not available right now.",
                failed: "The assistant did not answer. Please try again.",
                back: "Back to menu",
            },
        }
    }
}

/// Ready-made prompts offered under the assistant's input.
fn suggestion_prompts(locale: Locale) -> [(&'static str, &'static str); 4] {
    match locale {
        Locale::Mk => [
            ("no-lactose", "Нешто без лактоза"),
            ("light", "Нешто лесно"),
            ("sport", "Нешто слатко"),
            ("surprise", "Изненади ме"),
        ],
        Locale::Sq => [
            ("no-lactose", "Diçka pa laktozë"),
            ("light", "Diçka e lehtë"),
            ("sport", "Diçka e ëmbël"),
            ("surprise", "Më surprizo"),
        ],
        Locale::En => [
            ("no-lactose", "Something without lactose"),
            ("light", "Something light"),
            ("sport", "Something sweet"),
            ("surprise", "Surprise me"),
        ],
    }
}

fn not_found_message(locale: Locale) -> &'static str {
    match locale {
        Locale::Mk => "Не е пронајдено",
        Locale::Sq => "Nuk u gjet",
        Locale::En => "Not found",
    }
}

fn meal_label(meal: MealKind, locale: Locale) -> &'static str {
    match (meal, locale) {
        (MealKind::Food, Locale::Mk) => "Храна",
        (MealKind::Drink, Locale::Mk) => "Пијалоци",
        (MealKind::Food, Locale::Sq) => "Ushqim",
        (MealKind::Drink, Locale::Sq) => "Pije",
        (MealKind::Food, Locale::En) => "Food",
        (MealKind::Drink, Locale::En) => "Drinks",
    }
}

#[derive(Debug, Serialize)]
struct LinkView {
    label: String,
    href: String,
    active: bool,
}

#[derive(Debug, Serialize)]
struct LanguageLink {
    code: &'static str,
    label: &'static str,
    href: String,
    active: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RestaurantPageContext {
    lang: &'static str,
    title: String,
    labels: PageLabels,
    view: BrowserView,
    popular: Vec<ItemCard>,
    languages: Vec<LanguageLink>,
    meal_links: Vec<LinkView>,
    category_tabs: Vec<LinkView>,
    chips: Vec<LinkView>,
    /// JSON string literal for `history.replaceState`, when the URL changed.
    replace_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MenuItemPageContext {
    lang: &'static str,
    title: String,
    labels: PageLabels,
    item: ItemDetails,
    back_href: String,
    favorite: bool,
    favorite_action: String,
}

#[derive(Debug, Serialize)]
struct SuggestionLink {
    id: &'static str,
    label: &'static str,
    href: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AssistantPageContext {
    lang: &'static str,
    title: String,
    labels: AssistantLabels,
    assistant_name: String,
    has_credits: bool,
    prompt: String,
    form_action: String,
    back_href: String,
    suggestions: Vec<SuggestionLink>,
    answered: bool,
    assistant_text: String,
    cards: Vec<CandidateCard>,
    error: Option<&'static str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NotFoundContext {
    lang: &'static str,
    title: &'static str,
    message: &'static str,
    labels: PageLabels,
    home_href: String,
}

// ===== PAGES =====

pub struct StorefrontPages {
    backend: Arc<BackendClient>,
    menu_api: Arc<dyn MenuApi>,
    ai_router: Arc<AiRouterService>,
    renderer: PageRenderer,
    default_locale: Locale,
}

impl StorefrontPages {
    pub fn new(
        backend: Arc<BackendClient>,
        menu_api: Arc<dyn MenuApi>,
        ai_router: Arc<AiRouterService>,
        default_locale: Locale,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            backend,
            menu_api,
            ai_router,
            renderer: PageRenderer::new()?,
            default_locale,
        })
    }

    pub fn locale_for(&self, segment: &str) -> Locale {
        resolve_route_locale(segment, self.default_locale)
    }

    /// `location` is the request path plus query, e.g.
    /// `/mk/restaurant/r1?kind=drink&categoryId=c1`.
    pub async fn restaurant_page(
        &self,
        locale_segment: &str,
        restaurant_id: &str,
        location: &str,
    ) -> Result<RenderedPage, ApiError> {
        let locale = self.locale_for(locale_segment);
        let page = PageLocation::parse(location)
            .ok_or_else(|| ApiError::BadRequest(format!("Invalid page location: {}", location)))?;
        let meal = read_meal_kind(&page);
        let candidate = read_selection_candidate(&page);
        let resolver = LabelResolver::new(locale, self.default_locale);

        let (name, prefetch, popular) = tokio::join!(
            self.restaurant_name(restaurant_id, &resolver),
            fetch_initial_menu_data(
                self.menu_api.as_ref(),
                restaurant_id,
                meal,
                candidate.category_id.as_deref(),
                candidate.subcategory_id.as_ref().map(|sub| sub.as_str()),
            ),
            self.popular_items(restaurant_id, meal, locale, &resolver),
        );

        let session = MenuSession::start(
            Arc::clone(&self.menu_api),
            BrowserInit {
                restaurant_id: restaurant_id.to_string(),
                meal,
                resolver: resolver.clone(),
                location: page.to_path(),
                memory: SelectionMemory::new(Arc::new(MemoryStorage::new())),
                prefetch,
            },
        );
        session.settled().await;

        let view = session.view();
        let current = session.location();
        let replace_url = (current != page.to_path())
            .then(|| script_string(&current))
            .transpose()?;

        let context = RestaurantPageContext {
            lang: locale.code(),
            title: name.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            labels: PageLabels::for_locale(locale),
            languages: language_links(&current, locale),
            meal_links: meal_links(&current, meal, locale),
            category_tabs: category_links(&view, &current),
            chips: chip_links(&view, &current),
            popular,
            view,
            replace_url,
        };

        Ok(RenderedPage {
            html: self.renderer.render("restaurant", &context)?,
            found: true,
        })
    }

    pub async fn menu_item_page(
        &self,
        locale_segment: &str,
        restaurant_id: &str,
        item_id: &str,
        kind: Option<&str>,
        favorites: &Favorites,
    ) -> Result<RenderedPage, ApiError> {
        let locale = self.locale_for(locale_segment);
        let payload = match self.backend.menu_item(restaurant_id, item_id, kind).await {
            Ok(response) if response.is_success() => response.body,
            Ok(response) => {
                debug!("Menu item {} answered {}", item_id, response.status);
                None
            }
            Err(e @ ApiError::Configuration(_)) => return Err(e),
            Err(e) => {
                warn!("Menu item {} could not be loaded: {}", item_id, e);
                None
            }
        };

        let Some(payload) = payload.filter(|p| !p.is_null()) else {
            return self.not_found_page(locale);
        };

        let resolver = LabelResolver::new(locale, self.default_locale);
        let item = map_item_details(&payload, item_id, &resolver);
        let meal = MealKind::from_query(kind);
        let menu_path = format!("/restaurant/{restaurant_id}");
        let menu_path = sync_meal_kind_query(&menu_path, meal).unwrap_or(menu_path);

        let favorite_path = item_path(restaurant_id, item_id, meal, "/favorite");

        let context = MenuItemPageContext {
            lang: locale.code(),
            title: item.name.clone(),
            labels: PageLabels::for_locale(locale),
            back_href: build_localized_path(&menu_path, locale),
            favorite: favorites.contains(Some(restaurant_id), item_id),
            favorite_action: build_localized_path(&favorite_path, locale),
            item,
        };

        Ok(RenderedPage {
            html: self.renderer.render("menu_item", &context)?,
            found: true,
        })
    }

    /// Flips the item in the visitor's favorites and returns the item page
    /// to redirect back to.
    pub fn toggle_favorite(
        &self,
        locale_segment: &str,
        restaurant_id: &str,
        item_id: &str,
        kind: Option<&str>,
        favorites: &Favorites,
    ) -> String {
        let locale = self.locale_for(locale_segment);
        let now_favorite = favorites.toggle(Some(restaurant_id), item_id);
        debug!("Item {} favorite={} for {}", item_id, now_favorite, restaurant_id);
        let meal = MealKind::from_query(kind);
        build_localized_path(&item_path(restaurant_id, item_id, meal, ""), locale)
    }

    /// Assistant page. A non-empty `prompt` is sent to the AI router when
    /// the restaurant still has credits, and the reply is rendered as cards.
    pub async fn assistant_page(
        &self,
        locale_segment: &str,
        restaurant_id: &str,
        prompt: Option<&str>,
    ) -> Result<RenderedPage, ApiError> {
        let locale = self.locale_for(locale_segment);
        let labels = AssistantLabels::for_locale(locale);
        let resolver = LabelResolver::new(locale, self.default_locale);
        let record = self.restaurant_record(restaurant_id).await;

        let remaining = record
            .as_ref()
            .and_then(|r| r.get("aiCredits")?.get("remaining")?.as_f64())
            .unwrap_or(0.0);
        let has_credits = remaining > 0.0;
        let prompt = prompt.map(str::trim).unwrap_or_default();

        let mut reply = None;
        let mut error = None;
        if has_credits && !prompt.is_empty() {
            match self.ai_router.route(restaurant_id, prompt).await {
                Ok(payload) => reply = Some(AssistantReply::from_payload(&payload)),
                Err(e) => {
                    warn!("Assistant prompt failed for {}: {}", restaurant_id, e);
                    error = Some(labels.failed);
                }
            }
        }

        let display = reply.as_ref().and_then(|r| r.language).unwrap_or(locale);
        let assistant_name = record
            .as_ref()
            .and_then(|r| r.get("aiAssistantName"))
            .map(LocalizedText::from_value)
            .map(|text| LabelResolver::new(display, self.default_locale).resolve(Some(&text), ""))
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ASSISTANT_NAME.to_string());
        let title = record
            .as_ref()
            .and_then(|r| record_name(r.get("name")?, &resolver))
            .unwrap_or_else(|| DEFAULT_TITLE.to_string());

        let assistant_path = build_localized_path(&format!("/restaurant/{restaurant_id}/ai-assistant"), locale);
        let suggestions = suggestion_prompts(locale)
            .into_iter()
            .map(|(id, label)| SuggestionLink {
                id,
                label,
                href: rewrite(&assistant_path, |page| page.set("prompt", label)),
            })
            .collect();

        let context = AssistantPageContext {
            lang: locale.code(),
            title,
            assistant_name,
            has_credits,
            prompt: prompt.to_string(),
            back_href: build_localized_path(&format!("/restaurant/{restaurant_id}"), locale),
            form_action: assistant_path,
            suggestions,
            answered: reply.is_some(),
            assistant_text: reply.as_ref().map(|r| r.assistant_text.clone()).unwrap_or_default(),
            cards: reply
                .map(|r| r.cards(restaurant_id, locale, self.default_locale))
                .unwrap_or_default(),
            error,
            labels,
        };

        Ok(RenderedPage {
            html: self.renderer.render("ai_assistant", &context)?,
            found: true,
        })
    }

    pub fn not_found_page(&self, locale: Locale) -> Result<RenderedPage, ApiError> {
        let context = NotFoundContext {
            lang: locale.code(),
            title: not_found_message(locale),
            message: not_found_message(locale),
            labels: PageLabels::for_locale(locale),
            home_href: build_localized_path("/", locale),
        };
        Ok(RenderedPage {
            html: self.renderer.render("not_found", &context)?,
            found: false,
        })
    }

    /// `data.name` as a plain string or a localized record; `None` on any failure.
    async fn restaurant_name(&self, restaurant_id: &str, resolver: &LabelResolver) -> Option<String> {
        let record = self.restaurant_record(restaurant_id).await?;
        record_name(record.get("name")?, resolver)
    }

    /// The restaurant's `data` block (or the whole body when there is none).
    async fn restaurant_record(&self, restaurant_id: &str) -> Option<Value> {
        let response = match self.backend.restaurant(restaurant_id).await {
            Ok(response) if response.is_success() => response,
            Ok(response) => {
                debug!("Restaurant {} answered {}", restaurant_id, response.status);
                return None;
            }
            Err(e) => {
                warn!("Restaurant lookup failed for {}: {}", restaurant_id, e);
                return None;
            }
        };

        let mut body = response.body?;
        match body.get_mut("data").map(Value::take) {
            Some(data) if !data.is_null() => Some(data),
            _ => Some(body).filter(Value::is_object),
        }
    }

    async fn popular_items(
        &self,
        restaurant_id: &str,
        meal: MealKind,
        locale: Locale,
        resolver: &LabelResolver,
    ) -> Vec<ItemCard> {
        let query = ItemQuery::popular(restaurant_id, meal, POPULAR_LIMIT);
        match self.menu_api.fetch_items(&query).await {
            Ok(raw) => map_items(&raw, resolver)
                .iter()
                .map(|item| ItemCard::new(item, restaurant_id, meal, locale))
                .collect(),
            Err(e) => {
                warn!("Popular items unavailable for {}: {}", restaurant_id, e);
                Vec::new()
            }
        }
    }
}

fn record_name(name: &Value, resolver: &LabelResolver) -> Option<String> {
    let name = match name {
        Value::String(s) => s.trim().to_string(),
        other => resolver.resolve(Some(&LocalizedText::from_value(other)), ""),
    };
    (!name.is_empty()).then_some(name)
}

// ===== LINKS =====

fn item_path(restaurant_id: &str, item_id: &str, meal: MealKind, suffix: &str) -> String {
    let path = format!("/restaurant/{restaurant_id}/menuItem/{item_id}{suffix}");
    sync_meal_kind_query(&path, meal).unwrap_or(path)
}

/// JSON string literal safe to embed inside `<script>`.
fn script_string(value: &str) -> Result<String, ApiError> {
    serde_json::to_string(value)
        .map(|json| json.replace('<', "\\u003c"))
        .map_err(|e| ApiError::Internal(format!("Failed to encode URL: {}", e)))
}

fn language_links(current: &str, active: Locale) -> Vec<LanguageLink> {
    [Locale::Mk, Locale::Sq, Locale::En]
        .into_iter()
        .map(|locale| LanguageLink {
            code: locale.code(),
            label: match locale {
                Locale::Mk => "МК",
                Locale::Sq => "SQ",
                Locale::En => "EN",
            },
            href: build_localized_path(current, locale),
            active: locale == active,
        })
        .collect()
}

fn meal_links(current: &str, active: MealKind, locale: Locale) -> Vec<LinkView> {
    [MealKind::Food, MealKind::Drink]
        .into_iter()
        .map(|meal| {
            // Switching kind starts over from that kind's default selection.
            let href = PageLocation::parse(current)
                .map(|mut page| {
                    page.delete("categoryId");
                    page.delete("subcategoryId");
                    let path = page.to_path();
                    sync_meal_kind_query(&path, meal).unwrap_or(path)
                })
                .unwrap_or_else(|| current.to_string());
            LinkView {
                label: meal_label(meal, locale).to_string(),
                href,
                active: meal == active,
            }
        })
        .collect()
}

fn category_links(view: &BrowserView, current: &str) -> Vec<LinkView> {
    view.categories
        .iter()
        .map(|tab| LinkView {
            label: tab.label.clone(),
            href: rewrite(current, |page| {
                page.set("categoryId", &tab.id);
                page.delete("subcategoryId");
            }),
            active: tab.active,
        })
        .collect()
}

fn chip_links(view: &BrowserView, current: &str) -> Vec<LinkView> {
    view.chips
        .iter()
        .map(|chip| LinkView {
            label: chip.label.clone(),
            href: rewrite(current, |page| {
                if chip.id == SubcategoryId::ALL {
                    page.delete("subcategoryId");
                } else {
                    page.set("subcategoryId", &chip.id);
                }
            }),
            active: chip.active,
        })
        .collect()
}

fn rewrite(current: &str, edit: impl FnOnce(&mut PageLocation)) -> String {
    match PageLocation::parse(current) {
        Some(mut page) => {
            edit(&mut page);
            page.to_path()
        }
        None => current.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::api::MockMenuApi;
    use crate::config::AiRouterConfig;
    use crate::menu::storage::KeyValueStorage;
    use crate::menu::model::payload_list;
    use reqwest::Client;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn menu_api() -> MockMenuApi {
        let mut api = MockMenuApi::new();
        api.expect_fetch_categories().returning(|_, _| {
            Ok(payload_list(Some(&json!([
                { "_id": "c1", "sortOrder": 1, "name": { "mk": "Главни", "en": "Mains" }, "children": [
                    { "_id": "s1", "name": { "en": "Beef" } }
                ]},
                { "_id": "c2", "sortOrder": 2, "name": { "en": "Salads" } }
            ]))))
        });
        api.expect_fetch_items().returning(|query| {
            if query.popular {
                return Ok(payload_list(Some(&json!([{ "_id": "p1", "name": { "en": "Pizza" }, "price": 420 }]))));
            }
            Ok(payload_list(Some(&json!([{ "_id": "i1", "name": { "en": "Burger" }, "price": 370 }]))))
        });
        api
    }

    fn pages(backend_url: Option<String>, api: MockMenuApi) -> StorefrontPages {
        let router_url = backend_url
            .as_deref()
            .map(|url| format!("{url}/api/ai/router"))
            .unwrap_or_default();
        StorefrontPages::new(
            Arc::new(BackendClient::new(Client::new(), backend_url)),
            Arc::new(api),
            Arc::new(AiRouterService::new(
                Client::new(),
                AiRouterConfig {
                    service_url: router_url,
                    service_token: None,
                },
            )),
            Locale::Mk,
        )
        .unwrap()
    }

    async fn mount_restaurant(server: &MockServer, data: Value) {
        Mock::given(method("GET"))
            .and(path("/api/restaurants/r1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": data })))
            .mount(server)
            .await;
    }

    fn no_favorites() -> Favorites {
        Favorites::new(Arc::new(MemoryStorage::new()))
    }

    #[test]
    fn templates_register() {
        assert!(PageRenderer::new().is_ok());
    }

    #[test]
    fn attribute_values_use_default_html_escaping() {
        let renderer = PageRenderer::new().unwrap();
        let context = NotFoundContext {
            lang: "en",
            title: "Not found",
            message: "<b>x</b>",
            labels: PageLabels::for_locale(Locale::En),
            home_href: "/en?a=`1`&b=2".to_string(),
        };
        let html = renderer.render("not_found", &context).unwrap();
        assert!(html.contains("href=\"/en?a&#x3D;&#x60;1&#x60;&amp;b&#x3D;2\""));
        assert!(html.contains("&lt;b&gt;x&lt;/b&gt;"));
    }

    #[test]
    fn script_string_escapes_tags() {
        assert_eq!(script_string("/mk?x=</script>").unwrap(), "\"/mk?x=\\u003c/script>\"");
    }

    #[tokio::test]
    async fn restaurant_page_renders_reconciled_menu() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/restaurants/r1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "data": { "name": { "en": "Bistro" } } })),
            )
            .mount(&server)
            .await;

        let page = pages(Some(server.uri()), menu_api())
            .restaurant_page("en", "r1", "/en/restaurant/r1")
            .await
            .unwrap();

        assert!(page.found);
        assert!(page.html.contains("<title>Bistro</title>"));
        assert!(page.html.contains("Burger"));
        assert!(page.html.contains("370ден"));
        assert!(page.html.contains("Pizza"));
        assert!(page.html.contains("/en/restaurant/r1/menuItem/i1?kind&#x3D;food"));
        // Reconciliation picked c1/s1, which the browser URL must reflect.
        assert!(page.html.contains("replaceState"));
        assert!(page.html.contains("categoryId=c1&subcategoryId=s1"));
    }

    #[tokio::test]
    async fn restaurant_name_failure_falls_back_to_default_title() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/restaurants/r1"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let page = pages(Some(server.uri()), menu_api())
            .restaurant_page("xx", "r1", "/xx/restaurant/r1?categoryId=c1&subcategoryId=s1")
            .await
            .unwrap();
        assert!(page.html.contains("<title>Smart Menu</title>"));
        assert!(page.html.contains("lang=\"mk\""));
        assert!(!page.html.contains("replaceState"));
    }

    #[tokio::test]
    async fn menu_item_page_forwards_kind_and_renders_allergens() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/menuItems/r1/menu-items/i1"))
            .and(query_param("kind", "drink"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {
                    "_id": "i1",
                    "name": { "en": "Lemonade" },
                    "price": 150,
                    "allergens": [{ "code": "gluten", "label": { "en": "Gluten" } }]
                }
            })))
            .mount(&server)
            .await;

        let page = pages(Some(server.uri()), MockMenuApi::new())
            .menu_item_page("en", "r1", "i1", Some("drink"), &no_favorites())
            .await
            .unwrap();
        assert!(page.found);
        assert!(page.html.contains("Lemonade"));
        assert!(page.html.contains("150ден"));
        assert!(page.html.contains("data-allergen=\"gluten\""));
        assert!(page.html.contains("href=\"/en/restaurant/r1?kind&#x3D;drink\""));
        assert!(page.html.contains("action=\"/en/restaurant/r1/menuItem/i1/favorite?kind&#x3D;drink\""));
        assert!(page.html.contains("Add to favorites"));
    }

    #[tokio::test]
    async fn menu_item_page_reflects_stored_favorite() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/menuItems/r1/menu-items/i1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "data": { "_id": "i1", "name": { "en": "Burger" } } })),
            )
            .mount(&server)
            .await;

        let storage = Arc::new(MemoryStorage::new());
        storage.set_item("favorites:r1", r#"["i1"]"#).unwrap();
        let favorites = Favorites::new(storage);

        let page = pages(Some(server.uri()), MockMenuApi::new())
            .menu_item_page("en", "r1", "i1", None, &favorites)
            .await
            .unwrap();
        assert!(page.html.contains("aria-pressed=\"true\""));
        assert!(page.html.contains("Remove from favorites"));
    }

    #[test]
    fn toggle_favorite_flips_and_points_back_at_item() {
        let storage = Arc::new(MemoryStorage::new());
        let favorites = Favorites::new(storage.clone());
        let pages = pages(None, MockMenuApi::new());

        let location = pages.toggle_favorite("sq", "r1", "i1", Some("drink"), &favorites);
        assert_eq!(location, "/sq/restaurant/r1/menuItem/i1?kind=drink");
        assert_eq!(storage.get_item("favorites:r1").unwrap().as_deref(), Some(r#"["i1"]"#));

        let location = pages.toggle_favorite("zz", "r1", "i1", None, &favorites);
        assert_eq!(location, "/mk/restaurant/r1/menuItem/i1");
        assert!(!favorites.contains(Some("r1"), "i1"));
    }

    #[tokio::test]
    async fn missing_menu_item_renders_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "gone" })))
            .mount(&server)
            .await;

        let page = pages(Some(server.uri()), MockMenuApi::new())
            .menu_item_page("en", "r1", "nope", None, &no_favorites())
            .await
            .unwrap();
        assert!(!page.found);
        assert!(page.html.contains("Not found"));
    }

    #[tokio::test]
    async fn assistant_page_renders_router_cards() {
        let server = MockServer::start().await;
        mount_restaurant(
            &server,
            json!({ "name": "Bistro", "aiAssistantName": { "en": "Chef Ana" }, "aiCredits": { "remaining": 3 } }),
        )
        .await;
        Mock::given(method("POST"))
            .and(path("/api/ai/router"))
            .and(body_json(json!({ "restaurantId": "r1", "message": "something light" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {
                    "router": { "assistantText": "Try the salad", "language": "en" },
                    "candidates": [{ "_id": "i7", "name": { "en": "Green salad" } }]
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let page = pages(Some(server.uri()), MockMenuApi::new())
            .assistant_page("mk", "r1", Some("  something light "))
            .await
            .unwrap();

        assert!(page.found);
        assert!(page.html.contains("<title>Bistro</title>"));
        assert!(page.html.contains("Try the salad"));
        assert!(page.html.contains("Green salad"));
        assert!(page.html.contains("Give this special a try."));
        assert!(page.html.contains("href=\"/mk/restaurant/r1/menuItem/i7\""));
        assert!(page.html.contains("value=\"something light\""));
        assert!(page.html.contains("href=\"/mk/restaurant/r1\""));
    }

    #[tokio::test]
    async fn assistant_page_without_prompt_offers_suggestions_only() {
        let server = MockServer::start().await;
        mount_restaurant(&server, json!({ "aiCredits": { "remaining": 1 } })).await;
        Mock::given(method("POST"))
            .and(path("/api/ai/router"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let page = pages(Some(server.uri()), MockMenuApi::new())
            .assistant_page("en", "r1", Some("   "))
            .await
            .unwrap();

        assert!(page.html.contains("Асистентот!"));
        assert!(page.html.contains("data-suggestion=\"no-lactose\""));
        assert!(page.html.contains("/en/restaurant/r1/ai-assistant?prompt&#x3D;Surprise+me"));
        assert!(!page.html.contains("class=\"reply\""));
    }

    #[tokio::test]
    async fn assistant_page_without_credits_skips_the_router() {
        let server = MockServer::start().await;
        mount_restaurant(&server, json!({ "aiCredits": { "remaining": 0 } })).await;
        Mock::given(method("POST"))
            .and(path("/api/ai/router"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let page = pages(Some(server.uri()), MockMenuApi::new())
            .assistant_page("en", "r1", Some("pizza"))
            .await
            .unwrap();
        assert!(page.html.contains("The assistant is not available right now."));
        assert!(!page.html.contains("name=\"prompt\""));
    }

    #[tokio::test]
    async fn assistant_router_failure_renders_error_and_empty_reply() {
        let server = MockServer::start().await;
        mount_restaurant(&server, json!({ "aiCredits": { "remaining": 2 } })).await;
        Mock::given(method("POST"))
            .and(path("/api/ai/router"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({ "error": "No credits left" })))
            .mount(&server)
            .await;

        let page = pages(Some(server.uri()), MockMenuApi::new())
            .assistant_page("en", "r1", Some("pizza"))
            .await
            .unwrap();
        assert!(page.found);
        assert!(page.html.contains("The assistant did not answer. Please try again."));
        assert!(!page.html.contains("class=\"reply\""));
    }
}
