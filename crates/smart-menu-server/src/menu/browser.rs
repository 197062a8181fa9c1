//! Menu browser state machine.
//!
//! Owns category/item lists and the `(category, subcategory)` selection for
//! one `(restaurant, meal kind)` pair. The machine never performs I/O: it
//! returns [`Effect`]s for the caller to execute and accepts their results
//! back tagged with the [`RequestTicket`] they were issued with. Results whose
//! ticket is no longer the latest for their slot are dropped.

use super::api::ItemQuery;
use super::mapper::{map_categories, map_items};
use super::model::{Category, MealKind, MenuItem, RawCategory, RawMenuItem, Selection, SubcategoryId};
use super::prefetch::PrefetchedMenuData;
use super::query::{
    read_selection_candidate, retarget_restaurant_query, sync_meal_kind_query, sync_selection_query,
    PageLocation,
};
use super::selection::{default_subcategory, find_category, reconcile, revalidate, SelectionCandidate};
use super::storage::SelectionMemory;
use crate::i18n::{build_localized_path, LabelResolver, Locale, LocalizedText};
use crate::utils::error::ApiError;
use serde::Serialize;
use tracing::{debug, warn};

pub const CATEGORIES_ERROR: &str = "Не успеав да ги вчитам категориите. Обиди се повторно.";
pub const ITEMS_ERROR: &str = "Не успеав да ги вчитам производите. Обиди се повторно.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestTicket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchSlot {
    Categories,
    Items,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    FetchCategories {
        ticket: RequestTicket,
        restaurant_id: String,
        meal: MealKind,
    },
    FetchItems {
        ticket: RequestTicket,
        query: ItemQuery,
    },
    /// Replace the current history entry (no new entry, no scroll).
    ReplaceUrl(String),
}

impl Effect {
    pub fn slot(&self) -> Option<FetchSlot> {
        match self {
            Effect::FetchCategories { .. } => Some(FetchSlot::Categories),
            Effect::FetchItems { .. } => Some(FetchSlot::Items),
            Effect::ReplaceUrl(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the first non-empty category list.
    Uninitialized,
    /// Initial selection has been reconciled; URL/storage are no longer consulted.
    Stable,
}

pub struct BrowserInit {
    pub restaurant_id: String,
    pub meal: MealKind,
    pub resolver: LabelResolver,
    /// Current page location (`/path?query`).
    pub location: String,
    pub memory: SelectionMemory,
    pub prefetch: Option<PrefetchedMenuData>,
}

pub struct MenuBrowser {
    restaurant_id: String,
    meal: MealKind,
    resolver: LabelResolver,
    location: String,
    memory: SelectionMemory,
    prefetch: Option<PrefetchedMenuData>,

    phase: Phase,
    raw_categories: Vec<RawCategory>,
    categories: Vec<Category>,
    raw_items: Vec<RawMenuItem>,
    items: Vec<MenuItem>,
    selection: Option<Selection>,

    loading_categories: bool,
    loading_items: bool,
    categories_error: Option<&'static str>,
    items_error: Option<&'static str>,

    next_ticket: u64,
    pending_categories: Option<RequestTicket>,
    pending_items: Option<RequestTicket>,
}

impl MenuBrowser {
    pub fn new(init: BrowserInit) -> Self {
        let prefetch = init.prefetch.filter(|data| {
            let usable = data.is_usable_for(&init.restaurant_id, init.meal);
            if !usable {
                debug!(
                    "Ignoring prefetched menu for {} ({}), requested {} ({})",
                    data.restaurant_id, data.meal, init.restaurant_id, init.meal
                );
            }
            usable
        });

        Self {
            restaurant_id: init.restaurant_id,
            meal: init.meal,
            resolver: init.resolver,
            location: init.location,
            memory: init.memory,
            prefetch,
            phase: Phase::Uninitialized,
            raw_categories: Vec::new(),
            categories: Vec::new(),
            raw_items: Vec::new(),
            items: Vec::new(),
            selection: None,
            loading_categories: true,
            loading_items: false,
            categories_error: None,
            items_error: None,
            next_ticket: 0,
            pending_categories: None,
            pending_items: None,
        }
    }

    // ===== ACCESSORS =====

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn meal(&self) -> MealKind {
        self.meal
    }

    pub fn is_loading(&self) -> bool {
        self.loading_categories || self.loading_items
    }

    // ===== LIFECYCLE =====

    /// First effects after mount. Usable prefetched data replaces the
    /// category fetch (and the item fetch, when it matches the reconciled
    /// selection).
    pub fn start(&mut self) -> Vec<Effect> {
        let Some(prefetch) = self.prefetch.take() else {
            return vec![self.request_categories()];
        };

        debug!("Using prefetched menu for {} ({})", self.restaurant_id, self.meal);
        let seed = prefetch.seed();
        let prefetched_selection = prefetch.selection();
        self.loading_categories = false;
        self.install_categories(prefetch.raw_categories);

        if self.categories.is_empty() {
            return Vec::new();
        }

        let prefetched_items = prefetched_selection.map(|selection| (selection, prefetch.raw_items));
        self.reconcile_initial(seed, prefetched_items)
    }

    /// Meal-kind switch: everything is reset and reconciled again from scratch.
    pub fn set_meal_kind(&mut self, meal: MealKind) -> Vec<Effect> {
        if meal == self.meal {
            return Vec::new();
        }
        self.meal = meal;
        self.reset();

        let mut effects = Vec::new();
        if let Some(next) = sync_meal_kind_query(&self.location, meal) {
            effects.push(self.replace_url(next));
        }
        effects.push(self.request_categories());
        effects
    }

    pub fn set_restaurant(&mut self, restaurant_id: &str) -> Vec<Effect> {
        if restaurant_id == self.restaurant_id {
            return Vec::new();
        }
        self.restaurant_id = restaurant_id.to_string();
        self.reset();

        let mut effects = Vec::new();
        if let Some(next) = retarget_restaurant_query(&self.location, restaurant_id) {
            effects.push(self.replace_url(next));
        }
        effects.push(self.request_categories());
        effects
    }

    /// Re-labels categories and items; the selection is re-validated but URL
    /// and storage are not consulted again.
    pub fn set_locale(&mut self, locale: Locale) -> Vec<Effect> {
        if locale == self.resolver.locale() {
            return Vec::new();
        }
        self.resolver = LabelResolver::new(locale, self.resolver.default_locale());
        self.categories = map_categories(&self.raw_categories, &self.resolver);
        self.items = map_items(&self.raw_items, &self.resolver);

        if self.phase != Phase::Stable {
            return Vec::new();
        }
        let next = revalidate(&self.categories, self.selection.as_ref());
        self.commit_selection(next, None)
    }

    fn reset(&mut self) {
        self.phase = Phase::Uninitialized;
        self.prefetch = None;
        self.raw_categories.clear();
        self.categories.clear();
        self.raw_items.clear();
        self.items.clear();
        self.selection = None;
        self.categories_error = None;
        self.items_error = None;
        self.loading_items = false;
        self.pending_categories = None;
        self.pending_items = None;
    }

    // ===== USER INTERACTION =====

    /// Clicking a category. Re-selecting the current one is a no-op.
    pub fn select_category(&mut self, category_id: &str) -> Vec<Effect> {
        if self.phase != Phase::Stable {
            return Vec::new();
        }
        if self.selection.as_ref().map(|s| s.category_id.as_str()) == Some(category_id) {
            return Vec::new();
        }
        let Some(category) = find_category(&self.categories, category_id) else {
            warn!("Ignoring selection of unknown category {}", category_id);
            return Vec::new();
        };

        let next = Selection::new(category.id.clone(), default_subcategory(category));
        self.commit_selection(Some(next), None)
    }

    /// Clicking a subcategory chip (or `all`).
    pub fn select_subcategory(&mut self, subcategory_id: SubcategoryId) -> Vec<Effect> {
        if self.phase != Phase::Stable {
            return Vec::new();
        }
        let Some(current) = self.selection.clone() else {
            return Vec::new();
        };
        if current.subcategory_id == subcategory_id {
            return Vec::new();
        }
        let valid = match &subcategory_id {
            SubcategoryId::All => true,
            SubcategoryId::Id(id) => find_category(&self.categories, &current.category_id)
                .is_some_and(|category| category.has_subcategory(id)),
        };
        if !valid {
            warn!("Ignoring selection of unknown subcategory {}", subcategory_id);
            return Vec::new();
        }

        self.commit_selection(Some(Selection::new(current.category_id, subcategory_id)), None)
    }

    // ===== FETCH RESULTS =====

    pub fn apply_categories(
        &mut self,
        ticket: RequestTicket,
        result: Result<Vec<RawCategory>, ApiError>,
    ) -> Vec<Effect> {
        if self.pending_categories != Some(ticket) {
            debug!("Discarding stale categories response {:?}", ticket);
            return Vec::new();
        }
        self.pending_categories = None;
        self.loading_categories = false;

        match result {
            Ok(raw) => {
                self.categories_error = None;
                self.install_categories(raw);

                match self.phase {
                    Phase::Uninitialized if !self.categories.is_empty() => {
                        self.reconcile_initial(SelectionCandidate::default(), None)
                    }
                    Phase::Uninitialized => Vec::new(),
                    Phase::Stable => {
                        let next = revalidate(&self.categories, self.selection.as_ref());
                        self.commit_selection(next, None)
                    }
                }
            }
            Err(e) => {
                warn!("Failed to load categories for {}: {}", self.restaurant_id, e);
                self.raw_categories.clear();
                self.categories.clear();
                self.categories_error = Some(CATEGORIES_ERROR);
                self.selection = None;
                self.clear_items();
                Vec::new()
            }
        }
    }

    pub fn apply_items(
        &mut self,
        ticket: RequestTicket,
        result: Result<Vec<RawMenuItem>, ApiError>,
    ) -> Vec<Effect> {
        if self.pending_items != Some(ticket) {
            debug!("Discarding stale items response {:?}", ticket);
            return Vec::new();
        }
        self.pending_items = None;
        self.loading_items = false;

        match result {
            Ok(raw) => {
                self.items_error = None;
                self.items = map_items(&raw, &self.resolver);
                self.raw_items = raw;
            }
            Err(e) => {
                warn!("Failed to load items for {}: {}", self.restaurant_id, e);
                self.raw_items.clear();
                self.items.clear();
                self.items_error = Some(ITEMS_ERROR);
            }
        }
        Vec::new()
    }

    // ===== INTERNALS =====

    fn install_categories(&mut self, raw: Vec<RawCategory>) {
        self.categories = map_categories(&raw, &self.resolver);
        self.raw_categories = raw;
    }

    /// One-shot reconciliation: URL → session storage → `seed` → first category.
    fn reconcile_initial(
        &mut self,
        seed: SelectionCandidate,
        prefetched_items: Option<(Selection, Vec<RawMenuItem>)>,
    ) -> Vec<Effect> {
        let mut candidate = PageLocation::parse(&self.location)
            .map(|location| read_selection_candidate(&location))
            .unwrap_or_default();
        if !candidate.is_complete() {
            candidate = candidate.or(self.memory.load(&self.restaurant_id, self.meal));
        }
        let candidate = candidate.or(seed);

        let next = reconcile(&self.categories, &candidate);
        self.phase = Phase::Stable;
        self.commit_selection(next, prefetched_items)
    }

    /// Applies a new selection. While stable, every change triggers an item
    /// fetch (unless matching prefetched items are supplied), a URL rewrite
    /// and a session-storage write.
    fn commit_selection(
        &mut self,
        next: Option<Selection>,
        prefetched_items: Option<(Selection, Vec<RawMenuItem>)>,
    ) -> Vec<Effect> {
        if next == self.selection {
            return Vec::new();
        }
        self.selection = next;

        let Some(selection) = self.selection.clone() else {
            self.clear_items();
            let mut effects = Vec::new();
            if let Some(url) = sync_selection_query(&self.location, None) {
                effects.push(self.replace_url(url));
            }
            return effects;
        };

        let mut effects = Vec::new();
        match prefetched_items.filter(|(prefetched, _)| *prefetched == selection) {
            Some((_, raw)) => {
                self.pending_items = None;
                self.loading_items = false;
                self.items_error = None;
                self.items = map_items(&raw, &self.resolver);
                self.raw_items = raw;
            }
            None => effects.push(self.request_items(&selection)),
        }

        if let Some(url) = sync_selection_query(&self.location, Some(&selection)) {
            effects.push(self.replace_url(url));
        }
        self.memory.save(&self.restaurant_id, self.meal, &selection);
        effects
    }

    fn clear_items(&mut self) {
        self.raw_items.clear();
        self.items.clear();
        self.pending_items = None;
        self.loading_items = false;
    }

    fn issue_ticket(&mut self) -> RequestTicket {
        self.next_ticket += 1;
        RequestTicket(self.next_ticket)
    }

    fn request_categories(&mut self) -> Effect {
        let ticket = self.issue_ticket();
        self.pending_categories = Some(ticket);
        self.loading_categories = true;
        Effect::FetchCategories {
            ticket,
            restaurant_id: self.restaurant_id.clone(),
            meal: self.meal,
        }
    }

    fn request_items(&mut self, selection: &Selection) -> Effect {
        let ticket = self.issue_ticket();
        self.pending_items = Some(ticket);
        self.loading_items = true;
        Effect::FetchItems {
            ticket,
            query: ItemQuery::for_selection(&self.restaurant_id, self.meal, selection),
        }
    }

    fn replace_url(&mut self, url: String) -> Effect {
        self.location = url.clone();
        Effect::ReplaceUrl(url)
    }

    // ===== VIEW =====

    pub fn view(&self) -> BrowserView {
        let selected_category = self
            .selection
            .as_ref()
            .and_then(|s| find_category(&self.categories, &s.category_id));
        let active_sub = self.selection.as_ref().map(|s| &s.subcategory_id);

        let chips = selected_category
            .map(|category| {
                let all_label = self.resolver.resolve(
                    Some(
                        &LocalizedText::new()
                            .with(Locale::Mk, "Сите")
                            .with(Locale::Sq, "Të gjitha")
                            .with(Locale::En, "All"),
                    ),
                    "All",
                );
                std::iter::once(ChipView {
                    id: SubcategoryId::ALL.to_string(),
                    label: all_label,
                    active: active_sub.is_some_and(SubcategoryId::is_all),
                })
                .chain(category.subcategories.iter().map(|sub| ChipView {
                    id: sub.id.clone(),
                    label: sub.label.clone(),
                    active: active_sub.map(SubcategoryId::as_str) == Some(sub.id.as_str()),
                }))
                .collect()
            })
            .unwrap_or_default();

        let locale = self.resolver.locale();
        BrowserView {
            restaurant_id: self.restaurant_id.clone(),
            meal_type: self.meal,
            locale,
            loading_categories: self.loading_categories,
            loading_items: self.loading_items,
            categories_error: self.categories_error,
            items_error: self.items_error,
            categories: self
                .categories
                .iter()
                .map(|category| CategoryTab {
                    id: category.id.clone(),
                    label: category.label.clone(),
                    active: selected_category.is_some_and(|selected| selected.id == category.id),
                })
                .collect(),
            chips,
            selected_category_id: self.selection.as_ref().map(|s| s.category_id.clone()),
            selected_subcategory_id: active_sub.map(|s| s.as_str().to_string()),
            items: self
                .items
                .iter()
                .map(|item| ItemCard::new(item, &self.restaurant_id, self.meal, locale))
                .collect(),
        }
    }
}

// ===== VIEW MODELS =====

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserView {
    pub restaurant_id: String,
    pub meal_type: MealKind,
    pub locale: Locale,
    pub loading_categories: bool,
    pub loading_items: bool,
    pub categories_error: Option<&'static str>,
    pub items_error: Option<&'static str>,
    pub categories: Vec<CategoryTab>,
    pub chips: Vec<ChipView>,
    pub selected_category_id: Option<String>,
    pub selected_subcategory_id: Option<String>,
    pub items: Vec<ItemCard>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryTab {
    pub id: String,
    pub label: String,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChipView {
    pub id: String,
    pub label: String,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemCard {
    pub id: String,
    pub title: String,
    pub image_url: String,
    pub price: f64,
    pub price_label: String,
    pub kind: MealKind,
    pub href: String,
}

impl ItemCard {
    pub fn new(item: &MenuItem, restaurant_id: &str, meal: MealKind, locale: Locale) -> Self {
        Self {
            id: item.id.clone(),
            title: item.title.clone(),
            image_url: item.image_url.clone(),
            price: item.price,
            price_label: format!("{}ден", item.price),
            kind: item.kind.unwrap_or(meal),
            href: build_localized_path(
                &format!("/restaurant/{restaurant_id}/menuItem/{}?kind={meal}", item.id),
                locale,
            ),
        }
    }
}
