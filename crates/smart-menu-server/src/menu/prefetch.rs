use super::api::{ItemQuery, MenuApi};
use super::mapper::sorted_by_order;
use super::model::{MealKind, RawCategory, RawMenuItem, Selection, SubcategoryId};
use super::selection::SelectionCandidate;
use tracing::{debug, warn};

/// Menu data fetched on the server before first paint.
#[derive(Debug, Clone)]
pub struct PrefetchedMenuData {
    pub restaurant_id: String,
    pub meal: MealKind,
    pub raw_categories: Vec<RawCategory>,
    pub raw_items: Vec<RawMenuItem>,
    /// Empty when the backend returned no categories.
    pub category_id: String,
    pub subcategory_id: SubcategoryId,
}

impl PrefetchedMenuData {
    /// Prefetched data is only valid for the exact request it was made for.
    pub fn is_usable_for(&self, restaurant_id: &str, meal: MealKind) -> bool {
        self.restaurant_id == restaurant_id && self.meal == meal
    }

    pub fn seed(&self) -> SelectionCandidate {
        SelectionCandidate::new(Some(&self.category_id), Some(self.subcategory_id.as_str()))
    }

    pub fn selection(&self) -> Option<Selection> {
        (!self.category_id.is_empty())
            .then(|| Selection::new(self.category_id.clone(), self.subcategory_id.clone()))
    }
}

/// Resolves the requested ids against raw (unmapped) categories.
/// Unknown category → first by sort order; `all` or a childless category →
/// `all`; unknown subcategory → first child.
pub fn normalize_category_selection(
    raw_categories: &[RawCategory],
    requested_category_id: Option<&str>,
    requested_subcategory_id: Option<&str>,
) -> (String, SubcategoryId) {
    let sorted = sorted_by_order(raw_categories);
    let category = requested_category_id
        .and_then(|id| sorted.iter().find(|cat| cat.id == id))
        .or_else(|| sorted.first())
        .copied();

    let Some(category) = category.filter(|cat| !cat.id.is_empty()) else {
        return (String::new(), SubcategoryId::All);
    };

    let children = sorted_by_order(&category.children);
    if requested_subcategory_id == Some(SubcategoryId::ALL) || children.is_empty() {
        return (category.id.clone(), SubcategoryId::All);
    }

    let subcategory = requested_subcategory_id
        .and_then(|id| children.iter().find(|child| child.id == id))
        .or_else(|| children.first())
        .filter(|child| !child.id.is_empty());

    let subcategory_id = subcategory
        .map(|child| SubcategoryId::Id(child.id.clone()))
        .unwrap_or_default();
    (category.id.clone(), subcategory_id)
}

/// Fetches categories and the items for the requested (or default)
/// selection. `None` when categories cannot be loaded; item failures
/// degrade to an empty list.
pub async fn fetch_initial_menu_data(
    api: &dyn MenuApi,
    restaurant_id: &str,
    meal: MealKind,
    requested_category_id: Option<&str>,
    requested_subcategory_id: Option<&str>,
) -> Option<PrefetchedMenuData> {
    let raw_categories = match api.fetch_categories(restaurant_id, meal).await {
        Ok(categories) => categories,
        Err(e) => {
            warn!("Menu prefetch skipped for {} ({}): {}", restaurant_id, meal, e);
            return None;
        }
    };

    let (category_id, subcategory_id) = normalize_category_selection(
        &raw_categories,
        requested_category_id,
        requested_subcategory_id,
    );

    if category_id.is_empty() {
        return Some(PrefetchedMenuData {
            restaurant_id: restaurant_id.to_string(),
            meal,
            raw_categories,
            raw_items: Vec::new(),
            category_id,
            subcategory_id: SubcategoryId::All,
        });
    }

    let selection = Selection::new(category_id.clone(), subcategory_id.clone());
    let query = ItemQuery::for_selection(restaurant_id, meal, &selection);
    let raw_items = match api.fetch_items(&query).await {
        Ok(items) => items,
        Err(e) => {
            warn!("Menu prefetch could not load items for {}: {}", restaurant_id, e);
            Vec::new()
        }
    };

    debug!(
        "Prefetched {} categories / {} items for {} ({})",
        raw_categories.len(),
        raw_items.len(),
        restaurant_id,
        meal
    );

    Some(PrefetchedMenuData {
        restaurant_id: restaurant_id.to_string(),
        meal,
        raw_categories,
        raw_items,
        category_id,
        subcategory_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::api::MockMenuApi;
    use crate::menu::model::payload_list;
    use crate::utils::error::ApiError;
    use serde_json::json;

    fn raw() -> Vec<RawCategory> {
        payload_list(Some(&json!([
            { "_id": "c2", "sortOrder": 2, "children": [] },
            { "_id": "c1", "sortOrder": 1, "children": [
                { "_id": "s2", "sortOrder": 2 },
                { "_id": "s1", "sortOrder": 1 }
            ]}
        ])))
    }

    #[test]
    fn normalizes_to_first_sorted_category() {
        assert_eq!(
            normalize_category_selection(&raw(), None, None),
            ("c1".to_string(), SubcategoryId::Id("s1".into()))
        );
        assert_eq!(
            normalize_category_selection(&raw(), Some("missing"), Some("s2")),
            ("c1".to_string(), SubcategoryId::Id("s2".into()))
        );
    }

    #[test]
    fn normalizes_all_and_childless_categories() {
        assert_eq!(
            normalize_category_selection(&raw(), Some("c1"), Some("all")),
            ("c1".to_string(), SubcategoryId::All)
        );
        assert_eq!(
            normalize_category_selection(&raw(), Some("c2"), Some("s1")),
            ("c2".to_string(), SubcategoryId::All)
        );
        assert_eq!(
            normalize_category_selection(&[], Some("c1"), None),
            (String::new(), SubcategoryId::All)
        );
    }

    #[test]
    fn usability_requires_matching_request() {
        let data = PrefetchedMenuData {
            restaurant_id: "r1".into(),
            meal: MealKind::Food,
            raw_categories: Vec::new(),
            raw_items: Vec::new(),
            category_id: "c1".into(),
            subcategory_id: SubcategoryId::All,
        };
        assert!(data.is_usable_for("r1", MealKind::Food));
        assert!(!data.is_usable_for("r1", MealKind::Drink));
        assert!(!data.is_usable_for("r2", MealKind::Food));
        assert_eq!(data.seed(), SelectionCandidate::new(Some("c1"), Some("all")));
    }

    #[tokio::test]
    async fn fetches_items_for_normalized_selection() {
        let mut api = MockMenuApi::new();
        api.expect_fetch_categories()
            .times(1)
            .returning(|_, _| Ok(raw()));
        api.expect_fetch_items()
            .withf(|query| {
                query.category_id.as_deref() == Some("c1")
                    && query.subcategory_id == SubcategoryId::Id("s1".into())
            })
            .times(1)
            .returning(|_| Ok(payload_list(Some(&json!([{ "_id": "i1" }])))));

        let data = fetch_initial_menu_data(&api, "r1", MealKind::Food, None, None)
            .await
            .unwrap();
        assert_eq!(data.category_id, "c1");
        assert_eq!(data.raw_items.len(), 1);
    }

    #[tokio::test]
    async fn category_failure_skips_prefetch() {
        let mut api = MockMenuApi::new();
        api.expect_fetch_categories()
            .returning(|_, _| Err(ApiError::Configuration("BACKEND_URL is not configured.".into())));
        api.expect_fetch_items().never();

        assert!(fetch_initial_menu_data(&api, "r1", MealKind::Food, None, None)
            .await
            .is_none());
    }

    #[tokio::test]
    async fn item_failure_yields_empty_items() {
        let mut api = MockMenuApi::new();
        api.expect_fetch_categories().returning(|_, _| Ok(raw()));
        api.expect_fetch_items()
            .returning(|_| Err(ApiError::Unreachable("connection refused".into())));

        let data = fetch_initial_menu_data(&api, "r1", MealKind::Food, Some("c2"), None)
            .await
            .unwrap();
        assert_eq!(data.category_id, "c2");
        assert!(data.raw_items.is_empty());
    }
}
