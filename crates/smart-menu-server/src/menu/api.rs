use super::model::{MealKind, RawCategory, RawMenuItem, Selection, SubcategoryId};
use crate::utils::error::ApiError;
use async_trait::async_trait;

/// Parameters of one menu-items request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemQuery {
    pub restaurant_id: String,
    pub meal: MealKind,
    pub category_id: Option<String>,
    pub subcategory_id: SubcategoryId,
    pub popular: bool,
    pub limit: Option<u32>,
}

impl ItemQuery {
    pub fn for_selection(restaurant_id: &str, meal: MealKind, selection: &Selection) -> Self {
        Self {
            restaurant_id: restaurant_id.to_string(),
            meal,
            category_id: Some(selection.category_id.clone()),
            subcategory_id: selection.subcategory_id.clone(),
            popular: false,
            limit: None,
        }
    }

    pub fn popular(restaurant_id: &str, meal: MealKind, limit: u32) -> Self {
        Self {
            restaurant_id: restaurant_id.to_string(),
            meal,
            category_id: None,
            subcategory_id: SubcategoryId::All,
            popular: true,
            limit: Some(limit),
        }
    }

    /// Query pairs as the backend expects them; `subcategoryId` is omitted for `all`.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("kind", self.meal.as_str().to_string())];
        if let Some(category_id) = &self.category_id {
            pairs.push(("categoryId", category_id.clone()));
        }
        if !self.subcategory_id.is_all() {
            pairs.push(("subcategoryId", self.subcategory_id.as_str().to_string()));
        }
        if self.popular {
            pairs.push(("popular", "true".to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        pairs
    }
}

/// Source of menu data for the browser state machine and the prefetcher.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MenuApi: Send + Sync {
    async fn fetch_categories(
        &self,
        restaurant_id: &str,
        meal: MealKind,
    ) -> Result<Vec<RawCategory>, ApiError>;

    async fn fetch_items(&self, query: &ItemQuery) -> Result<Vec<RawMenuItem>, ApiError>;
}
