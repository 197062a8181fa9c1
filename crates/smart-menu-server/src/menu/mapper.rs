use super::model::{Category, MealKind, MenuItem, RawCategory, RawMenuItem, Subcategory};
use crate::i18n::LabelResolver;
use serde_json::Value;

const CATEGORY_FALLBACK: &str = "Category";
const SUBCATEGORY_FALLBACK: &str = "Subcategory";
const ITEM_FALLBACK: &str = "Item";

/// Stable ascending sort by `sortOrder` (missing = 0). Input is left untouched.
pub fn sorted_by_order(list: &[RawCategory]) -> Vec<&RawCategory> {
    let mut sorted: Vec<&RawCategory> = list.iter().collect();
    sorted.sort_by(|a, b| a.order().total_cmp(&b.order()));
    sorted
}

/// Maps backend categories into the browser shape, sorted at both levels,
/// labels resolved for the resolver's locale.
pub fn map_categories(raw: &[RawCategory], resolver: &LabelResolver) -> Vec<Category> {
    sorted_by_order(raw)
        .into_iter()
        .map(|category| Category {
            id: category.id.clone(),
            label: resolver.resolve(Some(&category.name), CATEGORY_FALLBACK),
            subcategories: sorted_by_order(&category.children)
                .into_iter()
                .map(|sub| Subcategory {
                    id: sub.id.clone(),
                    label: resolver.resolve(Some(&sub.name), SUBCATEGORY_FALLBACK),
                })
                .collect(),
        })
        .collect()
}

pub fn map_items(raw: &[RawMenuItem], resolver: &LabelResolver) -> Vec<MenuItem> {
    raw.iter().map(|item| map_item(item, resolver)).collect()
}

pub fn map_item(item: &RawMenuItem, resolver: &LabelResolver) -> MenuItem {
    let fallback_title = item.title.as_deref().unwrap_or(ITEM_FALLBACK);

    MenuItem {
        id: item
            .backend_id
            .clone()
            .or_else(|| item.id.clone())
            .unwrap_or_default(),
        title: resolver.resolve(item.name.as_ref(), fallback_title),
        image_url: item
            .image
            .as_ref()
            .and_then(|image| image.url.clone())
            .or_else(|| item.image_url.clone())
            .unwrap_or_default(),
        price: price_or_zero(&item.price),
        kind: [&item.kind, &item.base_category, &item.item_type]
            .into_iter()
            .flatten()
            .find_map(|kind| MealKind::parse(kind)),
    }
}

fn price_or_zero(value: &Value) -> f64 {
    value.as_f64().filter(|price| price.is_finite()).unwrap_or(0.0)
}
