use crate::i18n::LocalizedText;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

// ===== MEAL KIND =====

/// Top-level menu filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealKind {
    #[default]
    Food,
    Drink,
}

impl MealKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MealKind::Food => "food",
            MealKind::Drink => "drink",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "food" => Some(MealKind::Food),
            "drink" => Some(MealKind::Drink),
            _ => None,
        }
    }

    /// `?kind=drink` selects drinks; anything else (or nothing) is food.
    pub fn from_query(value: Option<&str>) -> Self {
        match value {
            Some("drink") => MealKind::Drink,
            _ => MealKind::Food,
        }
    }
}

impl fmt::Display for MealKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ===== SELECTION =====

/// Subcategory filter: either every subcategory or one by id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SubcategoryId {
    #[default]
    All,
    Id(String),
}

impl SubcategoryId {
    pub const ALL: &'static str = "all";

    pub fn parse(value: &str) -> Self {
        if value == Self::ALL {
            SubcategoryId::All
        } else {
            SubcategoryId::Id(value.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            SubcategoryId::All => Self::ALL,
            SubcategoryId::Id(id) => id,
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, SubcategoryId::All)
    }
}

impl From<String> for SubcategoryId {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<SubcategoryId> for String {
    fn from(value: SubcategoryId) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for SubcategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub category_id: String,
    pub subcategory_id: SubcategoryId,
}

impl Selection {
    pub fn new(category_id: impl Into<String>, subcategory_id: SubcategoryId) -> Self {
        Self {
            category_id: category_id.into(),
            subcategory_id,
        }
    }
}

// ===== BROWSER VIEW MODELS =====

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Category {
    pub id: String,
    pub label: String,
    pub subcategories: Vec<Subcategory>,
}

impl Category {
    pub fn has_subcategory(&self, id: &str) -> bool {
        self.subcategories.iter().any(|sub| sub.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subcategory {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub id: String,
    pub title: String,
    pub image_url: String,
    pub price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<MealKind>,
}

// ===== BACKEND PAYLOADS =====

/// Category record as returned by the menu backend.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCategory {
    #[serde(rename = "_id", default, deserialize_with = "lenient")]
    pub id: String,
    #[serde(default)]
    pub name: LocalizedText,
    #[serde(rename = "sortOrder", default, deserialize_with = "lenient")]
    pub sort_order: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub children: Vec<RawCategory>,
}

impl RawCategory {
    pub fn order(&self) -> f64 {
        self.sort_order.unwrap_or(0.0)
    }
}

/// Menu item record as returned by the menu backend.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMenuItem {
    #[serde(rename = "_id", default, deserialize_with = "lenient")]
    pub backend_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<LocalizedText>,
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub image: Option<RawImage>,
    #[serde(rename = "imageUrl", default, deserialize_with = "lenient")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub price: Value,
    #[serde(default, deserialize_with = "lenient")]
    pub kind: Option<String>,
    #[serde(rename = "baseCategory", default, deserialize_with = "lenient")]
    pub base_category: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "lenient")]
    pub item_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawImage {
    #[serde(default, deserialize_with = "lenient")]
    pub url: Option<String>,
}

/// Deserializes a field, falling back to its default when the backend sent a
/// value of the wrong shape.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// The list carried by a backend payload: `{ data: [...] }` or a bare array.
/// Anything else is an empty list; elements that fail to parse are skipped.
pub fn payload_list<T: DeserializeOwned>(payload: Option<&Value>) -> Vec<T> {
    payload_array(payload)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| serde_json::from_value(entry.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

/// Like [`payload_list`] but distinguishes "no array at all" from an empty one.
pub fn payload_array(payload: Option<&Value>) -> Option<&Vec<Value>> {
    let payload = payload?;
    payload
        .get("data")
        .and_then(Value::as_array)
        .or_else(|| payload.as_array())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn meal_kind_from_query_defaults_to_food() {
        assert_eq!(MealKind::from_query(Some("drink")), MealKind::Drink);
        assert_eq!(MealKind::from_query(Some("food")), MealKind::Food);
        assert_eq!(MealKind::from_query(Some("dessert")), MealKind::Food);
        assert_eq!(MealKind::from_query(None), MealKind::Food);
    }

    #[test]
    fn subcategory_id_uses_all_sentinel_on_the_wire() {
        let selection = Selection::new("c1", SubcategoryId::All);
        let encoded = serde_json::to_value(&selection).unwrap();
        assert_eq!(encoded, json!({ "categoryId": "c1", "subcategoryId": "all" }));

        let decoded: Selection =
            serde_json::from_value(json!({ "categoryId": "c1", "subcategoryId": "s9" })).unwrap();
        assert_eq!(decoded.subcategory_id, SubcategoryId::Id("s9".into()));
    }

    #[test]
    fn raw_category_tolerates_malformed_fields() {
        let raw: RawCategory = serde_json::from_value(json!({
            "_id": "c1",
            "sortOrder": "first",
            "name": 12,
            "children": "none"
        }))
        .unwrap();
        assert_eq!(raw.id, "c1");
        assert_eq!(raw.order(), 0.0);
        assert!(raw.name.is_empty());
        assert!(raw.children.is_empty());
    }

    #[test]
    fn payload_list_reads_data_or_bare_array() {
        let wrapped = json!({ "ok": true, "data": [{ "_id": "a" }, { "_id": "b" }] });
        let bare = json!([{ "_id": "a" }]);
        let object = json!({ "ok": false, "data": null });

        assert_eq!(payload_list::<RawCategory>(Some(&wrapped)).len(), 2);
        assert_eq!(payload_list::<RawCategory>(Some(&bare)).len(), 1);
        assert!(payload_list::<RawCategory>(Some(&object)).is_empty());
        assert!(payload_list::<RawCategory>(None).is_empty());
        assert!(payload_array(Some(&object)).is_none());
    }
}
