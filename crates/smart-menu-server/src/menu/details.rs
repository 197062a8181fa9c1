//! Menu-item detail page mapping.

use super::allergens::{icon_entry, resolve_tooltip_label, AllergenIconEntry, ALLERGEN_FALLBACK_LABEL};
use crate::i18n::{LabelResolver, Locale, LocalizedText};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

const ITEM_FALLBACK: &str = "Item";
const IMAGE_FALLBACK: &str = "/placeholder.jpg";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDetails {
    pub id: String,
    pub name: String,
    pub description: String,
    pub image_url: String,
    pub image_alt: String,
    pub price: Option<f64>,
    pub price_label: Option<String>,
    pub allergens: Vec<AllergenBadge>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllergenBadge {
    pub key: String,
    pub code: String,
    pub label: String,
    pub icon: Option<&'static str>,
    pub tooltip: String,
}

impl AllergenBadge {
    fn new(key: String, code: String, label: String) -> Self {
        let entry: Option<AllergenIconEntry> = icon_entry(&code);
        let tooltip = resolve_tooltip_label(Some(&label), entry.as_ref());
        Self {
            key,
            code,
            label,
            icon: entry.map(|e| e.icon),
            tooltip,
        }
    }
}

/// Maps the backend item payload (`data` block or the bare record).
pub fn map_item_details(payload: &Value, item_id: &str, resolver: &LabelResolver) -> ItemDetails {
    let item = payload.get("data").filter(|d| !d.is_null()).unwrap_or(payload);
    let pick = |value: Option<&Value>, fallback: &str| {
        let text = value.map(LocalizedText::from_value);
        resolver.resolve(text.as_ref(), fallback)
    };

    let name = pick(item.get("name"), ITEM_FALLBACK);
    let image = item.get("image");

    let alt = image.map(|image| {
        [(Locale::Mk, "altMk"), (Locale::Sq, "altSq"), (Locale::En, "altEn")]
            .into_iter()
            .filter_map(|(locale, key)| image.get(key).and_then(Value::as_str).map(|alt| (locale, alt)))
            .fold(LocalizedText::new(), |text, (locale, alt)| text.with(locale, alt))
    });

    let price = item.get("price").and_then(parse_price);

    ItemDetails {
        id: string_field(item, "_id")
            .or_else(|| string_field(item, "id"))
            .unwrap_or_else(|| item_id.to_string()),
        description: pick(item.get("description"), ""),
        image_url: image
            .and_then(|image| image.get("url"))
            .and_then(Value::as_str)
            .unwrap_or(IMAGE_FALLBACK)
            .to_string(),
        image_alt: resolver.resolve(alt.as_ref(), &name),
        price,
        price_label: price.map(|p| format!("{p}ден")),
        allergens: item
            .get("allergens")
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .enumerate()
                    .filter_map(|(idx, allergen)| map_allergen(allergen, idx, resolver))
                    .collect()
            })
            .unwrap_or_default(),
        name,
    }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn map_allergen(allergen: &Value, idx: usize, resolver: &LabelResolver) -> Option<AllergenBadge> {
    match allergen {
        Value::String(raw) => {
            let value = raw.trim();
            let label = humanize_allergen(value);
            Some(AllergenBadge::new(
                if value.is_empty() { idx.to_string() } else { value.to_string() },
                normalize_allergen_code(value),
                if label.is_empty() { ALLERGEN_FALLBACK_LABEL.to_string() } else { label },
            ))
        }
        Value::Object(_) => {
            let key = string_field(allergen, "_id")
                .or_else(|| string_field(allergen, "key"))
                .unwrap_or_else(|| idx.to_string());

            let localized = |field: &str| {
                allergen
                    .get(field)
                    .map(LocalizedText::from_value)
                    .map(|text| resolver.resolve(Some(&text), ""))
                    .filter(|label| !label.is_empty())
            };
            let label = localized("label")
                .or_else(|| localized("name"))
                .or_else(|| {
                    allergen
                        .get("key")
                        .and_then(Value::as_str)
                        .map(humanize_allergen)
                        .filter(|label| !label.is_empty())
                })?;

            Some(AllergenBadge::new(key, extract_allergen_code(allergen), label))
        }
        _ => None,
    }
}

static NON_CODE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9-]").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static DASH_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"-+").unwrap());
static WORD_SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[-_\s]+").unwrap());

/// Lowercase kebab-case code with only `[a-z0-9-]`.
pub fn normalize_allergen_code(value: &str) -> String {
    let lowered = value.trim().to_lowercase();
    let dashed = WHITESPACE.replace_all(&lowered, "-");
    let ascii = NON_CODE_CHARS.replace_all(&dashed, "-");
    DASH_RUNS
        .replace_all(&ascii, "-")
        .trim_matches('-')
        .to_string()
}

/// `tree_nuts` → `Tree Nuts`.
pub fn humanize_allergen(value: &str) -> String {
    WORD_SEPARATORS
        .split(value)
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Code from the first present of `code|slug|key|name|label`; a localized
/// object contributes its `mk` or `en` text.
fn extract_allergen_code(allergen: &Value) -> String {
    let direct = ["code", "slug", "key", "name", "label"]
        .iter()
        .find_map(|field| allergen.get(*field).filter(|v| !v.is_null()));

    match direct {
        Some(Value::String(s)) => normalize_allergen_code(s),
        Some(Value::Object(map)) => ["mk", "en"]
            .iter()
            .find_map(|locale| map.get(*locale).and_then(Value::as_str))
            .map(normalize_allergen_code)
            .unwrap_or_default(),
        _ => String::new(),
    }
}

static LEADING_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?").unwrap());

/// Accepts a number, a string starting with a number (`"370 ден"`), or an
/// object carrying the first present of `amount|value|mk` as a number.
pub fn parse_price(value: &Value) -> Option<f64> {
    let price = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => LEADING_NUMBER
            .find(s.trim_start())
            .and_then(|m| m.as_str().parse::<f64>().ok()),
        Value::Object(map) => ["amount", "value", "mk"]
            .iter()
            .find_map(|key| map.get(*key).filter(|v| !v.is_null()))
            .and_then(Value::as_f64),
        _ => None,
    };
    price.filter(|price| !price.is_nan())
}
