//! Allergen / dietary tag icons.
//!
//! Icons are referenced by their lucide name so the page template can render
//! them from the icon sprite.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

pub const ALLERGEN_FALLBACK_LABEL: &str = "Алерген";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllergenIconEntry {
    pub icon: &'static str,
    pub default_tooltip: Option<&'static str>,
}

const fn icon(icon: &'static str) -> AllergenIconEntry {
    AllergenIconEntry {
        icon,
        default_tooltip: None,
    }
}

const fn icon_with_tooltip(icon: &'static str, tooltip: &'static str) -> AllergenIconEntry {
    AllergenIconEntry {
        icon,
        default_tooltip: Some(tooltip),
    }
}

fn lookup(key: &str) -> Option<AllergenIconEntry> {
    let entry = match key {
        "gluten" => icon_with_tooltip("wheat", "Содржи глутен"),
        "gluten-free" => icon_with_tooltip("wheat-off", "Без глутен"),
        "wheat" => icon("wheat"),
        "dairy" => icon_with_tooltip("milk", "Содржи млечни производи"),
        "dairy-free" => icon_with_tooltip("milk-off", "Без млечни производи"),
        "milk" => icon_with_tooltip("milk", "Содржи млеко"),
        "lactose" => icon("milk"),
        "lactose-free" => icon("milk-off"),
        "egg" | "eggs" => icon("egg"),
        "egg-free" => icon_with_tooltip("egg-off", "Без јајца"),
        "fish" | "seafood" => icon("fish"),
        "fish-free" => icon_with_tooltip("fish-off", "Без риба"),
        "shellfish" | "crustacean" | "shrimp" => icon("shrimp"),
        "mollusc" => icon("shell"),
        "soy" | "legume" | "beans" => icon("bean"),
        "sesame" | "seed" | "plant" => icon("sprout"),
        "peanut-free" => icon_with_tooltip("nut-off", "Без кикирики"),
        "peanut" | "peanuts" | "nuts" | "tree-nuts" | "nut" | "almond" | "hazelnut"
        | "pistachio" | "cashew" | "walnut" => icon("nut"),
        "beef" => icon("beef"),
        "pork" | "lamb" | "chicken" | "meat" => icon("drumstick"),
        "vegan" => icon("vegan"),
        "vegetarian" | "herb" => icon("leaf"),
        "salad" => icon("salad"),
        "soup" | "broth" => icon("soup"),
        "dessert" | "cake" | "sweet" => icon("cake"),
        "drink" | "beverage" | "juice" => icon("cup-soda"),
        "spicy" | "hot" | "pepper" => icon("flame"),
        "healthy" => icon("heart-pulse"),
        "protein" | "high-protein" => icon("dumbbell"),
        "signature" | "special" => icon("sparkles"),
        "premium" | "star" => icon("star"),
        "brunch" | "breakfast" => icon("sun"),
        _ => return None,
    };
    Some(entry)
}

static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[_\s]+").unwrap());
static DASH_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"-+").unwrap());
static QUALIFIER_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:contains|with|without|includes)-").unwrap());
static QUALIFIER_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"-?(?:free|friendly)$").unwrap());

/// Keys tried against the icon map, most specific first: the normalized
/// code, the code without qualifiers, its `-free` variant, then each segment.
pub fn candidate_keys(code: &str) -> Vec<String> {
    let lowered = code.to_lowercase();
    let dashed = SEPARATORS.replace_all(&lowered, "-");
    let collapsed = DASH_RUNS.replace_all(&dashed, "-");
    let normalized = collapsed.trim_matches('-');
    if normalized.is_empty() {
        return Vec::new();
    }

    let unprefixed = normalized.strip_prefix("no-").unwrap_or(normalized);
    let unprefixed = QUALIFIER_PREFIX.replace(unprefixed, "");
    let sanitized = QUALIFIER_SUFFIX.replace(&unprefixed, "").into_owned();

    let mut keys: Vec<String> = Vec::new();
    let mut push = |value: &str| {
        if !value.is_empty() && !keys.iter().any(|k| k == value) {
            keys.push(value.to_string());
        }
    };

    push(normalized);
    push(&sanitized);
    push(&format!("{sanitized}-free"));
    normalized.split('-').for_each(&mut push);
    sanitized.split('-').for_each(&mut push);

    keys
}

pub fn icon_entry(code: &str) -> Option<AllergenIconEntry> {
    candidate_keys(code).iter().find_map(|key| lookup(key))
}

/// Tooltip text: a meaningful label wins, then the icon's default tooltip,
/// then the label as-is (or the generic fallback).
pub fn resolve_tooltip_label(label: Option<&str>, entry: Option<&AllergenIconEntry>) -> String {
    let trimmed = label.map(str::trim).filter(|l| !l.is_empty());
    if let Some(label) = trimmed.filter(|l| l.to_lowercase() != ALLERGEN_FALLBACK_LABEL.to_lowercase()) {
        return label.to_string();
    }

    if let Some(tooltip) = entry.and_then(|e| e.default_tooltip) {
        return tooltip.to_string();
    }

    label.unwrap_or(ALLERGEN_FALLBACK_LABEL).to_string()
}
