use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Locales the storefront is translated into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Mk,
    Sq,
    En,
}

impl Locale {
    pub const ALL: [Locale; 3] = [Locale::Mk, Locale::Sq, Locale::En];

    pub fn code(self) -> &'static str {
        match self {
            Locale::Mk => "mk",
            Locale::Sq => "sq",
            Locale::En => "en",
        }
    }

    /// Exact match on the two-letter code (`"mk"`, `"sq"`, `"en"`).
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|locale| locale.code() == code)
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A backend string keyed by locale code, e.g. `{ "mk": "Пица", "en": "Pizza" }`.
///
/// Values under keys that are not a known [`Locale`] are kept (in input order)
/// so the resolver can still fall back to them. A bare JSON string is accepted
/// as a single unkeyed value; any other shape is treated as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalizedText {
    by_locale: BTreeMap<Locale, String>,
    unkeyed: Vec<String>,
}

impl LocalizedText {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, locale: Locale, value: impl Into<String>) -> Self {
        self.by_locale.insert(locale, value.into());
        self
    }

    pub fn from_value(value: &Value) -> Self {
        let mut text = Self::default();
        match value {
            Value::String(s) => text.unkeyed.push(s.clone()),
            Value::Object(map) => {
                for (key, entry) in map {
                    let Some(s) = entry.as_str() else { continue };
                    match Locale::from_code(key) {
                        Some(locale) => {
                            text.by_locale.insert(locale, s.to_string());
                        }
                        None => text.unkeyed.push(s.to_string()),
                    }
                }
            }
            _ => {}
        }
        text
    }

    /// Non-empty value stored for `locale`.
    pub fn get(&self, locale: Locale) -> Option<&str> {
        self.by_locale
            .get(&locale)
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.first_non_empty().is_none()
    }

    fn first_non_empty(&self) -> Option<&str> {
        self.by_locale
            .values()
            .chain(self.unkeyed.iter())
            .map(String::as_str)
            .find(|s| !s.is_empty())
    }
}

impl<'de> Deserialize<'de> for LocalizedText {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

/// Picks the best label for a locale: requested → default → `en` → any
/// non-empty value → caller fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelResolver {
    priority: Vec<Locale>,
    default_locale: Locale,
}

impl LabelResolver {
    pub fn new(current: Locale, default_locale: Locale) -> Self {
        let mut priority = Vec::with_capacity(3);
        for locale in [current, default_locale, Locale::En] {
            if !priority.contains(&locale) {
                priority.push(locale);
            }
        }
        Self {
            priority,
            default_locale,
        }
    }

    pub fn locale(&self) -> Locale {
        self.priority[0]
    }

    pub fn default_locale(&self) -> Locale {
        self.default_locale
    }

    pub fn priority(&self) -> &[Locale] {
        &self.priority
    }

    pub fn resolve(&self, record: Option<&LocalizedText>, fallback: &str) -> String {
        let Some(record) = record else {
            return fallback.to_string();
        };

        self.priority
            .iter()
            .find_map(|locale| record.get(*locale))
            .or_else(|| record.first_non_empty())
            .unwrap_or(fallback)
            .to_string()
    }
}
