//! Key/value storage standing in for the browser's `sessionStorage` and
//! `localStorage`. Every read and write here is best-effort: failures are
//! logged and the feature degrades to "nothing remembered".

use super::model::{MealKind, Selection};
use super::selection::SelectionCandidate;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Storage quota exceeded")]
    QuotaExceeded,

    #[error("Malformed stored value: {0}")]
    Malformed(#[from] serde_json::Error),
}

pub trait KeyValueStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// In-process storage with an optional entry limit (to mimic a full quota).
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<DashMap<String, String>>,
    max_entries: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            max_entries: Some(max_entries),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if let Some(limit) = self.max_entries {
            if !self.entries.contains_key(key) && self.entries.len() >= limit {
                return Err(StorageError::QuotaExceeded);
            }
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}

// ===== COOKIE STORAGE (per visitor) =====

const COOKIE_PREFIX: &str = "sm_";
const COOKIE_MAX_AGE_SECS: u64 = 60 * 60 * 24 * 365;
const COOKIE_MAX_BYTES: usize = 4096;

/// Storage carried in the visitor's own cookies, one cookie per key.
///
/// Keys and values are base64url encoded so any storage key maps onto a
/// valid cookie name. Writes are collected and turned into `Set-Cookie`
/// headers with [`CookieStorage::set_cookie_headers`].
#[derive(Debug, Default)]
pub struct CookieStorage {
    entries: DashMap<String, String>,
    changed: DashMap<String, Option<String>>,
}

impl CookieStorage {
    /// Parses a `Cookie` request header, ignoring cookies it does not own.
    pub fn from_header(header: Option<&str>) -> Self {
        let storage = Self::default();
        for pair in header.unwrap_or_default().split(';') {
            let Some((name, value)) = pair.trim().split_once('=') else {
                continue;
            };
            let Some(encoded_key) = name.trim().strip_prefix(COOKIE_PREFIX) else {
                continue;
            };
            match (decode(encoded_key), decode(value.trim())) {
                (Some(key), Some(value)) => {
                    storage.entries.insert(key, value);
                }
                _ => debug!("Ignoring undecodable cookie {}", name.trim()),
            }
        }
        storage
    }

    /// One `Set-Cookie` value per key written or removed since parsing.
    pub fn set_cookie_headers(&self) -> Vec<String> {
        self.changed
            .iter()
            .map(|entry| {
                let name = cookie_name(entry.key());
                match entry.value() {
                    Some(value) => format!(
                        "{name}={}; Path=/; Max-Age={COOKIE_MAX_AGE_SECS}; SameSite=Lax",
                        URL_SAFE_NO_PAD.encode(value)
                    ),
                    None => format!("{name}=; Path=/; Max-Age=0; SameSite=Lax"),
                }
            })
            .collect()
    }
}

fn cookie_name(key: &str) -> String {
    format!("{COOKIE_PREFIX}{}", URL_SAFE_NO_PAD.encode(key))
}

fn decode(raw: &str) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(raw).ok()?;
    String::from_utf8(bytes).ok()
}

impl KeyValueStorage for CookieStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if cookie_name(key).len() + URL_SAFE_NO_PAD.encode(value).len() > COOKIE_MAX_BYTES {
            return Err(StorageError::QuotaExceeded);
        }
        self.entries.insert(key.to_string(), value.to_string());
        self.changed.insert(key.to_string(), Some(value.to_string()));
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        self.changed.insert(key.to_string(), None);
        Ok(())
    }
}

// ===== SELECTION MEMORY (sessionStorage) =====

pub fn selection_storage_key(restaurant_id: &str, meal: MealKind) -> String {
    format!("menu-browser:{restaurant_id}:{meal}")
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSelection {
    #[serde(default)]
    category_id: Option<String>,
    #[serde(default)]
    subcategory_id: Option<String>,
}

/// Last selection per `(restaurant, meal kind)`.
#[derive(Clone)]
pub struct SelectionMemory {
    storage: Arc<dyn KeyValueStorage>,
}

impl SelectionMemory {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self { storage }
    }

    pub fn load(&self, restaurant_id: &str, meal: MealKind) -> SelectionCandidate {
        let key = selection_storage_key(restaurant_id, meal);
        match self.try_load(&key) {
            Ok(candidate) => candidate,
            Err(e) => {
                debug!("Ignoring stored selection {}: {}", key, e);
                SelectionCandidate::default()
            }
        }
    }

    fn try_load(&self, key: &str) -> Result<SelectionCandidate, StorageError> {
        let Some(raw) = self.storage.get_item(key)? else {
            return Ok(SelectionCandidate::default());
        };
        let stored: StoredSelection = serde_json::from_str(&raw)?;
        Ok(SelectionCandidate::new(
            stored.category_id.as_deref(),
            stored.subcategory_id.as_deref(),
        ))
    }

    pub fn save(&self, restaurant_id: &str, meal: MealKind, selection: &Selection) {
        let key = selection_storage_key(restaurant_id, meal);
        let result = serde_json::to_string(selection)
            .map_err(StorageError::from)
            .and_then(|payload| self.storage.set_item(&key, &payload));

        if let Err(e) = result {
            debug!("Could not persist selection {}: {}", key, e);
        }
    }
}

// ===== FAVORITES (localStorage) =====

pub fn favorites_key(restaurant_id: Option<&str>) -> String {
    match restaurant_id.filter(|id| !id.is_empty()) {
        Some(id) => format!("favorites:{id}"),
        None => "favorites:default".to_string(),
    }
}

/// Per-restaurant favorite item ids.
#[derive(Clone)]
pub struct Favorites {
    storage: Arc<dyn KeyValueStorage>,
}

impl Favorites {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self { storage }
    }

    pub fn list(&self, restaurant_id: Option<&str>) -> Vec<String> {
        let key = favorites_key(restaurant_id);
        let result = self
            .storage
            .get_item(&key)
            .and_then(|raw| match raw {
                Some(raw) => serde_json::from_str::<Vec<String>>(&raw).map_err(StorageError::from),
                None => Ok(Vec::new()),
            });

        result.unwrap_or_else(|e| {
            debug!("Ignoring stored favorites {}: {}", key, e);
            Vec::new()
        })
    }

    pub fn contains(&self, restaurant_id: Option<&str>, item_id: &str) -> bool {
        self.list(restaurant_id).iter().any(|id| id == item_id)
    }

    /// Adds or removes `item_id`; returns whether it is a favorite afterwards.
    pub fn toggle(&self, restaurant_id: Option<&str>, item_id: &str) -> bool {
        let mut ids = self.list(restaurant_id);
        let now_favorite = match ids.iter().position(|id| id == item_id) {
            Some(index) => {
                ids.remove(index);
                false
            }
            None => {
                ids.push(item_id.to_string());
                true
            }
        };

        let key = favorites_key(restaurant_id);
        let result = serde_json::to_string(&ids)
            .map_err(StorageError::from)
            .and_then(|payload| self.storage.set_item(&key, &payload));
        if let Err(e) = result {
            debug!("Could not persist favorites {}: {}", key, e);
        }

        now_favorite
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::model::SubcategoryId;

    struct BrokenStorage;

    impl KeyValueStorage for BrokenStorage {
        fn get_item(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Unavailable("private mode".into()))
        }
        fn set_item(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("private mode".into()))
        }
        fn remove_item(&self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("private mode".into()))
        }
    }

    #[test]
    fn selection_key_format() {
        assert_eq!(selection_storage_key("r1", MealKind::Drink), "menu-browser:r1:drink");
    }

    #[test]
    fn selection_round_trips_through_storage() {
        let storage = Arc::new(MemoryStorage::new());
        let memory = SelectionMemory::new(storage.clone());
        memory.save("r1", MealKind::Food, &Selection::new("c1", SubcategoryId::All));

        assert_eq!(
            storage.get_item("menu-browser:r1:food").unwrap().as_deref(),
            Some(r#"{"categoryId":"c1","subcategoryId":"all"}"#)
        );
        assert_eq!(
            memory.load("r1", MealKind::Food),
            SelectionCandidate::new(Some("c1"), Some("all"))
        );
        assert_eq!(memory.load("r1", MealKind::Drink), SelectionCandidate::default());
    }

    #[test]
    fn malformed_stored_selection_is_ignored() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_item("menu-browser:r1:food", "{not json").unwrap();
        let memory = SelectionMemory::new(storage);
        assert_eq!(memory.load("r1", MealKind::Food), SelectionCandidate::default());
    }

    #[test]
    fn storage_failures_are_swallowed() {
        let memory = SelectionMemory::new(Arc::new(BrokenStorage));
        memory.save("r1", MealKind::Food, &Selection::new("c1", SubcategoryId::All));
        assert_eq!(memory.load("r1", MealKind::Food), SelectionCandidate::default());

        let favorites = Favorites::new(Arc::new(BrokenStorage));
        assert!(favorites.toggle(Some("r1"), "i1"));
        assert!(favorites.list(Some("r1")).is_empty());
    }

    #[test]
    fn favorites_toggle_per_restaurant() {
        let storage = Arc::new(MemoryStorage::new());
        let favorites = Favorites::new(storage.clone());

        assert!(favorites.toggle(Some("r1"), "i1"));
        assert!(favorites.toggle(Some("r1"), "i2"));
        assert!(favorites.contains(Some("r1"), "i1"));
        assert!(!favorites.contains(Some("r2"), "i1"));

        assert!(!favorites.toggle(Some("r1"), "i1"));
        assert_eq!(favorites.list(Some("r1")), vec!["i2".to_string()]);

        favorites.toggle(None, "i9");
        assert_eq!(
            storage.get_item("favorites:default").unwrap().as_deref(),
            Some(r#"["i9"]"#)
        );
    }

    #[test]
    fn cookie_storage_reads_its_own_cookies() {
        let header = format!(
            "theme=dark; {}={}; sm_%%%=x",
            cookie_name("favorites:r1"),
            URL_SAFE_NO_PAD.encode(r#"["i1"]"#)
        );
        let storage = CookieStorage::from_header(Some(&header));

        assert_eq!(storage.get_item("favorites:r1").unwrap().as_deref(), Some(r#"["i1"]"#));
        assert_eq!(storage.get_item("theme").unwrap(), None);
        assert!(storage.set_cookie_headers().is_empty());
    }

    #[test]
    fn cookie_storage_emits_changes_only() {
        let storage = CookieStorage::from_header(None);
        storage.set_item("favorites:r1", r#"["i2"]"#).unwrap();
        storage.remove_item("favorites:r2").unwrap();
        let mut headers = storage.set_cookie_headers();
        headers.sort();

        let set = format!(
            "{}={}; Path=/; Max-Age={COOKIE_MAX_AGE_SECS}; SameSite=Lax",
            cookie_name("favorites:r1"),
            URL_SAFE_NO_PAD.encode(r#"["i2"]"#)
        );
        let cleared = format!("{}=; Path=/; Max-Age=0; SameSite=Lax", cookie_name("favorites:r2"));
        let mut expected = vec![set, cleared];
        expected.sort();
        assert_eq!(headers, expected);

        // The written value round-trips through the next request's header.
        let pairs: Vec<&str> = headers.iter().filter_map(|h| h.split(';').next()).collect();
        let next = CookieStorage::from_header(Some(&pairs.join("; ")));
        assert_eq!(next.get_item("favorites:r1").unwrap().as_deref(), Some(r#"["i2"]"#));
    }

    #[test]
    fn oversized_cookie_value_is_rejected() {
        let storage = CookieStorage::from_header(None);
        let value = "x".repeat(COOKIE_MAX_BYTES);
        assert!(matches!(
            storage.set_item("favorites:r1", &value),
            Err(StorageError::QuotaExceeded)
        ));
        assert!(storage.set_cookie_headers().is_empty());
    }

    #[test]
    fn full_quota_rejects_new_keys() {
        let storage = MemoryStorage::with_max_entries(1);
        storage.set_item("a", "1").unwrap();
        storage.set_item("a", "2").unwrap();
        assert!(matches!(storage.set_item("b", "1"), Err(StorageError::QuotaExceeded)));
        assert_eq!(storage.len(), 1);
    }
}
