//! Reading and rewriting the restaurant page's query string
//! (`kind`, `categoryId`, `subcategoryId`).

use super::model::{MealKind, Selection};
use super::selection::SelectionCandidate;
use reqwest::Url;

const ORIGIN: &str = "http://localhost";

/// A site-relative location (`/path?query`) with `URLSearchParams`-style
/// accessors.
#[derive(Debug, Clone)]
pub struct PageLocation {
    url: Url,
}

impl PageLocation {
    pub fn parse(path_and_query: &str) -> Option<Self> {
        let base = Url::parse(ORIGIN).ok()?;
        base.join(path_and_query).ok().map(|url| Self { url })
    }

    pub fn pathname(&self) -> &str {
        self.url.path()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.rewrite(|pairs| {
            match pairs.iter().position(|(k, _)| k == key) {
                Some(index) => {
                    pairs[index].1 = value.to_string();
                    let mut seen = 0usize;
                    pairs.retain(|(k, _)| {
                        if k != key {
                            return true;
                        }
                        seen += 1;
                        seen == 1
                    });
                }
                None => pairs.push((key.to_string(), value.to_string())),
            }
        });
    }

    pub fn delete(&mut self, key: &str) {
        self.rewrite(|pairs| pairs.retain(|(k, _)| k != key));
    }

    fn pairs(&self) -> Vec<(String, String)> {
        self.url.query_pairs().into_owned().collect()
    }

    fn rewrite(&mut self, edit: impl FnOnce(&mut Vec<(String, String)>)) {
        let mut pairs = self.pairs();
        edit(&mut pairs);
        if pairs.is_empty() {
            self.url.set_query(None);
        } else {
            self.url.query_pairs_mut().clear().extend_pairs(pairs.iter());
        }
    }

    pub fn set_pathname(&mut self, path: &str) {
        self.url.set_path(path);
    }

    /// `/path` or `/path?query`.
    pub fn to_path(&self) -> String {
        match self.url.query() {
            Some(query) if !query.is_empty() => format!("{}?{}", self.url.path(), query),
            _ => self.url.path().to_string(),
        }
    }
}

pub fn read_meal_kind(location: &PageLocation) -> MealKind {
    MealKind::from_query(location.get("kind").as_deref())
}

pub fn read_selection_candidate(location: &PageLocation) -> SelectionCandidate {
    SelectionCandidate::new(
        location.get("categoryId").as_deref(),
        location.get("subcategoryId").as_deref(),
    )
}

/// Mirrors the selection into the query string. Returns the new location, or
/// `None` when the query would not change.
pub fn sync_selection_query(location: &str, selection: Option<&Selection>) -> Option<String> {
    let mut page = PageLocation::parse(location)?;
    let before = page.pairs();

    match selection {
        Some(selection) if !selection.category_id.is_empty() => {
            page.set("categoryId", &selection.category_id)
        }
        _ => page.delete("categoryId"),
    }
    match selection.map(|s| &s.subcategory_id) {
        Some(sub) if !sub.is_all() => page.set("subcategoryId", sub.as_str()),
        _ => page.delete("subcategoryId"),
    }

    (page.pairs() != before).then(|| page.to_path())
}

/// Food is the default and is dropped from the URL; drink is written as `kind=drink`.
pub fn sync_meal_kind_query(location: &str, meal: MealKind) -> Option<String> {
    let mut page = PageLocation::parse(location)?;
    let before = page.pairs();

    match meal {
        MealKind::Food => page.delete("kind"),
        MealKind::Drink => page.set("kind", meal.as_str()),
    }

    (page.pairs() != before).then(|| page.to_path())
}

/// Points the location at another restaurant: the segment after `restaurant`
/// becomes `restaurant_id` (appended when absent) and the previous
/// restaurant's `categoryId`/`subcategoryId` are dropped. Other params stay.
pub fn retarget_restaurant_query(location: &str, restaurant_id: &str) -> Option<String> {
    let mut page = PageLocation::parse(location)?;
    let before = page.to_path();

    let mut segments: Vec<String> = page
        .pathname()
        .split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    match segments.iter().position(|s| s == "restaurant") {
        Some(index) if index + 1 < segments.len() => segments[index + 1] = restaurant_id.to_string(),
        Some(_) => segments.push(restaurant_id.to_string()),
        None => segments.extend(["restaurant".to_string(), restaurant_id.to_string()]),
    }
    page.set_pathname(&format!("/{}", segments.join("/")));
    page.delete("categoryId");
    page.delete("subcategoryId");

    let after = page.to_path();
    (after != before).then_some(after)
}
