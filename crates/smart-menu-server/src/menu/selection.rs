//! Selection validation shared by first-load reconciliation and later
//! category refreshes.

use super::model::{Category, Selection, SubcategoryId};

/// Candidate ids gathered from one source (URL, session storage, prefetch).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionCandidate {
    pub category_id: Option<String>,
    pub subcategory_id: Option<SubcategoryId>,
}

impl SelectionCandidate {
    pub fn new(category_id: Option<&str>, subcategory_id: Option<&str>) -> Self {
        Self {
            category_id: category_id.filter(|id| !id.is_empty()).map(str::to_string),
            subcategory_id: subcategory_id
                .filter(|id| !id.is_empty())
                .map(SubcategoryId::parse),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.category_id.is_some() && self.subcategory_id.is_some()
    }

    /// Fills whichever ids are still missing from a lower-precedence source.
    pub fn or(self, fallback: SelectionCandidate) -> Self {
        Self {
            category_id: self.category_id.or(fallback.category_id),
            subcategory_id: self.subcategory_id.or(fallback.subcategory_id),
        }
    }
}

pub fn find_category<'a>(categories: &'a [Category], id: &str) -> Option<&'a Category> {
    categories.iter().find(|category| category.id == id)
}

/// First subcategory of `category`, or `all` when it has none.
pub fn default_subcategory(category: &Category) -> SubcategoryId {
    category
        .subcategories
        .first()
        .map(|sub| SubcategoryId::Id(sub.id.clone()))
        .unwrap_or_default()
}

/// Keeps `candidate` when it is `all` or belongs to `category`, otherwise
/// falls back to the category default.
pub fn validate_subcategory(category: &Category, candidate: Option<&SubcategoryId>) -> SubcategoryId {
    match candidate {
        Some(SubcategoryId::All) => SubcategoryId::All,
        Some(SubcategoryId::Id(id)) if category.has_subcategory(id) => SubcategoryId::Id(id.clone()),
        _ => default_subcategory(category),
    }
}

/// Resolves a candidate against loaded categories. Unknown or missing
/// category ids fall back to the first category. `None` when nothing is loaded.
pub fn reconcile(categories: &[Category], candidate: &SelectionCandidate) -> Option<Selection> {
    let first = categories.first()?;
    let category = candidate
        .category_id
        .as_deref()
        .and_then(|id| find_category(categories, id))
        .unwrap_or(first);

    Some(Selection::new(
        category.id.clone(),
        validate_subcategory(category, candidate.subcategory_id.as_ref()),
    ))
}

/// Re-checks the current selection after categories were re-mapped. A
/// category that disappeared resets to the first category and its default
/// subcategory.
pub fn revalidate(categories: &[Category], current: Option<&Selection>) -> Option<Selection> {
    let first = categories.first()?;
    let kept = current.and_then(|selection| {
        find_category(categories, &selection.category_id).map(|category| {
            Selection::new(
                category.id.clone(),
                validate_subcategory(category, Some(&selection.subcategory_id)),
            )
        })
    });

    Some(kept.unwrap_or_else(|| Selection::new(first.id.clone(), default_subcategory(first))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::model::Subcategory;

    fn category(id: &str, subs: &[&str]) -> Category {
        Category {
            id: id.into(),
            label: id.to_uppercase(),
            subcategories: subs
                .iter()
                .map(|sub| Subcategory {
                    id: (*sub).into(),
                    label: sub.to_uppercase(),
                })
                .collect(),
        }
    }

    fn categories() -> Vec<Category> {
        vec![category("c1", &["s1", "s2"]), category("c2", &[]), category("c3", &["s3"])]
    }

    #[test]
    fn valid_candidate_is_kept() {
        let candidate = SelectionCandidate::new(Some("c3"), Some("s3"));
        assert_eq!(
            reconcile(&categories(), &candidate),
            Some(Selection::new("c3", SubcategoryId::Id("s3".into())))
        );
    }

    #[test]
    fn empty_candidate_selects_first_category_and_subcategory() {
        assert_eq!(
            reconcile(&categories(), &SelectionCandidate::default()),
            Some(Selection::new("c1", SubcategoryId::Id("s1".into())))
        );
    }

    #[test]
    fn unknown_category_falls_back_to_first() {
        let candidate = SelectionCandidate::new(Some("gone"), Some("s2"));
        assert_eq!(
            reconcile(&categories(), &candidate),
            Some(Selection::new("c1", SubcategoryId::Id("s2".into())))
        );
    }

    #[test]
    fn foreign_subcategory_falls_back_to_default() {
        let candidate = SelectionCandidate::new(Some("c1"), Some("s3"));
        assert_eq!(
            reconcile(&categories(), &candidate),
            Some(Selection::new("c1", SubcategoryId::Id("s1".into())))
        );

        let candidate = SelectionCandidate::new(Some("c2"), Some("s3"));
        assert_eq!(
            reconcile(&categories(), &candidate),
            Some(Selection::new("c2", SubcategoryId::All))
        );
    }

    #[test]
    fn all_is_always_valid() {
        let candidate = SelectionCandidate::new(Some("c1"), Some("all"));
        assert_eq!(
            reconcile(&categories(), &candidate),
            Some(Selection::new("c1", SubcategoryId::All))
        );
    }

    #[test]
    fn nothing_loaded_yields_no_selection() {
        assert_eq!(reconcile(&[], &SelectionCandidate::default()), None);
        assert_eq!(revalidate(&[], None), None);
    }

    #[test]
    fn revalidate_drops_vanished_subcategory() {
        let current = Selection::new("c1", SubcategoryId::Id("s2".into()));
        let refreshed = vec![category("c1", &["s1"]), category("c2", &[])];
        assert_eq!(
            revalidate(&refreshed, Some(&current)),
            Some(Selection::new("c1", SubcategoryId::Id("s1".into())))
        );
    }

    #[test]
    fn revalidate_resets_vanished_category() {
        let current = Selection::new("c9", SubcategoryId::All);
        assert_eq!(
            revalidate(&categories(), Some(&current)),
            Some(Selection::new("c1", SubcategoryId::Id("s1".into())))
        );
    }

    #[test]
    fn candidate_precedence_fills_only_missing_ids() {
        let url = SelectionCandidate::new(Some("c3"), None);
        let stored = SelectionCandidate::new(Some("c1"), Some("s3"));
        let merged = url.or(stored);
        assert_eq!(merged, SelectionCandidate::new(Some("c3"), Some("s3")));
        assert!(merged.is_complete());
    }
}
