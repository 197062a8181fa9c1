use super::locale::Locale;

/// Ensures `path` starts with the `locale` segment, replacing an existing
/// locale prefix. Query string and hash fragment are preserved.
pub fn build_localized_path(path: &str, locale: Locale) -> String {
    let safe_path = if path.is_empty() { "/" } else { path };
    let (without_hash, hash) = safe_path.split_once('#').unwrap_or((safe_path, ""));
    let (pathname, query) = without_hash.split_once('?').unwrap_or((without_hash, ""));

    let mut segments: Vec<&str> = pathname.split('/').filter(|s| !s.is_empty()).collect();
    match segments.first() {
        Some(first) if Locale::from_code(first).is_some() => segments[0] = locale.code(),
        _ => segments.insert(0, locale.code()),
    }

    let mut result = format!("/{}", segments.join("/"));
    if !query.is_empty() {
        result.push('?');
        result.push_str(query);
    }
    if !hash.is_empty() {
        result.push('#');
        result.push_str(hash);
    }
    result
}

/// Locale taken from a route segment, or `default_locale` when unknown.
pub fn resolve_route_locale(segment: &str, default_locale: Locale) -> Locale {
    Locale::from_code(segment).unwrap_or(default_locale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_unlocalized_paths() {
        assert_eq!(build_localized_path("/restaurant/r1", Locale::Mk), "/mk/restaurant/r1");
        assert_eq!(build_localized_path("restaurant/r1", Locale::En), "/en/restaurant/r1");
        assert_eq!(build_localized_path("", Locale::Sq), "/sq");
    }

    #[test]
    fn replaces_existing_locale_segment() {
        assert_eq!(build_localized_path("/en/za-nas", Locale::Sq), "/sq/za-nas");
    }

    #[test]
    fn keeps_query_and_hash() {
        assert_eq!(
            build_localized_path("/restaurant/r1/menuItem/i1?kind=drink#top", Locale::En),
            "/en/restaurant/r1/menuItem/i1?kind=drink#top"
        );
    }

    #[test]
    fn unknown_route_locale_uses_default() {
        assert_eq!(resolve_route_locale("de", Locale::Mk), Locale::Mk);
        assert_eq!(resolve_route_locale("sq", Locale::Mk), Locale::Sq);
    }
}
