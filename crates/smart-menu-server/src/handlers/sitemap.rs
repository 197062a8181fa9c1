use crate::config::Settings;
use crate::i18n::Locale;
use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
};
use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::escape::escape;
use std::fmt::Write;
use std::sync::Arc;

const LOCALE_ROUTES: [&str; 4] = ["", "/kako-raboti", "/cenovnik", "/za-nas"];
const SITEMAP_LOCALES: [Locale; 3] = [Locale::Mk, Locale::Sq, Locale::En];

#[derive(Debug, Clone, PartialEq)]
pub struct SitemapEntry {
    pub url: String,
    pub last_modified: DateTime<Utc>,
    pub priority: f32,
}

/// Site root, then every marketing route under every locale.
pub fn sitemap_entries(app_url: &str, now: DateTime<Utc>) -> Vec<SitemapEntry> {
    let base = app_url.trim().trim_end_matches('/');
    let mut entries = vec![SitemapEntry {
        url: base.to_string(),
        last_modified: now,
        priority: 1.0,
    }];

    for locale in SITEMAP_LOCALES {
        for route in LOCALE_ROUTES {
            entries.push(SitemapEntry {
                url: format!("{}/{}{}", base, locale.code(), route),
                last_modified: now,
                priority: if route.is_empty() { 0.9 } else { 0.7 },
            });
        }
    }
    entries
}

pub fn render_sitemap(entries: &[SitemapEntry]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for entry in entries {
        // Writing into a String cannot fail.
        let _ = write!(
            xml,
            "<url>\n<loc>{}</loc>\n<lastmod>{}</lastmod>\n<changefreq>weekly</changefreq>\n<priority>{:.1}</priority>\n</url>\n",
            escape(entry.url.as_str()),
            entry.last_modified.to_rfc3339_opts(SecondsFormat::Millis, true),
            entry.priority,
        );
    }
    xml.push_str("</urlset>\n");
    xml
}

/// GET /sitemap.xml
pub async fn sitemap(State(settings): State<Arc<Settings>>) -> impl IntoResponse {
    let entries = sitemap_entries(&settings.site.app_url, Utc::now());
    (
        [(header::CONTENT_TYPE, "application/xml")],
        render_sitemap(&entries),
    )
}
