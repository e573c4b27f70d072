use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::config::SeoDefaults;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SeoEntry {
    pub id: Uuid,
    pub page_path: String,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    pub og_image: Option<String>,
    pub canonical_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Metadata for one page: a stored entry or the site defaults.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedSeo {
    pub page_path: String,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    pub og_image: Option<String>,
    pub canonical_url: Option<String>,
    pub is_default: bool,
}

impl ResolvedSeo {
    pub fn from_entry(entry: SeoEntry) -> Self {
        ResolvedSeo {
            page_path: entry.page_path,
            meta_title: entry.meta_title,
            meta_description: entry.meta_description,
            meta_keywords: entry.meta_keywords,
            og_image: entry.og_image,
            canonical_url: entry.canonical_url,
            is_default: false,
        }
    }

    pub fn defaults(page_path: String, defaults: &SeoDefaults) -> Self {
        ResolvedSeo {
            page_path,
            meta_title: Some(defaults.title.clone()),
            meta_description: Some(defaults.description.clone()),
            meta_keywords: Some(defaults.keywords.clone()),
            og_image: defaults.image.clone(),
            canonical_url: None,
            is_default: true,
        }
    }
}

/// Canonical form of a page path used as the lookup key.
///
/// Percent-escapes are decoded until nothing changes (or the bytes stop being UTF-8), then
/// the path is trimmed, lowercased, given a leading `/` and stripped of trailing slashes.
/// The root stays `/`. Applying it twice gives the same result as applying it once.
pub fn normalize_path(raw: &str) -> String {
    let mut decoded = raw.to_string();
    loop {
        let next = match urlencoding::decode(&decoded) {
            Ok(next) => next.into_owned(),
            Err(_) => break,
        };
        if next == decoded {
            break;
        }
        decoded = next;
    }

    let lowered = decoded.trim().to_lowercase();
    let mut path = if lowered.starts_with('/') {
        lowered
    } else {
        format!("/{}", lowered)
    };
    let end = path.trim_end_matches(|c: char| c == '/' || c.is_whitespace()).len();
    path.truncate(end);
    if path.is_empty() {
        "/".to_string()
    } else {
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_and_case_do_not_matter() {
        assert_eq!(normalize_path("/about/"), normalize_path("About"));
        assert_eq!(normalize_path("About"), "/about");
    }

    #[test]
    fn root_and_empty_map_to_slash() {
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("  ///  "), "/");
    }

    #[test]
    fn decodes_escapes_including_double_encoding() {
        assert_eq!(normalize_path("/Caf%C3%A9"), "/café");
        assert_eq!(normalize_path("/a%252Fb"), "/a/b");
        assert_eq!(normalize_path("%2Fproducts%2F"), "/products");
    }

    #[test]
    fn invalid_escapes_are_kept() {
        assert_eq!(normalize_path("/x%C3"), "/x%c3");
        assert_eq!(normalize_path("/100%"), "/100%");
    }

    #[test]
    fn normalization_is_idempotent() {
        let samples = [
            "/about/",
            "About",
            " /Shop/Item%20One/ ",
            "%252F",
            "/x%C3",
            "//double//",
            "/%20/",
            "/products%2F%2F",
            "",
        ];
        for s in samples {
            let once = normalize_path(s);
            assert_eq!(normalize_path(&once), once, "input {:?}", s);
        }
    }
}
