// src/utils/url.rs

//! URL manipulation utilities.
//!
//! GitHub payloads carry RFC 6570 URI Templates (`{/sha}`, `{?name}`); every
//! URL must be stripped of template variables before it is enqueued.

use std::sync::OnceLock;

use regex::Regex;
use url::Url;

fn template_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{[^}]*\}").expect("valid template pattern"))
}

/// Strip URI Template variables from a URL.
///
/// # Examples
/// ```
/// use octolink::utils::url::strip_template;
///
/// assert_eq!(
///     strip_template("http://commits{/sha}"),
///     "http://commits"
/// );
/// assert_eq!(
///     strip_template("http://repos{?type,page}"),
///     "http://repos"
/// );
/// ```
pub fn strip_template(url: &str) -> String {
    template_pattern().replace_all(url, "").into_owned()
}

/// Rewrite a URL so its `page` query parameter is `page` and `per_page` is
/// forced to 100. Any prior values of either parameter are dropped; other
/// query parameters are preserved in order.
pub fn with_page(base: &str, page: u32) -> Option<String> {
    let parsed = Url::parse(base).ok()?;
    let retained: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| k != "page" && k != "per_page")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut edited = parsed;
    {
        let mut pairs = edited.query_pairs_mut();
        pairs.clear();
        for (k, v) in &retained {
            pairs.append_pair(k, v);
        }
        pairs.append_pair("page", &page.to_string());
        pairs.append_pair("per_page", "100");
    }
    Some(edited.to_string())
}

/// Read the `page` query parameter from a URL.
pub fn page_of(url: &str) -> Option<u32> {
    let parsed = Url::parse(url).ok()?;
    parsed
        .query_pairs()
        .find(|(k, _)| k == "page")
        .and_then(|(_, v)| v.parse().ok())
}

/// A parsed pagination header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageLinks {
    pub next: Option<String>,
    pub last: Option<String>,
    pub prev: Option<String>,
}

impl PageLinks {
    /// Page number of the `rel="next"` entry, if present.
    pub fn next_page(&self) -> Option<u32> {
        self.next.as_deref().and_then(page_of)
    }

    /// Page number of the `rel="last"` entry, if present.
    pub fn last_page(&self) -> Option<u32> {
        self.last.as_deref().and_then(page_of)
    }
}

/// Parse an RFC 5988 `Link` header into its pagination relations.
///
/// Grammar: comma-separated `<url>; rel="name"` entries. Unparseable
/// entries are skipped; a header with no recognizable entry yields the
/// empty `PageLinks` (treated as "no next page").
pub fn parse_link_header(header: &str) -> PageLinks {
    let mut links = PageLinks::default();

    for entry in header.split(',') {
        let mut parts = entry.split(';');
        let url = match parts.next() {
            Some(raw) => {
                let trimmed = raw.trim();
                if !trimmed.starts_with('<') || !trimmed.ends_with('>') {
                    continue;
                }
                trimmed[1..trimmed.len() - 1].to_string()
            }
            None => continue,
        };

        for param in parts {
            let param = param.trim();
            if let Some(rel) = param
                .strip_prefix("rel=\"")
                .and_then(|rest| rest.strip_suffix('"'))
            {
                match rel {
                    "next" => links.next = Some(url.clone()),
                    "last" => links.last = Some(url.clone()),
                    "prev" => links.prev = Some(url.clone()),
                    _ => {}
                }
            }
        }
    }

    links
}
