use crate::cache::CacheKind;
use crate::network::Fetcher;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::sync::Arc;

static TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("title").expect("`title` is a valid selector"));

/// Returns the trimmed text of the first `<title>` element in `html`, or
/// `None` when there is no title or it is blank.
///
/// # Examples
///
/// ```rust
/// use sitemap_search::title::extract_title;
///
/// let html = "<html><head><title>  Hello  </title></head></html>";
/// assert_eq!(extract_title(html).as_deref(), Some("Hello"));
/// assert_eq!(extract_title("<title></title>"), None);
/// ```
pub fn extract_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let element = document.select(&TITLE_SELECTOR).next()?;
    let title = element.text().collect::<String>();
    let title = title.trim();
    (!title.is_empty()).then(|| title.to_string())
}

/// Looks up page titles, going through the fetcher (and its cache) for the
/// page body and memoizing found titles separately.
#[derive(Debug, Clone)]
pub struct TitleResolver {
    fetcher: Arc<Fetcher>,
}

impl TitleResolver {
    pub fn new(fetcher: Arc<Fetcher>) -> Self {
        Self { fetcher }
    }

    /// Resolves the title of the page at `url`.
    ///
    /// Fetch failures are logged and reported as `None`, the same as a page
    /// without a title; the caller falls back to the URL.
    pub async fn resolve(&self, url: &str) -> Option<String> {
        let cache = self.fetcher.cache();
        if let Some(cache) = cache {
            if let Some(title) = cache.get(CacheKind::Title, url).await {
                return Some(title);
            }
        }

        let html = match self.fetcher.fetch(url).await {
            Ok(html) => html,
            Err(e) => {
                tracing::debug!(url, error = %e, "could not fetch page for its title");
                return None;
            }
        };

        let title = extract_title(&html)?;
        if let Some(cache) = cache {
            if let Err(e) = cache.put(CacheKind::Title, url, &title).await {
                tracing::warn!(url, error = %e, "failed to write title to cache");
            }
        }
        Some(title)
    }
}
